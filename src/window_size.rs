use crate::error::{Error, Result};

/// The LZX decode window size, stored explicitly in a CHM archive's
/// `ControlData` block (spec.md §4.G CLCD) — unlike the generic LZX format,
/// where it has to be supplied out-of-band.
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowSize {
    KB32 = 0x0000_8000,
    KB64 = 0x0001_0000,
    KB128 = 0x0002_0000,
    KB256 = 0x0004_0000,
    KB512 = 0x0008_0000,
    MB1 = 0x0010_0000,
    MB2 = 0x0020_0000,
    MB4 = 0x0040_0000,
    MB8 = 0x0080_0000,
    MB16 = 0x0100_0000,
    MB32 = 0x0200_0000,
}

impl WindowSize {
    /// Maps the raw byte count stored in `ControlData` to a `WindowSize`.
    pub fn from_bytes(value: u32) -> Result<WindowSize> {
        use WindowSize::*;
        Ok(match value {
            0x0000_8000 => KB32,
            0x0001_0000 => KB64,
            0x0002_0000 => KB128,
            0x0004_0000 => KB256,
            0x0008_0000 => KB512,
            0x0010_0000 => MB1,
            0x0020_0000 => MB2,
            0x0040_0000 => MB4,
            0x0080_0000 => MB8,
            0x0100_0000 => MB16,
            0x0200_0000 => MB32,
            other => {
                return Err(Error::Format(format!(
                    "unsupported LZX window size {} bytes",
                    other
                )))
            }
        })
    }

    pub fn bytes(&self) -> usize {
        *self as usize
    }

    /// The window size determines the number of window subdivisions, or
    /// position slots, which bounds how large the main tree's match half
    /// can get.
    pub(crate) fn position_slots(&self) -> usize {
        use WindowSize::*;

        match self {
            KB32 => 30,
            KB64 => 32,
            KB128 => 34,
            KB256 => 36,
            KB512 => 38,
            MB1 => 42,
            MB2 => 50,
            MB4 => 66,
            MB8 => 98,
            MB16 => 162,
            MB32 => 290,
        }
    }
}
