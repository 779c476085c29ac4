use std::convert::TryFrom;

use crate::block::Engine;
use crate::bitstream::Bitstream;
use crate::error::{Error, Result};
use crate::reader::ByteReader;
use crate::window_size::WindowSize;

const CLCD_SIGNATURE: &[u8; 4] = b"LZXC";

/// Parsed `ControlData` unit: the per-archive LZX parameters CHM stores
/// explicitly (spec.md §4.G), found at
/// `::DataSpace/Storage/MSCompressed/ControlData`.
pub struct ControlData {
    pub window_size: WindowSize,
    /// Uncompressed bytes per reset interval (`reset_interval * 32768`).
    pub reset_interval_bytes: usize,
}

impl ControlData {
    pub fn parse(data: &[u8]) -> Result<ControlData> {
        let mut r = ByteReader::new(data);
        let _size = r.read_u32_le()?;
        let sig = r.read_exact(4)?;
        if sig != CLCD_SIGNATURE {
            return Err(Error::Format(format!(
                "bad ControlData signature {:?}, expected \"LZXC\"",
                sig
            )));
        }
        let _version = r.read_u32_le()?;
        let reset_interval = r.read_u32_le()?;
        let window_size_bytes = r.read_u32_le()?;
        let _cache_size = r.read_u32_le()?;

        let window_size = WindowSize::from_bytes(window_size_bytes)?;
        let reset_interval_bytes = reset_interval as usize * 0x8000;
        if reset_interval_bytes == 0 {
            return Err(Error::Corrupt("ControlData reset_interval is zero".into()));
        }

        Ok(ControlData {
            window_size,
            reset_interval_bytes,
        })
    }
}

/// Parsed reset-table unit: the compressed-stream byte offset of every
/// reset point, enabling random access into the LZX stream (spec.md §4.G),
/// found at
/// `::DataSpace/Storage/MSCompressed/Transform/{7FC28940-9D31-11D0-9B27-00A0C91E9C7C}/InstanceData/ResetTable`.
pub struct ResetTable {
    pub uncompressed_len: u64,
    pub block_size: u64,
    pub entries: Vec<u64>,
}

impl ResetTable {
    pub fn parse(data: &[u8]) -> Result<ResetTable> {
        let mut r = ByteReader::new(data);
        let _version = r.read_u32_le()?;
        let num_entries = r.read_u32_le()?;
        let _entry_size = r.read_u32_le()?;
        let table_offset = r.read_u32_le()?;
        let uncompressed_len = r.read_u64_le()?;
        let _compressed_len = r.read_u64_le()?;
        let block_size = r.read_u64_le()?;
        if block_size == 0 {
            return Err(Error::Corrupt("reset table block_size is zero".into()));
        }

        r.seek(table_offset as usize)?;
        let mut entries = Vec::with_capacity(num_entries as usize);
        for _ in 0..num_entries {
            entries.push(r.read_u64_le()?);
        }

        Ok(ResetTable {
            uncompressed_len,
            block_size,
            entries,
        })
    }

    /// Finds the reset interval containing `offset`, returning its index
    /// into `entries` and how many bytes to skip within that interval.
    fn locate(&self, offset: u64) -> Result<(usize, u64)> {
        let idx = offset / self.block_size;
        let idx = usize::try_from(idx).map_err(|_| Error::OutOfRange)?;
        if idx >= self.entries.len() {
            return Err(Error::OutOfRange);
        }
        Ok((idx, offset % self.block_size))
    }
}

/// Decompresses `length` bytes starting at uncompressed `offset`, seeking
/// to the nearest reset point at or before `offset` within `compressed`
/// (the raw bytes of the `Content` unit) and skipping forward from there —
/// spec.md §4.G's "seek, skip, decode" access pattern. A fresh [`Engine`]
/// is built for every call (no cross-call cache; see DESIGN.md).
pub fn retrieve(
    compressed: &[u8],
    control: &ControlData,
    reset_table: &ResetTable,
    offset: u64,
    length: u64,
) -> Result<Vec<u8>> {
    let end = offset.checked_add(length).ok_or(Error::OutOfRange)?;
    if end > reset_table.uncompressed_len {
        return Err(Error::OutOfRange);
    }

    let (idx, skip) = reset_table.locate(offset)?;
    let start = usize::try_from(reset_table.entries[idx]).map_err(|_| Error::OutOfRange)?;
    if start > compressed.len() {
        return Err(Error::Truncated);
    }

    let mut engine = Engine::new(
        control.window_size,
        Bitstream::new(&compressed[start..]),
        control.reset_interval_bytes,
    );
    engine.skip(skip as usize)?;
    engine.decode(length as usize)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_control_data() -> Vec<u8> {
        let mut b = Vec::new();
        b.extend_from_slice(&24u32.to_le_bytes()); // size
        b.extend_from_slice(CLCD_SIGNATURE);
        b.extend_from_slice(&2u32.to_le_bytes()); // version
        b.extend_from_slice(&2u32.to_le_bytes()); // reset_interval
        b.extend_from_slice(&0x10000u32.to_le_bytes()); // window_size (64 KB)
        b.extend_from_slice(&0u32.to_le_bytes()); // cache_size
        b
    }

    #[test]
    fn parses_control_data() {
        let bytes = sample_control_data();
        let control = ControlData::parse(&bytes).unwrap();
        assert_eq!(control.window_size, WindowSize::KB64);
        assert_eq!(control.reset_interval_bytes, 2 * 0x8000);
    }

    fn sample_reset_table(entries: &[u64], block_size: u64, uncompressed_len: u64) -> Vec<u8> {
        let mut b = Vec::new();
        b.extend_from_slice(&2u32.to_le_bytes()); // version
        b.extend_from_slice(&(entries.len() as u32).to_le_bytes());
        b.extend_from_slice(&8u32.to_le_bytes()); // entry_size
        b.extend_from_slice(&40u32.to_le_bytes()); // table_offset
        b.extend_from_slice(&uncompressed_len.to_le_bytes());
        b.extend_from_slice(&0u64.to_le_bytes()); // compressed_len
        b.extend_from_slice(&block_size.to_le_bytes());
        for e in entries {
            b.extend_from_slice(&e.to_le_bytes());
        }
        b
    }

    #[test]
    fn locates_correct_interval() {
        let bytes = sample_reset_table(&[0, 100, 250], 0x8000, 3 * 0x8000);
        let table = ResetTable::parse(&bytes).unwrap();
        assert_eq!(table.locate(0).unwrap(), (0, 0));
        assert_eq!(table.locate(0x8000 + 5).unwrap(), (1, 5));
        assert!(table.locate(3 * 0x8000).is_err());
    }
}
