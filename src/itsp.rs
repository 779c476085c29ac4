use crate::error::{Error, Result};
use crate::reader::ByteReader;

const ITSP_SIGNATURE: &[u8; 4] = b"ITSP";
const SUPPORTED_VERSION: u32 = 1;

/// The directory header (spec.md §3 "ITSP"), immediately followed by the
/// PMGL/PMGI block chain it describes. Always 84 bytes.
#[derive(Debug, Clone)]
pub struct Itsp {
    pub version: u32,
    pub length: u32,
    pub dir_block_length: u32,
    pub quickref_density: u32,
    pub index_depth: u32,
    /// Block number of the PMGI root, or `None` when `index_depth == 1`
    /// (single-level directory, PMGL chain walked directly).
    pub index_root: Option<u32>,
    pub first_pmgl_block: u32,
    pub last_pmgl_block: u32,
    pub num_blocks: u32,
}

impl Itsp {
    /// Parses the ITSP header. `offset` is the absolute file offset at which
    /// it starts (immediately after ITSF, at `itsf.dir_offset`).
    pub fn parse(r: &mut ByteReader, offset: u64) -> Result<Itsp> {
        r.seek(offset as usize)?;
        let sig = r.read_exact(4)?;
        if sig != ITSP_SIGNATURE {
            return Err(Error::Format(format!(
                "bad ITSP signature {:?}, expected \"ITSP\"",
                sig
            )));
        }
        let version = r.read_u32_le()?;
        if version != SUPPORTED_VERSION {
            return Err(Error::Format(format!(
                "unsupported ITSP version {} (only version 1 is supported)",
                version
            )));
        }
        let length = r.read_u32_le()?;
        let _unknown_1 = r.read_u32_le()?;
        let dir_block_length = r.read_u32_le()?;
        let quickref_density = r.read_u32_le()?;
        let index_depth = r.read_u32_le()?;
        let index_root_raw = r.read_i32_le()?;
        let first_pmgl_block = r.read_u32_le()?;
        let last_pmgl_block = r.read_u32_le()?;
        let _unknown_2 = r.read_i32_le()?;
        let num_blocks = r.read_u32_le()?;
        let _lang_id = r.read_u32_le()?;
        let _system_uuid = r.read_exact(16)?;
        let _length_copy = r.read_u32_le()?;
        let _zero_1 = r.read_u32_le()?;
        let _zero_2 = r.read_u32_le()?;
        let _zero_3 = r.read_u32_le()?;

        if index_depth == 1 && index_root_raw != -1 {
            return Err(Error::Corrupt(format!(
                "index_depth is 1 but index_root is {} (expected -1)",
                index_root_raw
            )));
        }
        let index_root = if index_root_raw < 0 {
            None
        } else {
            Some(index_root_raw as u32)
        };

        Ok(Itsp {
            version,
            length,
            dir_block_length,
            quickref_density,
            index_depth,
            index_root,
            first_pmgl_block,
            last_pmgl_block,
            num_blocks,
        })
    }
}
