use crate::error::{Error, Result};
use crate::reader::ByteReader;

const ITSF_SIGNATURE: &[u8; 4] = b"ITSF";
const SUPPORTED_VERSION: u32 = 3;

/// The outer file header (spec.md §3 "ITSF"). Always 96 bytes for the only
/// version this format defines in practice (version 3).
///
/// Two GUIDs (`dir_uuid`, `stream_uuid`) are read but not interpreted; they
/// identify the directory/stream format revisions and are constant across
/// every CHM file seen in the wild.
#[derive(Debug, Clone)]
pub struct Itsf {
    pub version: u32,
    pub length: u32,
    pub lang_id: u32,
    pub dir_offset: u64,
    pub dir_length: u64,
    pub data_offset: u64,
}

impl Itsf {
    /// Parses the ITSF header, which always starts at file offset 0.
    pub fn parse(r: &mut ByteReader) -> Result<Itsf> {
        r.seek(0)?;
        let sig = r.read_exact(4)?;
        if sig != ITSF_SIGNATURE {
            return Err(Error::Format(format!(
                "bad ITSF signature {:?}, expected \"ITSF\"",
                sig
            )));
        }
        let version = r.read_u32_le()?;
        if version != SUPPORTED_VERSION {
            return Err(Error::Format(format!(
                "unsupported ITSF version {} (only version 3 is supported)",
                version
            )));
        }
        let length = r.read_u32_le()?;
        let _unknown_1 = r.read_u32_le()?;
        let _timestamp = r.read_u32_le()?;
        let lang_id = r.read_u32_le()?;
        let _dir_uuid = r.read_exact(16)?;
        let _stream_uuid = r.read_exact(16)?;
        // The "header section table": two (offset, length) pairs. The first
        // is unused in every archive observed in practice; the second gives
        // the directory's location.
        let _unknown_offset = r.read_u64_le()?;
        let _unknown_len = r.read_u64_le()?;
        let dir_offset = r.read_u64_le()?;
        let dir_length = r.read_u64_le()?;
        let data_offset = r.read_u64_le()?;

        Ok(Itsf {
            version,
            length,
            lang_id,
            dir_offset,
            dir_length,
            data_offset,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_itsf_bytes() -> Vec<u8> {
        let mut b = Vec::new();
        b.extend_from_slice(b"ITSF");
        b.extend_from_slice(&3u32.to_le_bytes()); // version
        b.extend_from_slice(&96u32.to_le_bytes()); // length
        b.extend_from_slice(&1u32.to_le_bytes()); // unknown_1
        b.extend_from_slice(&0u32.to_le_bytes()); // timestamp
        b.extend_from_slice(&1031u32.to_le_bytes()); // lang_id
        b.extend_from_slice(&[0u8; 16]); // dir_uuid
        b.extend_from_slice(&[0u8; 16]); // stream_uuid
        b.extend_from_slice(&0u64.to_le_bytes()); // unknown_offset
        b.extend_from_slice(&0u64.to_le_bytes()); // unknown_len
        b.extend_from_slice(&120u64.to_le_bytes()); // dir_offset
        b.extend_from_slice(&4180u64.to_le_bytes()); // dir_length
        b.extend_from_slice(&4300u64.to_le_bytes()); // data_offset
        assert_eq!(b.len(), 96);
        b
    }

    #[test]
    fn parses_reference_header() {
        let bytes = sample_itsf_bytes();
        let mut r = ByteReader::new(&bytes);
        let itsf = Itsf::parse(&mut r).unwrap();
        assert_eq!(itsf.version, 3);
        assert_eq!(itsf.length, 96);
        assert_eq!(itsf.lang_id, 1031);
        assert_eq!(itsf.dir_offset, 120);
        assert_eq!(itsf.dir_length, 4180);
        assert_eq!(itsf.data_offset, 4300);
    }

    #[test]
    fn rejects_bad_signature() {
        let mut bytes = sample_itsf_bytes();
        bytes[0] = b'X';
        let mut r = ByteReader::new(&bytes);
        assert!(matches!(Itsf::parse(&mut r), Err(Error::Format(_))));
    }

    #[test]
    fn rejects_unsupported_version() {
        let mut bytes = sample_itsf_bytes();
        bytes[4..8].copy_from_slice(&4u32.to_le_bytes());
        let mut r = ByteReader::new(&bytes);
        assert!(matches!(Itsf::parse(&mut r), Err(Error::Format(_))));
    }
}
