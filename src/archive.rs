use std::convert::TryFrom;
use std::fs;
use std::path::Path;

use crate::directory::Directory;
use crate::error::{Error, Result};
use crate::itsf::Itsf;
use crate::itsp::Itsp;
use crate::reader::ByteReader;
use crate::reset_table::{self, ControlData, ResetTable};
use crate::system::{self, SystemStream};
use crate::unit::Unit;

const SYSTEM_NAME: &str = "/#SYSTEM";
const CONTROL_DATA_NAME: &str = "::DataSpace/Storage/MSCompressed/ControlData";
const RESET_TABLE_NAME: &str = "::DataSpace/Storage/MSCompressed/Transform/\
{7FC28940-9D31-11D0-9B27-00A0C91E9C7C}/InstanceData/ResetTable";
const CONTENT_NAME: &str = "::DataSpace/Storage/MSCompressed/Content";

struct CompressedStream {
    control: ControlData,
    reset_table: ResetTable,
    offset: u64,
    length: u64,
}

/// An open CHM archive (spec.md §4.H): the parsed header and directory index
/// plus, if the archive carries compressed content, the `ControlData` and
/// reset table needed to decompress it on demand.
pub struct Archive {
    data: Vec<u8>,
    itsf: Itsf,
    directory: Directory,
    system: Option<SystemStream>,
    compressed: Option<CompressedStream>,
    closed: bool,
}

impl Archive {
    /// Reads and parses an archive from disk.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Archive> {
        Archive::open_bytes(fs::read(path)?)
    }

    /// Parses an archive already loaded into memory.
    pub fn open_bytes(data: Vec<u8>) -> Result<Archive> {
        let itsf = {
            let mut r = ByteReader::new(&data);
            Itsf::parse(&mut r)?
        };
        let itsp = {
            let mut r = ByteReader::new(&data);
            Itsp::parse(&mut r, itsf.dir_offset)?
        };
        let directory = Directory::parse(&data, itsf.dir_offset, &itsp)?;

        let system = match directory.resolve(SYSTEM_NAME) {
            Some(unit) => Some(system::parse_checked(read_section0(&data, &itsf, &unit)?)?),
            None => None,
        };

        let compressed = match (
            directory.resolve(CONTROL_DATA_NAME),
            directory.resolve(RESET_TABLE_NAME),
            directory.resolve(CONTENT_NAME),
        ) {
            (Some(cd), Some(rt), Some(content)) => {
                let control = ControlData::parse(read_section0(&data, &itsf, &cd)?)?;
                let reset_table = ResetTable::parse(read_section0(&data, &itsf, &rt)?)?;
                if control.reset_interval_bytes as u64 != reset_table.block_size {
                    return Err(Error::Corrupt(format!(
                        "ControlData reset_interval ({} bytes) disagrees with reset table block_size ({})",
                        control.reset_interval_bytes, reset_table.block_size
                    )));
                }
                Some(CompressedStream {
                    control,
                    reset_table,
                    offset: itsf.data_offset + content.offset,
                    length: content.length,
                })
            }
            _ => None,
        };

        Ok(Archive {
            data,
            itsf,
            directory,
            system,
            compressed,
            closed: false,
        })
    }

    fn check_open(&self) -> Result<()> {
        if self.closed {
            return Err(Error::Closed);
        }
        Ok(())
    }

    /// Every unit in the archive, in on-disk order.
    pub fn enumerate(&self) -> Result<Vec<Unit>> {
        self.check_open()?;
        Ok(self.directory.enumerate())
    }

    /// Every non-internal unit: excludes `/`, `/#...`, `/$...`.
    pub fn content_files(&self) -> Result<Vec<Unit>> {
        self.check_open()?;
        Ok(self.directory.content_files())
    }

    /// Resolves an exact unit name. A missing name is `Ok(None)`, not an
    /// error (spec.md §7).
    pub fn resolve(&self, name: &str) -> Result<Option<Unit>> {
        self.check_open()?;
        Ok(self.directory.resolve(name))
    }

    /// Reads a unit's full contents, decompressing through the reset table
    /// when the unit lives in the compressed section.
    pub fn retrieve(&self, unit: &Unit) -> Result<Vec<u8>> {
        self.check_open()?;
        if !unit.is_compressed() {
            return Ok(read_section0(&self.data, &self.itsf, unit)?.to_vec());
        }

        let stream = self.compressed.as_ref().ok_or_else(|| {
            Error::Corrupt(
                "unit is in the compressed section but the archive has no ControlData/ResetTable/Content stream"
                    .into(),
            )
        })?;

        let start = usize::try_from(stream.offset).map_err(|_| Error::OutOfRange)?;
        let end = start
            .checked_add(usize::try_from(stream.length).map_err(|_| Error::OutOfRange)?)
            .ok_or(Error::OutOfRange)?;
        if end > self.data.len() {
            return Err(Error::Truncated);
        }

        reset_table::retrieve(
            &self.data[start..end],
            &stream.control,
            &stream.reset_table,
            unit.offset,
            unit.length,
        )
    }

    /// Locates the sitemap unit, matched case-insensitively by its trailing
    /// `.hhc` extension. Parsing the file it points to is the caller's job
    /// (spec.md §1).
    pub fn get_hhc(&self) -> Result<Option<Unit>> {
        self.check_open()?;
        Ok(self
            .directory
            .content_files()
            .into_iter()
            .find(|u| u.name.to_ascii_lowercase().ends_with(".hhc")))
    }

    /// The archive's declared text encoding as an IANA encoding name,
    /// defaulting to `iso-8859-1` when `/#SYSTEM` is absent or carries no
    /// LCID.
    pub fn encoding(&self) -> Result<&'static str> {
        self.check_open()?;
        Ok(self
            .system
            .as_ref()
            .map(|s| s.encoding())
            .unwrap_or("iso-8859-1"))
    }

    /// Marks the archive closed; every other method fails with
    /// `Error::Closed` afterwards.
    pub fn close(&mut self) {
        self.closed = true;
    }
}

fn read_section0<'a>(data: &'a [u8], itsf: &Itsf, unit: &Unit) -> Result<&'a [u8]> {
    let abs_offset = itsf.data_offset + unit.offset;
    let start = usize::try_from(abs_offset).map_err(|_| Error::OutOfRange)?;
    let end = start
        .checked_add(usize::try_from(unit.length).map_err(|_| Error::OutOfRange)?)
        .ok_or(Error::OutOfRange)?;
    if end > data.len() {
        return Err(Error::Truncated);
    }
    Ok(&data[start..end])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encint(mut v: u64) -> Vec<u8> {
        let mut digits = vec![(v & 0x7f) as u8];
        v >>= 7;
        while v > 0 {
            digits.push(((v & 0x7f) as u8) | 0x80);
            v >>= 7;
        }
        digits.reverse();
        digits
    }

    fn pmgl_entry(name: &str, section: u64, offset: u64, length: u64) -> Vec<u8> {
        let mut b = Vec::new();
        b.extend(encint(name.len() as u64));
        b.extend_from_slice(name.as_bytes());
        b.extend(encint(section));
        b.extend(encint(offset));
        b.extend(encint(length));
        b
    }

    fn build_pmgl_chunk(entries: &[(&str, u64, u64, u64)], block_len: usize) -> Vec<u8> {
        let mut body = Vec::new();
        body.extend_from_slice(b"PMGL");
        body.extend_from_slice(&0u32.to_le_bytes());
        body.extend_from_slice(&0u32.to_le_bytes());
        body.extend_from_slice(&(-1i32).to_le_bytes());
        body.extend_from_slice(&(-1i32).to_le_bytes());
        for (name, section, offset, length) in entries {
            body.extend(pmgl_entry(name, *section, *offset, *length));
        }
        body.resize(block_len - 2, 0);
        body.extend_from_slice(&(entries.len() as u16).to_le_bytes());
        body
    }

    /// Builds a minimal single-directory-block archive: ITSF + ITSP + one
    /// PMGL chunk, holding one uncompressed unit and no `/#SYSTEM`.
    fn minimal_archive(unit_name: &str, unit_data: &[u8]) -> Vec<u8> {
        let block_len: usize = 128;
        let pmgl = build_pmgl_chunk(&[(unit_name, 0, 0, unit_data.len() as u64)], block_len);

        let itsp_len: u32 = 84;
        let dir_offset: u64 = 96;
        let dir_length: u64 = itsp_len as u64 + pmgl.len() as u64;
        let data_offset = dir_offset + dir_length;

        let mut b = Vec::new();
        // ITSF
        b.extend_from_slice(b"ITSF");
        b.extend_from_slice(&3u32.to_le_bytes());
        b.extend_from_slice(&96u32.to_le_bytes());
        b.extend_from_slice(&0u32.to_le_bytes());
        b.extend_from_slice(&0u32.to_le_bytes());
        b.extend_from_slice(&1033u32.to_le_bytes());
        b.extend_from_slice(&[0u8; 16]);
        b.extend_from_slice(&[0u8; 16]);
        b.extend_from_slice(&0u64.to_le_bytes());
        b.extend_from_slice(&0u64.to_le_bytes());
        b.extend_from_slice(&dir_offset.to_le_bytes());
        b.extend_from_slice(&dir_length.to_le_bytes());
        b.extend_from_slice(&data_offset.to_le_bytes());
        assert_eq!(b.len(), 96);

        // ITSP
        b.extend_from_slice(b"ITSP");
        b.extend_from_slice(&1u32.to_le_bytes());
        b.extend_from_slice(&itsp_len.to_le_bytes());
        b.extend_from_slice(&1u32.to_le_bytes());
        b.extend_from_slice(&(block_len as u32).to_le_bytes());
        b.extend_from_slice(&2u32.to_le_bytes());
        b.extend_from_slice(&1u32.to_le_bytes()); // index_depth
        b.extend_from_slice(&(-1i32).to_le_bytes()); // index_root
        b.extend_from_slice(&0u32.to_le_bytes()); // first_pmgl_block
        b.extend_from_slice(&0u32.to_le_bytes()); // last_pmgl_block
        b.extend_from_slice(&(-1i32).to_le_bytes());
        b.extend_from_slice(&1u32.to_le_bytes()); // num_blocks
        b.extend_from_slice(&1033u32.to_le_bytes());
        b.extend_from_slice(&[0u8; 16]);
        b.extend_from_slice(&itsp_len.to_le_bytes());
        b.extend_from_slice(&0u32.to_le_bytes());
        b.extend_from_slice(&0u32.to_le_bytes());
        b.extend_from_slice(&0u32.to_le_bytes());
        assert_eq!(b.len() as u64, dir_offset + itsp_len as u64);

        b.extend(pmgl);
        assert_eq!(b.len() as u64, data_offset);
        b.extend_from_slice(unit_data);
        b
    }

    #[test]
    fn opens_and_retrieves_uncompressed_unit() {
        let bytes = minimal_archive("/hello.txt", b"hello world");
        let archive = Archive::open_bytes(bytes).unwrap();
        let unit = archive.resolve("/hello.txt").unwrap().unwrap();
        assert!(!unit.is_compressed());
        assert_eq!(archive.retrieve(&unit).unwrap(), b"hello world");
    }

    #[test]
    fn enumerate_and_content_files() {
        let bytes = minimal_archive("/page.html", b"<html></html>");
        let archive = Archive::open_bytes(bytes).unwrap();
        let all = archive.enumerate().unwrap();
        assert_eq!(all.len(), 1);
        let files = archive.content_files().unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].name, "/page.html");
    }

    #[test]
    fn get_hhc_matches_case_insensitively() {
        let bytes = minimal_archive("/Table Of Contents.HHC", b"sitemap");
        let archive = Archive::open_bytes(bytes).unwrap();
        let hhc = archive.get_hhc().unwrap().unwrap();
        assert_eq!(hhc.name, "/Table Of Contents.HHC");
    }

    #[test]
    fn defaults_encoding_without_system_stream() {
        let bytes = minimal_archive("/a.txt", b"x");
        let archive = Archive::open_bytes(bytes).unwrap();
        assert_eq!(archive.encoding().unwrap(), "iso-8859-1");
    }

    #[test]
    fn closed_archive_rejects_operations() {
        let bytes = minimal_archive("/a.txt", b"x");
        let mut archive = Archive::open_bytes(bytes).unwrap();
        archive.close();
        assert!(matches!(archive.enumerate(), Err(Error::Closed)));
        assert!(matches!(archive.resolve("/a.txt"), Err(Error::Closed)));
    }
}
