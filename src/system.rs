use encoding_rs::{BIG5, EUC_KR, GBK, SHIFT_JIS, WINDOWS_1251};

use crate::error::{Error, Result};
use crate::reader::ByteReader;

/// Parsed form of the `/#SYSTEM` unit: a flat sequence of
/// `(entry_code: u16, length: u16, data)` records. Most entries (title,
/// default topic, compiled file name, ...) are opaque to `chmkit` and kept
/// only for completeness; the one this crate interprets is entry 4, the
/// Windows LCID used to resolve the archive's text encoding.
pub struct SystemStream {
    entries: Vec<(u16, Vec<u8>)>,
}

impl SystemStream {
    /// Parses the raw bytes of a resolved `/#SYSTEM` unit.
    pub fn parse(data: &[u8]) -> Result<SystemStream> {
        let mut r = ByteReader::new(data);
        let mut entries = Vec::new();
        while r.tell() < r.len() {
            let code = r.read_u16_le()?;
            let len = r.read_u16_le()?;
            let body = r.read_exact(len as usize)?;
            entries.push((code, body.to_vec()));
        }
        Ok(SystemStream { entries })
    }

    fn entry(&self, code: u16) -> Option<&[u8]> {
        self.entries
            .iter()
            .find(|(c, _)| *c == code)
            .map(|(_, data)| data.as_slice())
    }

    /// The Windows LCID stored in entry 4, if present.
    pub fn language_id(&self) -> Option<u32> {
        let data = self.entry(4)?;
        if data.len() < 4 {
            return None;
        }
        Some(u32::from_le_bytes([data[0], data[1], data[2], data[3]]))
    }

    /// Resolves the archive's declared text encoding from its LCID as an
    /// IANA encoding name, defaulting to `iso-8859-1` when the LCID is
    /// absent or names a Western-European language (the legacy CHM default;
    /// see [`lcid_to_iana_name`]).
    pub fn encoding(&self) -> &'static str {
        match self.language_id() {
            Some(lcid) => lcid_to_iana_name(lcid),
            None => "iso-8859-1",
        }
    }

    /// Raw bytes of an arbitrary entry code, for callers that need a field
    /// this crate does not otherwise interpret (e.g. entry 2, the default
    /// topic file).
    pub fn raw_entry(&self, code: u16) -> Option<&[u8]> {
        self.entry(code)
    }
}

/// Maps a Windows LCID to the IANA name of the encoding its text is stored
/// in. `encoding_rs` has no standalone ISO-8859-1 encoding of its own — per
/// the WHATWG Encoding Standard it aliases the `iso-8859-1` label to the
/// shared windows-1252 decoder — so the Western-European/unspecified case is
/// named directly here instead of resolved through it.
fn lcid_to_iana_name(lcid: u32) -> &'static str {
    // Chinese splits by sublanguage, not primary language id, so check the
    // full LCID before falling back to the masked primary id below.
    match lcid {
        0x0404 => return BIG5.name(), // Chinese (Traditional, Taiwan)
        0x0804 => return GBK.name(),  // Chinese (Simplified, PRC)
        _ => {}
    }
    // Low 10 bits of an LCID are the primary language id; sublanguage bits
    // are ignored for every other language family here.
    match lcid & 0x3ff {
        0x011 => SHIFT_JIS.name(),    // Japanese
        0x004 => GBK.name(),          // Chinese, unspecified sublanguage
        0x012 => EUC_KR.name(),       // Korean
        0x019 => WINDOWS_1251.name(), // Russian
        _ => "iso-8859-1",            // German (0x407), English-US (0x409), ...
    }
}

/// Surfaces an invalid entry length as `Corrupt` rather than letting the
/// underlying `Truncated` escape un-contextualized, for callers that parse
/// the stream directly rather than through `Archive`.
pub fn parse_checked(data: &[u8]) -> Result<SystemStream> {
    SystemStream::parse(data).map_err(|e| match e {
        Error::Truncated => Error::Corrupt("/#SYSTEM entry runs past end of stream".into()),
        other => other,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry_bytes(code: u16, data: &[u8]) -> Vec<u8> {
        let mut b = Vec::new();
        b.extend_from_slice(&code.to_le_bytes());
        b.extend_from_slice(&(data.len() as u16).to_le_bytes());
        b.extend_from_slice(data);
        b
    }

    #[test]
    fn parses_multiple_entries() {
        let mut bytes = Vec::new();
        bytes.extend(entry_bytes(3, b"My Help Title"));
        bytes.extend(entry_bytes(4, &0x409u32.to_le_bytes()));
        let sys = SystemStream::parse(&bytes).unwrap();
        assert_eq!(sys.raw_entry(3).unwrap(), b"My Help Title");
        assert_eq!(sys.language_id(), Some(0x409));
    }

    #[test]
    fn defaults_to_iso_8859_1_without_lcid() {
        let bytes = entry_bytes(3, b"no lcid here");
        let sys = SystemStream::parse(&bytes).unwrap();
        assert_eq!(sys.encoding(), "iso-8859-1");
    }

    #[test]
    fn resolves_german_lcid_to_iso_8859_1() {
        let bytes = entry_bytes(4, &0x407u32.to_le_bytes());
        let sys = SystemStream::parse(&bytes).unwrap();
        assert_eq!(sys.encoding(), "iso-8859-1");
    }

    #[test]
    fn resolves_english_us_lcid_to_iso_8859_1() {
        let bytes = entry_bytes(4, &0x409u32.to_le_bytes());
        let sys = SystemStream::parse(&bytes).unwrap();
        assert_eq!(sys.encoding(), "iso-8859-1");
    }

    #[test]
    fn resolves_japanese_lcid() {
        let bytes = entry_bytes(4, &0x411u32.to_le_bytes());
        let sys = SystemStream::parse(&bytes).unwrap();
        assert_eq!(sys.encoding(), SHIFT_JIS.name());
    }

    #[test]
    fn truncated_entry_is_corrupt() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&3u16.to_le_bytes());
        bytes.extend_from_slice(&10u16.to_le_bytes());
        bytes.extend_from_slice(b"short");
        assert!(matches!(parse_checked(&bytes), Err(Error::Corrupt(_))));
    }
}
