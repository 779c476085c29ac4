use std::fmt;

/// The error type returned by every fallible `chmkit` operation.
///
/// Mirrors the error kinds a CHM reader can encounter: a malformed outer
/// container (`Format`), an internally inconsistent structure discovered
/// mid-parse (`Corrupt`), a read that ran past the end of the input
/// (`Truncated`), a caller-supplied range outside what the archive declares
/// (`OutOfRange`), use of an archive after `close` (`Closed`), and failures
/// from the underlying reader (`Io`).
#[derive(Debug)]
pub enum Error {
    /// Wrong magic, unsupported version, or an otherwise impossible header
    /// field.
    Format(String),
    /// An internally inconsistent structure was discovered mid-parse (bad
    /// block magic, a length that runs past a block's end, invalid Huffman
    /// code lengths, a decoded symbol outside its alphabet, ...).
    Corrupt(String),
    /// The input ended while more bytes were required to complete a read.
    Truncated,
    /// The caller asked for an offset/length outside what the archive
    /// declares.
    OutOfRange,
    /// The operation was attempted against a closed archive.
    Closed,
    /// The underlying reader failed.
    Io(std::io::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Format(msg) => write!(f, "malformed CHM container: {}", msg),
            Error::Corrupt(msg) => write!(f, "corrupt archive structure: {}", msg),
            Error::Truncated => write!(f, "unexpected end of input"),
            Error::OutOfRange => write!(f, "requested range is outside the archive"),
            Error::Closed => write!(f, "archive is closed"),
            Error::Io(e) => write!(f, "I/O error: {}", e),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e)
    }
}

/// Convenience alias for `Result<T, chmkit::Error>`.
pub type Result<T> = std::result::Result<T, Error>;
