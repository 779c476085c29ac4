//! This library reads Microsoft Compiled HTML Help (CHM) archives: the
//! ITSF/ITSP container format and its LZX-compressed content section, as
//! described in [MS-ITSF]/[MS-ITSP] and revision 9.0 of
//! [LZX DELTA Compression and Decompression].
//!
//! A CHM file is a little-endian binary container holding an HTML help
//! project — pages, images, a table-of-contents sitemap — addressed through
//! a B-tree-like directory index. Most of a CHM's content lives in a single
//! LZX-compressed stream with periodic reset points, which this crate
//! decompresses on demand rather than all at once.
//!
//! In order to use this crate, refer to the main [`Archive`] type and its
//! methods.
//!
//! ```no_run
//! # fn write_data(_a: &[u8]) {}
//! use chmkit::Archive;
//!
//! let archive = Archive::open("help.chm")?;
//! for unit in archive.content_files()? {
//!     let data = archive.retrieve(&unit)?;
//!     write_data(&data);
//! }
//! # Ok::<(), chmkit::Error>(())
//! ```
//!
//! [MS-ITSF]: https://learn.microsoft.com/en-us/openspecs/office_protocols/ms-itsf/
//! [MS-ITSP]: https://learn.microsoft.com/en-us/openspecs/office_protocols/ms-itsf/
//! [LZX DELTA Compression and Decompression]: https://docs.microsoft.com/en-us/openspecs/exchange_server_protocols/ms-patch/cc78752a-b4af-4eee-88cb-01f4d8a4c2bf
//! [`Archive`]: struct.Archive.html

mod archive;
mod bitstream;
mod block;
mod directory;
mod error;
mod itsf;
mod itsp;
mod reader;
mod reset_table;
mod system;
mod tree;
mod unit;
mod window;
mod window_size;

pub use archive::Archive;
pub use error::{Error, Result};
pub use unit::Unit;
pub use window_size::WindowSize;
