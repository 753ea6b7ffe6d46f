//! Protocol 27 file list, as sent for the options `-l -p -r -t`.
//!
//! Each entry starts with a flags byte and omits whatever it shares with the
//! previous entry: a prefix of the name, the mtime or the mode. A zero flags
//! byte ends the list and is followed by the sender's 4-byte I/O error flag.
//!
//! ```
//! use std::io::Cursor;
//! use protocol::flist::{FileEntry, FileListWriter, read_file_list};
//!
//! let mut wire = Vec::new();
//! let mut writer = FileListWriter::new();
//! writer.write_entry(&mut wire, &FileEntry::new("b.txt", 3, 1_700_000_000, 0o100644)).unwrap();
//! writer.write_entry(&mut wire, &FileEntry::new("a.txt", 5, 1_700_000_000, 0o100644)).unwrap();
//! writer.write_end(&mut wire, 0).unwrap();
//!
//! let (list, io_error) = read_file_list(&mut Cursor::new(wire)).unwrap();
//! assert_eq!(io_error, 0);
//! assert_eq!(list.get(0).unwrap().path(), "a.txt");
//! ```

mod entry;
mod error;
pub mod flags;
mod list;
mod read;
mod write;

pub use entry::{FileEntry, FileKind, S_IFDIR, S_IFLNK, S_IFMT, S_IFREG};
pub use error::FileListError;
pub use list::FileList;
pub use read::{FileListReader, read_file_list};
pub use write::FileListWriter;

/// Longest path accepted from the wire, matching upstream's `MAXPATHLEN`.
pub const MAX_PATH_LEN: usize = 4096;
