//! Decoding of the sender's file list.

use std::io::{self, Read};

use crate::wire::{read_byte, read_int, read_longint};

use super::MAX_PATH_LEN;
use super::entry::{FileEntry, FileKind};
use super::error::FileListError;
use super::flags::{XMIT_LONG_NAME, XMIT_SAME_MODE, XMIT_SAME_NAME, XMIT_SAME_TIME};
use super::list::FileList;

/// Decoder state carried between entries.
///
/// Entries omit fields shared with their predecessor, so the reader keeps the
/// previous name, mode and mtime.
#[derive(Debug, Default)]
pub struct FileListReader {
    prev_name: Vec<u8>,
    prev_mode: u32,
    prev_mtime: i64,
}

impl FileListReader {
    /// Creates a reader with empty history.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads one entry. Returns `None` at the zero-flags terminator.
    pub fn read_entry<R: Read + ?Sized>(
        &mut self,
        reader: &mut R,
    ) -> io::Result<Option<FileEntry>> {
        let flags = read_byte(reader)?;
        if flags == 0 {
            return Ok(None);
        }

        let shared = if flags & XMIT_SAME_NAME != 0 {
            usize::from(read_byte(reader)?)
        } else {
            0
        };
        let suffix = if flags & XMIT_LONG_NAME != 0 {
            let len = read_int(reader)?;
            usize::try_from(len).map_err(|_| FileListError::InvalidLength(len))?
        } else {
            usize::from(read_byte(reader)?)
        };

        if shared > self.prev_name.len() {
            return Err(FileListError::PrefixTooLong {
                prefix: shared,
                previous: self.prev_name.len(),
            }
            .into());
        }
        if shared + suffix > MAX_PATH_LEN {
            return Err(FileListError::NameTooLong {
                len: shared + suffix,
            }
            .into());
        }

        self.prev_name.truncate(shared);
        let start = self.prev_name.len();
        self.prev_name.resize(start + suffix, 0);
        reader.read_exact(&mut self.prev_name[start..])?;

        let size = read_longint(reader)?;
        let size = u64::try_from(size).map_err(|_| FileListError::NegativeSize(size))?;

        if flags & XMIT_SAME_TIME == 0 {
            self.prev_mtime = i64::from(read_int(reader)?);
        }
        if flags & XMIT_SAME_MODE == 0 {
            self.prev_mode = read_int(reader)? as u32;
        }

        let path = String::from_utf8_lossy(&self.prev_name).into_owned();
        let mut entry = FileEntry::new(path, size, self.prev_mtime, self.prev_mode);

        if FileKind::from_mode(self.prev_mode) == FileKind::Symlink {
            let len = read_int(reader)?;
            let len = usize::try_from(len)
                .ok()
                .filter(|&len| len <= MAX_PATH_LEN)
                .ok_or(FileListError::InvalidLength(len))?;
            let mut target = vec![0u8; len];
            reader.read_exact(&mut target)?;
            entry = entry.with_link_target(String::from_utf8_lossy(&target));
        }

        Ok(Some(entry))
    }
}

/// Reads a complete file list and the trailing I/O error flag.
///
/// The returned list is sorted and deduplicated so that its positions are
/// the sender's file indices.
pub fn read_file_list<R: Read + ?Sized>(reader: &mut R) -> io::Result<(FileList, i32)> {
    let mut decoder = FileListReader::new();
    let mut entries = Vec::new();
    while let Some(entry) = decoder.read_entry(reader)? {
        entries.push(entry);
    }
    let io_error = read_int(reader)?;
    Ok((FileList::from_entries(entries), io_error))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wire::{write_byte, write_int, write_longint};
    use std::io::Cursor;

    #[test]
    fn decodes_shared_prefix_and_reused_fields() {
        let mut wire = Vec::new();
        // "dir/a", size 10, mtime 100, mode 0o100644
        write_byte(&mut wire, 0x01).unwrap();
        write_byte(&mut wire, 5).unwrap();
        wire.extend_from_slice(b"dir/a");
        write_longint(&mut wire, 10).unwrap();
        write_int(&mut wire, 100).unwrap();
        write_int(&mut wire, 0o100644).unwrap();
        // "dir/b": reuses 4 bytes, mtime and mode
        write_byte(&mut wire, XMIT_SAME_NAME | XMIT_SAME_TIME | XMIT_SAME_MODE).unwrap();
        write_byte(&mut wire, 4).unwrap();
        write_byte(&mut wire, 1).unwrap();
        wire.push(b'b');
        write_longint(&mut wire, 20).unwrap();
        write_byte(&mut wire, 0).unwrap();
        write_int(&mut wire, 0).unwrap();

        let (list, io_error) = read_file_list(&mut Cursor::new(wire)).unwrap();
        assert_eq!(io_error, 0);
        assert_eq!(list.len(), 2);
        let second = list.get(1).unwrap();
        assert_eq!(second.path(), "dir/b");
        assert_eq!(second.size(), 20);
        assert_eq!(second.mtime(), 100);
        assert_eq!(second.mode(), 0o100644);
    }

    #[test]
    fn symlink_entries_carry_target() {
        let mut wire = Vec::new();
        write_byte(&mut wire, 0x01).unwrap();
        write_byte(&mut wire, 4).unwrap();
        wire.extend_from_slice(b"link");
        write_longint(&mut wire, 6).unwrap();
        write_int(&mut wire, 5).unwrap();
        write_int(&mut wire, 0o120777).unwrap();
        write_int(&mut wire, 6).unwrap();
        wire.extend_from_slice(b"target");

        let entry = FileListReader::new()
            .read_entry(&mut Cursor::new(wire))
            .unwrap()
            .unwrap();
        assert!(entry.is_symlink());
        assert_eq!(entry.link_target(), Some("target"));
    }

    #[test]
    fn prefix_longer_than_previous_name_is_rejected() {
        let mut wire = Vec::new();
        write_byte(&mut wire, XMIT_SAME_NAME).unwrap();
        write_byte(&mut wire, 3).unwrap();
        write_byte(&mut wire, 1).unwrap();

        let err = FileListReader::new()
            .read_entry(&mut Cursor::new(wire))
            .unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }

    #[test]
    fn negative_long_name_length_is_rejected() {
        let mut wire = Vec::new();
        write_byte(&mut wire, XMIT_LONG_NAME).unwrap();
        write_int(&mut wire, -5).unwrap();

        let err = FileListReader::new()
            .read_entry(&mut Cursor::new(wire))
            .unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }
}
