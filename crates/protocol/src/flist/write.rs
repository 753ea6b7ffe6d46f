//! Encoding of a file list, as a protocol 27 sender produces it.

use std::io::{self, Write};

use crate::wire::{write_byte, write_int, write_longint};

use super::entry::FileEntry;
use super::flags::{XMIT_LONG_NAME, XMIT_SAME_MODE, XMIT_SAME_NAME, XMIT_SAME_TIME, XMIT_TOP_DIR};

/// Encoder state mirroring [`super::FileListReader`].
#[derive(Debug, Default)]
pub struct FileListWriter {
    prev_name: Vec<u8>,
    prev_mode: Option<u32>,
    prev_mtime: Option<i64>,
}

impl FileListWriter {
    /// Creates a writer with empty history.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Writes one entry, compressing fields shared with the previous one.
    pub fn write_entry<W: Write + ?Sized>(
        &mut self,
        writer: &mut W,
        entry: &FileEntry,
    ) -> io::Result<()> {
        let name = entry.path().as_bytes();
        let shared = name
            .iter()
            .zip(&self.prev_name)
            .take(255)
            .take_while(|(a, b)| a == b)
            .count();
        let suffix = &name[shared..];

        let mut flags = 0u8;
        if shared > 0 {
            flags |= XMIT_SAME_NAME;
        }
        if suffix.len() > 255 {
            flags |= XMIT_LONG_NAME;
        }
        if self.prev_mtime == Some(entry.mtime()) {
            flags |= XMIT_SAME_TIME;
        }
        if self.prev_mode == Some(entry.mode()) {
            flags |= XMIT_SAME_MODE;
        }
        if flags == 0 {
            flags = if entry.is_dir() {
                XMIT_LONG_NAME
            } else {
                XMIT_TOP_DIR
            };
        }

        let mut encoded = Vec::with_capacity(32 + suffix.len());
        write_byte(&mut encoded, flags)?;
        if flags & XMIT_SAME_NAME != 0 {
            write_byte(&mut encoded, shared as u8)?;
        }
        if flags & XMIT_LONG_NAME != 0 {
            write_int(&mut encoded, suffix.len() as i32)?;
        } else {
            write_byte(&mut encoded, suffix.len() as u8)?;
        }
        encoded.extend_from_slice(suffix);
        write_longint(&mut encoded, entry.size() as i64)?;
        if flags & XMIT_SAME_TIME == 0 {
            write_int(&mut encoded, entry.mtime() as i32)?;
        }
        if flags & XMIT_SAME_MODE == 0 {
            write_int(&mut encoded, entry.mode() as i32)?;
        }
        if entry.is_symlink() {
            let target = entry.link_target().unwrap_or_default().as_bytes();
            write_int(&mut encoded, target.len() as i32)?;
            encoded.extend_from_slice(target);
        }
        writer.write_all(&encoded)?;

        self.prev_name.clear();
        self.prev_name.extend_from_slice(name);
        self.prev_mode = Some(entry.mode());
        self.prev_mtime = Some(entry.mtime());
        Ok(())
    }

    /// Writes the terminator and the I/O error flag.
    pub fn write_end<W: Write + ?Sized>(
        &mut self,
        writer: &mut W,
        io_error: i32,
    ) -> io::Result<()> {
        write_byte(writer, 0)?;
        write_int(writer, io_error)
    }
}
