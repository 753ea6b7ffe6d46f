//! Destinations for received files.
//!
//! A [`StorageSink`] is the only mutable state a transfer shares with the
//! outside world. The engine calls it from one thread at a time; reads of
//! prior copies go through the separate [`ReferenceProvider`], which the
//! request thread uses concurrently with the sink's writes.

use std::io::{self, Read};
use std::sync::Arc;

use matching::ReferenceSource;
use protocol::flist::{FileEntry, FileKind, FileList};

mod local;
mod memory;

pub use local::LocalDirSink;
pub use memory::MemoryStorage;

/// Modification time and mode applied to a written entry.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct FileMetadata {
    /// Seconds since the Unix epoch.
    pub mtime: i64,
    /// File type and permission bits, as in `st_mode`.
    pub mode: u32,
}

impl FileMetadata {
    /// Creates metadata from its parts.
    #[must_use]
    pub const fn new(mtime: i64, mode: u32) -> Self {
        Self { mtime, mode }
    }

    /// Metadata announced for a remote entry.
    #[must_use]
    pub const fn of(entry: &FileEntry) -> Self {
        Self::new(entry.mtime(), entry.mode())
    }

    /// File type encoded in the mode.
    #[must_use]
    pub const fn kind(&self) -> FileKind {
        FileKind::from_mode(self.mode)
    }
}

/// Opens prior copies of files for delta matching.
pub trait ReferenceProvider: Send + Sync {
    /// Opens the current copy of `path`, or `None` when there is no regular
    /// file to compare against.
    fn open(&self, path: &str) -> io::Result<Option<Box<dyn ReferenceSource>>>;
}

/// Durable destination for a transfer.
///
/// Paths are relative to the transfer root and use `/` separators. The
/// entry type comes from `metadata.mode`: directories are written with an
/// empty stream and symlinks with their target as content.
pub trait StorageSink {
    /// Stores `size` bytes from `data` at `path`, replacing any existing
    /// entry, and returns the number of bytes stored.
    fn write(
        &mut self,
        path: &str,
        data: &mut dyn Read,
        size: u64,
        metadata: FileMetadata,
    ) -> io::Result<u64>;

    /// Removes `path`. Removing a missing entry succeeds.
    fn delete(&mut self, path: &str) -> io::Result<()>;

    /// Every entry currently stored, sorted by path.
    fn list(&self) -> io::Result<FileList>;

    /// Read access to prior copies, usable from another thread.
    fn references(&self) -> Arc<dyn ReferenceProvider>;

    /// Called once after the last write and delete.
    fn finish(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<S: StorageSink + ?Sized> StorageSink for &mut S {
    fn write(
        &mut self,
        path: &str,
        data: &mut dyn Read,
        size: u64,
        metadata: FileMetadata,
    ) -> io::Result<u64> {
        (**self).write(path, data, size, metadata)
    }

    fn delete(&mut self, path: &str) -> io::Result<()> {
        (**self).delete(path)
    }

    fn list(&self) -> io::Result<FileList> {
        (**self).list()
    }

    fn references(&self) -> Arc<dyn ReferenceProvider> {
        (**self).references()
    }

    fn finish(&mut self) -> io::Result<()> {
        (**self).finish()
    }
}
