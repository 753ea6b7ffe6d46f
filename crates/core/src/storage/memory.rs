use std::collections::BTreeMap;
use std::io::{self, Read};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use matching::ReferenceSource;
use protocol::flist::{FileEntry, FileKind, FileList};

use super::{FileMetadata, ReferenceProvider, StorageSink};
use crate::address::trim_prepath;

type Entries = BTreeMap<String, (Vec<u8>, FileMetadata)>;

/// In-memory storage, mainly for tests and dry runs.
///
/// Clones share contents, so a test can hand one clone to a receiver and
/// inspect the other afterwards.
///
/// Every path is stored under a key prefix, empty by default. Views with
/// different prefixes share one store but see only their own entries, the
/// way several pulls can share one object-store bucket.
#[derive(Clone, Debug, Default)]
pub struct MemoryStorage {
    entries: Arc<RwLock<Entries>>,
    prefix: String,
}

impl MemoryStorage {
    /// Creates empty storage.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A view of the same store whose paths live under `prefix`.
    ///
    /// The prefix is normalised with [`trim_prepath`], so `"/mirror"` and
    /// `"mirror/"` name the same view, and `""` or `"/"` the whole store.
    #[must_use]
    pub fn with_prefix(self, prefix: &str) -> Self {
        Self {
            entries: self.entries,
            prefix: trim_prepath(prefix),
        }
    }

    /// The normalised key prefix.
    #[must_use]
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Seeds an entry without going through [`StorageSink::write`].
    pub fn insert(
        &self,
        path: impl AsRef<str>,
        data: impl Into<Vec<u8>>,
        metadata: FileMetadata,
    ) {
        let key = self.key(path.as_ref());
        self.write_lock().insert(key, (data.into(), metadata));
    }

    /// Contents and metadata stored at `path`.
    #[must_use]
    pub fn get(&self, path: &str) -> Option<(Vec<u8>, FileMetadata)> {
        self.read_lock().get(&self.key(path)).cloned()
    }

    /// Every path in this view, in sorted order.
    #[must_use]
    pub fn paths(&self) -> Vec<String> {
        self.read_lock()
            .keys()
            .filter_map(|key| key.strip_prefix(self.prefix.as_str()))
            .map(str::to_owned)
            .collect()
    }

    fn key(&self, path: &str) -> String {
        format!("{}{path}", self.prefix)
    }

    fn read_lock(&self) -> RwLockReadGuard<'_, Entries> {
        self.entries.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_lock(&self) -> RwLockWriteGuard<'_, Entries> {
        self.entries.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl StorageSink for MemoryStorage {
    fn write(
        &mut self,
        path: &str,
        data: &mut dyn Read,
        size: u64,
        metadata: FileMetadata,
    ) -> io::Result<u64> {
        let mut contents = Vec::with_capacity(size.min(1 << 20) as usize);
        data.read_to_end(&mut contents)?;
        let written = contents.len() as u64;
        self.insert(path, contents, metadata);
        Ok(written)
    }

    fn delete(&mut self, path: &str) -> io::Result<()> {
        let key = self.key(path);
        let nested = format!("{key}/");
        self.write_lock()
            .retain(|stored, _| *stored != key && !stored.starts_with(&nested));
        Ok(())
    }

    fn list(&self) -> io::Result<FileList> {
        let entries = self
            .read_lock()
            .iter()
            .filter_map(|(key, value)| Some((key.strip_prefix(self.prefix.as_str())?, value)))
            .map(|(path, (data, metadata))| {
                let FileMetadata { mtime, mode } = *metadata;
                let size = data.len() as u64;
                match metadata.kind() {
                    FileKind::Directory => FileEntry::new(path, 0, mtime, mode),
                    FileKind::Symlink => FileEntry::new(path, size, mtime, mode)
                        .with_link_target(String::from_utf8_lossy(data)),
                    _ => FileEntry::new(path, size, mtime, mode),
                }
            })
            .collect();
        Ok(FileList::from_entries(entries))
    }

    fn references(&self) -> Arc<dyn ReferenceProvider> {
        Arc::new(MemoryReferences {
            entries: Arc::clone(&self.entries),
            prefix: self.prefix.clone(),
        })
    }
}

struct MemoryReferences {
    entries: Arc<RwLock<Entries>>,
    prefix: String,
}

impl ReferenceProvider for MemoryReferences {
    fn open(&self, path: &str) -> io::Result<Option<Box<dyn ReferenceSource>>> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        Ok(entries
            .get(&format!("{}{path}", self.prefix))
            .filter(|(_, metadata)| metadata.kind() == FileKind::Regular)
            .map(|(data, _)| Box::new(data.clone()) as Box<dyn ReferenceSource>))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use protocol::flist::{S_IFDIR, S_IFREG};
    use std::io::Cursor;

    #[test]
    fn clones_share_contents() {
        let storage = MemoryStorage::new();
        let mut sink = storage.clone();
        let mut data = Cursor::new(b"xyz".to_vec());
        sink.write("a", &mut data, 3, FileMetadata::new(1, S_IFREG | 0o644))
            .unwrap();
        assert_eq!(storage.get("a").unwrap().0, b"xyz");
    }

    #[test]
    fn delete_removes_directory_contents() {
        let mut storage = MemoryStorage::new();
        storage.insert("d", Vec::new(), FileMetadata::new(0, S_IFDIR | 0o755));
        storage.insert("d/f", b"1".to_vec(), FileMetadata::new(0, S_IFREG | 0o644));
        storage.insert("dz", b"2".to_vec(), FileMetadata::new(0, S_IFREG | 0o644));

        storage.delete("d").unwrap();
        assert_eq!(storage.paths(), ["dz"]);
    }

    #[test]
    fn references_cover_regular_files() {
        let storage = MemoryStorage::new();
        storage.insert("f", b"abcd".to_vec(), FileMetadata::new(0, S_IFREG | 0o644));
        storage.insert("d", Vec::new(), FileMetadata::new(0, S_IFDIR | 0o755));

        let references = storage.references();
        assert_eq!(references.open("f").unwrap().unwrap().len(), 4);
        assert!(references.open("d").unwrap().is_none());
        assert!(references.open("nope").unwrap().is_none());
    }

    #[test]
    fn prefixed_views_share_one_store() {
        let store = MemoryStorage::new();
        let mut mirror = store.clone().with_prefix("/mirror");
        let other = store.clone().with_prefix("other/");
        assert_eq!(mirror.prefix(), "mirror/");

        mirror
            .write("f", &mut Cursor::new(b"abc".to_vec()), 3, FileMetadata::new(0, S_IFREG | 0o644))
            .unwrap();
        other.insert("g", b"z".to_vec(), FileMetadata::new(0, S_IFREG | 0o644));

        assert_eq!(store.paths(), ["mirror/f", "other/g"]);
        assert_eq!(mirror.paths(), ["f"]);
        let listed: Vec<_> = mirror.list().unwrap().iter().map(|e| e.path().to_owned()).collect();
        assert_eq!(listed, ["f"]);
        assert_eq!(mirror.references().open("f").unwrap().unwrap().len(), 3);
        assert!(mirror.references().open("g").unwrap().is_none());

        mirror.delete("f").unwrap();
        assert_eq!(store.paths(), ["other/g"]);
    }
}
