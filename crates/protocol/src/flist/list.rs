use std::cmp::Ordering;

use super::entry::FileEntry;

/// A file list sorted bytewise by path with duplicates removed.
///
/// Positions in this list are the file indices used on the wire, so both
/// peers must agree on the ordering.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct FileList {
    entries: Vec<FileEntry>,
}

impl FileList {
    /// Creates an empty list.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Sorts `entries` by path and drops later duplicates.
    #[must_use]
    pub fn from_entries(mut entries: Vec<FileEntry>) -> Self {
        entries.sort_by(compare_paths);
        entries.dedup_by(|later, earlier| later.path() == earlier.path());
        Self { entries }
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` when the list is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entry at wire index `index`.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&FileEntry> {
        self.entries.get(index)
    }

    /// Looks up an entry by path.
    #[must_use]
    pub fn find(&self, path: &str) -> Option<&FileEntry> {
        self.index_of(path).map(|index| &self.entries[index])
    }

    /// Wire index of `path`, if present.
    #[must_use]
    pub fn index_of(&self, path: &str) -> Option<usize> {
        self.entries
            .binary_search_by(|entry| entry.path().as_bytes().cmp(path.as_bytes()))
            .ok()
    }

    /// Iterates in wire order.
    pub fn iter(&self) -> std::slice::Iter<'_, FileEntry> {
        self.entries.iter()
    }

    /// Entries in wire order.
    #[must_use]
    pub fn entries(&self) -> &[FileEntry] {
        &self.entries
    }
}

fn compare_paths(a: &FileEntry, b: &FileEntry) -> Ordering {
    a.path().as_bytes().cmp(b.path().as_bytes())
}

impl FromIterator<FileEntry> for FileList {
    fn from_iter<I: IntoIterator<Item = FileEntry>>(iter: I) -> Self {
        Self::from_entries(iter.into_iter().collect())
    }
}

impl IntoIterator for FileList {
    type Item = FileEntry;
    type IntoIter = std::vec::IntoIter<FileEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl<'a> IntoIterator for &'a FileList {
    type Item = &'a FileEntry;
    type IntoIter = std::slice::Iter<'a, FileEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
