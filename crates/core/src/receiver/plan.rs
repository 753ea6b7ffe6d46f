use std::collections::BTreeSet;

use protocol::flist::{FileEntry, FileKind, FileList};

/// Path of the transfer root in both lists.
const ROOT: &str = ".";

/// Decides what to do with each remote entry.
///
/// Regular files are requested when the local copy is missing or its size
/// or modification time differs. Directories and symlinks never need file
/// data; they are recreated when missing or changed. Other file types are
/// skipped.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct TransferPlan {
    requests: Vec<usize>,
    metadata_only: Vec<usize>,
    skipped: Vec<usize>,
    deletions: Vec<String>,
}

impl TransferPlan {
    /// Compares the remote list with the local one.
    ///
    /// With `delete_extraneous`, local entries missing from the remote list
    /// are scheduled for deletion. Entries below a deleted directory are
    /// not listed separately, and the destination root `"."` is never
    /// deleted.
    #[must_use]
    pub fn build(remote: &FileList, local: &FileList, delete_extraneous: bool) -> Self {
        let mut plan = Self::default();
        for (index, entry) in remote.iter().enumerate() {
            let current = local.find(entry.path());
            match entry.kind() {
                FileKind::Regular if current.is_some_and(|local| same_file(entry, local)) => {
                    plan.skipped.push(index);
                }
                FileKind::Regular => plan.requests.push(index),
                FileKind::Directory if current.is_some_and(|local| same_dir(entry, local)) => {
                    plan.skipped.push(index);
                }
                FileKind::Symlink if current.is_some_and(|local| same_link(entry, local)) => {
                    plan.skipped.push(index);
                }
                FileKind::Directory | FileKind::Symlink => plan.metadata_only.push(index),
                FileKind::Other => plan.skipped.push(index),
            }
        }

        if delete_extraneous {
            let mut removed = BTreeSet::new();
            for entry in local {
                let path = entry.path();
                if path == ROOT
                    || remote.find(path).is_some()
                    || has_removed_ancestor(&removed, path)
                {
                    continue;
                }
                removed.insert(path);
                plan.deletions.push(path.to_owned());
            }
        }
        plan
    }

    /// Indices of regular files to request, in file-list order.
    #[must_use]
    pub fn requests(&self) -> &[usize] {
        &self.requests
    }

    /// Indices of directories and symlinks to create.
    #[must_use]
    pub fn metadata_only(&self) -> &[usize] {
        &self.metadata_only
    }

    /// Indices left untouched.
    #[must_use]
    pub fn skipped(&self) -> &[usize] {
        &self.skipped
    }

    /// Local paths to delete.
    #[must_use]
    pub fn deletions(&self) -> &[String] {
        &self.deletions
    }
}

fn same_file(remote: &FileEntry, local: &FileEntry) -> bool {
    local.is_regular() && local.size() == remote.size() && local.mtime() == remote.mtime()
}

fn same_dir(remote: &FileEntry, local: &FileEntry) -> bool {
    local.is_dir() && local.mode() == remote.mode() && local.mtime() == remote.mtime()
}

fn same_link(remote: &FileEntry, local: &FileEntry) -> bool {
    local.is_symlink() && local.link_target() == remote.link_target()
}

fn has_removed_ancestor(removed: &BTreeSet<&str>, path: &str) -> bool {
    path.match_indices('/').any(|(i, _)| removed.contains(&path[..i]))
}
