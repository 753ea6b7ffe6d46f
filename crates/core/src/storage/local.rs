use std::fs;
use std::io::{self, Read, Write};
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use filetime::FileTime;
use matching::{FileReference, ReferenceSource};
use protocol::flist::{FileEntry, FileKind, FileList};
use tempfile::NamedTempFile;

use super::{FileMetadata, ReferenceProvider, StorageSink};

/// Stores a transfer under a local directory.
///
/// Regular files are written to a temporary file beside the destination
/// and renamed into place, so readers never observe a partial file.
/// Directory modification times are applied in [`StorageSink::finish`],
/// after the files inside them stop changing.
#[derive(Debug)]
pub struct LocalDirSink {
    root: PathBuf,
    dir_times: Vec<(PathBuf, i64)>,
}

impl LocalDirSink {
    /// Uses `root` as the destination, creating it if needed.
    pub fn create(root: impl Into<PathBuf>) -> io::Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self {
            root,
            dir_times: Vec::new(),
        })
    }

    /// The destination directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn write_regular(
        &self,
        dest: &Path,
        data: &mut dyn Read,
        metadata: FileMetadata,
    ) -> io::Result<u64> {
        let parent = dest.parent().unwrap_or(&self.root);
        fs::create_dir_all(parent)?;

        let mut temp = NamedTempFile::new_in(parent)?;
        let written = io::copy(data, temp.as_file_mut())?;
        temp.as_file_mut().flush()?;
        set_permissions(temp.path(), metadata.mode)?;
        temp.persist(dest).map_err(|err| err.error)?;

        filetime::set_file_mtime(dest, FileTime::from_unix_time(metadata.mtime, 0))?;
        Ok(written)
    }

    fn write_directory(&mut self, dest: &Path, metadata: FileMetadata) -> io::Result<u64> {
        if let Ok(existing) = fs::symlink_metadata(dest)
            && !existing.is_dir()
        {
            fs::remove_file(dest)?;
        }
        fs::create_dir_all(dest)?;
        set_permissions(dest, metadata.mode)?;
        self.dir_times.push((dest.to_path_buf(), metadata.mtime));
        Ok(0)
    }

    fn write_symlink(
        &self,
        dest: &Path,
        data: &mut dyn Read,
        metadata: FileMetadata,
    ) -> io::Result<u64> {
        let mut target = String::new();
        data.read_to_string(&mut target)?;
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)?;
        }
        match fs::symlink_metadata(dest) {
            Ok(existing) if existing.is_dir() => fs::remove_dir_all(dest)?,
            Ok(_) => fs::remove_file(dest)?,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {}
            Err(err) => return Err(err),
        }
        create_symlink(&target, dest)?;
        let mtime = FileTime::from_unix_time(metadata.mtime, 0);
        filetime::set_symlink_file_times(dest, mtime, mtime)?;
        Ok(target.len() as u64)
    }
}

impl StorageSink for LocalDirSink {
    fn write(
        &mut self,
        path: &str,
        data: &mut dyn Read,
        _size: u64,
        metadata: FileMetadata,
    ) -> io::Result<u64> {
        let dest = resolve(&self.root, path)?;
        match metadata.kind() {
            FileKind::Regular => self.write_regular(&dest, data, metadata),
            FileKind::Directory => self.write_directory(&dest, metadata),
            FileKind::Symlink => self.write_symlink(&dest, data, metadata),
            FileKind::Other => Err(io::Error::new(
                io::ErrorKind::Unsupported,
                format!("cannot store special file {path:?} (mode {:o})", metadata.mode),
            )),
        }
    }

    fn delete(&mut self, path: &str) -> io::Result<()> {
        let dest = resolve(&self.root, path)?;
        let result = match fs::symlink_metadata(&dest) {
            Ok(meta) if meta.is_dir() => fs::remove_dir_all(&dest),
            Ok(_) => fs::remove_file(&dest),
            Err(err) => Err(err),
        };
        match result {
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            other => other,
        }
    }

    /// Lists the tree, starting with the destination itself as `"."`.
    fn list(&self) -> io::Result<FileList> {
        let meta = fs::metadata(&self.root)?;
        let mtime = FileTime::from_last_modification_time(&meta).unix_seconds();
        let mut entries = vec![FileEntry::new(".", 0, mtime, mode_of(&meta))];
        walk(&self.root, "", &mut entries)?;
        Ok(FileList::from_entries(entries))
    }

    fn references(&self) -> Arc<dyn ReferenceProvider> {
        Arc::new(LocalReferences {
            root: self.root.clone(),
        })
    }

    fn finish(&mut self) -> io::Result<()> {
        // Deepest directories first so a parent's time is set last.
        self.dir_times.sort_by(|a, b| b.0.cmp(&a.0));
        for (dir, mtime) in self.dir_times.drain(..) {
            filetime::set_file_mtime(&dir, FileTime::from_unix_time(mtime, 0))?;
        }
        Ok(())
    }
}

#[derive(Debug)]
struct LocalReferences {
    root: PathBuf,
}

impl ReferenceProvider for LocalReferences {
    fn open(&self, path: &str) -> io::Result<Option<Box<dyn ReferenceSource>>> {
        let source = resolve(&self.root, path)?;
        match fs::symlink_metadata(&source) {
            Ok(meta) if meta.is_file() => Ok(Some(Box::new(FileReference::open(&source)?))),
            Ok(_) => Ok(None),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err),
        }
    }
}

/// Maps a transfer path onto `root`, refusing anything that would escape it.
fn resolve(root: &Path, path: &str) -> io::Result<PathBuf> {
    let mut resolved = root.to_path_buf();
    for component in Path::new(path).components() {
        match component {
            Component::Normal(part) => resolved.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidInput,
                    format!("refusing path outside the destination: {path:?}"),
                ));
            }
        }
    }
    Ok(resolved)
}

fn walk(dir: &Path, prefix: &str, entries: &mut Vec<FileEntry>) -> io::Result<()> {
    for item in fs::read_dir(dir)? {
        let item = item?;
        let name = item.file_name();
        let Some(name) = name.to_str() else {
            continue;
        };
        let path = if prefix.is_empty() {
            name.to_owned()
        } else {
            format!("{prefix}/{name}")
        };

        let meta = fs::symlink_metadata(item.path())?;
        let mtime = FileTime::from_last_modification_time(&meta).unix_seconds();
        let mode = mode_of(&meta);
        if meta.is_dir() {
            entries.push(FileEntry::new(path.clone(), 0, mtime, mode));
            walk(&item.path(), &path, entries)?;
        } else if meta.file_type().is_symlink() {
            let target = fs::read_link(item.path())?;
            let target = target.to_string_lossy().into_owned();
            let entry = FileEntry::new(path, target.len() as u64, mtime, mode);
            entries.push(entry.with_link_target(target));
        } else {
            entries.push(FileEntry::new(path, meta.len(), mtime, mode));
        }
    }
    Ok(())
}

#[cfg(unix)]
fn mode_of(meta: &fs::Metadata) -> u32 {
    use std::os::unix::fs::MetadataExt;
    meta.mode()
}

#[cfg(not(unix))]
fn mode_of(meta: &fs::Metadata) -> u32 {
    use protocol::flist::{S_IFDIR, S_IFLNK, S_IFREG};

    if meta.is_dir() {
        S_IFDIR | 0o755
    } else if meta.file_type().is_symlink() {
        S_IFLNK | 0o777
    } else if meta.permissions().readonly() {
        S_IFREG | 0o444
    } else {
        S_IFREG | 0o644
    }
}

#[cfg(unix)]
fn set_permissions(path: &Path, mode: u32) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(mode & 0o7777))
}

#[cfg(not(unix))]
fn set_permissions(path: &Path, mode: u32) -> io::Result<()> {
    let mut permissions = fs::metadata(path)?.permissions();
    permissions.set_readonly(mode & 0o222 == 0);
    fs::set_permissions(path, permissions)
}

#[cfg(unix)]
fn create_symlink(target: &str, dest: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(target, dest)
}

#[cfg(not(unix))]
fn create_symlink(target: &str, dest: &Path) -> io::Result<()> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        format!("cannot create symlink {} -> {target}", dest.display()),
    ))
}
