/// Mask selecting the file-type bits of a mode.
pub const S_IFMT: u32 = 0o170_000;
/// Directory file type.
pub const S_IFDIR: u32 = 0o040_000;
/// Regular file type.
pub const S_IFREG: u32 = 0o100_000;
/// Symbolic link file type.
pub const S_IFLNK: u32 = 0o120_000;

/// File type derived from the mode bits.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum FileKind {
    /// Regular file.
    Regular,
    /// Directory.
    Directory,
    /// Symbolic link.
    Symlink,
    /// Device, fifo, socket or anything else.
    Other,
}

impl FileKind {
    /// Classifies a raw mode.
    #[must_use]
    pub const fn from_mode(mode: u32) -> Self {
        match mode & S_IFMT {
            S_IFREG => Self::Regular,
            S_IFDIR => Self::Directory,
            S_IFLNK => Self::Symlink,
            _ => Self::Other,
        }
    }
}

/// One remote file as described by the sender's file list.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct FileEntry {
    path: String,
    size: u64,
    mtime: i64,
    mode: u32,
    link_target: Option<String>,
}

impl FileEntry {
    /// Creates an entry. `mode` includes the file-type bits.
    #[must_use]
    pub fn new(path: impl Into<String>, size: u64, mtime: i64, mode: u32) -> Self {
        Self {
            path: path.into(),
            size,
            mtime,
            mode,
            link_target: None,
        }
    }

    /// Attaches a symlink target.
    #[must_use]
    pub fn with_link_target(mut self, target: impl Into<String>) -> Self {
        self.link_target = Some(target.into());
        self
    }

    /// Path relative to the transfer root, `/`-separated.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Size in bytes.
    #[must_use]
    pub const fn size(&self) -> u64 {
        self.size
    }

    /// Modification time in seconds since the epoch.
    #[must_use]
    pub const fn mtime(&self) -> i64 {
        self.mtime
    }

    /// Full mode including file-type bits.
    #[must_use]
    pub const fn mode(&self) -> u32 {
        self.mode
    }

    /// Permission bits only.
    #[must_use]
    pub const fn permissions(&self) -> u32 {
        self.mode & 0o7777
    }

    /// File type.
    #[must_use]
    pub const fn kind(&self) -> FileKind {
        FileKind::from_mode(self.mode)
    }

    /// Symlink target, when the entry is a symlink.
    #[must_use]
    pub fn link_target(&self) -> Option<&str> {
        self.link_target.as_deref()
    }

    /// Returns `true` for directories.
    #[must_use]
    pub const fn is_dir(&self) -> bool {
        matches!(self.kind(), FileKind::Directory)
    }

    /// Returns `true` for regular files.
    #[must_use]
    pub const fn is_regular(&self) -> bool {
        matches!(self.kind(), FileKind::Regular)
    }

    /// Returns `true` for symlinks.
    #[must_use]
    pub const fn is_symlink(&self) -> bool {
        matches!(self.kind(), FileKind::Symlink)
    }
}
