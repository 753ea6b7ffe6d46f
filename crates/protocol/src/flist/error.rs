use std::io;

use thiserror::Error;

/// A file-list entry that cannot be decoded.
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum FileListError {
    /// The entry reuses more of the previous name than exists.
    #[error("file list entry reuses {prefix} bytes of a {previous}-byte name")]
    PrefixTooLong {
        /// Prefix length claimed by the entry.
        prefix: usize,
        /// Length of the previous name.
        previous: usize,
    },
    /// The reconstructed name exceeds the maximum path length.
    #[error("file list entry name of {len} bytes is too long")]
    NameTooLong {
        /// Length of the rejected name.
        len: usize,
    },
    /// A length field was negative or implausibly large.
    #[error("file list entry carries invalid length {0}")]
    InvalidLength(i32),
    /// The file size was negative.
    #[error("file list entry has negative size {0}")]
    NegativeSize(i64),
}

impl From<FileListError> for io::Error {
    fn from(err: FileListError) -> Self {
        Self::new(io::ErrorKind::InvalidData, err)
    }
}
