use std::io;

use checksums::RollingError;
use thiserror::Error;

/// Errors produced while building block tables or matching data.
#[derive(Debug, Error)]
pub enum MatchError {
    /// A block length of zero or beyond the protocol maximum was requested.
    #[error("invalid block length {0}")]
    InvalidBlockLength(u64),
    /// The file needs more blocks than the wire format can count.
    #[error("block count {blocks} for block length {block_len} exceeds i32::MAX")]
    BlockCountOverflow {
        /// Block length in use.
        block_len: u32,
        /// Resulting block count.
        blocks: u64,
    },
    /// A block index outside the layout was referenced.
    #[error("block index {index} out of range for {count} blocks")]
    BlockOutOfRange {
        /// Requested index.
        index: u64,
        /// Number of blocks in the layout.
        count: u64,
    },
    /// The reference is shorter than the layout describes.
    #[error("reference holds {actual} bytes but the layout needs {expected}")]
    ReferenceTooShort {
        /// Bytes required by the layout.
        expected: u64,
        /// Bytes available.
        actual: u64,
    },
    /// The rolling window was driven past its bounds.
    #[error(transparent)]
    Rolling(#[from] RollingError),
    /// Reading the reference failed.
    #[error("failed to read reference data: {0}")]
    Io(#[from] io::Error),
}

impl From<MatchError> for io::Error {
    fn from(err: MatchError) -> Self {
        match err {
            MatchError::Io(inner) => inner,
            other => Self::new(io::ErrorKind::InvalidInput, other),
        }
    }
}
