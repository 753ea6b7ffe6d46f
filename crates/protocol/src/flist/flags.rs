//! Flag bits of the per-entry flags byte.

/// Top-level directory of the transfer. Protocol 27 senders also set it on
/// non-directories whose flags would otherwise be zero.
pub const XMIT_TOP_DIR: u8 = 1 << 0;

/// Mode equals the previous entry's mode and is omitted.
pub const XMIT_SAME_MODE: u8 = 1 << 1;

/// Uid equals the previous entry's (only meaningful with `-o`).
pub const XMIT_SAME_UID: u8 = 1 << 3;

/// Gid equals the previous entry's (only meaningful with `-g`).
pub const XMIT_SAME_GID: u8 = 1 << 4;

/// A byte follows giving the length of the prefix shared with the previous name.
pub const XMIT_SAME_NAME: u8 = 1 << 5;

/// The name suffix length is a 4-byte int instead of a byte.
pub const XMIT_LONG_NAME: u8 = 1 << 6;

/// Mtime equals the previous entry's mtime and is omitted.
pub const XMIT_SAME_TIME: u8 = 1 << 7;
