use crate::error::FileFailure;

/// Totals the sender reports when the transfer ends, seen from this client.
///
/// The sender counts its own reads and writes; what it read is what this
/// client wrote, and the other way round.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct TransferStats {
    /// Bytes this client wrote to the sender.
    pub total_written: i64,
    /// Bytes this client read from the sender.
    pub total_read: i64,
    /// Combined size of every file in the list.
    pub total_size: i64,
}

/// What a [`Receiver::run`](super::Receiver::run) achieved.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct TransferSummary {
    /// Files reconstructed and stored.
    pub transferred: usize,
    /// Entries already up to date locally.
    pub skipped: usize,
    /// Directories and symlinks created or refreshed.
    pub created: usize,
    /// Local entries removed because the remote no longer has them.
    pub deleted: usize,
    /// Bytes that arrived as literal data.
    pub literal_bytes: u64,
    /// Bytes copied from local reference blocks.
    pub matched_bytes: u64,
    /// Entries that could not be stored.
    pub failures: Vec<FileFailure>,
    /// Sender-side totals.
    pub stats: TransferStats,
}

impl TransferSummary {
    /// Returns `true` when no entry failed.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}
