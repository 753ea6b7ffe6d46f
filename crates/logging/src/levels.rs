//! Severity levels and subsystem tags.

use std::fmt;

/// Severity of a log event, ordered from most to least severe.
#[derive(Copy, Clone, Debug, Default, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum LogLevel {
    /// The session or a file transfer failed.
    Error,
    /// Something unexpected happened but the run continues.
    Warn,
    /// Progress a user asked to see with `-v`.
    #[default]
    Info,
    /// Protocol-level detail.
    Debug,
    /// Per-block or per-frame detail.
    Trace,
}

impl LogLevel {
    /// Every level, most severe first.
    pub const ALL: [Self; 5] = [Self::Error, Self::Warn, Self::Info, Self::Debug, Self::Trace];

    /// Maps a count of `-v` flags to the most verbose level to show.
    ///
    /// No flag shows warnings and errors only.
    #[must_use]
    pub const fn from_verbosity(verbose: u8) -> Self {
        match verbose {
            0 => Self::Warn,
            1 => Self::Info,
            2 => Self::Debug,
            _ => Self::Trace,
        }
    }

    /// Lowercase name, as accepted by `tracing` filter directives.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warn => "warn",
            Self::Info => "info",
            Self::Debug => "debug",
            Self::Trace => "trace",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The part of the engine an event comes from.
#[derive(Copy, Clone, Debug, Eq, Hash, PartialEq)]
pub enum Subsystem {
    /// Transport establishment and teardown.
    Connect,
    /// Handshake lines, version negotiation and multiplexed messages.
    Protocol,
    /// Challenge-response authentication.
    Auth,
    /// File-list reception.
    Flist,
    /// Checksum requests sent to the sender.
    Generator,
    /// Per-file reception and the transfer state machine.
    Receiver,
    /// Delta token decoding and reconstruction.
    Delta,
    /// Storage sink reads and writes.
    Io,
}

impl Subsystem {
    /// Every subsystem.
    pub const ALL: [Self; 8] = [
        Self::Connect,
        Self::Protocol,
        Self::Auth,
        Self::Flist,
        Self::Generator,
        Self::Receiver,
        Self::Delta,
        Self::Io,
    ];

    /// Short lowercase name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Connect => "connect",
            Self::Protocol => "protocol",
            Self::Auth => "auth",
            Self::Flist => "flist",
            Self::Generator => "generator",
            Self::Receiver => "receiver",
            Self::Delta => "delta",
            Self::Io => "io",
        }
    }

    /// `tracing` target used for events of this subsystem.
    #[must_use]
    pub const fn target(self) -> &'static str {
        match self {
            Self::Connect => "rsync::connect",
            Self::Protocol => "rsync::protocol",
            Self::Auth => "rsync::auth",
            Self::Flist => "rsync::flist",
            Self::Generator => "rsync::generator",
            Self::Receiver => "rsync::receiver",
            Self::Delta => "rsync::delta",
            Self::Io => "rsync::io",
        }
    }
}

impl fmt::Display for Subsystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn levels_order_by_verbosity() {
        assert!(LogLevel::Error < LogLevel::Warn);
        assert!(LogLevel::Debug < LogLevel::Trace);
        assert_eq!(LogLevel::ALL.iter().max(), Some(&LogLevel::Trace));
    }

    #[test]
    fn verbosity_flags_map_to_levels() {
        assert_eq!(LogLevel::from_verbosity(0), LogLevel::Warn);
        assert_eq!(LogLevel::from_verbosity(1), LogLevel::Info);
        assert_eq!(LogLevel::from_verbosity(2), LogLevel::Debug);
        assert_eq!(LogLevel::from_verbosity(9), LogLevel::Trace);
    }

    #[test]
    fn targets_share_the_rsync_prefix() {
        for subsystem in Subsystem::ALL {
            assert_eq!(subsystem.target(), format!("rsync::{subsystem}"));
        }
    }
}
