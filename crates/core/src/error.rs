use std::fmt;
use std::io;

use matching::MatchError;
use protocol::NegotiationError;
use thiserror::Error;

use crate::address::AddressError;

/// Fatal errors of a client session.
///
/// Any of these leaves the connection unusable. Per-file problems during a
/// transfer are reported as [`FileFailure`]s instead.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The transport failed or closed.
    #[error("transport failure: {0}")]
    Io(#[source] io::Error),
    /// The peer sent something the protocol does not allow.
    #[error("protocol violation: {0}")]
    Protocol(String),
    /// The daemon demanded credentials and none were configured.
    #[error("daemon requires authentication but no credentials were supplied")]
    AuthRequired,
    /// The daemon rejected the session with an `@ERROR` line or `EXIT`.
    #[error("daemon refused the session: {0}")]
    Daemon(String),
    /// The caller supplied an unusable address.
    #[error(transparent)]
    Address(#[from] AddressError),
}

impl ClientError {
    pub(crate) fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol(message.into())
    }
}

impl From<io::Error> for ClientError {
    fn from(err: io::Error) -> Self {
        // Decoders in the protocol crate report malformed input as InvalidData.
        if err.kind() == io::ErrorKind::InvalidData {
            Self::Protocol(err.to_string())
        } else {
            Self::Io(err)
        }
    }
}

impl From<NegotiationError> for ClientError {
    fn from(err: NegotiationError) -> Self {
        Self::Protocol(err.to_string())
    }
}

impl From<MatchError> for ClientError {
    fn from(err: MatchError) -> Self {
        match err {
            MatchError::Io(err) => err.into(),
            other => Self::Protocol(other.to_string()),
        }
    }
}

/// A file that could not be transferred.
///
/// The run continues past such failures; they are collected in the
/// transfer summary.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct FileFailure {
    /// Path relative to the transfer root.
    pub path: String,
    /// Human readable cause.
    pub reason: String,
}

impl FileFailure {
    pub(crate) fn new(path: impl Into<String>, reason: impl fmt::Display) -> Self {
        Self {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}

impl fmt::Display for FileFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.reason)
    }
}
