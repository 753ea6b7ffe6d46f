use std::io;

use thiserror::Error;

/// Errors raised while interpreting the plaintext `@RSYNCD:` handshake.
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum NegotiationError {
    /// The daemon greeting did not follow `@RSYNCD: <major>.<minor>`.
    #[error("malformed rsync daemon greeting: {input:?}")]
    MalformedGreeting {
        /// The offending line without its trailing newline.
        input: String,
    },
    /// An `AUTHREQD` line arrived without a challenge token.
    #[error("daemon requested authentication without a challenge: {input:?}")]
    MissingChallenge {
        /// The offending line without its trailing newline.
        input: String,
    },
}

impl NegotiationError {
    /// Returns the raw line that triggered the error.
    #[must_use]
    pub fn input(&self) -> &str {
        match self {
            Self::MalformedGreeting { input } | Self::MissingChallenge { input } => input,
        }
    }
}

impl From<NegotiationError> for io::Error {
    fn from(err: NegotiationError) -> Self {
        Self::new(io::ErrorKind::InvalidData, err)
    }
}
