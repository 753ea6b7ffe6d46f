//! Daemon challenge/response authentication.
//!
//! Protocol 27 daemons authenticate with MD4 over four zero bytes, the
//! password and the challenge. The digest is sent base64 encoded without
//! padding, so every response is [`RESPONSE_LEN`] characters long.

use std::fmt;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD_NO_PAD;
use checksums::strong::{Md4, Md4Seed};
use zeroize::Zeroizing;

/// Length of every encoded response.
pub const RESPONSE_LEN: usize = 22;

/// Computes the response to `challenge` for `password`.
///
/// ```
/// use rsync_core::{RESPONSE_LEN, respond};
///
/// let response = respond("secret", "Bm9Q3rXh7TqK");
/// assert_eq!(response.len(), RESPONSE_LEN);
/// assert!(!response.contains('='));
/// ```
#[must_use]
pub fn respond(password: &str, challenge: &str) -> String {
    let mut hasher = Md4::with_seed(Md4Seed::prefix(0));
    hasher.update(password.as_bytes());
    hasher.update(challenge.as_bytes());
    STANDARD_NO_PAD.encode(hasher.finalize())
}

/// Credentials for a daemon module.
///
/// The password is wiped from memory when the value is dropped and is
/// redacted from `Debug` output.
#[derive(Clone)]
pub struct ClientAuth {
    username: String,
    password: Zeroizing<String>,
}

impl ClientAuth {
    /// Creates credentials.
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: Zeroizing::new(password.into()),
        }
    }

    /// Login name sent with each response.
    #[must_use]
    pub fn username(&self) -> &str {
        &self.username
    }

    /// Builds the `"<username> <response>"` line body for `challenge`.
    #[must_use]
    pub fn respond(&self, challenge: &str) -> String {
        format!("{} {}", self.username, respond(&self.password, challenge))
    }
}

impl fmt::Debug for ClientAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientAuth")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn known_response() {
        assert_eq!(respond("secret", "Bm9Q3rXh7TqK"), "nDMuZi03F2VQ9tlbOAT0dw");
    }

    #[test]
    fn response_line_carries_username() {
        let auth = ClientAuth::new("mirror", "secret");
        assert_eq!(auth.respond("Bm9Q3rXh7TqK"), "mirror nDMuZi03F2VQ9tlbOAT0dw");
    }

    #[test]
    fn debug_hides_password() {
        let rendered = format!("{:?}", ClientAuth::new("mirror", "hunter2"));
        assert!(rendered.contains("mirror"));
        assert!(!rendered.contains("hunter2"));
    }

    proptest! {
        #[test]
        fn responses_are_deterministic_and_unpadded(
            password in ".{0,64}",
            challenge in "[A-Za-z0-9+/]{0,32}",
        ) {
            let first = respond(&password, &challenge);
            prop_assert_eq!(&first, &respond(&password, &challenge));
            prop_assert_eq!(first.len(), RESPONSE_LEN);
            prop_assert!(!first.contains('='));
        }
    }
}
