use std::num::NonZeroU32;

use logging::LogContext;
use protocol::{ExclusionList, ProtocolVersion};

use crate::auth::ClientAuth;

/// Arguments sent to the daemon when none are configured: act as sender,
/// preserve symlinks, permissions and times, recurse.
pub const DEFAULT_SERVER_ARGS: [&str; 7] = ["--server", "--sender", "-l", "-p", "-r", "-t", "."];

/// Settings for one client session.
///
/// Every field has a usable default, so `ClientOptions::new()` pulls
/// anonymously with no exclusions and logging disabled.
///
/// ```
/// use rsync_core::{ClientAuth, ClientOptions};
///
/// let options = ClientOptions::new()
///     .with_auth(ClientAuth::new("mirror", "secret"))
///     .with_exclude("*.tmp")
///     .with_delete_extraneous(true);
/// assert_eq!(options.exclusions().patterns(), ["*.tmp"]);
/// ```
#[derive(Clone, Debug)]
pub struct ClientOptions {
    auth: Option<ClientAuth>,
    exclusions: ExclusionList,
    log: LogContext,
    server_args: Vec<String>,
    block_size: Option<NonZeroU32>,
    delete_extraneous: bool,
    protocol: ProtocolVersion,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            auth: None,
            exclusions: ExclusionList::new(),
            log: LogContext::default(),
            server_args: DEFAULT_SERVER_ARGS.iter().map(|&arg| arg.to_owned()).collect(),
            block_size: None,
            delete_extraneous: false,
            protocol: ProtocolVersion::CLIENT,
        }
    }
}

impl ClientOptions {
    /// Options with every default.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Credentials used when the daemon sends `AUTHREQD`.
    #[must_use]
    pub fn with_auth(mut self, auth: ClientAuth) -> Self {
        self.auth = Some(auth);
        self
    }

    /// Replaces the exclusion list.
    #[must_use]
    pub fn with_exclusions(mut self, exclusions: ExclusionList) -> Self {
        self.exclusions = exclusions;
        self
    }

    /// Appends one exclusion pattern.
    #[must_use]
    #[doc(alias = "--exclude")]
    pub fn with_exclude(mut self, pattern: impl Into<String>) -> Self {
        self.exclusions.push(pattern);
        self
    }

    /// Context every component of the session logs through.
    #[must_use]
    pub fn with_log(mut self, log: LogContext) -> Self {
        self.log = log;
        self
    }

    /// Replaces the argument block sent before the module path.
    #[must_use]
    pub fn with_server_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.server_args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Forces the block size of every signature instead of the square-root
    /// heuristic.
    #[must_use]
    #[doc(alias = "--block-size")]
    pub const fn with_block_size(mut self, block_size: Option<NonZeroU32>) -> Self {
        self.block_size = block_size;
        self
    }

    /// Deletes local entries the remote list does not contain.
    #[must_use]
    #[doc(alias = "--delete")]
    pub const fn with_delete_extraneous(mut self, delete: bool) -> Self {
        self.delete_extraneous = delete;
        self
    }

    /// Version advertised during the handshake.
    #[must_use]
    pub const fn with_protocol(mut self, version: ProtocolVersion) -> Self {
        self.protocol = version;
        self
    }

    /// Configured credentials.
    #[must_use]
    pub const fn auth(&self) -> Option<&ClientAuth> {
        self.auth.as_ref()
    }

    /// Exclusion patterns in transmission order.
    #[must_use]
    pub const fn exclusions(&self) -> &ExclusionList {
        &self.exclusions
    }

    /// Logging context.
    #[must_use]
    pub const fn log(&self) -> &LogContext {
        &self.log
    }

    /// Argument block.
    #[must_use]
    pub fn server_args(&self) -> &[String] {
        &self.server_args
    }

    /// Forced block size, if any.
    #[must_use]
    pub const fn block_size(&self) -> Option<NonZeroU32> {
        self.block_size
    }

    /// Whether extraneous local entries are deleted.
    #[must_use]
    pub const fn delete_extraneous(&self) -> bool {
        self.delete_extraneous
    }

    /// Advertised protocol version.
    #[must_use]
    pub const fn protocol(&self) -> ProtocolVersion {
        self.protocol
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_request_recursive_pull() {
        let options = ClientOptions::new();
        assert_eq!(options.server_args(), DEFAULT_SERVER_ARGS);
        assert!(options.auth().is_none());
        assert!(options.exclusions().is_empty());
        assert!(!options.delete_extraneous());
        assert_eq!(options.protocol(), ProtocolVersion::new(27, 0));
    }

    #[test]
    fn exclusions_keep_insertion_order() {
        let options = ClientOptions::new()
            .with_exclude("b")
            .with_exclude("a")
            .with_exclude("b");
        assert_eq!(options.exclusions().patterns(), ["b", "a", "b"]);
    }
}
