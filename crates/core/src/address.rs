//! Parsing of `rsync://host[:port]/module[/path]` addresses.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Port a daemon listens on when the address does not name one.
pub const DEFAULT_PORT: u16 = 873;

const SCHEME: &str = "rsync://";

/// Reasons an address cannot be used.
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum AddressError {
    /// Only the `rsync://` form is supported; `host::module` is not.
    #[error("unsupported address syntax {0:?}; expected rsync://host[:port]/module[/path]")]
    UnsupportedSyntax(String),
    /// The address has no module component.
    #[error("address {0:?} does not name a module")]
    MissingModule(String),
    /// The port is not a number in `1..=65535`.
    #[error("invalid port {0:?}")]
    InvalidPort(String),
    /// The host component is empty.
    #[error("address {0:?} does not name a host")]
    EmptyHost(String),
}

/// A parsed daemon address.
///
/// ```
/// use rsync_core::RsyncUrl;
///
/// let url: RsyncUrl = "rsync://host:8730/mod/sub/dir".parse().unwrap();
/// assert_eq!(url.address(), "host:8730");
/// assert_eq!(url.module(), "mod");
/// assert_eq!(url.path(), "/sub/dir");
/// ```
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct RsyncUrl {
    host: String,
    port: u16,
    module: String,
    path: String,
}

impl RsyncUrl {
    /// Parses `rsync://host[:port]/module[/path]`.
    ///
    /// IPv6 literals must be bracketed: `rsync://[::1]:8730/mod`.
    pub fn parse(input: &str) -> Result<Self, AddressError> {
        let rest = input
            .strip_prefix(SCHEME)
            .ok_or_else(|| AddressError::UnsupportedSyntax(input.to_owned()))?;

        let (authority, tail) = rest
            .split_once('/')
            .ok_or_else(|| AddressError::MissingModule(input.to_owned()))?;
        let (host, port) = split_host_port(authority, input)?;

        let (module, path) = match tail.find('/') {
            Some(i) => (&tail[..i], &tail[i..]),
            None => (tail, ""),
        };
        if module.is_empty() {
            return Err(AddressError::MissingModule(input.to_owned()));
        }

        Ok(Self {
            host,
            port,
            module: module.to_owned(),
            path: path.to_owned(),
        })
    }

    /// `host:port` suitable for dialing, with the default port filled in.
    #[must_use]
    pub fn address(&self) -> String {
        if self.host.contains(':') {
            format!("[{}]:{}", self.host, self.port)
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }

    /// Host name or literal, without brackets.
    #[must_use]
    pub fn host_name(&self) -> &str {
        &self.host
    }

    /// Port number.
    #[must_use]
    pub const fn port(&self) -> u16 {
        self.port
    }

    /// Module name.
    #[must_use]
    pub fn module(&self) -> &str {
        &self.module
    }

    /// Path inside the module, starting with `/`, or empty for the module
    /// root.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }
}

impl FromStr for RsyncUrl {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for RsyncUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{SCHEME}{}/{}{}", self.address(), self.module, self.path)
    }
}

fn split_host_port(authority: &str, input: &str) -> Result<(String, u16), AddressError> {
    let (host, port) = if let Some(bracketed) = authority.strip_prefix('[') {
        let (host, remainder) = bracketed
            .split_once(']')
            .ok_or_else(|| AddressError::UnsupportedSyntax(input.to_owned()))?;
        match remainder {
            "" => (host, None),
            _ => {
                let port = remainder
                    .strip_prefix(':')
                    .ok_or_else(|| AddressError::InvalidPort(remainder.to_owned()))?;
                (host, Some(port))
            }
        }
    } else {
        match authority.rsplit_once(':') {
            Some((host, port)) => (host, Some(port)),
            None => (authority, None),
        }
    };

    if host.is_empty() {
        return Err(AddressError::EmptyHost(input.to_owned()));
    }

    let port = match port {
        None => DEFAULT_PORT,
        Some(text) => text
            .parse::<u16>()
            .ok()
            .filter(|&port| port != 0)
            .ok_or_else(|| AddressError::InvalidPort(text.to_owned()))?,
    };
    Ok((host.to_owned(), port))
}

/// Normalises a path prefix: exactly one trailing `/`, no leading `/`.
///
/// ```
/// use rsync_core::trim_prepath;
///
/// assert_eq!(trim_prepath("/xx"), "xx/");
/// assert_eq!(trim_prepath("/"), "");
/// ```
#[must_use]
pub fn trim_prepath(prepath: &str) -> String {
    let mut path = prepath.to_owned();
    if !path.ends_with('/') {
        path.push('/');
    }
    match path.strip_prefix('/') {
        Some(stripped) => stripped.to_owned(),
        None => path,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_port_and_path() {
        let url = RsyncUrl::parse("rsync://host:8730/mod/sub/dir").unwrap();
        assert_eq!(url.address(), "host:8730");
        assert_eq!(url.host_name(), "host");
        assert_eq!(url.port(), 8730);
        assert_eq!(url.module(), "mod");
        assert_eq!(url.path(), "/sub/dir");
    }

    #[test]
    fn default_port_and_empty_path() {
        let url = RsyncUrl::parse("rsync://host/mod").unwrap();
        assert_eq!(url.address(), "host:873");
        assert_eq!(url.module(), "mod");
        assert_eq!(url.path(), "");
    }

    #[test]
    fn trailing_slash_keeps_root_path() {
        let url = RsyncUrl::parse("rsync://host/mod/").unwrap();
        assert_eq!(url.module(), "mod");
        assert_eq!(url.path(), "/");
    }

    #[test]
    fn bracketed_ipv6_host() {
        let url = RsyncUrl::parse("rsync://[::1]:8730/mod").unwrap();
        assert_eq!(url.host_name(), "::1");
        assert_eq!(url.address(), "[::1]:8730");
        assert_eq!(url.to_string(), "rsync://[::1]:8730/mod");
    }

    #[test]
    fn malformed_addresses_are_rejected() {
        assert!(matches!(
            RsyncUrl::parse("host::mod/path"),
            Err(AddressError::UnsupportedSyntax(_))
        ));
        assert!(matches!(
            RsyncUrl::parse("rsync://host"),
            Err(AddressError::MissingModule(_))
        ));
        assert!(matches!(
            RsyncUrl::parse("rsync://host//path"),
            Err(AddressError::MissingModule(_))
        ));
        assert!(matches!(
            RsyncUrl::parse("rsync://host:rsync/mod"),
            Err(AddressError::InvalidPort(_))
        ));
        assert!(matches!(
            RsyncUrl::parse("rsync://host:70000/mod"),
            Err(AddressError::InvalidPort(_))
        ));
        assert!(matches!(
            RsyncUrl::parse("rsync://:873/mod"),
            Err(AddressError::EmptyHost(_))
        ));
    }

    #[test]
    fn prepath_normalisation() {
        for input in ["xx", "/xx", "xx/", "/xx/"] {
            assert_eq!(trim_prepath(input), "xx/", "{input}");
        }
        assert_eq!(trim_prepath(""), "");
        assert_eq!(trim_prepath("/"), "");
        assert_eq!(trim_prepath("a/b"), "a/b/");
    }
}
