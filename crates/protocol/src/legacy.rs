//! The newline-terminated text exchange that precedes the seed on daemon
//! connections.

use crate::error::NegotiationError;
use crate::version::ProtocolVersion;

/// Prefix shared by every daemon handshake line.
pub const RSYNCD_PREFIX: &str = "@RSYNCD: ";

/// Token that ends the module/authentication loop.
pub const RSYNCD_OK: &str = "@RSYNCD: OK";

/// Token that introduces an authentication challenge. The trailing space is
/// part of the token.
pub const RSYNCD_AUTHREQD: &str = "@RSYNCD: AUTHREQD ";

/// Token a daemon sends when it closes the exchange (e.g. after a module listing).
pub const RSYNCD_EXIT: &str = "@RSYNCD: EXIT";

/// Prefix of a fatal daemon diagnostic such as `@ERROR: Unknown module 'x'`.
pub const ERROR_PREFIX: &str = "@ERROR";

/// Classification of one handshake line received after the module name.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum DaemonLine<'a> {
    /// `@RSYNCD: OK`; the client may send its argument block.
    Ok,
    /// `@RSYNCD: AUTHREQD <challenge>`.
    AuthRequired {
        /// Nonce the response hash is computed over.
        challenge: &'a str,
    },
    /// `@RSYNCD: EXIT`.
    Exit,
    /// `@ERROR...`; the daemon refused the request.
    Error(&'a str),
    /// Anything else (message of the day, future extensions).
    Other(&'a str),
}

/// Formats the greeting line advertising `version`, including the newline.
#[must_use]
pub fn format_greeting(version: ProtocolVersion) -> String {
    format!("{RSYNCD_PREFIX}{}.{}\n", version.major(), version.minor())
}

/// Parses a daemon greeting such as `@RSYNCD: 31.0` or `@RSYNCD: 30.0 md5 md4`.
///
/// A missing minor number parses as zero. Anything after the version token is
/// ignored.
pub fn parse_greeting(line: &str) -> Result<ProtocolVersion, NegotiationError> {
    let trimmed = line.trim_end_matches(['\r', '\n']);
    let malformed = || NegotiationError::MalformedGreeting {
        input: trimmed.to_owned(),
    };

    let rest = trimmed.strip_prefix(RSYNCD_PREFIX).ok_or_else(malformed)?;
    let token = rest.split_whitespace().next().ok_or_else(malformed)?;
    let (major, minor) = match token.split_once('.') {
        Some((major, minor)) => (major, Some(minor)),
        None => (token, None),
    };

    let major = major.parse::<u32>().map_err(|_| malformed())?;
    let minor = match minor {
        Some(minor) => minor.parse::<u32>().map_err(|_| malformed())?,
        None => 0,
    };
    Ok(ProtocolVersion::new(major, minor))
}

/// Classifies a line read while waiting for `@RSYNCD: OK`.
///
/// Matching is substring based, so a token is recognised even when the daemon
/// prefixes it with other text.
pub fn classify_daemon_line(line: &str) -> Result<DaemonLine<'_>, NegotiationError> {
    let trimmed = line.trim_end_matches(['\r', '\n']);

    if let Some(message) = trimmed.strip_prefix(ERROR_PREFIX) {
        let message = message.trim_start_matches(':').trim();
        return Ok(DaemonLine::Error(message));
    }

    if let Some(pos) = trimmed.find(RSYNCD_AUTHREQD) {
        let challenge = trimmed[pos + RSYNCD_AUTHREQD.len()..]
            .split_whitespace()
            .next()
            .ok_or_else(|| NegotiationError::MissingChallenge {
                input: trimmed.to_owned(),
            })?;
        return Ok(DaemonLine::AuthRequired { challenge });
    }

    if trimmed.contains(RSYNCD_OK) {
        return Ok(DaemonLine::Ok);
    }

    if trimmed.contains(RSYNCD_EXIT) {
        return Ok(DaemonLine::Exit);
    }

    Ok(DaemonLine::Other(trimmed))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn greeting_formats_with_newline() {
        assert_eq!(format_greeting(ProtocolVersion::CLIENT), "@RSYNCD: 27.0\n");
    }

    #[test]
    fn greeting_parses_major_and_minor() {
        assert_eq!(
            parse_greeting("@RSYNCD: 31.0\n").unwrap(),
            ProtocolVersion::new(31, 0)
        );
        assert_eq!(
            parse_greeting("@RSYNCD: 30.0 md5 md4\r\n").unwrap(),
            ProtocolVersion::new(30, 0)
        );
        assert_eq!(
            parse_greeting("@RSYNCD: 26").unwrap(),
            ProtocolVersion::new(26, 0)
        );
    }

    #[test]
    fn greeting_rejects_garbage() {
        for line in ["", "hello", "@RSYNCD: ", "@RSYNCD: x.y", "@RSYNCD: 30.z"] {
            let err = parse_greeting(line).unwrap_err();
            assert!(matches!(err, NegotiationError::MalformedGreeting { .. }));
        }
    }

    #[test]
    fn classifies_handshake_lines() {
        assert_eq!(classify_daemon_line("@RSYNCD: OK").unwrap(), DaemonLine::Ok);
        assert_eq!(classify_daemon_line("@RSYNCD: EXIT\n").unwrap(), DaemonLine::Exit);
        assert_eq!(
            classify_daemon_line("@RSYNCD: AUTHREQD abc123  \n").unwrap(),
            DaemonLine::AuthRequired { challenge: "abc123" }
        );
        assert_eq!(
            classify_daemon_line("@ERROR: Unknown module 'nope'").unwrap(),
            DaemonLine::Error("Unknown module 'nope'")
        );
        assert_eq!(
            classify_daemon_line("Welcome to the mirror").unwrap(),
            DaemonLine::Other("Welcome to the mirror")
        );
    }

    #[test]
    fn empty_challenge_is_an_error() {
        let err = classify_daemon_line("@RSYNCD: AUTHREQD ").unwrap_err();
        assert_eq!(err.input(), "@RSYNCD: AUTHREQD ");
    }
}
