//! The plaintext handshake that precedes the multiplexed stream.

use std::io::{Read, Write};

use logging::{Subsystem, log_debug, log_info, log_warn};
use protocol::{DaemonLine, ProtocolVersion, classify_daemon_line, format_greeting, parse_greeting};

use crate::connection::PlainConnection;
use crate::error::ClientError;
use crate::options::ClientOptions;

/// Parameters fixed by the handshake.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SessionParams {
    module: String,
    path: String,
    seed: i32,
    local: ProtocolVersion,
    remote: ProtocolVersion,
}

impl SessionParams {
    /// Module name, empty on the remote-shell path.
    #[must_use]
    pub fn module(&self) -> &str {
        &self.module
    }

    /// Requested path inside the module.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Checksum seed announced by the server.
    #[must_use]
    pub const fn seed(&self) -> i32 {
        self.seed
    }

    /// Version this client advertised.
    #[must_use]
    pub const fn local_version(&self) -> ProtocolVersion {
        self.local
    }

    /// Version the server advertised.
    #[must_use]
    pub const fn remote_version(&self) -> ProtocolVersion {
        self.remote
    }

    /// Version both sides speak: the lower of the two.
    #[must_use]
    pub fn protocol(&self) -> ProtocolVersion {
        self.local.min(self.remote)
    }

    #[cfg(test)]
    pub(crate) fn for_tests(module: &str, path: &str, seed: i32, version: ProtocolVersion) -> Self {
        Self {
            module: module.to_owned(),
            path: path.to_owned(),
            seed,
            local: version,
            remote: version,
        }
    }
}

/// Runs the daemon handshake up to and including the seed.
///
/// The connection is left in plain mode; switching to the multiplexed
/// reader is the caller's next step.
pub fn negotiate_daemon<R: Read, W: Write>(
    conn: &mut PlainConnection<R, W>,
    module: &str,
    path: &str,
    options: &ClientOptions,
) -> Result<SessionParams, ClientError> {
    let log = options.log();
    let local = options.protocol();

    conn.write_all(format_greeting(local).as_bytes())?;
    conn.flush()?;

    let greeting = conn.read_line()?;
    let remote = match parse_greeting(&greeting) {
        Ok(version) => version,
        Err(err) => {
            log_warn!(log, Subsystem::Protocol, "{err}; assuming protocol {local}");
            local
        }
    };
    log_debug!(log, Subsystem::Protocol, "daemon speaks protocol {remote}");

    conn.write_all(module.as_bytes())?;
    conn.write_all(b"\n")?;
    conn.flush()?;

    loop {
        let line = conn.read_line()?;
        match classify_daemon_line(&line)? {
            DaemonLine::Ok => break,
            DaemonLine::AuthRequired { challenge } => {
                let auth = options.auth().ok_or(ClientError::AuthRequired)?;
                log_debug!(log, Subsystem::Auth, "answering challenge as {}", auth.username());
                conn.write_all(auth.respond(challenge).as_bytes())?;
                conn.write_all(b"\n")?;
                conn.flush()?;
            }
            DaemonLine::Error(message) => return Err(ClientError::Daemon(message.to_owned())),
            DaemonLine::Exit => {
                return Err(ClientError::Daemon(format!(
                    "daemon closed the session before accepting module {module:?}"
                )));
            }
            DaemonLine::Other(text) => log_info!(log, Subsystem::Connect, "{text}"),
        }
    }

    let mut block = String::new();
    for arg in options.server_args() {
        block.push_str(arg);
        block.push('\n');
    }
    block.push_str(module);
    block.push_str(path);
    block.push_str("\n\n");
    conn.write_all(block.as_bytes())?;
    conn.flush()?;

    let seed = conn.read_int()?;
    log_debug!(log, Subsystem::Protocol, "checksum seed {seed}");

    Ok(SessionParams {
        module: module.to_owned(),
        path: path.to_owned(),
        seed,
        local,
        remote,
    })
}

/// Runs the binary handshake used over a remote shell.
///
/// The remote command line already carries the arguments and path, so the
/// exchange is only: local version out, remote version in, seed in.
pub fn negotiate_shell<R: Read, W: Write>(
    conn: &mut PlainConnection<R, W>,
    path: &str,
    options: &ClientOptions,
) -> Result<SessionParams, ClientError> {
    let log = options.log();
    let local = options.protocol();

    conn.write_int(local.as_wire())?;
    conn.flush()?;
    let remote = ProtocolVersion::from_wire(conn.read_int()?);
    log_debug!(log, Subsystem::Protocol, "remote shell speaks protocol {remote}");
    if remote.major() < local.major() && remote.major() < 20 {
        return Err(ClientError::protocol(format!(
            "remote protocol {remote} is too old"
        )));
    }
    let seed = conn.read_int()?;

    Ok(SessionParams {
        module: String::new(),
        path: path.to_owned(),
        seed,
        local,
        remote,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{ClientAuth, respond};
    use crate::connection::Connection;
    use logging::{LogContext, LogLevel, MemorySink};
    use std::io::Cursor;

    fn script(lines: &str, seed: i32) -> Cursor<Vec<u8>> {
        let mut bytes = lines.as_bytes().to_vec();
        bytes.extend_from_slice(&seed.to_le_bytes());
        Cursor::new(bytes)
    }

    #[test]
    fn anonymous_module_handshake() {
        let mut conn = Connection::new(script("@RSYNCD: 27.0\n@RSYNCD: OK\n", 42), Vec::new());
        let params = negotiate_daemon(&mut conn, "pub", "/dir", &ClientOptions::new()).unwrap();

        assert_eq!(params.seed(), 42);
        assert_eq!(params.module(), "pub");
        assert_eq!(params.remote_version(), ProtocolVersion::new(27, 0));

        let (_, sent) = conn.into_parts();
        assert_eq!(
            String::from_utf8(sent).unwrap(),
            "@RSYNCD: 27.0\npub\n--server\n--sender\n-l\n-p\n-r\n-t\n.\npub/dir\n\n"
        );
    }

    #[test]
    fn motd_lines_are_skipped() {
        let input = script("@RSYNCD: 31.0\nwelcome\n\n@RSYNCD: OK\n", 1);
        let sink = MemorySink::new();
        let options = ClientOptions::new().with_log(LogContext::new(sink.clone()));
        let mut conn = Connection::new(input, Vec::new());

        let params = negotiate_daemon(&mut conn, "m", "", &options).unwrap();
        assert_eq!(params.protocol(), ProtocolVersion::new(27, 0));
        assert_eq!(sink.messages_at(LogLevel::Info), ["welcome", ""]);
    }

    #[test]
    fn unparsable_greeting_falls_back() {
        let sink = MemorySink::new();
        let options = ClientOptions::new().with_log(LogContext::new(sink.clone()));
        let mut conn = Connection::new(script("hello\n@RSYNCD: OK\n", 3), Vec::new());

        let params = negotiate_daemon(&mut conn, "m", "", &options).unwrap();
        assert_eq!(params.remote_version(), ProtocolVersion::CLIENT);
        assert_eq!(sink.messages_at(LogLevel::Warn).len(), 1);
    }

    #[test]
    fn challenge_without_credentials_fails() {
        let input = script("@RSYNCD: 27.0\n@RSYNCD: AUTHREQD abc\n@RSYNCD: OK\n", 0);
        let mut conn = Connection::new(input, Vec::new());
        let err = negotiate_daemon(&mut conn, "m", "", &ClientOptions::new()).unwrap_err();
        assert!(matches!(err, ClientError::AuthRequired));
    }

    #[test]
    fn challenge_is_answered() {
        let input = script("@RSYNCD: 27.0\n@RSYNCD: AUTHREQD abc\n@RSYNCD: OK\n", 5);
        let options = ClientOptions::new().with_auth(ClientAuth::new("u", "pw"));
        let mut conn = Connection::new(input, Vec::new());
        negotiate_daemon(&mut conn, "m", "", &options).unwrap();

        let (_, sent) = conn.into_parts();
        let sent = String::from_utf8(sent).unwrap();
        assert!(sent.starts_with(&format!("@RSYNCD: 27.0\nm\nu {}\n", respond("pw", "abc"))));
    }

    #[test]
    fn daemon_error_aborts() {
        let input = script("@RSYNCD: 27.0\n@ERROR: Unknown module 'm'\n", 0);
        let mut conn = Connection::new(input, Vec::new());
        let err = negotiate_daemon(&mut conn, "m", "", &ClientOptions::new()).unwrap_err();
        assert!(matches!(err, ClientError::Daemon(message) if message == "Unknown module 'm'"));
    }

    #[test]
    fn stream_closing_before_ok_is_io() {
        let input = Cursor::new(b"@RSYNCD: 27.0\n@RSYNCD: AUTHREQD".to_vec());
        let mut conn = Connection::new(input, Vec::new());
        let err = negotiate_daemon(&mut conn, "m", "", &ClientOptions::new()).unwrap_err();
        assert!(matches!(err, ClientError::Io(_)));
    }

    #[test]
    fn shell_handshake() {
        let mut input = 29i32.to_le_bytes().to_vec();
        input.extend_from_slice(&(-9i32).to_le_bytes());
        let mut conn = Connection::new(Cursor::new(input), Vec::new());

        let params = negotiate_shell(&mut conn, "dir", &ClientOptions::new()).unwrap();
        assert_eq!(params.seed(), -9);
        assert_eq!(params.protocol(), ProtocolVersion::new(27, 0));
        let (_, sent) = conn.into_parts();
        assert_eq!(sent, 27i32.to_le_bytes());
    }
}
