//! Entry points that turn a transport into a ready [`Receiver`].

use std::ffi::OsStr;
use std::io::{Read, Write};
use std::net::TcpStream;

use logging::{Subsystem, log_debug, log_info};
use protocol::write_exclusion_list;
#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::address::RsyncUrl;
use crate::connection::{Connection, PlainConnection};
use crate::error::ClientError;
use crate::negotiate::{SessionParams, negotiate_daemon, negotiate_shell};
use crate::options::ClientOptions;
use crate::receiver::{Receiver, ReceiverState};
use crate::transport::{RemoteShell, ShellReader, ShellWriter, ShutdownHandle, Transport};

/// Connects to the daemon named by `url` over TCP and runs the handshake.
///
/// # Errors
///
/// Fails when the connection cannot be established or the handshake does
/// not complete; see [`handshake_daemon`].
#[cfg_attr(feature = "tracing", instrument(skip(options), fields(url = %url)))]
pub fn connect_daemon(
    url: &RsyncUrl,
    options: ClientOptions,
) -> Result<Receiver<TcpStream, TcpStream>, ClientError> {
    let address = url.address();
    log_debug!(options.log(), Subsystem::Connect, "connecting to {address}");
    let stream = TcpStream::connect(&address)?;
    stream.set_nodelay(true)?;
    handshake_daemon(stream, url.module(), url.path(), options)
}

/// Spawns `program host rsync <server args> path` and runs the remote-shell
/// handshake over the child's standard streams.
///
/// # Errors
///
/// Fails when the command cannot be spawned or the handshake does not
/// complete; see [`handshake_shell`].
#[cfg_attr(feature = "tracing", instrument(skip(program, options)))]
pub fn connect_shell<P: AsRef<OsStr>>(
    program: P,
    host: &str,
    path: &str,
    options: ClientOptions,
) -> Result<Receiver<ShellReader, ShellWriter>, ClientError> {
    let mut command = Vec::with_capacity(options.server_args().len() + 2);
    command.push("rsync");
    command.extend(options.server_args().iter().map(String::as_str));
    command.push(path);
    log_debug!(options.log(), Subsystem::Connect, "spawning {} on {host}", command.join(" "));
    let shell = RemoteShell::spawn(program, host, &command)?;
    handshake_shell(shell, path, options)
}

/// Runs the daemon handshake over an established transport.
///
/// Sends the greeting and module, answers authentication challenges,
/// sends the argument block, reads the seed, switches to multiplexed reads
/// and sends the exclusion list.
///
/// # Errors
///
/// - [`ClientError::AuthRequired`] when the daemon asks for credentials and
///   none are configured.
/// - [`ClientError::Daemon`] when the daemon refuses the session.
/// - [`ClientError::Io`] or [`ClientError::Protocol`] when the stream fails
///   or carries unexpected data.
pub fn handshake_daemon<T: Transport>(
    transport: T,
    module: &str,
    path: &str,
    options: ClientOptions,
) -> Result<Receiver<T::Reader, T::Writer>, ClientError> {
    let shutdown = transport.shutdown_handle()?;
    let (reader, writer) = transport.split()?;
    let mut conn = Connection::new(reader, writer);
    log_state(&options, ReceiverState::Connected);
    let session = negotiate_daemon(&mut conn, module, path, &options)?;
    finish_handshake(conn, session, options, shutdown)
}

/// Runs the remote-shell handshake over an established transport.
///
/// The remote command already carries the arguments, so only versions and
/// the seed are exchanged before the exclusion list.
///
/// # Errors
///
/// [`ClientError::Io`] or [`ClientError::Protocol`] when the stream fails,
/// carries unexpected data or the remote side is too old.
pub fn handshake_shell<T: Transport>(
    transport: T,
    path: &str,
    options: ClientOptions,
) -> Result<Receiver<T::Reader, T::Writer>, ClientError> {
    let shutdown = transport.shutdown_handle()?;
    let (reader, writer) = transport.split()?;
    let mut conn = Connection::new(reader, writer);
    log_state(&options, ReceiverState::Connected);
    let session = negotiate_shell(&mut conn, path, &options)?;
    finish_handshake(conn, session, options, shutdown)
}

fn finish_handshake<R, W>(
    conn: PlainConnection<R, W>,
    session: SessionParams,
    options: ClientOptions,
    shutdown: Option<ShutdownHandle>,
) -> Result<Receiver<R, W>, ClientError>
where
    R: Read,
    W: Write + Send,
{
    log_state(&options, ReceiverState::Handshaken);
    log_info!(
        options.log(),
        Subsystem::Protocol,
        "session on protocol {} with seed {}",
        session.protocol(),
        session.seed()
    );

    let mut conn = conn.into_multiplexed(options.log());
    write_exclusion_list(conn.writer_mut(), options.exclusions())?;
    conn.flush()?;
    log_state(&options, ReceiverState::ExclusionsSent);

    Ok(Receiver::new(conn, session, options, shutdown))
}

fn log_state(options: &ClientOptions, state: ReceiverState) {
    log_debug!(options.log(), Subsystem::Connect, "state {state:?}");
}

#[cfg(test)]
mod tests {
    use super::*;
    use protocol::ProtocolVersion;
    use protocol::wire::write_int;
    use std::io::Cursor;

    #[test]
    fn shell_handshake_sends_version_then_exclusions() {
        let mut script = Vec::new();
        write_int(&mut script, 27).unwrap();
        write_int(&mut script, 99).unwrap();
        let mut sent = Vec::new();

        let options = ClientOptions::new().with_exclude("*.o");
        let receiver = handshake_shell((Cursor::new(script), &mut sent), "/src", options).unwrap();
        assert_eq!(receiver.state(), ReceiverState::ExclusionsSent);
        assert_eq!(receiver.session().seed(), 99);
        assert_eq!(receiver.session().path(), "/src");
        drop(receiver);

        let mut expected = Vec::new();
        write_int(&mut expected, ProtocolVersion::CLIENT.as_wire()).unwrap();
        write_int(&mut expected, 3).unwrap();
        expected.extend_from_slice(b"*.o");
        write_int(&mut expected, 0).unwrap();
        assert_eq!(sent, expected);
    }

    #[test]
    fn refused_module_never_yields_a_receiver() {
        let script = b"@RSYNCD: 27\n@ERROR: Unknown module 'nope'\n".to_vec();
        let err = handshake_daemon(
            (Cursor::new(script), Vec::new()),
            "nope",
            "",
            ClientOptions::new(),
        )
        .unwrap_err();
        assert!(matches!(err, ClientError::Daemon(message) if message.contains("Unknown module")));
    }
}
