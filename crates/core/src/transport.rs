//! Duplex byte streams a session can run over.

use std::ffi::OsStr;
use std::fmt;
use std::io::{self, Read, Write};
use std::net::{Shutdown, TcpStream};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// A blocking duplex stream that can be split into independent halves.
///
/// The write half must be `Send` because file requests are written from a
/// separate thread while the main thread consumes replies.
pub trait Transport {
    /// Read half.
    type Reader: Read;
    /// Write half.
    type Writer: Write + Send;

    /// Separates the two directions.
    fn split(self) -> io::Result<(Self::Reader, Self::Writer)>;

    /// A handle that closes the stream from any thread, waking a read or
    /// write blocked on either half.
    ///
    /// Returns `None` when the stream offers no such control. A failed
    /// transfer over such a stream stops its request writer at the next
    /// request boundary but cannot interrupt a blocked call.
    fn shutdown_handle(&self) -> io::Result<Option<ShutdownHandle>> {
        Ok(None)
    }
}

/// Closes a transport out from under its halves.
///
/// Used to unblock one half of a transfer after the other has failed.
#[derive(Clone)]
pub struct ShutdownHandle {
    close: Arc<dyn Fn() + Send + Sync>,
}

impl ShutdownHandle {
    /// Wraps the action that closes the stream. It may run more than once.
    pub fn new<F>(close: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        Self {
            close: Arc::new(close),
        }
    }

    /// Closes the stream.
    pub fn shutdown(&self) {
        (self.close)();
    }
}

impl fmt::Debug for ShutdownHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShutdownHandle").finish_non_exhaustive()
    }
}

impl Transport for TcpStream {
    type Reader = TcpStream;
    type Writer = TcpStream;

    fn split(self) -> io::Result<(Self::Reader, Self::Writer)> {
        let reader = self.try_clone()?;
        Ok((reader, self))
    }

    fn shutdown_handle(&self) -> io::Result<Option<ShutdownHandle>> {
        let stream = self.try_clone()?;
        Ok(Some(ShutdownHandle::new(move || {
            let _ = stream.shutdown(Shutdown::Both);
        })))
    }
}

impl<R: Read, W: Write + Send> Transport for (R, W) {
    type Reader = R;
    type Writer = W;

    fn split(self) -> io::Result<(Self::Reader, Self::Writer)> {
        Ok(self)
    }
}

/// A remote command reached through a shell such as `ssh`.
///
/// The child's stdout is the read half and its stdin the write half; stderr
/// is inherited so prompts and diagnostics reach the user.
#[derive(Debug)]
pub struct RemoteShell {
    child: Option<Arc<Mutex<Child>>>,
    stdin: Option<ChildStdin>,
    stdout: Option<ChildStdout>,
}

impl RemoteShell {
    /// Runs `program host remote_command...`.
    pub fn spawn<P, S>(program: P, host: &str, remote_command: &[S]) -> io::Result<Self>
    where
        P: AsRef<OsStr>,
        S: AsRef<OsStr>,
    {
        let mut command = Command::new(program);
        command.arg(host).args(remote_command);
        Self::from_command(command)
    }

    /// Runs an arbitrary prepared command with piped stdin and stdout.
    pub fn from_command(mut command: Command) -> io::Result<Self> {
        let mut child = command
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()?;
        let stdin = child.stdin.take();
        let stdout = child.stdout.take();
        Ok(Self {
            child: Some(Arc::new(Mutex::new(child))),
            stdin,
            stdout,
        })
    }
}

impl Transport for RemoteShell {
    type Reader = ShellReader;
    type Writer = ShellWriter;

    fn split(mut self) -> io::Result<(Self::Reader, Self::Writer)> {
        let closed = || io::Error::new(io::ErrorKind::BrokenPipe, "shell pipes already taken");
        let stdin = self.stdin.take().ok_or_else(closed)?;
        let stdout = self.stdout.take().ok_or_else(closed)?;
        let child = self.child.take().ok_or_else(closed)?;
        Ok((ShellReader { stdout, child }, ShellWriter { stdin }))
    }

    /// Kills the child, which closes both pipes.
    fn shutdown_handle(&self) -> io::Result<Option<ShutdownHandle>> {
        Ok(self.child.as_ref().map(|child| {
            let child = Arc::clone(child);
            ShutdownHandle::new(move || {
                let _ = lock(&child).kill();
            })
        }))
    }
}

impl Drop for RemoteShell {
    fn drop(&mut self) {
        if let Some(child) = self.child.as_ref() {
            reap(child);
        }
    }
}

/// Read half of a [`RemoteShell`]. Owns the child process, which is
/// reaped when the reader is dropped.
#[derive(Debug)]
pub struct ShellReader {
    stdout: ChildStdout,
    child: Arc<Mutex<Child>>,
}

impl Read for ShellReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.stdout.read(buf)
    }
}

impl Drop for ShellReader {
    fn drop(&mut self) {
        reap(&self.child);
    }
}

/// Write half of a [`RemoteShell`].
#[derive(Debug)]
pub struct ShellWriter {
    stdin: ChildStdin,
}

impl Write for ShellWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.stdin.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.stdin.flush()
    }
}

fn lock(child: &Mutex<Child>) -> MutexGuard<'_, Child> {
    child.lock().unwrap_or_else(PoisonError::into_inner)
}

fn reap(child: &Mutex<Child>) {
    let mut child = lock(child);
    if let Ok(None) = child.try_wait() {
        let _ = child.kill();
    }
    let _ = child.wait();
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn tuple_transport_splits_into_itself() {
        let (mut reader, mut writer) = (Cursor::new(b"abc".to_vec()), Vec::new())
            .split()
            .unwrap();
        let mut text = String::new();
        reader.read_to_string(&mut text).unwrap();
        writer.write_all(b"x").unwrap();
        assert_eq!(text, "abc");
        assert_eq!(writer, b"x");
    }

    #[cfg(unix)]
    #[test]
    fn remote_shell_pipes_through_child() {
        let mut command = Command::new("sh");
        command.args(["-c", "cat"]);
        let shell = RemoteShell::from_command(command).unwrap();
        let (mut reader, mut writer) = shell.split().unwrap();

        writer.write_all(b"ping").unwrap();
        writer.flush().unwrap();
        drop(writer);

        let mut echoed = Vec::new();
        reader.read_to_end(&mut echoed).unwrap();
        assert_eq!(echoed, b"ping");
    }

    #[test]
    fn tuple_transport_has_no_shutdown() {
        let transport = (Cursor::new(Vec::new()), Vec::new());
        assert!(transport.shutdown_handle().unwrap().is_none());
    }

    #[test]
    fn tcp_shutdown_wakes_a_blocked_reader() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let client = TcpStream::connect(listener.local_addr().unwrap()).unwrap();
        let (_server, _) = listener.accept().unwrap();

        let handle = client.shutdown_handle().unwrap().unwrap();
        let (mut reader, _writer) = client.split().unwrap();
        let blocked = std::thread::spawn(move || {
            let mut buf = [0u8; 1];
            reader.read(&mut buf)
        });
        handle.shutdown();
        assert_eq!(blocked.join().unwrap().unwrap(), 0);
    }

    #[cfg(unix)]
    #[test]
    fn shell_shutdown_kills_the_child() {
        let mut command = Command::new("sh");
        command.args(["-c", "exec sleep 30"]);
        let shell = RemoteShell::from_command(command).unwrap();
        let handle = shell.shutdown_handle().unwrap().unwrap();
        let (mut reader, _writer) = shell.split().unwrap();

        handle.shutdown();
        let mut rest = Vec::new();
        reader.read_to_end(&mut rest).unwrap();
        assert!(rest.is_empty());
    }
}
