//! A duplex byte stream with framed primitive reads.
//!
//! The read path is part of the type: a [`PlainConnection`] reads the
//! handshake directly, and [`Connection::into_multiplexed`] consumes it to
//! produce a [`MuxConnection`] whose reads go through [`MplexReader`]. There
//! is no way back, and no way to switch twice.

use std::fmt;
use std::io::{self, BufReader, Read, Write};

use logging::{LogContext, Subsystem, log_debug, log_error, log_info, log_warn};
use protocol::{MessageCode, MplexReader};

/// Longest handshake line accepted before the peer is considered hostile.
const MAX_LINE_LEN: usize = 4096;

/// Which decoder a connection reads through.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ReadMode {
    /// Raw bytes, used for the handshake.
    Plain,
    /// Demultiplexed application stream.
    Multiplexed,
}

/// A read half that a [`Connection`] may sit on.
pub trait ReadPath: Read {
    /// The mode this read path implements.
    const MODE: ReadMode;
}

impl<R: Read> ReadPath for BufReader<R> {
    const MODE: ReadMode = ReadMode::Plain;
}

impl<R: Read> ReadPath for MplexReader<BufReader<R>> {
    const MODE: ReadMode = ReadMode::Multiplexed;
}

/// Connection during the plaintext handshake.
pub type PlainConnection<R, W> = Connection<BufReader<R>, W>;

/// Connection after the seed, with a demultiplexed read path.
pub type MuxConnection<R, W> = Connection<MplexReader<BufReader<R>>, W>;

/// Owns one duplex stream and a scratch buffer for fixed-width reads.
pub struct Connection<P, W> {
    reader: P,
    writer: W,
    scratch: [u8; 4],
}

impl<P: ReadPath, W> fmt::Debug for Connection<P, W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("mode", &P::MODE)
            .finish_non_exhaustive()
    }
}

impl<R: Read, W: Write> Connection<BufReader<R>, W> {
    /// Wraps the two halves of a freshly established stream.
    pub fn new(reader: R, writer: W) -> Self {
        Self {
            reader: BufReader::new(reader),
            writer,
            scratch: [0; 4],
        }
    }

    /// Switches the read path to the multiplexed decoder.
    ///
    /// Out-of-band messages are reported through `log` from then on: info,
    /// log and client text at info level, warnings at warn, error codes at
    /// error. Bytes already buffered from the handshake carry over.
    pub fn into_multiplexed(self, log: &LogContext) -> MuxConnection<R, W> {
        let mut reader = MplexReader::new(self.reader);
        let log = log.clone();
        reader.set_message_handler(move |code, payload| {
            let text = String::from_utf8_lossy(payload);
            let text = text.trim_end_matches('\n');
            match code {
                MessageCode::Info | MessageCode::Log | MessageCode::Client => {
                    log_info!(log, Subsystem::Protocol, "{text}");
                }
                MessageCode::Warning => log_warn!(log, Subsystem::Protocol, "{text}"),
                code if code.is_error() => log_error!(log, Subsystem::Protocol, "{text}"),
                code => log_debug!(
                    log,
                    Subsystem::Protocol,
                    "ignored {code:?} message of {} bytes",
                    payload.len()
                ),
            }
        });
        Connection {
            reader,
            writer: self.writer,
            scratch: self.scratch,
        }
    }
}

impl<P: ReadPath, W: Write> Connection<P, W> {
    /// The active read mode.
    #[must_use]
    pub const fn mode(&self) -> ReadMode {
        P::MODE
    }

    /// Reads up to and excluding `\n`; a trailing `\r` is dropped too.
    ///
    /// Fails with [`io::ErrorKind::UnexpectedEof`] when the stream closes
    /// before the newline and [`io::ErrorKind::InvalidData`] for lines over
    /// 4096 bytes.
    pub fn read_line(&mut self) -> io::Result<String> {
        let mut line = Vec::new();
        loop {
            self.reader.read_exact(&mut self.scratch[..1])?;
            match self.scratch[0] {
                b'\n' => break,
                byte => line.push(byte),
            }
            if line.len() > MAX_LINE_LEN {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    "handshake line exceeds 4096 bytes",
                ));
            }
        }
        if line.last() == Some(&b'\r') {
            line.pop();
        }
        String::from_utf8(line)
            .map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err.utf8_error()))
    }

    /// Reads a little-endian `i32`.
    pub fn read_int(&mut self) -> io::Result<i32> {
        self.reader.read_exact(&mut self.scratch)?;
        Ok(i32::from_le_bytes(self.scratch))
    }

    /// Writes a little-endian `i32`.
    pub fn write_int(&mut self, value: i32) -> io::Result<()> {
        self.scratch = value.to_le_bytes();
        self.writer.write_all(&self.scratch)
    }

    /// Writes every byte of `bytes`.
    pub fn write_all(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.writer.write_all(bytes)
    }

    /// Flushes the write half.
    pub fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }

    /// Borrows both halves at once, so one thread can read while another
    /// writes.
    pub fn split_mut(&mut self) -> (&mut P, &mut W) {
        (&mut self.reader, &mut self.writer)
    }

    /// Returns the write half.
    pub fn writer_mut(&mut self) -> &mut W {
        &mut self.writer
    }

    /// Consumes the connection, returning both halves.
    pub fn into_parts(self) -> (P, W) {
        (self.reader, self.writer)
    }
}

impl<P: ReadPath, W> Read for Connection<P, W> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.reader.read(buf)
    }
}

impl<P, W: Write> Write for Connection<P, W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.writer.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }
}
