//! [`MplexReader`]: a `Read` adapter that strips multiplex framing.

use std::fmt;
use std::io::{self, Read};

use super::io::{read_header, read_payload_into};
use crate::envelope::MessageCode;

type MessageHandler = Box<dyn FnMut(MessageCode, &[u8]) + Send>;

/// A reader that transparently demultiplexes rsync protocol messages.
///
/// `Data` payloads are handed to the caller as one continuous byte stream;
/// reads cross frame boundaries as needed. Every other message is passed to
/// the out-of-band handler exactly once and never appears in the stream.
///
/// # Examples
///
/// ```
/// use std::io::{Cursor, Read};
/// use std::sync::{Arc, Mutex};
/// use protocol::{MessageCode, MplexReader, send_msg};
///
/// let mut wire = Vec::new();
/// send_msg(&mut wire, MessageCode::Warning, b"slow disk").unwrap();
/// send_msg(&mut wire, MessageCode::Data, b"abc").unwrap();
///
/// let seen = Arc::new(Mutex::new(Vec::new()));
/// let sink = Arc::clone(&seen);
/// let mut reader = MplexReader::new(Cursor::new(wire));
/// reader.set_message_handler(move |code, payload| {
///     sink.lock().unwrap().push((code, payload.to_vec()));
/// });
///
/// let mut buf = [0u8; 3];
/// reader.read_exact(&mut buf).unwrap();
/// assert_eq!(&buf, b"abc");
/// assert_eq!(seen.lock().unwrap()[0].0, MessageCode::Warning);
/// ```
pub struct MplexReader<R> {
    inner: R,
    buffer: Vec<u8>,
    pos: usize,
    message_handler: Option<MessageHandler>,
}

impl<R> fmt::Debug for MplexReader<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MplexReader")
            .field("buffered", &self.buffered())
            .field("has_handler", &self.message_handler.is_some())
            .finish_non_exhaustive()
    }
}

impl<R> MplexReader<R> {
    /// Wraps `inner`, preallocating a 32 KiB frame buffer.
    #[inline]
    pub fn new(inner: R) -> Self {
        Self::with_capacity(inner, 32 * 1024)
    }

    /// Wraps `inner` with a specific buffer capacity.
    pub fn with_capacity(inner: R, capacity: usize) -> Self {
        Self {
            inner,
            buffer: Vec::with_capacity(capacity),
            pos: 0,
            message_handler: None,
        }
    }

    /// Returns a reference to the underlying reader.
    #[inline]
    pub const fn get_ref(&self) -> &R {
        &self.inner
    }

    /// Consumes the adapter and returns the underlying reader. Buffered data is lost.
    #[inline]
    pub fn into_inner(self) -> R {
        self.inner
    }

    /// Installs the handler invoked for every non-`Data` message.
    ///
    /// Without a handler such messages are discarded.
    pub fn set_message_handler<F>(&mut self, handler: F)
    where
        F: FnMut(MessageCode, &[u8]) + Send + 'static,
    {
        self.message_handler = Some(Box::new(handler));
    }

    /// Number of application bytes decoded but not yet returned.
    #[inline]
    pub fn buffered(&self) -> usize {
        self.buffer.len().saturating_sub(self.pos)
    }
}

impl<R: Read> MplexReader<R> {
    /// Pulls frames until a non-empty `Data` payload is buffered.
    fn fill(&mut self) -> io::Result<()> {
        loop {
            let header = read_header(&mut self.inner)?;
            self.pos = 0;
            read_payload_into(&mut self.inner, &mut self.buffer, header.payload_len_usize())?;

            match header.code() {
                MessageCode::Data if self.buffer.is_empty() => {}
                MessageCode::Data => return Ok(()),
                other => {
                    if let Some(handler) = self.message_handler.as_mut() {
                        handler(other, &self.buffer);
                    }
                    self.buffer.clear();
                }
            }
        }
    }
}

impl<R: Read> Read for MplexReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }

        if self.buffered() == 0 {
            self.fill()?;
        }

        let available = &self.buffer[self.pos..];
        let to_copy = available.len().min(buf.len());
        buf[..to_copy].copy_from_slice(&available[..to_copy]);
        self.pos += to_copy;
        Ok(to_copy)
    }
}
