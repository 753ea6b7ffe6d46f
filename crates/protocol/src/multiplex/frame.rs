use std::borrow::Cow;
use std::io;

use crate::envelope::{MAX_PAYLOAD_LENGTH, MessageCode, MessageHeader};

/// A complete multiplexed message: its code and owned payload.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct MessageFrame {
    code: MessageCode,
    payload: Vec<u8>,
}

impl MessageFrame {
    /// Creates a frame, rejecting payloads longer than 24 bits can express.
    pub fn new(code: MessageCode, payload: Vec<u8>) -> io::Result<Self> {
        if payload.len() > MAX_PAYLOAD_LENGTH as usize {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!(
                    "multiplexed payload length {} exceeds maximum {MAX_PAYLOAD_LENGTH}",
                    payload.len()
                ),
            ));
        }
        Ok(Self { code, payload })
    }

    /// The message code.
    #[must_use]
    pub const fn code(&self) -> MessageCode {
        self.code
    }

    /// The payload bytes.
    #[must_use]
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Takes ownership of the payload.
    #[must_use]
    pub fn into_payload(self) -> Vec<u8> {
        self.payload
    }

    /// The payload as text, with invalid UTF-8 replaced and trailing newlines removed.
    #[must_use]
    pub fn text(&self) -> Cow<'_, str> {
        match String::from_utf8_lossy(&self.payload) {
            Cow::Borrowed(text) => Cow::Borrowed(text.trim_end_matches(['\r', '\n'])),
            Cow::Owned(text) => Cow::Owned(text.trim_end_matches(['\r', '\n']).to_owned()),
        }
    }

    /// Header describing this frame.
    pub fn header(&self) -> io::Result<MessageHeader> {
        Ok(MessageHeader::new(self.code, self.payload.len() as u32)?)
    }
}
