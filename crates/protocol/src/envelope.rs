use std::io;

use thiserror::Error;

/// Number of bytes in a multiplexed message header.
pub const HEADER_LEN: usize = 4;

/// Maximum payload length representable in a multiplexed header.
pub const MAX_PAYLOAD_LENGTH: u32 = 0x00FF_FFFF;

const MPLEX_BASE: u8 = 7;
const PAYLOAD_MASK: u32 = 0x00FF_FFFF;

/// Tags carried in the high byte of a multiplexed header.
///
/// Only [`MessageCode::Data`] belongs to the application stream; every other
/// code is out-of-band.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[repr(u8)]
pub enum MessageCode {
    /// Application bytes.
    Data = 0,
    /// Fatal transfer error (`FERROR_XFER`).
    ErrorXfer = 1,
    /// Informational message (`FINFO`).
    Info = 2,
    /// Non-fatal error (`FERROR`).
    Error = 3,
    /// Warning (`FWARNING`).
    Warning = 4,
    /// Error relayed from a sibling process (`FERROR_SOCKET`).
    ErrorSocket = 5,
    /// Daemon-log message (`FLOG`).
    Log = 6,
    /// Client-only message (`FCLIENT`).
    Client = 7,
    /// Filename conversion problem (`FERROR_UTF8`).
    ErrorUtf8 = 8,
    /// Request to resend a file-list index.
    Redo = 9,
    /// Transfer statistics.
    Stats = 10,
    /// Sender hit an I/O error while reading its tree.
    IoError = 22,
    /// Daemon timeout announcement.
    IoTimeout = 33,
    /// Keep-alive.
    NoOp = 42,
    /// Synchronised error exit.
    ErrorExit = 86,
    /// Receiver reports an updated file.
    Success = 100,
    /// Receiver reports a deleted file.
    Deleted = 101,
    /// Sender could not open a requested file.
    NoSend = 102,
}

impl MessageCode {
    /// Every code, ordered by numeric value.
    pub const ALL: [Self; 18] = [
        Self::Data,
        Self::ErrorXfer,
        Self::Info,
        Self::Error,
        Self::Warning,
        Self::ErrorSocket,
        Self::Log,
        Self::Client,
        Self::ErrorUtf8,
        Self::Redo,
        Self::Stats,
        Self::IoError,
        Self::IoTimeout,
        Self::NoOp,
        Self::ErrorExit,
        Self::Success,
        Self::Deleted,
        Self::NoSend,
    ];

    /// Returns the numeric representation expected on the wire.
    #[must_use]
    #[inline]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    /// Looks up the code for a numeric value.
    #[must_use]
    pub const fn from_u8(value: u8) -> Option<Self> {
        Some(match value {
            0 => Self::Data,
            1 => Self::ErrorXfer,
            2 => Self::Info,
            3 => Self::Error,
            4 => Self::Warning,
            5 => Self::ErrorSocket,
            6 => Self::Log,
            7 => Self::Client,
            8 => Self::ErrorUtf8,
            9 => Self::Redo,
            10 => Self::Stats,
            22 => Self::IoError,
            33 => Self::IoTimeout,
            42 => Self::NoOp,
            86 => Self::ErrorExit,
            100 => Self::Success,
            101 => Self::Deleted,
            102 => Self::NoSend,
            _ => return None,
        })
    }

    /// Returns `true` for codes that carry human-readable error text.
    #[must_use]
    pub const fn is_error(self) -> bool {
        matches!(
            self,
            Self::ErrorXfer | Self::Error | Self::ErrorSocket | Self::ErrorUtf8 | Self::ErrorExit
        )
    }
}

impl TryFrom<u8> for MessageCode {
    type Error = EnvelopeError;

    fn try_from(value: u8) -> Result<Self, EnvelopeError> {
        Self::from_u8(value).ok_or(EnvelopeError::UnknownMessageCode(value))
    }
}

/// Failures encountered while parsing or constructing multiplexed headers.
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum EnvelopeError {
    /// Fewer than [`HEADER_LEN`] bytes were available.
    #[error("multiplexed header truncated: expected {HEADER_LEN} bytes, got {actual}")]
    TruncatedHeader {
        /// Number of bytes that were available.
        actual: usize,
    },
    /// The tag byte was below the multiplex base offset.
    #[error("multiplexed header contained invalid tag byte {0}")]
    InvalidTag(u8),
    /// The tag named a message code this client does not know.
    #[error("unknown multiplexed message code {0}")]
    UnknownMessageCode(u8),
    /// The payload length does not fit in 24 bits.
    #[error("multiplexed payload length {0} exceeds maximum {MAX_PAYLOAD_LENGTH}")]
    OversizedPayload(u32),
}

impl From<EnvelopeError> for io::Error {
    fn from(err: EnvelopeError) -> Self {
        Self::new(io::ErrorKind::InvalidData, err)
    }
}

/// A decoded multiplexed header: a message code and a 24-bit payload length.
///
/// On the wire the header is a little-endian `u32` whose high byte is
/// `7 + code` and whose low three bytes are the payload length.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct MessageHeader {
    code: MessageCode,
    payload_len: u32,
}

impl MessageHeader {
    /// Creates a header for `code` with the provided payload length.
    pub const fn new(code: MessageCode, payload_len: u32) -> Result<Self, EnvelopeError> {
        if payload_len > MAX_PAYLOAD_LENGTH {
            return Err(EnvelopeError::OversizedPayload(payload_len));
        }

        Ok(Self { code, payload_len })
    }

    /// Parses a header from the beginning of `bytes`.
    pub fn decode(bytes: &[u8]) -> Result<Self, EnvelopeError> {
        if bytes.len() < HEADER_LEN {
            return Err(EnvelopeError::TruncatedHeader {
                actual: bytes.len(),
            });
        }

        let mut encoded = [0u8; HEADER_LEN];
        encoded.copy_from_slice(&bytes[..HEADER_LEN]);
        Self::from_raw(u32::from_le_bytes(encoded))
    }

    /// Interprets the raw 32-bit header value.
    pub const fn from_raw(raw: u32) -> Result<Self, EnvelopeError> {
        let tag = (raw >> 24) as u8;
        if tag < MPLEX_BASE {
            return Err(EnvelopeError::InvalidTag(tag));
        }

        let code_value = tag - MPLEX_BASE;
        match MessageCode::from_u8(code_value) {
            Some(code) => Self::new(code, raw & PAYLOAD_MASK),
            None => Err(EnvelopeError::UnknownMessageCode(code_value)),
        }
    }

    /// Encodes this header into its little-endian wire form.
    #[must_use]
    pub const fn encode(self) -> [u8; HEADER_LEN] {
        let tag = (MPLEX_BASE as u32) + (self.code as u32);
        ((tag << 24) | (self.payload_len & PAYLOAD_MASK)).to_le_bytes()
    }

    /// Returns the decoded message code.
    #[must_use]
    #[inline]
    pub const fn code(self) -> MessageCode {
        self.code
    }

    /// Returns the payload length encoded in the header.
    #[must_use]
    #[inline]
    pub const fn payload_len(self) -> u32 {
        self.payload_len
    }

    /// Returns the payload length as a `usize`.
    #[must_use]
    #[inline]
    pub const fn payload_len_usize(self) -> usize {
        self.payload_len as usize
    }
}
