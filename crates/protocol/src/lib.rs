#![deny(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(missing_docs)]

//! Wire primitives for the client side of the rsync protocol.
//!
//! The crate only knows how bytes are laid out on the wire. It never decides
//! when to read or write; sequencing lives in `rsync_core`. The pieces are:
//!
//! - the `@RSYNCD:` text handshake ([`ProtocolVersion`], [`DaemonLine`]),
//! - the multiplexed envelope that carries every byte after the seed
//!   ([`MessageHeader`], [`send_msg`], [`MplexReader`]),
//! - the exclusion list sent after authentication ([`ExclusionList`]),
//! - the protocol 27 file list ([`flist`]),
//! - sum heads, block signatures and delta tokens ([`wire`]).
//!
//! # Examples
//!
//! Classify the lines a daemon sends after the module name:
//!
//! ```
//! use protocol::{DaemonLine, classify_daemon_line};
//!
//! assert_eq!(classify_daemon_line("@RSYNCD: OK\n").unwrap(), DaemonLine::Ok);
//! assert_eq!(
//!     classify_daemon_line("@RSYNCD: AUTHREQD 6iFc4xQzWnBd\n").unwrap(),
//!     DaemonLine::AuthRequired { challenge: "6iFc4xQzWnBd" }
//! );
//! ```
//!
//! Demultiplex an application stream:
//!
//! ```
//! use std::io::{Cursor, Read};
//! use protocol::{MessageCode, MplexReader, send_msg};
//!
//! let mut wire = Vec::new();
//! send_msg(&mut wire, MessageCode::Data, b"file ").unwrap();
//! send_msg(&mut wire, MessageCode::Info, b"hello from the daemon").unwrap();
//! send_msg(&mut wire, MessageCode::Data, b"list").unwrap();
//!
//! let mut reader = MplexReader::new(Cursor::new(wire));
//! let mut out = [0u8; 9];
//! reader.read_exact(&mut out).unwrap();
//! assert_eq!(&out, b"file list");
//! ```

mod envelope;
mod error;
mod filters;
pub mod flist;
mod legacy;
mod multiplex;
mod version;
pub mod wire;

pub use envelope::{EnvelopeError, HEADER_LEN, MAX_PAYLOAD_LENGTH, MessageCode, MessageHeader};
pub use error::NegotiationError;
pub use filters::{ExclusionList, read_exclusion_list, write_exclusion_list};
pub use legacy::{
    DaemonLine, ERROR_PREFIX, RSYNCD_AUTHREQD, RSYNCD_EXIT, RSYNCD_OK, RSYNCD_PREFIX,
    classify_daemon_line, format_greeting, parse_greeting,
};
pub use multiplex::{MessageFrame, MplexReader, recv_msg, send_msg};
pub use version::ProtocolVersion;
