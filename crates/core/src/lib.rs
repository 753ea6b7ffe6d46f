#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! # Overview
//!
//! `rsync_core` is the client engine that pulls a module (or a path inside
//! one) from a remote rsync daemon speaking protocol 27. It sequences the
//! wire primitives from the `protocol` crate, computes block signatures and
//! replays deltas with the `matching` crate, and persists results through a
//! caller-supplied [`StorageSink`].
//!
//! # Session flow
//!
//! 1. A [`Transport`] (TCP socket, [`RemoteShell`], or any reader/writer pair)
//!    is wrapped in a plain [`Connection`].
//! 2. [`negotiate_daemon`] (or [`negotiate_shell`]) exchanges versions,
//!    selects the module, answers `AUTHREQD` challenges and reads the seed.
//! 3. The connection is converted into a [`MuxConnection`]; from here on every
//!    read is demultiplexed and out-of-band messages reach the [`LogContext`].
//! 4. The exclusion list is sent and a [`Receiver`] is returned. Handshake
//!    failures never produce a receiver.
//! 5. [`Receiver::run`] pulls the file list, requests changed files, verifies
//!    every reconstructed file and writes it to the sink.
//!
//! # Examples
//!
//! ```no_run
//! use rsync_core::{ClientOptions, LocalDirSink, RsyncUrl, connect_daemon};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let url: RsyncUrl = "rsync://mirror.example.org/pub/releases".parse()?;
//! let mut receiver = connect_daemon(&url, ClientOptions::new())?;
//! let mut sink = LocalDirSink::create("/srv/mirror/releases")?;
//! let summary = receiver.run(&mut sink)?;
//! println!("{} files transferred", summary.transferred);
//! # Ok(())
//! # }
//! ```
//!
//! [`LogContext`]: logging::LogContext

mod address;
mod auth;
mod client;
mod connection;
mod error;
mod negotiate;
mod options;
mod receiver;
/// Storage sinks that persist received files.
pub mod storage;
mod transport;

pub use address::{AddressError, DEFAULT_PORT, RsyncUrl, trim_prepath};
pub use auth::{ClientAuth, RESPONSE_LEN, respond};
pub use client::{connect_daemon, connect_shell, handshake_daemon, handshake_shell};
pub use connection::{Connection, MuxConnection, PlainConnection, ReadMode, ReadPath};
pub use error::{ClientError, FileFailure};
pub use negotiate::{SessionParams, negotiate_daemon, negotiate_shell};
pub use options::{ClientOptions, DEFAULT_SERVER_ARGS};
pub use receiver::{Receiver, ReceiverState, TransferPlan, TransferStats, TransferSummary};
pub use storage::{FileMetadata, LocalDirSink, MemoryStorage, ReferenceProvider, StorageSink};
pub use transport::{RemoteShell, ShellReader, ShellWriter, ShutdownHandle, Transport};
