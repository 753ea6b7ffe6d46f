#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! # Overview
//!
//! `logging` provides the diagnostics plumbing shared by the client engine.
//! Nothing in the workspace writes to a process-global logger; instead every
//! component that reports progress receives a [`LogContext`] from its caller
//! and emits [`LogEvent`]s through it.
//!
//! # Design
//!
//! A [`LogContext`] is a cheap, clonable handle around a shared [`LogSink`]
//! plus a maximum [`LogLevel`]. The default context discards everything, so
//! library code and tests never need to configure logging. [`MemorySink`]
//! keeps events in memory for assertions, and with the `tracing` feature
//! [`LogContext::tracing`] forwards events to the `tracing` crate using one
//! fixed target per [`Subsystem`] (`rsync::protocol`, `rsync::receiver`, ...).
//!
//! # Examples
//!
//! ```
//! use logging::{LogContext, LogLevel, MemorySink, Subsystem, log_info};
//!
//! let sink = MemorySink::new();
//! let ctx = LogContext::new(sink.clone());
//!
//! log_info!(ctx, Subsystem::Protocol, "server speaks {}.{}", 27, 0);
//!
//! let events = sink.events();
//! assert_eq!(events.len(), 1);
//! assert_eq!(events[0].level, LogLevel::Info);
//! assert_eq!(events[0].message, "server speaks 27.0");
//! ```

mod context;
mod levels;
mod macros;
mod memory;
#[cfg(feature = "tracing")]
mod tracing_bridge;

pub use context::{LogContext, LogEvent, LogSink, NoopSink};
pub use levels::{LogLevel, Subsystem};
pub use memory::{MemorySink, RecordedEvent};
#[cfg(feature = "tracing")]
pub use tracing_bridge::{TracingSink, init_tracing};
