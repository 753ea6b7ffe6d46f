#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! # Overview
//!
//! Checksum primitives for the rsync delta transfer.
//!
//! - [`RollingChecksum`] is the weak, O(1)-updatable block checksum (`rsum`)
//!   used to find candidate blocks while a window slides over a stream.
//! - [`strong::Md4`] is the 128-bit digest used both to verify weak hits and
//!   to compute whole-file sums and daemon authentication responses.
//!
//! # Examples
//!
//! ```
//! use checksums::RollingChecksum;
//!
//! let data = b"abcdefgh";
//! let mut rolling = RollingChecksum::new();
//! rolling.update(&data[..4]);
//! rolling.roll(data[0], data[4]).unwrap();
//!
//! assert_eq!(rolling.value(), RollingChecksum::of(&data[1..5]));
//! ```

mod rolling;
pub mod strong;

pub use rolling::{RollingChecksum, RollingError};
