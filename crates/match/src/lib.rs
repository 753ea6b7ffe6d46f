#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! Block matching and delta replay for rsync transfers.
//!
//! - [`BlockLayout`] splits a reference file into fixed-size blocks using
//!   rsync's square-root heuristic.
//! - [`BlockTable`] holds the weak and strong checksum of every block and an
//!   index from weak checksum to candidate blocks.
//! - [`Matcher`] slides a window over new data and emits a [`DeltaScript`] of
//!   copy ranges and literal runs.
//! - [`DeltaScript::replay`] rebuilds the new data from a
//!   [`ReferenceSource`] and the script.
//!
//! # Examples
//!
//! ```
//! use checksums::strong::Md4Seed;
//! use matching::{BlockLayout, BlockTable, Matcher};
//!
//! let reference: Vec<u8> = (0..4000u32).map(|i| (i % 251) as u8).collect();
//! let layout = BlockLayout::for_file(reference.len() as u64, None).unwrap();
//! let table = BlockTable::build(&reference, layout, Md4Seed::prefix(7)).unwrap();
//!
//! let script = Matcher::new(&table)
//!     .with_reference(&reference)
//!     .find_matches(&reference)
//!     .unwrap();
//! assert_eq!(script.literal_bytes(), 0);
//! assert_eq!(script.instructions().len(), 1);
//!
//! let mut rebuilt = Vec::new();
//! script.replay(&reference, &mut rebuilt).unwrap();
//! assert_eq!(rebuilt, reference);
//! ```

mod error;
mod generator;
mod layout;
mod reference;
mod script;
mod table;

pub use error::MatchError;
pub use generator::{Matcher, MatcherConfig, longest_match};
pub use layout::{BLOCK_SIZE, BlockLayout, MAX_BLOCK_SIZE};
pub use reference::{FileReference, ReferenceSource};
pub use script::{DeltaInstruction, DeltaScript};
pub use table::{BlockChecksum, BlockTable};
