//! Strong checksum implementations.
//!
//! Protocol 27 sessions use MD4 everywhere a strong digest is needed: block
//! verification, the whole-file sum sent after each transfer and the daemon
//! challenge response.

mod md4;

pub use md4::{MD4_DIGEST_LEN, Md4, Md4Seed, SeedOrder};
