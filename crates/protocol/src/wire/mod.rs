//! Fixed-width integers, block signatures and delta tokens.
//!
//! Protocol 27 predates varints: every integer is a 4-byte little-endian
//! value and 64-bit sizes use the `longint` escape.

mod delta;
mod int;
mod signature;

pub use delta::{
    CHUNK_SIZE, DeltaToken, read_token, write_token_block, write_token_end, write_token_literal,
};
pub use int::{read_byte, read_int, read_longint, write_byte, write_int, write_longint};
pub use signature::{
    MAX_BLOCK_LEN, MAX_STRONG_LEN, SignatureBlock, SumHead, read_signature, write_signature,
};
