//! Block sizing that mirrors upstream rsync's `sum_sizes_sqroot()` for
//! protocols before 30.

use std::num::NonZeroU32;
use std::ops::Range;

use crate::error::MatchError;

/// Block length used for files up to `BLOCK_SIZE²` bytes.
pub const BLOCK_SIZE: u32 = 700;

/// Largest block length accepted by protocol 27 peers.
pub const MAX_BLOCK_SIZE: u32 = 1 << 29;

/// How a reference file is partitioned into blocks.
///
/// Every block is `block_len` bytes except possibly the last, which holds
/// `remainder` bytes when the file length is not a multiple of the block
/// length.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct BlockLayout {
    block_len: NonZeroU32,
    remainder: u32,
    block_count: u64,
}

impl BlockLayout {
    /// Computes the layout for a file of `file_len` bytes.
    ///
    /// `forced` overrides the heuristic, as `--block-size` does.
    pub fn for_file(file_len: u64, forced: Option<NonZeroU32>) -> Result<Self, MatchError> {
        let block_len = match forced {
            Some(len) if len.get() > MAX_BLOCK_SIZE => {
                return Err(MatchError::InvalidBlockLength(u64::from(len.get())));
            }
            Some(len) => len.get(),
            None => derive_block_len(file_len),
        };
        Self::from_parts(file_len, block_len)
    }

    /// Builds the layout of a `file_len`-byte file cut into `block_len` blocks.
    pub fn from_parts(file_len: u64, block_len: u32) -> Result<Self, MatchError> {
        let block_len = NonZeroU32::new(block_len)
            .filter(|len| len.get() <= MAX_BLOCK_SIZE)
            .ok_or(MatchError::InvalidBlockLength(u64::from(block_len)))?;

        let len = u64::from(block_len.get());
        let remainder = (file_len % len) as u32;
        let block_count = file_len / len + u64::from(remainder != 0);
        if block_count > i32::MAX as u64 {
            return Err(MatchError::BlockCountOverflow {
                block_len: block_len.get(),
                blocks: block_count,
            });
        }

        Ok(Self {
            block_len,
            remainder,
            block_count,
        })
    }

    /// Nominal block length.
    #[must_use]
    pub const fn block_len(&self) -> u32 {
        self.block_len.get()
    }

    /// Length of the trailing short block, or 0 when every block is full.
    #[must_use]
    pub const fn remainder(&self) -> u32 {
        self.remainder
    }

    /// Number of blocks.
    #[must_use]
    pub const fn block_count(&self) -> u64 {
        self.block_count
    }

    /// Total bytes covered by the layout.
    #[must_use]
    pub const fn file_len(&self) -> u64 {
        if self.block_count == 0 {
            return 0;
        }
        let full = self.block_len.get() as u64;
        if self.remainder == 0 {
            self.block_count * full
        } else {
            (self.block_count - 1) * full + self.remainder as u64
        }
    }

    /// Actual length of block `index`, accounting for the short final block.
    pub fn len_of(&self, index: u64) -> Result<u32, MatchError> {
        self.check(index)?;
        if index + 1 == self.block_count && self.remainder != 0 {
            Ok(self.remainder)
        } else {
            Ok(self.block_len.get())
        }
    }

    /// Byte range covered by block `index`.
    pub fn range_of(&self, index: u64) -> Result<Range<u64>, MatchError> {
        let len = self.len_of(index)?;
        let start = index * u64::from(self.block_len.get());
        Ok(start..start + u64::from(len))
    }

    fn check(&self, index: u64) -> Result<(), MatchError> {
        if index < self.block_count {
            Ok(())
        } else {
            Err(MatchError::BlockOutOfRange {
                index,
                count: self.block_count,
            })
        }
    }
}

fn derive_block_len(file_len: u64) -> u32 {
    let base = u64::from(BLOCK_SIZE);
    if file_len <= base * base {
        return BLOCK_SIZE;
    }

    let mut c: u64 = 1;
    let mut l = file_len;
    while l >> 2 != 0 {
        c <<= 1;
        l >>= 2;
    }
    if c >= u64::from(MAX_BLOCK_SIZE) {
        return MAX_BLOCK_SIZE;
    }

    let mut block_len = 0u64;
    while c >= 8 {
        block_len |= c;
        if u128::from(file_len) < u128::from(block_len) * u128::from(block_len) {
            block_len &= !c;
        }
        c >>= 1;
    }
    block_len.max(base) as u32
}
