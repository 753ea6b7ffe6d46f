use checksums::RollingChecksum;
use checksums::strong::{MD4_DIGEST_LEN, Md4, Md4Seed};
use rustc_hash::FxHashMap;

use crate::error::MatchError;
use crate::layout::BlockLayout;
use crate::reference::ReferenceSource;

/// Weak and strong checksum of one reference block.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct BlockChecksum {
    /// Packed rolling checksum.
    pub weak: u32,
    /// Seeded MD4 digest, possibly truncated on the wire.
    pub strong: [u8; MD4_DIGEST_LEN],
}

/// Checksums of every block in a reference, indexed by weak checksum.
#[derive(Clone, Debug)]
pub struct BlockTable {
    layout: BlockLayout,
    seed: Md4Seed,
    strong_len: usize,
    blocks: Vec<BlockChecksum>,
    index: FxHashMap<u32, Vec<u32>>,
}

impl BlockTable {
    /// Reads `source` block by block and computes its checksums.
    pub fn build<S>(source: &S, layout: BlockLayout, seed: Md4Seed) -> Result<Self, MatchError>
    where
        S: ReferenceSource + ?Sized,
    {
        let expected = layout.file_len();
        if source.len() < expected {
            return Err(MatchError::ReferenceTooShort {
                expected,
                actual: source.len(),
            });
        }

        let mut blocks = Vec::with_capacity(layout.block_count() as usize);
        let mut buf = vec![0u8; layout.block_len() as usize];
        for index in 0..layout.block_count() {
            let range = layout.range_of(index)?;
            let block = &mut buf[..(range.end - range.start) as usize];
            source.read_at(range.start, block)?;
            blocks.push(BlockChecksum {
                weak: RollingChecksum::of(block),
                strong: Md4::digest_with_seed(seed, block),
            });
        }

        Self::from_checksums(layout, seed, MD4_DIGEST_LEN, blocks)
    }

    /// Assembles a table from checksums received from a peer.
    ///
    /// Only the first `strong_len` bytes of each strong sum take part in
    /// verification.
    pub fn from_checksums(
        layout: BlockLayout,
        seed: Md4Seed,
        strong_len: usize,
        blocks: Vec<BlockChecksum>,
    ) -> Result<Self, MatchError> {
        if blocks.len() as u64 != layout.block_count() {
            return Err(MatchError::BlockOutOfRange {
                index: blocks.len() as u64,
                count: layout.block_count(),
            });
        }

        let mut index: FxHashMap<u32, Vec<u32>> = FxHashMap::default();
        for (i, block) in blocks.iter().enumerate() {
            index.entry(block.weak).or_default().push(i as u32);
        }

        Ok(Self {
            layout,
            seed,
            strong_len: strong_len.clamp(1, MD4_DIGEST_LEN),
            blocks,
            index,
        })
    }

    /// Block indices whose weak checksum equals `weak`, in ascending order.
    #[must_use]
    pub fn candidates(&self, weak: u32) -> &[u32] {
        self.index.get(&weak).map_or(&[], Vec::as_slice)
    }

    /// Checksums of block `index`.
    #[must_use]
    pub fn block(&self, index: u32) -> Option<&BlockChecksum> {
        self.blocks.get(index as usize)
    }

    /// All block checksums in file order.
    #[must_use]
    pub fn blocks(&self) -> &[BlockChecksum] {
        &self.blocks
    }

    /// Layout the table was built against.
    #[must_use]
    pub const fn layout(&self) -> &BlockLayout {
        &self.layout
    }

    /// Seed applied to strong sums.
    #[must_use]
    pub const fn seed(&self) -> Md4Seed {
        self.seed
    }

    /// Number of strong-sum bytes compared during verification.
    #[must_use]
    pub const fn strong_len(&self) -> usize {
        self.strong_len
    }

    /// Returns `true` when the reference has no blocks.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Seeded strong sum of `window`, computed the way block sums were.
    #[must_use]
    pub fn strong_sum(&self, window: &[u8]) -> [u8; MD4_DIGEST_LEN] {
        Md4::digest_with_seed(self.seed, window)
    }

    /// Compares a strong sum against block `index`.
    #[must_use]
    pub fn verify(&self, index: u32, strong: &[u8; MD4_DIGEST_LEN]) -> bool {
        self.block(index)
            .is_some_and(|block| block.strong[..self.strong_len] == strong[..self.strong_len])
    }
}
