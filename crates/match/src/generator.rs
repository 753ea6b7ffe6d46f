//! Rolling-window block matcher.
//!
//! The matcher slides a window of one block length across the new data. A
//! weak checksum hit is confirmed with the seeded strong sum before any copy
//! is emitted, and bytes that never fall inside a confirmed block become
//! literals. Once the window reaches the end of the data it shrinks one byte
//! at a time so the reference's short final block can still match.

use checksums::RollingChecksum;
use checksums::strong::MD4_DIGEST_LEN;

use crate::error::MatchError;
use crate::reference::ReferenceSource;
use crate::script::DeltaScript;
use crate::table::BlockTable;

/// Tuning knobs for [`Matcher`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct MatcherConfig {
    /// Upper bound on bytes compared per extension step after a block match.
    ///
    /// When a reference is attached, a matched copy keeps growing while the
    /// bytes following it agree with the bytes following the block in the
    /// reference. Zero disables extension so every copy stays block aligned.
    pub extension_cap: usize,
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self { extension_cap: 256 }
    }
}

/// Finds the blocks of a [`BlockTable`] inside new data.
pub struct Matcher<'a> {
    table: &'a BlockTable,
    reference: Option<&'a dyn ReferenceSource>,
    config: MatcherConfig,
}

impl std::fmt::Debug for Matcher<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Matcher")
            .field("blocks", &self.table.blocks().len())
            .field("has_reference", &self.reference.is_some())
            .field("config", &self.config)
            .finish()
    }
}

impl<'a> Matcher<'a> {
    /// Creates a matcher that only knows the block checksums.
    ///
    /// This is the sender's view: copies are whole blocks.
    #[must_use]
    pub fn new(table: &'a BlockTable) -> Self {
        Self {
            table,
            reference: None,
            config: MatcherConfig::default(),
        }
    }

    /// Attaches the reference bytes so matches can be extended past block
    /// boundaries.
    #[must_use]
    pub fn with_reference(mut self, reference: &'a dyn ReferenceSource) -> Self {
        self.reference = Some(reference);
        self
    }

    /// Replaces the configuration.
    #[must_use]
    pub const fn with_config(mut self, config: MatcherConfig) -> Self {
        self.config = config;
        self
    }

    /// Produces the script that rebuilds `input` from the reference.
    pub fn find_matches(&self, input: &[u8]) -> Result<DeltaScript, MatchError> {
        let mut script = DeltaScript::new();
        if self.table.is_empty() || input.is_empty() {
            script.push_literal(input);
            return Ok(script);
        }

        let layout = self.table.layout();
        let block_len = layout.block_len() as usize;
        let mut extension = vec![0u8; self.config.extension_cap];

        let mut pos = 0usize;
        let mut literal_start = 0usize;
        let mut previous_end: Option<u64> = None;
        let mut rolling = RollingChecksum::new();
        rolling.update(&input[..block_len.min(input.len())]);

        while pos < input.len() {
            let window_len = rolling.len();
            let window = &input[pos..pos + window_len];
            if let Some(index) = self.lookup(rolling.value(), window, previous_end)? {
                script.push_literal(&input[literal_start..pos]);

                let range = layout.range_of(u64::from(index))?;
                let mut end = range.end;
                pos += window_len;
                if let Some(reference) = self.reference {
                    while !extension.is_empty() {
                        let grown = extend(reference, end, &input[pos..], &mut extension)?;
                        end += grown as u64;
                        pos += grown;
                        if grown < extension.len() {
                            break;
                        }
                    }
                }

                script.push_copy(range.start, end);
                previous_end = Some(end);
                literal_start = pos;
                rolling.update_from_block(&input[pos..(pos + block_len).min(input.len())]);
                continue;
            }

            if pos + window_len < input.len() {
                rolling.roll(input[pos], input[pos + window_len])?;
            } else {
                rolling.roll_out(input[pos])?;
            }
            pos += 1;
        }

        script.push_literal(&input[literal_start..]);
        Ok(script)
    }

    /// Picks the verified block matching `window`, preferring the block that
    /// continues the previous copy.
    fn lookup(
        &self,
        weak: u32,
        window: &[u8],
        previous_end: Option<u64>,
    ) -> Result<Option<u32>, MatchError> {
        let layout = self.table.layout();
        let mut candidates = Vec::new();
        for &index in self.table.candidates(weak) {
            if layout.len_of(u64::from(index))? as usize == window.len() {
                candidates.push(index);
            }
        }
        if candidates.is_empty() {
            return Ok(None);
        }

        let strong: [u8; MD4_DIGEST_LEN] = self.table.strong_sum(window);
        let block_len = u64::from(layout.block_len());
        let contiguous = previous_end
            .filter(|end| end % block_len == 0)
            .and_then(|end| u32::try_from(end / block_len).ok())
            .filter(|next| candidates.contains(next) && self.table.verify(*next, &strong));
        if contiguous.is_some() {
            return Ok(contiguous);
        }

        Ok(candidates
            .into_iter()
            .find(|&index| self.table.verify(index, &strong)))
    }
}

fn extend(
    reference: &dyn ReferenceSource,
    offset: u64,
    input: &[u8],
    buf: &mut [u8],
) -> Result<usize, MatchError> {
    let available = reference.len().saturating_sub(offset);
    let want = buf.len().min(input.len()).min(usize::try_from(available).unwrap_or(usize::MAX));
    if want == 0 {
        return Ok(0);
    }
    reference.read_at(offset, &mut buf[..want])?;
    Ok(longest_match(&buf[..want], &input[..want], want))
}

/// Length of the common prefix of `left` and `right`, capped at `cap`.
#[must_use]
pub fn longest_match(left: &[u8], right: &[u8], cap: usize) -> usize {
    left.iter()
        .zip(right)
        .take(cap)
        .take_while(|(a, b)| a == b)
        .count()
}
