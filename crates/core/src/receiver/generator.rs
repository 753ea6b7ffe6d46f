//! Writes one request per wanted file: its index and the block signature of
//! the local copy.

use std::io::{BufWriter, Write};
use std::num::NonZeroU32;
use std::sync::atomic::{AtomicBool, Ordering};

use checksums::strong::{MD4_DIGEST_LEN, Md4Seed};
use logging::{LogContext, Subsystem, log_debug, log_warn};
use matching::{BlockLayout, BlockTable, MatchError, ReferenceSource};
use protocol::flist::FileList;
use protocol::wire::{SignatureBlock, SumHead, write_int, write_signature};

use crate::error::ClientError;
use crate::storage::ReferenceProvider;

/// How block signatures are computed for this session.
#[derive(Clone, Copy, Debug)]
pub(crate) struct SignatureParams {
    pub(crate) seed: Md4Seed,
    pub(crate) block_size: Option<NonZeroU32>,
}

/// Sends a request for every index in `requests`, then the end-of-phase
/// marker.
///
/// A local copy that cannot be read is logged and requested in full. Once
/// `stop` is set no further request is started and the marker is not sent.
pub(crate) fn write_requests<W: Write>(
    writer: W,
    remote: &FileList,
    requests: &[usize],
    references: &dyn ReferenceProvider,
    params: SignatureParams,
    stop: &AtomicBool,
    log: &LogContext,
) -> Result<(), ClientError> {
    let mut out = BufWriter::new(writer);
    for &index in requests {
        if stop.load(Ordering::Acquire) {
            log_debug!(log, Subsystem::Generator, "stopping requests at index {index}");
            return Ok(());
        }
        let entry = remote
            .get(index)
            .ok_or_else(|| ClientError::protocol(format!("no file-list entry {index}")))?;
        let wire_index = i32::try_from(index)
            .map_err(|_| ClientError::protocol(format!("file index {index} out of range")))?;

        let described = references
            .open(entry.path())
            .map_err(MatchError::from)
            .and_then(|reference| match reference {
                Some(reference) => signature(&*reference, params),
                None => Ok((SumHead::empty(), Vec::new())),
            });
        let (head, blocks) = described.unwrap_or_else(|err| {
            log_warn!(log, Subsystem::Generator, "{}: {err}; requesting whole file", entry.path());
            (SumHead::empty(), Vec::new())
        });
        log_debug!(
            log,
            Subsystem::Generator,
            "request {index} {} with {} blocks of {}",
            entry.path(),
            head.count,
            head.block_len
        );

        write_int(&mut out, wire_index)?;
        write_signature(&mut out, &head, &blocks)?;
        out.flush()?;
    }
    write_int(&mut out, -1)?;
    out.flush()?;
    Ok(())
}

fn signature(
    reference: &dyn ReferenceSource,
    params: SignatureParams,
) -> Result<(SumHead, Vec<SignatureBlock>), MatchError> {
    if reference.is_empty() {
        return Ok((SumHead::empty(), Vec::new()));
    }
    let layout = BlockLayout::for_file(reference.len(), params.block_size)?;
    let table = BlockTable::build(reference, layout, params.seed)?;

    let head = SumHead {
        count: layout.block_count() as i32,
        block_len: layout.block_len() as i32,
        strong_len: MD4_DIGEST_LEN as i32,
        remainder: layout.remainder() as i32,
    };
    let blocks = table
        .blocks()
        .iter()
        .map(|block| SignatureBlock {
            rolling_sum: block.weak,
            strong_sum: block.strong.to_vec(),
        })
        .collect();
    Ok((head, blocks))
}
