//! Decodes the sender's per-file replies and rebuilds each file.
//!
//! Stream errors are fatal to the session. Local errors (an unreadable
//! reference, a full spool, a checksum mismatch) only fail the file, and the
//! rest of its reply is still consumed so the stream stays in step.

use std::io::{self, Read, Seek, SeekFrom, Write};

use checksums::strong::{MD4_DIGEST_LEN, Md4, Md4Seed};
use logging::{LogContext, Subsystem, log_debug, log_error, log_info};
use matching::{BlockLayout, DeltaInstruction, ReferenceSource};
use protocol::flist::{FileEntry, FileList};
use protocol::wire::{CHUNK_SIZE, DeltaToken, SumHead, read_int, read_token};
use tempfile::SpooledTempFile;

use super::outcome::TransferSummary;
use crate::error::{ClientError, FileFailure};
use crate::storage::{FileMetadata, ReferenceProvider, StorageSink};

/// Files up to this size are rebuilt in memory; larger ones spill to disk.
const SPOOL_LIMIT: usize = 8 << 20;

/// What the reply loop needs besides the stream and the sink.
pub(crate) struct ReplyContext<'a> {
    pub(crate) remote: &'a FileList,
    pub(crate) references: &'a dyn ReferenceProvider,
    pub(crate) seed: i32,
    pub(crate) log: &'a LogContext,
}

struct Rebuilt {
    data: SpooledTempFile,
    literal: u64,
    matched: u64,
}

/// Spool that hashes everything written to it.
struct HashingSpool {
    file: SpooledTempFile,
    hasher: Md4,
}

impl Write for HashingSpool {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let written = self.file.write(buf)?;
        self.hasher.update(&buf[..written]);
        Ok(written)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()
    }
}

/// Consumes replies until the sender's end-of-phase marker, storing every
/// file that verifies.
pub(crate) fn receive_replies<R, S>(
    reader: &mut R,
    ctx: &ReplyContext<'_>,
    sink: &mut S,
    summary: &mut TransferSummary,
) -> Result<(), ClientError>
where
    R: Read + ?Sized,
    S: StorageSink + ?Sized,
{
    loop {
        let index = read_int(reader)?;
        if index == -1 {
            return Ok(());
        }
        let entry = usize::try_from(index)
            .ok()
            .and_then(|i| ctx.remote.get(i))
            .ok_or_else(|| ClientError::protocol(format!("reply for unknown file index {index}")))?;
        let head = SumHead::read(reader)?;
        log_debug!(ctx.log, Subsystem::Receiver, "receiving {} ({index})", entry.path());

        let rebuilt = match receive_file(reader, entry, &head, ctx)? {
            Ok(rebuilt) => rebuilt,
            Err(err) => {
                log_error!(ctx.log, Subsystem::Receiver, "{}: {err}", entry.path());
                summary.failures.push(FileFailure::new(entry.path(), err));
                continue;
            }
        };
        summary.literal_bytes += rebuilt.literal;
        summary.matched_bytes += rebuilt.matched;
        store(sink, entry, rebuilt.data, ctx.log, summary);
    }
}

fn store<S: StorageSink + ?Sized>(
    sink: &mut S,
    entry: &FileEntry,
    mut data: SpooledTempFile,
    log: &LogContext,
    summary: &mut TransferSummary,
) {
    let metadata = FileMetadata::of(entry);
    match sink.write(entry.path(), &mut data, entry.size(), metadata) {
        Ok(written) => {
            log_info!(log, Subsystem::Receiver, "{} ({written} bytes)", entry.path());
            summary.transferred += 1;
        }
        Err(err) => {
            log_error!(log, Subsystem::Io, "{}: {err}", entry.path());
            summary.failures.push(FileFailure::new(entry.path(), err));
        }
    }
}

/// Reads one file's delta tokens and whole-file sum.
///
/// The outer error ends the session; the inner one fails only this file.
fn receive_file<R: Read + ?Sized>(
    reader: &mut R,
    entry: &FileEntry,
    head: &SumHead,
    ctx: &ReplyContext<'_>,
) -> Result<Result<Rebuilt, io::Error>, ClientError> {
    let layout = block_layout(head)?;
    let mut failure: Option<io::Error> = None;
    let reference: Option<Box<dyn ReferenceSource>> = match layout {
        None => None,
        Some(_) => match ctx.references.open(entry.path()) {
            Ok(Some(reference)) => Some(reference),
            Ok(None) => {
                failure = Some(io::Error::new(
                    io::ErrorKind::NotFound,
                    "local copy disappeared during the transfer",
                ));
                None
            }
            Err(err) => {
                failure = Some(err);
                None
            }
        },
    };

    let mut out = HashingSpool {
        file: SpooledTempFile::new(SPOOL_LIMIT),
        hasher: Md4::with_seed(Md4Seed::prefix(ctx.seed)),
    };
    let mut literal = 0u64;
    let mut matched = 0u64;
    let mut buf = vec![0u8; CHUNK_SIZE];

    loop {
        match read_token(reader)? {
            DeltaToken::End => break,
            DeltaToken::Literal(len) => {
                literal += len as u64;
                let mut remaining = len;
                while remaining > 0 {
                    let chunk = remaining.min(buf.len());
                    reader.read_exact(&mut buf[..chunk])?;
                    if failure.is_none()
                        && let Err(err) = out.write_all(&buf[..chunk])
                    {
                        failure = Some(err);
                    }
                    remaining -= chunk;
                }
            }
            DeltaToken::Block(index) => {
                let layout = layout.as_ref().ok_or_else(|| {
                    ClientError::protocol(format!(
                        "{}: block {index} sent for a file requested whole",
                        entry.path()
                    ))
                })?;
                let range = layout.range_of(u64::from(index))?;
                matched += range.end - range.start;
                if failure.is_none()
                    && let Some(reference) = reference.as_deref()
                {
                    let copy = DeltaInstruction::Copy {
                        start: range.start,
                        end: range.end,
                    };
                    if let Err(err) = copy.apply(reference, &mut out) {
                        failure = Some(err);
                    }
                }
            }
        }
    }

    let mut expected = [0u8; MD4_DIGEST_LEN];
    reader.read_exact(&mut expected)?;

    if let Some(err) = failure {
        return Ok(Err(err));
    }
    let HashingSpool { mut file, hasher } = out;
    if hasher.finalize() != expected {
        return Ok(Err(io::Error::new(
            io::ErrorKind::InvalidData,
            "whole-file checksum mismatch",
        )));
    }
    if let Err(err) = file.seek(SeekFrom::Start(0)) {
        return Ok(Err(err));
    }
    Ok(Ok(Rebuilt {
        data: file,
        literal,
        matched,
    }))
}

/// Block geometry of the echoed head, or `None` for a whole-file request.
fn block_layout(head: &SumHead) -> Result<Option<BlockLayout>, ClientError> {
    if head.count == 0 {
        return Ok(None);
    }
    let block_len = head.block_len as u64;
    let last = if head.remainder == 0 {
        block_len
    } else {
        head.remainder as u64
    };
    let file_len = (head.count as u64 - 1) * block_len + last;
    let layout = BlockLayout::from_parts(file_len, head.block_len as u32)?;
    Ok(Some(layout))
}
