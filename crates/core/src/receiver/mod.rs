//! The receiving half of a pull: file list, requests, replies, teardown.
//!
//! After the handshake the session runs two cooperating flows over one
//! connection. The generator thread owns the write half and sends one
//! request per wanted file; the calling thread owns the read half and
//! rebuilds every reply. Both flows end with the same `-1` marker, which is
//! then exchanged once more before the sender's totals arrive.

mod generator;
mod outcome;
mod plan;
mod receive;

use std::io::{self, Read, Write};
use std::panic;
use std::sync::OnceLock;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

use checksums::strong::Md4Seed;
use logging::{LogContext, Subsystem, log_debug, log_error, log_info, log_warn};
use protocol::flist::{FileEntry, FileKind, FileList, read_file_list};
use protocol::wire::read_longint;
#[cfg(feature = "tracing")]
use tracing::instrument;

pub use outcome::{TransferStats, TransferSummary};
pub use plan::TransferPlan;

use self::generator::{SignatureParams, write_requests};
use self::receive::{ReplyContext, receive_replies};
use crate::connection::MuxConnection;
use crate::error::{ClientError, FileFailure};
use crate::negotiate::SessionParams;
use crate::options::ClientOptions;
use crate::storage::{FileMetadata, StorageSink};
use crate::transport::ShutdownHandle;

/// Where a session stands.
///
/// A [`Receiver`] is only ever handed out in [`ReceiverState::ExclusionsSent`];
/// the earlier states are reported by the handshake functions' logging.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ReceiverState {
    /// Transport is open.
    Connected,
    /// Versions, module and seed are settled.
    Handshaken,
    /// Exclusion list is on the wire.
    ExclusionsSent,
    /// Remote file list has been read.
    FileListReceived,
    /// Requests and replies are in flight.
    Transferring,
    /// Teardown finished.
    Done,
}

/// A negotiated session, ready to pull the file list and the files.
pub struct Receiver<R, W> {
    conn: MuxConnection<R, W>,
    session: SessionParams,
    options: ClientOptions,
    shutdown: Option<ShutdownHandle>,
    state: ReceiverState,
}

impl<R, W> std::fmt::Debug for Receiver<R, W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Receiver")
            .field("session", &self.session)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl<R: Read, W: Write + Send> Receiver<R, W> {
    pub(crate) fn new(
        conn: MuxConnection<R, W>,
        session: SessionParams,
        options: ClientOptions,
        shutdown: Option<ShutdownHandle>,
    ) -> Self {
        Self {
            conn,
            session,
            options,
            shutdown,
            state: ReceiverState::ExclusionsSent,
        }
    }

    /// Handshake results.
    #[must_use]
    pub fn session(&self) -> &SessionParams {
        &self.session
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> ReceiverState {
        self.state
    }

    /// Runs the transfer into `sink`.
    ///
    /// Per-file problems (an unreadable local copy, a checksum mismatch, a
    /// refused write) are collected in [`TransferSummary::failures`] and the
    /// transfer continues. Stream and protocol errors abort it; the sink may
    /// then hold some files already, but never a partially written one.
    ///
    /// # Errors
    ///
    /// [`ClientError::Protocol`] when the sender violates the protocol or
    /// this receiver has already run, and [`ClientError::Io`] when the
    /// stream fails or listing the sink fails.
    #[cfg_attr(feature = "tracing", instrument(skip_all, fields(module = %self.session.module())))]
    pub fn run<S: StorageSink + ?Sized>(
        &mut self,
        sink: &mut S,
    ) -> Result<TransferSummary, ClientError> {
        if self.state != ReceiverState::ExclusionsSent {
            return Err(ClientError::protocol(format!(
                "receiver cannot run in state {:?}",
                self.state
            )));
        }
        let log = self.options.log().clone();

        let (remote, io_error) = read_file_list(&mut self.conn)?;
        self.state = ReceiverState::FileListReceived;
        log_info!(log, Subsystem::Flist, "received {} entries", remote.len());
        if io_error != 0 {
            log_warn!(log, Subsystem::Flist, "sender reported I/O errors building the list");
        }

        let local = sink.list()?;
        let plan = TransferPlan::build(&remote, &local, self.options.delete_extraneous());
        log_debug!(
            log,
            Subsystem::Generator,
            "{} to request, {} to create, {} up to date, {} to delete",
            plan.requests().len(),
            plan.metadata_only().len(),
            plan.skipped().len(),
            plan.deletions().len()
        );

        let mut summary = TransferSummary {
            skipped: plan.skipped().len(),
            ..TransferSummary::default()
        };
        create_entries(sink, &remote, plan.metadata_only(), &mut summary, &log);

        self.state = ReceiverState::Transferring;
        self.transfer(sink, &remote, &plan, &mut summary)?;
        summary.stats = self.teardown()?;

        for path in plan.deletions() {
            match sink.delete(path) {
                Ok(()) => {
                    log_info!(log, Subsystem::Receiver, "deleting {path}");
                    summary.deleted += 1;
                }
                Err(err) => {
                    log_error!(log, Subsystem::Io, "cannot delete {path}: {err}");
                    summary.failures.push(FileFailure::new(path.as_str(), err));
                }
            }
        }
        sink.finish()?;
        self.state = ReceiverState::Done;
        Ok(summary)
    }

    /// Runs the generator thread against the reply loop until both have
    /// seen their end-of-phase marker.
    ///
    /// When one side fails the other is stopped, closing the stream if the
    /// transport allows it, and the first failure is returned.
    fn transfer<S: StorageSink + ?Sized>(
        &mut self,
        sink: &mut S,
        remote: &FileList,
        plan: &TransferPlan,
        summary: &mut TransferSummary,
    ) -> Result<(), ClientError> {
        let seed = self.session.seed();
        let block_seed = if self.session.protocol().uses_legacy_block_seed() {
            Md4Seed::legacy(seed)
        } else {
            Md4Seed::prefix(seed)
        };
        let params = SignatureParams {
            seed: block_seed,
            block_size: self.options.block_size(),
        };
        let references = sink.references();
        let log = self.options.log();
        let tripwire = Tripwire::new(self.shutdown.as_ref());
        let (reader, writer) = self.conn.split_mut();

        thread::scope(|scope| {
            let generator = scope.spawn(|| {
                let result = write_requests(
                    writer,
                    remote,
                    plan.requests(),
                    &*references,
                    params,
                    &tripwire.stop,
                    log,
                );
                if result.is_err() {
                    tripwire.trip(Side::Generator, log);
                }
                result
            });
            let ctx = ReplyContext {
                remote,
                references: &*references,
                seed,
                log,
            };
            let received = receive_replies(reader, &ctx, sink, summary);
            if received.is_err() {
                tripwire.trip(Side::Replies, log);
            }
            let generated = generator
                .join()
                .unwrap_or_else(|payload| panic::resume_unwind(payload));
            match tripwire.first.get() {
                Some(Side::Generator) => generated.and(received),
                _ => received.and(generated),
            }
        })
    }

    /// Closes both phases, reads the sender's totals and says goodbye.
    fn teardown(&mut self) -> Result<TransferStats, ClientError> {
        self.conn.write_int(-1)?;
        self.conn.flush()?;

        let index = self.conn.read_int()?;
        if index != -1 {
            return Err(ClientError::protocol(format!(
                "unexpected redo request for file index {index}"
            )));
        }

        let stats = TransferStats {
            total_written: read_longint(&mut self.conn)?,
            total_read: read_longint(&mut self.conn)?,
            total_size: read_longint(&mut self.conn)?,
        };
        log_debug!(
            self.options.log(),
            Subsystem::Receiver,
            "sent {} bytes, received {} bytes, total size {}",
            stats.total_written,
            stats.total_read,
            stats.total_size
        );

        self.conn.write_int(-1)?;
        self.conn.flush()?;
        Ok(stats)
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Side {
    Generator,
    Replies,
}

/// Remembers which half of a transfer failed first and stops the other.
struct Tripwire<'a> {
    first: OnceLock<Side>,
    stop: AtomicBool,
    shutdown: Option<&'a ShutdownHandle>,
}

impl<'a> Tripwire<'a> {
    fn new(shutdown: Option<&'a ShutdownHandle>) -> Self {
        Self {
            first: OnceLock::new(),
            stop: AtomicBool::new(false),
            shutdown,
        }
    }

    fn trip(&self, side: Side, log: &LogContext) {
        self.stop.store(true, Ordering::Release);
        if self.first.set(side).is_ok() {
            log_debug!(log, Subsystem::Receiver, "{side:?} failed; closing the transfer");
            if let Some(handle) = self.shutdown {
                handle.shutdown();
            }
        }
    }
}

/// Creates directories and symlinks, which need no file data.
fn create_entries<S: StorageSink + ?Sized>(
    sink: &mut S,
    remote: &FileList,
    indices: &[usize],
    summary: &mut TransferSummary,
    log: &LogContext,
) {
    for entry in indices.iter().filter_map(|&i| remote.get(i)) {
        match create_entry(sink, entry) {
            Ok(()) => {
                log_info!(log, Subsystem::Receiver, "{}", entry.path());
                summary.created += 1;
            }
            Err(err) => {
                log_error!(log, Subsystem::Io, "{}: {err}", entry.path());
                summary.failures.push(FileFailure::new(entry.path(), err));
            }
        }
    }
}

fn create_entry<S: StorageSink + ?Sized>(sink: &mut S, entry: &FileEntry) -> io::Result<()> {
    let metadata = FileMetadata::of(entry);
    match entry.kind() {
        FileKind::Symlink => {
            let target = entry.link_target().unwrap_or_default().as_bytes();
            sink.write(entry.path(), &mut &target[..], target.len() as u64, metadata)?;
        }
        _ => {
            sink.write(entry.path(), &mut io::empty(), 0, metadata)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::Connection;
    use crate::storage::MemoryStorage;
    use checksums::strong::Md4;
    use protocol::flist::{FileListWriter, S_IFDIR, S_IFLNK, S_IFREG};
    use protocol::wire::{
        SumHead, read_int, write_int, write_longint, write_token_end, write_token_literal,
    };
    use protocol::{MessageCode, ProtocolVersion, send_msg};
    use std::io::Cursor;
    use std::sync::mpsc;
    use std::sync::{Arc, Condvar, Mutex};
    use std::time::Duration;

    const SEED: i32 = 1234;

    fn session() -> SessionParams {
        SessionParams::for_tests("mod", "", SEED, ProtocolVersion::CLIENT)
    }

    /// Sender output for a list with one directory, one link and one file,
    /// whose content arrives as a single literal. `closing` is what the
    /// sender sends after the client ends the first phase.
    fn sender_script(content: &[u8], closing: i32) -> Vec<u8> {
        let entries = [
            FileEntry::new("d", 0, 5, S_IFDIR | 0o755),
            FileEntry::new("d/f", content.len() as u64, 7, S_IFREG | 0o644),
            FileEntry::new("l", 1, 9, S_IFLNK | 0o777).with_link_target("d/f"),
        ];
        let mut plain = Vec::new();
        let mut writer = FileListWriter::new();
        for entry in &entries {
            writer.write_entry(&mut plain, entry).unwrap();
        }
        writer.write_end(&mut plain, 0).unwrap();

        write_int(&mut plain, 1).unwrap();
        SumHead::empty().write(&mut plain).unwrap();
        write_token_literal(&mut plain, content).unwrap();
        write_token_end(&mut plain).unwrap();
        plain.extend_from_slice(&Md4::digest_with_seed(Md4Seed::prefix(SEED), content));
        write_int(&mut plain, -1).unwrap();

        // The sender reports what it read from us before what it wrote.
        write_int(&mut plain, closing).unwrap();
        write_longint(&mut plain, 100).unwrap();
        write_longint(&mut plain, 50).unwrap();
        write_longint(&mut plain, content.len() as i64).unwrap();

        let mut framed = Vec::new();
        send_msg(&mut framed, MessageCode::Data, &plain).unwrap();
        framed
    }

    fn receiver(wire: Vec<u8>, options: ClientOptions) -> Receiver<Cursor<Vec<u8>>, Vec<u8>> {
        let conn = Connection::new(Cursor::new(wire), Vec::new()).into_multiplexed(options.log());
        Receiver::new(conn, session(), options, None)
    }

    /// Gates a test stream the way a stalled peer would.
    #[derive(Clone, Default)]
    struct Gate(Arc<(Mutex<bool>, Condvar)>);

    impl Gate {
        fn open(&self) {
            let (open, changed) = &*self.0;
            *open.lock().unwrap() = true;
            changed.notify_all();
        }

        fn wait(&self) {
            let (open, changed) = &*self.0;
            let mut guard = open.lock().unwrap();
            while !*guard {
                guard = changed.wait(guard).unwrap();
            }
        }

        fn shutdown_handle(&self) -> ShutdownHandle {
            let gate = self.clone();
            ShutdownHandle::new(move || gate.open())
        }
    }

    /// Accepts `limit` bytes, then blocks until the gate opens and fails
    /// like a closed socket.
    struct StalledWriter {
        gate: Gate,
        limit: usize,
    }

    impl Write for StalledWriter {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            if self.limit > 0 {
                let n = buf.len().min(self.limit);
                self.limit -= n;
                return Ok(n);
            }
            self.gate.wait();
            Err(io::ErrorKind::BrokenPipe.into())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    /// Yields `data`, then blocks until the gate opens and reports the end
    /// of the stream.
    struct StalledReader {
        data: Cursor<Vec<u8>>,
        gate: Gate,
    }

    impl Read for StalledReader {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            let n = self.data.read(buf)?;
            if n == 0 && !buf.is_empty() {
                self.gate.wait();
            }
            Ok(n)
        }
    }

    /// A framed file list holding one regular file nobody has, followed by
    /// `replies`.
    fn list_then(replies: &[u8]) -> Vec<u8> {
        let mut plain = Vec::new();
        let mut writer = FileListWriter::new();
        writer
            .write_entry(&mut plain, &FileEntry::new("f", 4, 1, S_IFREG | 0o644))
            .unwrap();
        writer.write_end(&mut plain, 0).unwrap();
        plain.extend_from_slice(replies);

        let mut framed = Vec::new();
        send_msg(&mut framed, MessageCode::Data, &plain).unwrap();
        framed
    }

    fn run_with_deadline<F>(run: F) -> Result<TransferSummary, ClientError>
    where
        F: FnOnce() -> Result<TransferSummary, ClientError> + Send + 'static,
    {
        let (done, result) = mpsc::channel();
        thread::spawn(move || {
            let _ = done.send(run());
        });
        result
            .recv_timeout(Duration::from_secs(10))
            .expect("transfer did not return")
    }

    #[test]
    fn pulls_list_and_files_into_sink() {
        let mut receiver = receiver(sender_script(b"hello", -1), ClientOptions::new());
        let storage = MemoryStorage::new();

        let summary = receiver.run(&mut storage.clone()).unwrap();
        assert!(summary.is_complete());
        assert_eq!(summary.transferred, 1);
        assert_eq!(summary.created, 2);
        assert_eq!(
            summary.stats,
            TransferStats {
                total_written: 100,
                total_read: 50,
                total_size: 5
            }
        );
        assert_eq!(storage.paths(), ["d", "d/f", "l"]);
        assert_eq!(storage.get("d/f").unwrap().0, b"hello");
        assert_eq!(storage.get("l").unwrap().0, b"d/f");
        assert_eq!(receiver.state(), ReceiverState::Done);
    }

    #[test]
    fn client_writes_requests_then_phase_markers() {
        let mut receiver = receiver(sender_script(b"abc", -1), ClientOptions::new());
        receiver.run(&mut MemoryStorage::new()).unwrap();

        let (_, written) = receiver.conn.into_parts();
        let mut cursor = Cursor::new(written);
        assert_eq!(read_int(&mut cursor).unwrap(), 1);
        assert_eq!(SumHead::read(&mut cursor).unwrap(), SumHead::empty());
        assert_eq!(read_int(&mut cursor).unwrap(), -1);
        assert_eq!(read_int(&mut cursor).unwrap(), -1);
        assert_eq!(read_int(&mut cursor).unwrap(), -1);
        assert_eq!(cursor.position() as usize, cursor.get_ref().len());
    }

    #[test]
    fn second_run_is_rejected() {
        let mut receiver = receiver(sender_script(b"abc", -1), ClientOptions::new());
        receiver.run(&mut MemoryStorage::new()).unwrap();
        let err = receiver.run(&mut MemoryStorage::new()).unwrap_err();
        assert!(matches!(err, ClientError::Protocol(_)));
    }

    #[test]
    fn deletes_extraneous_entries_after_teardown() {
        let storage = MemoryStorage::new();
        storage.insert("stale", b"x".to_vec(), FileMetadata::new(1, S_IFREG | 0o644));
        let options = ClientOptions::new().with_delete_extraneous(true);
        let mut receiver = receiver(sender_script(b"abc", -1), options);

        let summary = receiver.run(&mut storage.clone()).unwrap();
        assert_eq!(summary.deleted, 1);
        assert!(storage.get("stale").is_none());
    }

    #[test]
    fn redo_request_is_a_protocol_error() {
        let framed = sender_script(b"abc", 0);
        let mut receiver = receiver(framed, ClientOptions::new());
        let err = receiver.run(&mut MemoryStorage::new()).unwrap_err();
        assert!(matches!(err, ClientError::Protocol(message) if message.contains("redo")));
    }

    #[test]
    fn failed_reply_unblocks_a_stalled_request_writer() {
        let gate = Gate::default();
        let result = run_with_deadline(move || {
            let mut unknown_index = Vec::new();
            write_int(&mut unknown_index, 99).unwrap();
            let writer = StalledWriter {
                gate: gate.clone(),
                limit: 8,
            };
            let options = ClientOptions::new();
            let conn = Connection::new(Cursor::new(list_then(&unknown_index)), writer)
                .into_multiplexed(options.log());
            let shutdown = Some(gate.shutdown_handle());
            Receiver::new(conn, session(), options, shutdown).run(&mut MemoryStorage::new())
        });
        assert!(matches!(result, Err(ClientError::Protocol(message)) if message.contains("99")));
    }

    #[test]
    fn failed_request_writer_unblocks_the_reply_loop() {
        let stalled_reads = Gate::default();
        let broken_pipe = Gate::default();
        broken_pipe.open();
        let result = run_with_deadline(move || {
            let reader = StalledReader {
                data: Cursor::new(list_then(&[])),
                gate: stalled_reads.clone(),
            };
            let writer = StalledWriter {
                gate: broken_pipe,
                limit: 0,
            };
            let options = ClientOptions::new();
            let conn = Connection::new(reader, writer).into_multiplexed(options.log());
            let shutdown = Some(stalled_reads.shutdown_handle());
            Receiver::new(conn, session(), options, shutdown).run(&mut MemoryStorage::new())
        });
        assert!(
            matches!(result, Err(ClientError::Io(err)) if err.kind() == io::ErrorKind::BrokenPipe)
        );
    }
}
