// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Per-connection ingest loop.
//!
//! # Operation
//!
//! 1. Read the next chunk (at most `max_chunk_size` bytes)
//! 2. End of stream closes the session
//! 3. Feed the chunk to the reassembler
//! 4. Hand every completed record to the sink as one batch, and wait for
//!    the sink before reading again
//! 5. Drop the connection if the unterminated tail outgrows `max_frame_size`

use crate::config::FramingOptions;
use crate::framing::{FramingError, Reassembler, Record};
use crate::shutdown::ShutdownSignal;
use crate::sink::RecordSink;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt};

/// Session errors. All of them end the connection.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("No data received for {0:?}")]
    IdleTimeout(Duration),

    #[error("Framing error: {0}")]
    Framing(#[from] FramingError),
}

/// Why a session ended without error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    /// The device closed its side of the stream
    EndOfStream,
    /// The server is shutting down
    Shutdown,
}

/// Session statistics
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SessionStats {
    /// Non-empty reads
    pub chunks_received: u64,
    /// Total bytes read
    pub bytes_received: u64,
    /// Records framed
    pub records_extracted: u64,
    /// Batches handed to the sink
    pub batches_dispatched: u64,
    /// Records the sink reported as written
    pub records_persisted: u64,
    /// Records the sink reported as dropped
    pub records_rejected: u64,
    /// Batches the sink failed outright
    pub sink_errors: u64,
}

/// Ingest loop for one connection.
///
/// Owns its transport and reassembler; only the sink is shared.
pub struct IngestSession<R> {
    reader: R,
    peer: SocketAddr,
    reassembler: Reassembler,
    sink: Arc<dyn RecordSink>,
    options: FramingOptions,
    read_buffer: Vec<u8>,
    stats: SessionStats,
}

impl<R: AsyncRead + Unpin> IngestSession<R> {
    /// Create a session reading from `reader`.
    pub fn new(
        reader: R,
        peer: SocketAddr,
        sink: Arc<dyn RecordSink>,
        options: FramingOptions,
    ) -> Self {
        Self {
            reader,
            peer,
            reassembler: Reassembler::with_capacity(options.delimiter, options.max_chunk_size),
            sink,
            options,
            read_buffer: vec![0u8; options.max_chunk_size],
            stats: SessionStats::default(),
        }
    }

    pub fn peer_addr(&self) -> SocketAddr {
        self.peer
    }

    pub fn stats(&self) -> &SessionStats {
        &self.stats
    }

    /// Bytes buffered for a record that has not been terminated yet.
    pub fn pending_bytes(&self) -> usize {
        self.reassembler.pending_len()
    }

    /// Run until end of stream, shutdown, or a transport/framing error.
    pub async fn run(&mut self, mut shutdown: ShutdownSignal) -> Result<CloseReason, SessionError> {
        loop {
            let n = tokio::select! {
                biased;
                _ = shutdown.wait() => {
                    tracing::debug!(peer = %self.peer, "Session shutting down");
                    return Ok(CloseReason::Shutdown);
                }
                read = self.read_chunk() => read?,
            };

            if n == 0 {
                if !self.reassembler.is_empty() {
                    tracing::debug!(
                        peer = %self.peer,
                        "Discarding {} bytes of unterminated record",
                        self.reassembler.pending_len()
                    );
                }
                return Ok(CloseReason::EndOfStream);
            }

            self.stats.chunks_received += 1;
            self.stats.bytes_received += n as u64;
            tracing::trace!(peer = %self.peer, "Received {} bytes", n);

            self.reassembler.append(&self.read_buffer[..n]);

            if self.reassembler.has_complete_record() {
                let records = self.reassembler.extract_complete();
                if !records.is_empty() {
                    self.dispatch(records).await;
                }
            }

            self.reassembler.ensure_within(self.options.max_frame_size)?;
        }
    }

    async fn read_chunk(&mut self) -> Result<usize, SessionError> {
        let read = self.reader.read(&mut self.read_buffer);

        match self.options.idle_timeout {
            Some(limit) => tokio::time::timeout(limit, read)
                .await
                .map_err(|_| SessionError::IdleTimeout(limit))?
                .map_err(SessionError::Io),
            None => read.await.map_err(SessionError::Io),
        }
    }

    /// Hand a batch to the sink and wait for it.
    ///
    /// Sink failures are logged and counted; the batch is not retried.
    async fn dispatch(&mut self, records: Vec<Record>) {
        let count = records.len();
        self.stats.records_extracted += count as u64;
        self.stats.batches_dispatched += 1;

        let sink = Arc::clone(&self.sink);
        let outcome = tokio::task::spawn_blocking(move || sink.persist(&records)).await;

        match outcome {
            Ok(Ok(report)) => {
                self.stats.records_persisted += report.persisted;
                self.stats.records_rejected += report.rejected;
                tracing::debug!(
                    peer = %self.peer,
                    "Batch of {} records: {} persisted, {} rejected",
                    count,
                    report.persisted,
                    report.rejected
                );
            }
            Ok(Err(e)) => {
                self.stats.sink_errors += 1;
                tracing::warn!(peer = %self.peer, "Failed to persist batch of {}: {:#}", count, e);
            }
            Err(e) => {
                self.stats.sink_errors += 1;
                tracing::error!(peer = %self.peer, "Sink task failed: {}", e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::SinkReport;
    use anyhow::anyhow;
    use std::sync::Mutex;
    use tokio::io::AsyncWriteExt;

    /// Records every batch it is given.
    #[derive(Default)]
    struct RecordingSink {
        batches: Mutex<Vec<Vec<String>>>,
    }

    impl RecordingSink {
        fn batches(&self) -> Vec<Vec<String>> {
            self.batches.lock().unwrap().clone()
        }
    }

    impl RecordSink for RecordingSink {
        fn persist(&self, batch: &[Record]) -> anyhow::Result<SinkReport> {
            let texts = batch
                .iter()
                .map(|r| String::from_utf8_lossy(r.as_bytes()).into_owned())
                .collect();
            self.batches.lock().unwrap().push(texts);
            Ok(SinkReport {
                persisted: batch.len() as u64,
                rejected: 0,
            })
        }
    }

    struct FailingSink;

    impl RecordSink for FailingSink {
        fn persist(&self, _batch: &[Record]) -> anyhow::Result<SinkReport> {
            Err(anyhow!("database unreachable"))
        }
    }

    fn options(max_chunk_size: usize, max_frame_size: usize) -> FramingOptions {
        FramingOptions {
            delimiter: b'#',
            max_chunk_size,
            max_frame_size,
            idle_timeout: None,
        }
    }

    fn peer() -> SocketAddr {
        "127.0.0.1:45001".parse().unwrap()
    }

    /// Write each chunk and wait until the session has consumed it, so every
    /// chunk arrives as its own read.
    async fn run_chunks(
        chunks: &[&str],
        sink: Arc<dyn RecordSink>,
        opts: FramingOptions,
    ) -> (Result<CloseReason, SessionError>, SessionStats) {
        let (mut client, server) = tokio::io::duplex(64);
        let mut session = IngestSession::new(server, peer(), sink, opts);

        let writer = async move {
            for chunk in chunks {
                client.write_all(chunk.as_bytes()).await.unwrap();
                client.flush().await.unwrap();
                tokio::time::sleep(Duration::from_millis(20)).await;
            }
            drop(client);
        };

        let (result, ()) = tokio::join!(session.run(ShutdownSignal::never()), writer);
        (result, session.stats().clone())
    }

    #[tokio::test]
    async fn test_records_across_reads() {
        let sink = Arc::new(RecordingSink::default());
        let (result, stats) = run_chunks(&["A#B", "#C#"], sink.clone(), options(64, 1024)).await;

        assert_eq!(result.unwrap(), CloseReason::EndOfStream);
        assert_eq!(sink.batches(), vec![vec!["A"], vec!["B", "C"]]);
        assert_eq!(stats.chunks_received, 2);
        assert_eq!(stats.records_extracted, 3);
        assert_eq!(stats.batches_dispatched, 2);
        assert_eq!(stats.records_persisted, 3);
    }

    #[tokio::test]
    async fn test_no_batch_without_delimiter() {
        let sink = Arc::new(RecordingSink::default());
        let (result, stats) = run_chunks(&["A#B", "C"], sink.clone(), options(64, 1024)).await;

        assert!(result.is_ok());
        assert_eq!(sink.batches(), vec![vec!["A"]]);
        assert_eq!(stats.batches_dispatched, 1);
        assert_eq!(stats.bytes_received, 4);
    }

    #[tokio::test]
    async fn test_lone_delimiter_forwards_empty_record() {
        let sink = Arc::new(RecordingSink::default());
        let (_, _) = run_chunks(&["#"], sink.clone(), options(64, 1024)).await;

        assert_eq!(sink.batches(), vec![vec![String::new()]]);
    }

    #[tokio::test]
    async fn test_small_reads_preserve_order() {
        let sink = Arc::new(RecordingSink::default());
        // 4-byte reads split every record
        let (result, _) = run_chunks(&["one#two#three#four#"], sink.clone(), options(4, 1024)).await;

        assert!(result.is_ok());
        let flat: Vec<String> = sink.batches().into_iter().flatten().collect();
        assert_eq!(flat, ["one", "two", "three", "four"]);
    }

    #[tokio::test]
    async fn test_frame_too_large() {
        let sink = Arc::new(RecordingSink::default());
        let chunks = ["AB"; 40];
        let (result, stats) = run_chunks(&chunks, sink.clone(), options(64, 16)).await;

        match result {
            Err(SessionError::Framing(FramingError::FrameTooLarge { size, max })) => {
                assert_eq!(max, 16);
                assert!(size > 16);
            }
            other => panic!("expected frame too large, got {:?}", other),
        }
        assert!(sink.batches().is_empty());
        assert!(stats.chunks_received < 40);
    }

    #[tokio::test]
    async fn test_sink_failure_does_not_end_session() {
        let (result, stats) =
            run_chunks(&["A#", "B#"], Arc::new(FailingSink), options(64, 1024)).await;

        assert_eq!(result.unwrap(), CloseReason::EndOfStream);
        assert_eq!(stats.sink_errors, 2);
        assert_eq!(stats.records_persisted, 0);
        assert_eq!(stats.records_extracted, 2);
    }

    #[tokio::test]
    async fn test_shutdown_stops_idle_session() {
        let (_client, server) = tokio::io::duplex(64);
        let sink = Arc::new(RecordingSink::default());
        let mut session = IngestSession::new(server, peer(), sink, options(64, 1024));

        let (trigger, signal) = crate::shutdown::channel();
        let handle = tokio::spawn(async move { session.run(signal).await });

        tokio::time::sleep(Duration::from_millis(20)).await;
        trigger.trigger();

        let result = tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("session should stop")
            .unwrap();
        assert_eq!(result.unwrap(), CloseReason::Shutdown);
    }

    #[tokio::test]
    async fn test_idle_timeout() {
        let (_client, server) = tokio::io::duplex(64);
        let sink = Arc::new(RecordingSink::default());
        let opts = FramingOptions {
            idle_timeout: Some(Duration::from_millis(30)),
            ..options(64, 1024)
        };
        let mut session = IngestSession::new(server, peer(), sink, opts);

        let result = session.run(ShutdownSignal::never()).await;
        assert!(matches!(result, Err(SessionError::IdleTimeout(_))));
    }

    #[tokio::test]
    async fn test_unterminated_tail_on_close() {
        let (mut client, server) = tokio::io::duplex(64);
        let sink = Arc::new(RecordingSink::default());
        let mut session = IngestSession::new(server, peer(), sink.clone(), options(64, 1024));
        assert_eq!(session.peer_addr(), peer());

        client.write_all(b"A#partial").await.unwrap();
        drop(client);

        assert_eq!(
            session.run(ShutdownSignal::never()).await.unwrap(),
            CloseReason::EndOfStream
        );
        assert_eq!(session.pending_bytes(), 7);
        assert_eq!(sink.batches(), vec![vec!["A"]]);
    }
}
