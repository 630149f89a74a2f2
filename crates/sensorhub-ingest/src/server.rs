// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Ingest server core implementation.

use crate::config::{ConfigError, FramingOptions, IngestConfig};
use crate::session::IngestSession;
use crate::shutdown::{self, ShutdownTrigger};
use crate::sink::RecordSink;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, error, info, warn};

/// Server error types.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Bind error on {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        source: std::io::Error,
    },

    #[error("Server already running")]
    AlreadyRunning,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Server-wide counters.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ServerStats {
    pub connections_accepted: u64,
    pub connections_refused: u64,
    pub active_connections: usize,
}

#[derive(Debug, Default)]
struct Counters {
    accepted: AtomicU64,
    refused: AtomicU64,
    active: AtomicUsize,
}

/// Decrements the active count when a session task ends.
struct ActiveGuard(Arc<Counters>);

impl Drop for ActiveGuard {
    fn drop(&mut self) {
        self.0.active.fetch_sub(1, Ordering::SeqCst);
    }
}

/// TCP ingest server: one [`IngestSession`] per device connection, all
/// feeding the same sink.
#[derive(Clone)]
pub struct IngestServer {
    config: Arc<IngestConfig>,
    framing: FramingOptions,
    sink: Arc<dyn RecordSink>,
    shutdown: ShutdownTrigger,
    running: Arc<AtomicBool>,
    counters: Arc<Counters>,
}

impl IngestServer {
    /// Create a new ingest server.
    pub fn new(config: IngestConfig, sink: Arc<dyn RecordSink>) -> Result<Self, ServerError> {
        let framing = config.framing()?;
        let (trigger, _) = shutdown::channel();

        Ok(Self {
            config: Arc::new(config),
            framing,
            sink,
            shutdown: trigger,
            running: Arc::new(AtomicBool::new(false)),
            counters: Arc::new(Counters::default()),
        })
    }

    pub fn config(&self) -> &IngestConfig {
        &self.config
    }

    /// Bind the configured address and serve until shutdown.
    pub async fn run(&self) -> Result<(), ServerError> {
        let addr = SocketAddr::new(self.config.bind_address, self.config.port);
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| ServerError::Bind { addr, source })?;

        self.serve(listener).await
    }

    /// Serve connections from an already bound listener until shutdown.
    pub async fn serve(&self, listener: TcpListener) -> Result<(), ServerError> {
        if self.running.swap(true, Ordering::SeqCst) {
            return Err(ServerError::AlreadyRunning);
        }

        info!("Ingest server listening on {}", listener.local_addr()?);

        let mut shutdown = self.shutdown.subscribe();
        loop {
            tokio::select! {
                result = listener.accept() => {
                    match result {
                        Ok((stream, peer_addr)) => self.accept(stream, peer_addr),
                        Err(e) => error!("Accept error: {}", e),
                    }
                }
                _ = shutdown.wait() => {
                    info!("Shutdown signal received");
                    break;
                }
            }
        }

        self.running.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn accept(&self, stream: TcpStream, peer_addr: SocketAddr) {
        let max = self.config.max_connections;
        if max > 0 && self.counters.active.load(Ordering::SeqCst) >= max {
            warn!("Max connections ({}) reached, refusing {}", max, peer_addr);
            self.counters.refused.fetch_add(1, Ordering::Relaxed);
            return;
        }

        info!("New connection from {}", peer_addr);
        self.counters.accepted.fetch_add(1, Ordering::Relaxed);
        self.counters.active.fetch_add(1, Ordering::SeqCst);
        let guard = ActiveGuard(Arc::clone(&self.counters));

        let sink = Arc::clone(&self.sink);
        let framing = self.framing;
        let signal = self.shutdown.subscribe();

        tokio::spawn(async move {
            let _guard = guard;
            let mut session = IngestSession::new(stream, peer_addr, sink, framing);

            match session.run(signal).await {
                Ok(reason) => info!("Connection closed: {} ({:?})", peer_addr, reason),
                Err(e) => warn!("Connection error from {}: {}", peer_addr, e),
            }

            let stats = session.stats();
            debug!(
                peer = %peer_addr,
                bytes = stats.bytes_received,
                records = stats.records_extracted,
                persisted = stats.records_persisted,
                rejected = stats.records_rejected,
                sink_errors = stats.sink_errors,
                "Session summary"
            );
        });
    }

    /// Signal the server and every open session to stop.
    pub fn shutdown(&self) {
        self.shutdown.trigger();
    }

    /// Check if server is running.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Get number of open device connections.
    pub fn active_connections(&self) -> usize {
        self.counters.active.load(Ordering::SeqCst)
    }

    pub fn stats(&self) -> ServerStats {
        ServerStats {
            connections_accepted: self.counters.accepted.load(Ordering::Relaxed),
            connections_refused: self.counters.refused.load(Ordering::Relaxed),
            active_connections: self.active_connections(),
        }
    }
}
