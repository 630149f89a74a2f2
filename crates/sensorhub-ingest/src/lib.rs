// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! SensorHub ingest server
//!
//! Accepts TCP connections from sensor gateways that stream JSON reports
//! separated by a delimiter byte, reassembles the reports across reads and
//! hands them to a [`RecordSink`] (SQLite store, JSON-lines archive, or
//! both).
//!
//! # Architecture
//!
//! ```text
//! TcpListener ──> IngestServer ──spawn──> IngestSession (one per device)
//!                                            │  read chunk
//!                                            ▼
//!                                         Reassembler ──records──> RecordSink
//!                                                                 ├─ JsonLinesSink
//!                                                                 └─ StoreSink ──> SqliteStore
//! ```
//!
//! # Example
//!
//! ```rust,no_run
//! use sensorhub_ingest::{sink, IngestConfig, IngestServer};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = IngestConfig::default();
//! let server = IngestServer::new(config.clone(), sink::from_config(&config)?)?;
//! server.run().await?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod framing;
pub mod server;
pub mod session;
pub mod shutdown;
pub mod sink;

pub use config::{ConfigError, FramingOptions, IngestConfig};
pub use framing::{FramingError, Reassembler, Record};
pub use server::{IngestServer, ServerError, ServerStats};
pub use session::{CloseReason, IngestSession, SessionError, SessionStats};
pub use shutdown::{ShutdownSignal, ShutdownTrigger};
pub use sink::{FanoutSink, JsonLinesSink, RecordSink, SinkReport, StoreSink};
