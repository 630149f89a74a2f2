// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Record sinks
//!
//! Where complete records go once a session has framed them.
//!
//! # Implementations
//!
//! - [`StoreSink`] -- decodes each record as a sensor report and stores it
//! - [`JsonLinesSink`] -- archives each batch as a JSON-lines file
//! - [`FanoutSink`] -- hands the same batch to several sinks in turn
//!
//! Sinks are synchronous and may block (database round trips, file I/O);
//! sessions call them from the blocking pool.

use crate::config::IngestConfig;
use crate::framing::Record;
use anyhow::{anyhow, Context, Result};
use sensorhub_store::{SensorReport, SensorStore, SqliteStore};
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Outcome of one batch.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SinkReport {
    /// Records durably written
    pub persisted: u64,
    /// Records dropped (undecodable or refused by the backend)
    pub rejected: u64,
}

/// Destination for framed records.
///
/// Called with every batch a read completes, in arrival order. An `Err`
/// means the whole batch failed; per-record problems belong in the
/// returned [`SinkReport`]. Callers do not retry.
pub trait RecordSink: Send + Sync {
    fn persist(&self, batch: &[Record]) -> Result<SinkReport>;
}

// ============================================================================
// Store sink
// ============================================================================

/// Decodes records as [`SensorReport`]s and inserts them into a store.
///
/// Each report commits on its own, so one bad record never takes the rest
/// of its batch down with it.
pub struct StoreSink<S> {
    store: Arc<S>,
}

impl<S: SensorStore + Send + Sync> StoreSink<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> Arc<S> {
        Arc::clone(&self.store)
    }

    fn decode(record: &Record) -> Result<SensorReport> {
        let text = record.as_str().context("record is not valid UTF-8")?;
        SensorReport::from_json(text).context("record is not a valid sensor report")
    }
}

impl<S: SensorStore + Send + Sync> RecordSink for StoreSink<S> {
    fn persist(&self, batch: &[Record]) -> Result<SinkReport> {
        let mut report = SinkReport::default();

        for record in batch {
            if record.is_empty() {
                tracing::debug!("Skipping empty record");
                report.rejected += 1;
                continue;
            }

            let decoded = match Self::decode(record) {
                Ok(decoded) => decoded,
                Err(e) => {
                    tracing::warn!("Dropping record ({} bytes): {:#}", record.len(), e);
                    report.rejected += 1;
                    continue;
                }
            };

            match self.store.insert_report(&decoded) {
                Ok(ids) => {
                    report.persisted += 1;
                    tracing::trace!(
                        "Stored report: office={}, bay={}, machine={}",
                        ids.office_sensor,
                        ids.bay_sensor,
                        ids.machine_sensor
                    );
                }
                Err(e) => {
                    report.rejected += 1;
                    tracing::error!("Failed to store report: {:#}", e);
                }
            }
        }

        Ok(report)
    }
}

// ============================================================================
// JSON-lines archive
// ============================================================================

/// Writes each batch to a fresh `<timestamp>-<seq>.jsonl` file, one record
/// per line.
pub struct JsonLinesSink {
    dir: PathBuf,
    sequence: AtomicU64,
}

impl JsonLinesSink {
    /// Create the sink, creating `dir` if needed.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create archive directory {}", dir.display()))?;
        Ok(Self {
            dir,
            sequence: AtomicU64::new(0),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn next_file(&self) -> Result<(PathBuf, File)> {
        let seq = self.sequence.fetch_add(1, Ordering::Relaxed);
        let name = format!(
            "{}-{:06}.jsonl",
            chrono::Local::now().format("%Y-%m-%dT%H-%M-%S%.6f"),
            seq
        );
        let path = self.dir.join(name);
        let file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .with_context(|| format!("Failed to create archive file {}", path.display()))?;
        Ok((path, file))
    }
}

impl RecordSink for JsonLinesSink {
    fn persist(&self, batch: &[Record]) -> Result<SinkReport> {
        let (path, file) = self.next_file()?;
        let mut out = BufWriter::new(file);

        for record in batch {
            out.write_all(record.as_bytes())?;
            out.write_all(b"\n")?;
        }
        out.flush()
            .with_context(|| format!("Failed to write {}", path.display()))?;

        tracing::debug!("Archived {} records to {}", batch.len(), path.display());

        Ok(SinkReport {
            persisted: batch.len() as u64,
            rejected: 0,
        })
    }
}

// ============================================================================
// Fan-out
// ============================================================================

/// Hands every batch to each inner sink, in order.
///
/// A failing sink is logged and skipped. The combined report is the most
/// pessimistic one: fewest persisted, most rejected. Fails only when every
/// inner sink fails.
pub struct FanoutSink {
    sinks: Vec<Arc<dyn RecordSink>>,
}

impl FanoutSink {
    pub fn new(sinks: Vec<Arc<dyn RecordSink>>) -> Self {
        Self { sinks }
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

impl RecordSink for FanoutSink {
    fn persist(&self, batch: &[Record]) -> Result<SinkReport> {
        let mut combined: Option<SinkReport> = None;
        let mut last_error = None;

        for sink in &self.sinks {
            match sink.persist(batch) {
                Ok(report) => {
                    combined = Some(match combined {
                        None => report,
                        Some(acc) => SinkReport {
                            persisted: acc.persisted.min(report.persisted),
                            rejected: acc.rejected.max(report.rejected),
                        },
                    });
                }
                Err(e) => {
                    tracing::warn!("Sink failed for batch of {}: {:#}", batch.len(), e);
                    last_error = Some(e);
                }
            }
        }

        match (combined, last_error) {
            (Some(report), _) => Ok(report),
            (None, Some(e)) => Err(e),
            (None, None) => Err(anyhow!("no sinks configured")),
        }
    }
}

/// Build the sink chain a config asks for.
///
/// The archive, when enabled, runs before the database so raw records are
/// kept even when they fail to decode.
pub fn from_config(config: &IngestConfig) -> Result<Arc<dyn RecordSink>> {
    let mut sinks: Vec<Arc<dyn RecordSink>> = Vec::new();

    if let Some(dir) = &config.json_archive_dir {
        sinks.push(Arc::new(JsonLinesSink::new(dir)?));
        tracing::info!("Archiving records to {}", dir.display());
    }

    if config.save_database {
        let store = SqliteStore::new(&config.database_path)
            .with_context(|| format!("Failed to open database {}", config.database_path))?;
        sinks.push(Arc::new(StoreSink::new(Arc::new(store))));
        tracing::info!("Persisting reports to {}", config.database_path);
    }

    match sinks.len() {
        0 => Err(anyhow!("no sink enabled")),
        1 => Ok(sinks.remove(0)),
        _ => Ok(Arc::new(FanoutSink::new(sinks))),
    }
}
