// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Ingest server configuration.
//!
//! The delimiter is part of the contract with the sending devices: it must
//! never occur inside a report. Nothing on this side can verify that, so a
//! device that embeds the delimiter in a payload will see its report split
//! into undecodable pieces.

use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid value: {0}")]
    InvalidValue(String),
}

/// Ingest server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestConfig {
    /// Address to bind to (default: 127.0.0.1)
    #[serde(default = "default_bind_address")]
    pub bind_address: IpAddr,

    /// TCP port to listen on (default: 45000)
    #[serde(default = "default_port")]
    pub port: u16,

    /// Record delimiter, a single ASCII character (default: '#')
    #[serde(default = "default_delimiter")]
    pub delimiter: char,

    /// Maximum bytes taken from the socket per read
    #[serde(default = "default_max_chunk_size")]
    pub max_chunk_size: usize,

    /// Maximum size of an unterminated record before the connection is dropped
    #[serde(default = "default_max_frame_size")]
    pub max_frame_size: usize,

    /// Maximum concurrent device connections (0 = unlimited)
    #[serde(default)]
    pub max_connections: usize,

    /// Close a connection after this many idle seconds (0 = never)
    #[serde(default)]
    pub idle_timeout_secs: u64,

    /// SQLite database file
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Persist decoded reports to the database
    #[serde(default = "default_true")]
    pub save_database: bool,

    /// Also archive raw records as JSON-lines files in this directory
    #[serde(default)]
    pub json_archive_dir: Option<PathBuf>,
}

fn default_bind_address() -> IpAddr {
    IpAddr::from([127, 0, 0, 1])
}

fn default_port() -> u16 {
    45000
}

fn default_delimiter() -> char {
    '#'
}

fn default_max_chunk_size() -> usize {
    6000
}

fn default_max_frame_size() -> usize {
    1024 * 1024 // 1 MB
}

fn default_database_path() -> String {
    "sensorhub.db".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            port: default_port(),
            delimiter: default_delimiter(),
            max_chunk_size: default_max_chunk_size(),
            max_frame_size: default_max_frame_size(),
            max_connections: 0,
            idle_timeout_secs: 0,
            database_path: default_database_path(),
            save_database: true,
            json_archive_dir: None,
        }
    }
}

/// Per-connection framing limits, derived from a validated config.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FramingOptions {
    pub delimiter: u8,
    pub max_chunk_size: usize,
    pub max_frame_size: usize,
    pub idle_timeout: Option<Duration>,
}

impl IngestConfig {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a JSON file.
    pub fn to_file(&self, path: &Path) -> Result<(), ConfigError> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Idle timeout, if enabled.
    pub fn idle_timeout(&self) -> Option<Duration> {
        (self.idle_timeout_secs > 0).then(|| Duration::from_secs(self.idle_timeout_secs))
    }

    /// Framing limits for a connection.
    pub fn framing(&self) -> Result<FramingOptions, ConfigError> {
        self.validate()?;
        Ok(FramingOptions {
            delimiter: self.delimiter as u8,
            max_chunk_size: self.max_chunk_size,
            max_frame_size: self.max_frame_size,
            idle_timeout: self.idle_timeout(),
        })
    }

    /// Validate configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.port == 0 {
            return Err(ConfigError::InvalidValue("port cannot be 0".into()));
        }
        if !self.delimiter.is_ascii() {
            return Err(ConfigError::InvalidValue(format!(
                "delimiter must be a single ASCII character, got {:?}",
                self.delimiter
            )));
        }
        if self.max_chunk_size == 0 {
            return Err(ConfigError::InvalidValue(
                "max_chunk_size cannot be 0".into(),
            ));
        }
        if self.max_frame_size == 0 {
            return Err(ConfigError::InvalidValue(
                "max_frame_size cannot be 0".into(),
            ));
        }
        if !self.save_database && self.json_archive_dir.is_none() {
            return Err(ConfigError::InvalidValue(
                "nothing to persist to: enable save_database or set json_archive_dir".into(),
            ));
        }
        Ok(())
    }
}
