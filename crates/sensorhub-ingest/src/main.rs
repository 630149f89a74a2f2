// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! SensorHub Ingest Server
//!
//! Receives delimiter-framed sensor reports from devices over TCP and
//! persists them.
//!
//! # Usage
//!
//! ```bash
//! # Start on the default port (45000), storing into sensorhub.db
//! sensorhub-ingest
//!
//! # Listen on all interfaces, newline-delimited reports
//! sensorhub-ingest --bind 0.0.0.0 --delimiter '\n'
//!
//! # Archive raw records only, no database
//! sensorhub-ingest --no-database --json-dir ./archive
//!
//! # Load everything from a config file
//! sensorhub-ingest --config ingest.json
//! ```

use clap::Parser;
use sensorhub_ingest::{sink, IngestConfig, IngestServer};
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

/// SensorHub Ingest Server - collects sensor reports streamed over TCP
#[derive(Parser, Debug)]
#[command(name = "sensorhub-ingest")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// TCP port to listen on
    #[arg(short, long, default_value = "45000")]
    port: u16,

    /// Bind address (0.0.0.0 for all interfaces)
    #[arg(short, long, default_value = "127.0.0.1")]
    bind: String,

    /// Configuration file (JSON format)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Database path (SQLite file)
    #[arg(long, default_value = "sensorhub.db")]
    db: String,

    /// Record delimiter (single ASCII character)
    #[arg(short, long, default_value = "#")]
    delimiter: char,

    /// Maximum bytes per socket read
    #[arg(long, default_value = "6000")]
    max_chunk_size: usize,

    /// Maximum unterminated record size before dropping the connection
    #[arg(long, default_value = "1048576")]
    max_frame_size: usize,

    /// Maximum concurrent connections (0 = unlimited)
    #[arg(long, default_value = "0")]
    max_connections: usize,

    /// Idle timeout in seconds (0 = never)
    #[arg(long, default_value = "0")]
    idle_timeout: u64,

    /// Also archive raw records as JSON-lines files in this directory
    #[arg(long)]
    json_dir: Option<PathBuf>,

    /// Do not write reports to the database
    #[arg(long)]
    no_database: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Initialize logging
    let level = match args.log_level.as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .with_thread_ids(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    // Load or create config
    let config = if let Some(config_path) = args.config {
        info!("Loading config from {:?}", config_path);
        IngestConfig::from_file(&config_path)?
    } else {
        let config = IngestConfig {
            bind_address: args.bind.parse()?,
            port: args.port,
            delimiter: args.delimiter,
            max_chunk_size: args.max_chunk_size,
            max_frame_size: args.max_frame_size,
            max_connections: args.max_connections,
            idle_timeout_secs: args.idle_timeout,
            database_path: args.db,
            save_database: !args.no_database,
            json_archive_dir: args.json_dir,
        };
        config.validate()?;
        config
    };

    let addr = SocketAddr::new(config.bind_address, config.port);

    info!("+----------------------------------------------------+");
    info!(
        "|       SensorHub Ingest Server v{}               |",
        env!("CARGO_PKG_VERSION")
    );
    info!("+----------------------------------------------------+");
    info!("|  Bind:      {:37} |", addr);
    info!("|  Delimiter: {:37} |", format!("{:?}", config.delimiter));
    info!(
        "|  Database:  {:37} |",
        if config.save_database {
            config.database_path.as_str()
        } else {
            "disabled"
        }
    );
    info!(
        "|  Archive:   {:37} |",
        config
            .json_archive_dir
            .as_ref()
            .map(|d| d.display().to_string())
            .unwrap_or_else(|| "disabled".to_string())
    );
    info!("+----------------------------------------------------+");

    // Create and run server
    let sink = sink::from_config(&config)?;
    let server = IngestServer::new(config, sink)?;

    // Handle shutdown signals
    let server_handle = server.clone();
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("Shutdown signal received, stopping server...");
        server_handle.shutdown();
    });

    // Run server
    server.run().await?;

    let stats = server.stats();
    info!(
        "Ingest server stopped ({} connections accepted, {} refused)",
        stats.connections_accepted, stats.connections_refused
    );
    Ok(())
}
