// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! SensorHub Gateway - REST query API
//!
//! Serves the readings stored by the ingest server as JSON.
//!
//! # Usage
//!
//! ```bash
//! # Start gateway on default port 8000
//! sensorhub-gateway
//!
//! # Custom port and database
//! sensorhub-gateway --port 9000 --db /var/lib/sensorhub/sensorhub.db
//! ```
//!
//! # Endpoints
//!
//! - `GET /officesensor`
//! - `GET /warehouse`
//! - `GET /baysensor`, `GET /baysensor/{bay_id}`
//! - `GET /transportbay`
//! - `GET /machinesensor`, `GET /machinesensor/{machine_id}`
//! - `GET /machinery`
//! - `GET /api/v1/health` - Row counts per table
//! - `GET /api/v1/info` - Gateway info
//!
//! Every sensor endpoint takes `order` (`ascendant` or `descendant`),
//! `init_date` and `end_date` (`YYYY-MM-DD`).

mod handlers;
mod routes;

use axum::Router;
use clap::Parser;
use handlers::ApiError;
use sensorhub_store::{SensorStore, SqliteStore};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// SensorHub REST query API
#[derive(Parser, Debug)]
#[command(name = "sensorhub-gateway")]
#[command(about = "SensorHub REST query API")]
#[command(version)]
struct Args {
    /// HTTP server port
    #[arg(short, long, default_value = "8000")]
    port: u16,

    /// Bind address
    #[arg(short, long, default_value = "127.0.0.1")]
    bind: String,

    /// Database path (SQLite file written by sensorhub-ingest)
    #[arg(long, default_value = "sensorhub.db")]
    db: String,

    /// Log level (trace, debug, info, warn, error); RUST_LOG takes precedence
    #[arg(long, default_value = "info")]
    log_level: String,
}

/// Shared application state
pub struct AppState {
    store: Arc<dyn SensorStore + Send + Sync>,
}

impl AppState {
    fn new(store: Arc<dyn SensorStore + Send + Sync>) -> Self {
        Self { store }
    }

    /// Run a store read on the blocking pool.
    async fn read<T, F>(&self, f: F) -> Result<T, ApiError>
    where
        F: FnOnce(&dyn SensorStore) -> anyhow::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let store = Arc::clone(&self.store);
        tokio::task::spawn_blocking(move || f(store.as_ref()))
            .await
            .map_err(|e| ApiError::internal(format!("Query task failed: {}", e)))?
            .map_err(ApiError::from)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Setup logging
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    let store = SqliteStore::new(&args.db)?;
    let state = Arc::new(AppState::new(Arc::new(store)));

    let app = build_router(state);

    let addr = format!("{}:{}", args.bind, args.port);
    info!("SensorHub Gateway v{}", env!("CARGO_PKG_VERSION"));
    info!("HTTP server: http://{}", addr);
    info!("Database: {}", args.db);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .merge(routes::sensor_routes())
        .merge(routes::api_routes())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use reqwest::StatusCode;
    use sensorhub_store::{
        BaySensor, MachineSensor, Machinery, OfficeSensor, ReadingQuery, ReportIds, SensorReport,
        SensorTable, TransportBay, Warehouse,
    };
    use serde_json::Value;

    fn report(day: u32, hour: u32, bay_id: i64, machine_id: i64) -> SensorReport {
        let ts = format!("2023-03-{:02}T{:02}:00:00", day, hour);
        let json = format!(
            r#"{{
                "OfficeSensor": {{"Datetime": "{ts}", "Lights": true, "Someone": false}},
                "Warehouse": {{"Datetime": "{ts}", "Power": true, "Temperature": 18.5}},
                "TransportBay": {{
                    "Baysensor": {{"Datetime": "{ts}", "Occupied": true, "Bay_id": {bay_id}}},
                    "General": {{"Datetime": "{ts}", "Power": false}}
                }},
                "Machinery": {{
                    "Machinesensor": {{"Datetime": "{ts}", "MachineId": {machine_id}, "Working": true, "Faulty": false}},
                    "General": {{"Datetime": "{ts}", "Power": true}}
                }}
            }}"#
        );
        SensorReport::from_json(&json).unwrap()
    }

    /// Three reports on consecutive days, bays 1/2/1, machines 7/8/7.
    fn seeded_store() -> Arc<SqliteStore> {
        let store = SqliteStore::new_in_memory().unwrap();
        store.insert_report(&report(1, 10, 1, 7)).unwrap();
        store.insert_report(&report(2, 10, 2, 8)).unwrap();
        store.insert_report(&report(3, 10, 1, 7)).unwrap();
        Arc::new(store)
    }

    async fn spawn_app(store: Arc<dyn SensorStore + Send + Sync>) -> String {
        let app = build_router(Arc::new(AppState::new(store)));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    async fn get_json<T: serde::de::DeserializeOwned>(url: &str) -> T {
        let response = reqwest::get(url).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK, "GET {}", url);
        response.json().await.unwrap()
    }

    #[tokio::test]
    async fn test_office_sensor_order() {
        let base = spawn_app(seeded_store()).await;

        let rows: Vec<OfficeSensor> = get_json(&format!("{}/officesensor", base)).await;
        let ids: Vec<i64> = rows.iter().map(|r| r.id).collect();
        assert_eq!(ids, [1, 2, 3]);

        let rows: Vec<OfficeSensor> =
            get_json(&format!("{}/officesensor?order=descendant", base)).await;
        let ids: Vec<i64> = rows.iter().map(|r| r.id).collect();
        assert_eq!(ids, [3, 2, 1]);
    }

    #[tokio::test]
    async fn test_date_filters() {
        let base = spawn_app(seeded_store()).await;

        let rows: Vec<Warehouse> =
            get_json(&format!("{}/warehouse?init_date=2023-03-02", base)).await;
        assert_eq!(rows.len(), 2);
        assert!((rows[0].temperature - 18.5).abs() < f64::EPSILON);

        // end_date bounds at midnight, so the 10:00 reading of that day is out
        let rows: Vec<Warehouse> =
            get_json(&format!("{}/warehouse?end_date=2023-03-02", base)).await;
        assert_eq!(rows.len(), 1);

        let rows: Vec<Machinery> = get_json(&format!(
            "{}/machinery?init_date=2023-03-02&end_date=2023-03-04&order=descendant",
            base
        ))
        .await;
        let parents: Vec<i64> = rows.iter().map(|r| r.machinesensor_id).collect();
        assert_eq!(parents, [3, 2]);
    }

    #[tokio::test]
    async fn test_id_filters() {
        let base = spawn_app(seeded_store()).await;

        let rows: Vec<BaySensor> = get_json(&format!("{}/baysensor/1", base)).await;
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|r| r.bay_id == 1));

        let rows: Vec<MachineSensor> =
            get_json(&format!("{}/machinesensor/8?order=descendant", base)).await;
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].machine_id, 8);

        let rows: Vec<MachineSensor> = get_json(&format!("{}/machinesensor/99", base)).await;
        assert!(rows.is_empty());

        let rows: Vec<BaySensor> = get_json(&format!("{}/baysensor", base)).await;
        assert_eq!(rows.len(), 3);
    }

    #[tokio::test]
    async fn test_joined_tables() {
        let base = spawn_app(seeded_store()).await;

        let rows: Vec<TransportBay> = get_json(&format!("{}/transportbay", base)).await;
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].baysensor_id, 1);
        assert!(!rows[0].general_power);

        let rows: Vec<Machinery> = get_json(&format!("{}/machinery", base)).await;
        assert_eq!(rows.len(), 3);
        assert!(rows[2].general_power);
    }

    #[tokio::test]
    async fn test_bad_parameters() {
        let base = spawn_app(seeded_store()).await;

        for path in [
            "/officesensor?order=sideways",
            "/warehouse?init_date=yesterday",
            "/machinery?end_date=2023-13-01",
            "/baysensor/abc",
            "/machinesensor/1.5",
        ] {
            let response = reqwest::get(format!("{}{}", base, path)).await.unwrap();
            assert_eq!(response.status(), StatusCode::BAD_REQUEST, "GET {}", path);

            let body: Value = response.json().await.unwrap();
            assert_eq!(body["code"], 400);
            assert!(body["error"].as_str().is_some_and(|e| !e.is_empty()));
        }
    }

    #[tokio::test]
    async fn test_health_counts() {
        let base = spawn_app(seeded_store()).await;

        let body: Value = get_json(&format!("{}/api/v1/health", base)).await;
        assert_eq!(body["status"], "ok");
        for table in SensorTable::ALL {
            assert_eq!(body["rows"][table.name()], 3, "{}", table);
        }
    }

    #[tokio::test]
    async fn test_info() {
        let base = spawn_app(seeded_store()).await;

        let body: Value = get_json(&format!("{}/api/v1/info", base)).await;
        assert_eq!(body["name"], "sensorhub-gateway");
        assert!(body["endpoints"]
            .as_array()
            .unwrap()
            .contains(&Value::from("/machinery")));
    }

    /// Store whose every call fails.
    struct BrokenStore;

    impl SensorStore for BrokenStore {
        fn insert_report(&self, _report: &SensorReport) -> anyhow::Result<ReportIds> {
            Err(anyhow!("disk I/O error"))
        }
        fn office_sensors(&self, _query: &ReadingQuery) -> anyhow::Result<Vec<OfficeSensor>> {
            Err(anyhow!("disk I/O error"))
        }
        fn warehouses(&self, _query: &ReadingQuery) -> anyhow::Result<Vec<Warehouse>> {
            Err(anyhow!("disk I/O error"))
        }
        fn bay_sensors(
            &self,
            _query: &ReadingQuery,
            _bay_id: Option<i64>,
        ) -> anyhow::Result<Vec<BaySensor>> {
            Err(anyhow!("disk I/O error"))
        }
        fn transport_bays(&self, _query: &ReadingQuery) -> anyhow::Result<Vec<TransportBay>> {
            Err(anyhow!("disk I/O error"))
        }
        fn machine_sensors(
            &self,
            _query: &ReadingQuery,
            _machine_id: Option<i64>,
        ) -> anyhow::Result<Vec<MachineSensor>> {
            Err(anyhow!("disk I/O error"))
        }
        fn machinery(&self, _query: &ReadingQuery) -> anyhow::Result<Vec<Machinery>> {
            Err(anyhow!("disk I/O error"))
        }
        fn count(&self, _table: SensorTable) -> anyhow::Result<usize> {
            Err(anyhow!("disk I/O error"))
        }
        fn clear(&self) -> anyhow::Result<()> {
            Err(anyhow!("disk I/O error"))
        }
    }

    #[tokio::test]
    async fn test_store_failure_is_500() {
        let base = spawn_app(Arc::new(BrokenStore)).await;

        for path in ["/officesensor", "/baysensor/1", "/api/v1/health"] {
            let response = reqwest::get(format!("{}{}", base, path)).await.unwrap();
            assert_eq!(
                response.status(),
                StatusCode::INTERNAL_SERVER_ERROR,
                "GET {}",
                path
            );

            let body: Value = response.json().await.unwrap();
            assert_eq!(body["code"], 500);
            assert!(body["error"].as_str().unwrap().contains("disk I/O error"));
        }
    }
}
