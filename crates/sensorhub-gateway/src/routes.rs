// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Route definitions for the query API.

use crate::handlers;
use crate::AppState;
use axum::{routing::get, Router};
use std::sync::Arc;

/// Sensor table routes
pub fn sensor_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/officesensor", get(handlers::office_sensors))
        .route("/warehouse", get(handlers::warehouses))
        .route("/baysensor", get(handlers::bay_sensors))
        .route("/baysensor/:bay_id", get(handlers::bay_sensors_by_id))
        .route("/transportbay", get(handlers::transport_bays))
        .route("/machinesensor", get(handlers::machine_sensors))
        .route("/machinesensor/:machine_id", get(handlers::machine_sensors_by_id))
        .route("/machinery", get(handlers::machinery))
}

/// API v1 routes
pub fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/v1/health", get(handlers::health))
        .route("/api/v1/info", get(handlers::info))
}
