// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! HTTP request handlers for the query API.

use crate::AppState;
use axum::{
    extract::{
        rejection::{PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use sensorhub_store::{
    BaySensor, MachineSensor, Machinery, OfficeSensor, ReadingQuery, SensorTable, TransportBay,
    Warehouse,
};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;

/// API error response
#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: String,
    pub code: u16,
}

impl ApiError {
    fn bad_request(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            code: 400,
        }
    }

    pub(crate) fn internal(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            code: 500,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self)).into_response()
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        tracing::error!("Store query failed: {:#}", err);
        Self::internal(format!("{:#}", err))
    }
}

/// `order`, `init_date` and `end_date` query parameters.
type TableQuery = Result<Query<ReadingQuery>, QueryRejection>;

/// GET /officesensor
pub async fn office_sensors(
    State(state): State<Arc<AppState>>,
    query: TableQuery,
) -> Result<Json<Vec<OfficeSensor>>, ApiError> {
    let Query(query) = query?;
    let rows = state.read(move |store| store.office_sensors(&query)).await?;
    Ok(Json(rows))
}

/// GET /warehouse
pub async fn warehouses(
    State(state): State<Arc<AppState>>,
    query: TableQuery,
) -> Result<Json<Vec<Warehouse>>, ApiError> {
    let Query(query) = query?;
    let rows = state.read(move |store| store.warehouses(&query)).await?;
    Ok(Json(rows))
}

/// GET /baysensor
pub async fn bay_sensors(
    State(state): State<Arc<AppState>>,
    query: TableQuery,
) -> Result<Json<Vec<BaySensor>>, ApiError> {
    let Query(query) = query?;
    let rows = state.read(move |store| store.bay_sensors(&query, None)).await?;
    Ok(Json(rows))
}

/// GET /baysensor/:bay_id
pub async fn bay_sensors_by_id(
    State(state): State<Arc<AppState>>,
    bay_id: Result<Path<i64>, PathRejection>,
    query: TableQuery,
) -> Result<Json<Vec<BaySensor>>, ApiError> {
    let Path(bay_id) = bay_id?;
    let Query(query) = query?;
    let rows = state
        .read(move |store| store.bay_sensors(&query, Some(bay_id)))
        .await?;
    Ok(Json(rows))
}

/// GET /transportbay
pub async fn transport_bays(
    State(state): State<Arc<AppState>>,
    query: TableQuery,
) -> Result<Json<Vec<TransportBay>>, ApiError> {
    let Query(query) = query?;
    let rows = state.read(move |store| store.transport_bays(&query)).await?;
    Ok(Json(rows))
}

/// GET /machinesensor
pub async fn machine_sensors(
    State(state): State<Arc<AppState>>,
    query: TableQuery,
) -> Result<Json<Vec<MachineSensor>>, ApiError> {
    let Query(query) = query?;
    let rows = state
        .read(move |store| store.machine_sensors(&query, None))
        .await?;
    Ok(Json(rows))
}

/// GET /machinesensor/:machine_id
pub async fn machine_sensors_by_id(
    State(state): State<Arc<AppState>>,
    machine_id: Result<Path<i64>, PathRejection>,
    query: TableQuery,
) -> Result<Json<Vec<MachineSensor>>, ApiError> {
    let Path(machine_id) = machine_id?;
    let Query(query) = query?;
    let rows = state
        .read(move |store| store.machine_sensors(&query, Some(machine_id)))
        .await?;
    Ok(Json(rows))
}

/// GET /machinery
pub async fn machinery(
    State(state): State<Arc<AppState>>,
    query: TableQuery,
) -> Result<Json<Vec<Machinery>>, ApiError> {
    let Query(query) = query?;
    let rows = state.read(move |store| store.machinery(&query)).await?;
    Ok(Json(rows))
}

#[derive(Serialize)]
pub struct Health {
    status: &'static str,
    rows: BTreeMap<&'static str, usize>,
}

/// GET /api/v1/health - store reachability and row counts
pub async fn health(State(state): State<Arc<AppState>>) -> Result<Json<Health>, ApiError> {
    let rows = state
        .read(|store| {
            SensorTable::ALL
                .iter()
                .map(|&table| -> anyhow::Result<(&'static str, usize)> {
                    Ok((table.name(), store.count(table)?))
                })
                .collect::<anyhow::Result<BTreeMap<_, _>>>()
        })
        .await?;

    Ok(Json(Health { status: "ok", rows }))
}

/// GET /api/v1/info - Gateway info
pub async fn info() -> Response {
    let info = serde_json::json!({
        "name": "sensorhub-gateway",
        "version": env!("CARGO_PKG_VERSION"),
        "api_version": "v1",
        "endpoints": [
            "/officesensor",
            "/warehouse",
            "/baysensor",
            "/baysensor/{bay_id}",
            "/transportbay",
            "/machinesensor",
            "/machinesensor/{machine_id}",
            "/machinery",
            "/api/v1/health",
            "/api/v1/info"
        ],
        "query": ["order", "init_date", "end_date"]
    });

    (StatusCode::OK, Json(info)).into_response()
}
