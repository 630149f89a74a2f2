// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Sensor store abstraction
//!
//! Defines the trait for storage backends.

use crate::model::{
    BaySensor, MachineSensor, Machinery, OfficeSensor, SensorReport, TransportBay, Warehouse,
};
use crate::query::ReadingQuery;
use anyhow::Result;
use serde::Serialize;
use std::fmt;

/// Sensor tables, in insertion order of a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SensorTable {
    OfficeSensor,
    Warehouse,
    BaySensor,
    TransportBay,
    MachineSensor,
    Machinery,
}

impl SensorTable {
    /// Every table.
    pub const ALL: [SensorTable; 6] = [
        SensorTable::OfficeSensor,
        SensorTable::Warehouse,
        SensorTable::BaySensor,
        SensorTable::TransportBay,
        SensorTable::MachineSensor,
        SensorTable::Machinery,
    ];

    /// SQL table name (also the query API route).
    pub fn name(self) -> &'static str {
        match self {
            SensorTable::OfficeSensor => "officesensor",
            SensorTable::Warehouse => "warehouse",
            SensorTable::BaySensor => "baysensor",
            SensorTable::TransportBay => "transportbay",
            SensorTable::MachineSensor => "machinesensor",
            SensorTable::Machinery => "machinery",
        }
    }
}

impl fmt::Display for SensorTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Row ids written for one report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportIds {
    pub office_sensor: i64,
    pub warehouse: i64,
    pub bay_sensor: i64,
    pub transport_bay: i64,
    pub machine_sensor: i64,
    pub machinery: i64,
}

/// Sensor store trait
///
/// Backend-agnostic interface for persisting reports and reading them back.
///
/// # Implementations
///
/// - `SqliteStore` -- Default
pub trait SensorStore {
    /// Persist one report atomically (one row per table).
    fn insert_report(&self, report: &SensorReport) -> Result<ReportIds>;

    /// Read `officesensor` rows.
    fn office_sensors(&self, query: &ReadingQuery) -> Result<Vec<OfficeSensor>>;

    /// Read `warehouse` rows.
    fn warehouses(&self, query: &ReadingQuery) -> Result<Vec<Warehouse>>;

    /// Read `baysensor` rows, optionally for a single bay.
    fn bay_sensors(&self, query: &ReadingQuery, bay_id: Option<i64>) -> Result<Vec<BaySensor>>;

    /// Read `transportbay` rows joined with their bay sensor.
    ///
    /// Date bounds and ordering apply to `general_datetime`.
    fn transport_bays(&self, query: &ReadingQuery) -> Result<Vec<TransportBay>>;

    /// Read `machinesensor` rows, optionally for a single machine.
    fn machine_sensors(
        &self,
        query: &ReadingQuery,
        machine_id: Option<i64>,
    ) -> Result<Vec<MachineSensor>>;

    /// Read `machinery` rows joined with their machine sensor.
    ///
    /// Date bounds and ordering apply to `general_datetime`.
    fn machinery(&self, query: &ReadingQuery) -> Result<Vec<Machinery>>;

    /// Number of rows in a table
    fn count(&self, table: SensorTable) -> Result<usize>;

    /// Delete every row (for testing)
    fn clear(&self) -> Result<()>;
}
