// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! SensorHub Storage
//!
//! Relational storage for the sensor reports pushed by field devices.
//!
//! # Features
//!
//! - **Report model** -- Serde types for the nested JSON report a device sends
//! - **SQLite Backend** -- One table per sensor category, one transaction per report
//! - **Filtered reads** -- Date range bounds and ascending/descending ordering
//!
//! # Architecture
//!
//! ```text
//! SensorReport (JSON)
//! +-- OfficeSensor   -> officesensor
//! +-- Warehouse      -> warehouse
//! +-- TransportBay
//! |   +-- Baysensor  -> baysensor
//! |   +-- General    -> transportbay (FK baysensor)
//! +-- Machinery
//!     +-- Machinesensor -> machinesensor
//!     +-- General       -> machinery (FK machinesensor)
//! ```
//!
//! # Example
//!
//! ```ignore
//! use sensorhub_store::{ReadingQuery, SensorReport, SensorStore, SqliteStore};
//!
//! let store = SqliteStore::new("sensorhub.db")?;
//! let report = SensorReport::from_json(payload)?;
//! store.insert_report(&report)?;
//!
//! let rows = store.office_sensors(&ReadingQuery::default())?;
//! ```

pub mod model;
pub mod query;
pub mod sqlite;
pub mod store;

pub use model::{
    BaySensor, BaySensorReading, GeneralReading, MachineSensor, MachineSensorReading, Machinery,
    MachineryReading, OfficeReading, OfficeSensor, SensorReport, TransportBay,
    TransportBayReading, Warehouse, WarehouseReading,
};
pub use query::{Order, ReadingQuery};
pub use sqlite::SqliteStore;
pub use store::{ReportIds, SensorStore, SensorTable};
