// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Sensor data model.
//!
//! Two families of types live here:
//!
//! - `*Reading` / [`SensorReport`] -- the JSON report as sent by a device
//!   (PascalCase keys, one nested section per sensor category)
//! - row types ([`OfficeSensor`], [`Warehouse`], ...) -- what the store
//!   persists and the query API returns

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

// ============================================================================
// Wire report
// ============================================================================

/// One complete report from a device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorReport {
    #[serde(rename = "OfficeSensor")]
    pub office: OfficeReading,

    #[serde(rename = "Warehouse")]
    pub warehouse: WarehouseReading,

    #[serde(rename = "TransportBay")]
    pub transport_bay: TransportBayReading,

    #[serde(rename = "Machinery")]
    pub machinery: MachineryReading,
}

impl SensorReport {
    /// Decode a report from its JSON text.
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// Decode a report from raw JSON bytes.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }
}

/// Office presence/lighting section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct OfficeReading {
    pub datetime: NaiveDateTime,
    pub lights: bool,
    pub someone: bool,
}

/// Warehouse climate section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct WarehouseReading {
    pub datetime: NaiveDateTime,
    pub power: bool,
    pub temperature: f64,
}

/// Transport bay section: one bay sensor plus the bay's general status.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TransportBayReading {
    #[serde(rename = "Baysensor")]
    pub bay_sensor: BaySensorReading,
    pub general: GeneralReading,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct BaySensorReading {
    pub datetime: NaiveDateTime,
    pub occupied: bool,
    #[serde(rename = "Bay_id")]
    pub bay_id: i64,
}

/// Machinery section: one machine sensor plus the hall's general status.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MachineryReading {
    #[serde(rename = "Machinesensor")]
    pub machine_sensor: MachineSensorReading,
    pub general: GeneralReading,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MachineSensorReading {
    pub datetime: NaiveDateTime,
    #[serde(rename = "MachineId")]
    pub machine_id: i64,
    pub working: bool,
    pub faulty: bool,
}

/// Power status shared by the transport bay and machinery sections.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct GeneralReading {
    pub datetime: NaiveDateTime,
    pub power: bool,
}

// ============================================================================
// Stored rows
// ============================================================================

/// Row of the `officesensor` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OfficeSensor {
    pub id: i64,
    pub datetime: NaiveDateTime,
    pub lights: bool,
    pub someone: bool,
}

/// Row of the `warehouse` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Warehouse {
    pub id: i64,
    pub datetime: NaiveDateTime,
    pub power: bool,
    pub temperature: f64,
}

/// Row of the `baysensor` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BaySensor {
    pub id: i64,
    pub datetime: NaiveDateTime,
    pub occupied: bool,
    pub bay_id: i64,
}

/// Row of the `transportbay` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransportBay {
    pub id: i64,
    /// Parent `baysensor` row
    pub baysensor_id: i64,
    pub general_datetime: NaiveDateTime,
    pub general_power: bool,
}

/// Row of the `machinesensor` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MachineSensor {
    pub id: i64,
    pub datetime: NaiveDateTime,
    pub machine_id: i64,
    pub working: bool,
    pub faulty: bool,
}

/// Row of the `machinery` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Machinery {
    pub id: i64,
    /// Parent `machinesensor` row
    pub machinesensor_id: i64,
    pub general_datetime: NaiveDateTime,
    pub general_power: bool,
}

#[cfg(test)]
pub(crate) mod fixtures {
    /// A well-formed device report; `minute` varies every timestamp.
    pub fn report_json(minute: u32, bay_id: i64, machine_id: i64) -> String {
        let ts = format!("2023-03-01T10:{:02}:00", minute);
        format!(
            r#"{{
                "OfficeSensor": {{"Datetime": "{ts}", "Lights": true, "Someone": false}},
                "Warehouse": {{"Datetime": "{ts}", "Power": true, "Temperature": 21.5}},
                "TransportBay": {{
                    "Baysensor": {{"Datetime": "{ts}", "Occupied": true, "Bay_id": {bay_id}}},
                    "General": {{"Datetime": "{ts}", "Power": true}}
                }},
                "Machinery": {{
                    "Machinesensor": {{"Datetime": "{ts}", "MachineId": {machine_id}, "Working": true, "Faulty": false}},
                    "General": {{"Datetime": "{ts}", "Power": false}}
                }}
            }}"#
        )
    }
}
