// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! SQLite storage backend

use crate::model::{
    BaySensor, MachineSensor, Machinery, OfficeSensor, SensorReport, TransportBay, Warehouse,
};
use crate::query::ReadingQuery;
use crate::store::{ReportIds, SensorStore, SensorTable};
use anyhow::{anyhow, Context, Result};
use chrono::NaiveDateTime;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row};
use std::sync::{Mutex, MutexGuard};

/// Timestamp text layout used for every datetime column.
///
/// Fixed width up to the seconds, so lexical comparison in SQL matches
/// chronological order.
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

fn sql_timestamp(ts: &NaiveDateTime) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

/// SQLite sensor store
///
/// Thread-safe via internal Mutex (SQLite Connection is not Sync), so one
/// instance can back every ingest session and the query API at once.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE officesensor  (id, datetime, lights, someone);
/// CREATE TABLE warehouse     (id, datetime, power, temperature);
/// CREATE TABLE baysensor     (id, datetime, occupied, bay_id);
/// CREATE TABLE transportbay  (id, baysensor_id -> baysensor, general_datetime, general_power);
/// CREATE TABLE machinesensor (id, datetime, machine_id, working, faulty);
/// CREATE TABLE machinery     (id, machinesensor_id -> machinesensor, general_datetime, general_power);
/// ```
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

/// Static parts of a filtered read.
struct Select<'a> {
    /// `SELECT ... FROM ...` (joins included)
    from: &'a str,
    /// Column the date bounds and ordering apply to
    time_column: &'a str,
    /// Tie breaker for rows sharing a timestamp
    id_column: &'a str,
    /// Optional `column = value` equality filter
    key: Option<(&'a str, i64)>,
}

impl SqliteStore {
    /// Create a new SQLite store with a file-based database
    pub fn new(path: &str) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open SQLite database at {}", path))?;

        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        tracing::debug!("Opened sensor store at {}", path);
        Ok(store)
    }

    /// Create an in-memory SQLite store (for testing)
    pub fn new_in_memory() -> Result<Self> {
        let conn =
            Connection::open_in_memory().context("Failed to create in-memory SQLite database")?;

        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        Ok(store)
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| anyhow!("SQLite connection lock poisoned"))
    }

    /// Initialize database schema
    fn init_schema(&self) -> Result<()> {
        let conn = self.conn()?;

        conn.execute_batch(
            "PRAGMA foreign_keys = ON;

            CREATE TABLE IF NOT EXISTS officesensor (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                datetime TEXT NOT NULL,
                lights INTEGER NOT NULL,
                someone INTEGER NOT NULL
            );

            CREATE TABLE IF NOT EXISTS warehouse (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                datetime TEXT NOT NULL,
                power INTEGER NOT NULL,
                temperature REAL NOT NULL
            );

            CREATE TABLE IF NOT EXISTS baysensor (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                datetime TEXT NOT NULL,
                occupied INTEGER NOT NULL,
                bay_id INTEGER NOT NULL
            );

            CREATE TABLE IF NOT EXISTS transportbay (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                baysensor_id INTEGER NOT NULL REFERENCES baysensor(id),
                general_datetime TEXT NOT NULL,
                general_power INTEGER NOT NULL
            );

            CREATE TABLE IF NOT EXISTS machinesensor (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                datetime TEXT NOT NULL,
                machine_id INTEGER NOT NULL,
                working INTEGER NOT NULL,
                faulty INTEGER NOT NULL
            );

            CREATE TABLE IF NOT EXISTS machinery (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                machinesensor_id INTEGER NOT NULL REFERENCES machinesensor(id),
                general_datetime TEXT NOT NULL,
                general_power INTEGER NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_officesensor_datetime ON officesensor(datetime);
            CREATE INDEX IF NOT EXISTS idx_warehouse_datetime ON warehouse(datetime);
            CREATE INDEX IF NOT EXISTS idx_baysensor_datetime ON baysensor(datetime);
            CREATE INDEX IF NOT EXISTS idx_transportbay_datetime ON transportbay(general_datetime);
            CREATE INDEX IF NOT EXISTS idx_machinesensor_datetime ON machinesensor(datetime);
            CREATE INDEX IF NOT EXISTS idx_machinery_datetime ON machinery(general_datetime);",
        )
        .context("Failed to initialize sensor schema")?;

        Ok(())
    }

    /// Run a filtered, ordered read.
    fn select<T, F>(&self, select: Select<'_>, query: &ReadingQuery, map: F) -> Result<Vec<T>>
    where
        F: FnMut(&Row<'_>) -> rusqlite::Result<T>,
    {
        let mut clauses: Vec<String> = Vec::new();
        let mut values: Vec<Value> = Vec::new();

        if let Some(lower) = query.lower_bound() {
            values.push(Value::Text(sql_timestamp(&lower)));
            clauses.push(format!("{} >= ?{}", select.time_column, values.len()));
        }
        if let Some(upper) = query.upper_bound() {
            values.push(Value::Text(sql_timestamp(&upper)));
            clauses.push(format!("{} <= ?{}", select.time_column, values.len()));
        }
        if let Some((column, key)) = select.key {
            values.push(Value::Integer(key));
            clauses.push(format!("{} = ?{}", column, values.len()));
        }

        let mut sql = select.from.to_string();
        if !clauses.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&clauses.join(" AND "));
        }
        let dir = query.order.as_sql();
        sql.push_str(&format!(
            " ORDER BY {} {dir}, {} {dir}",
            select.time_column, select.id_column
        ));

        let conn = self.conn()?;
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params_from_iter(values), map)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(rows)
    }
}

impl SensorStore for SqliteStore {
    fn insert_report(&self, report: &SensorReport) -> Result<ReportIds> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        let office = &report.office;
        tx.execute(
            "INSERT INTO officesensor (datetime, lights, someone) VALUES (?1, ?2, ?3)",
            params![sql_timestamp(&office.datetime), office.lights, office.someone],
        )?;
        let office_sensor = tx.last_insert_rowid();

        let warehouse = &report.warehouse;
        tx.execute(
            "INSERT INTO warehouse (datetime, power, temperature) VALUES (?1, ?2, ?3)",
            params![
                sql_timestamp(&warehouse.datetime),
                warehouse.power,
                warehouse.temperature
            ],
        )?;
        let warehouse_id = tx.last_insert_rowid();

        let bay = &report.transport_bay.bay_sensor;
        tx.execute(
            "INSERT INTO baysensor (datetime, occupied, bay_id) VALUES (?1, ?2, ?3)",
            params![sql_timestamp(&bay.datetime), bay.occupied, bay.bay_id],
        )?;
        let bay_sensor = tx.last_insert_rowid();

        let general = &report.transport_bay.general;
        tx.execute(
            "INSERT INTO transportbay (baysensor_id, general_datetime, general_power)
             VALUES (?1, ?2, ?3)",
            params![bay_sensor, sql_timestamp(&general.datetime), general.power],
        )?;
        let transport_bay = tx.last_insert_rowid();

        let machine = &report.machinery.machine_sensor;
        tx.execute(
            "INSERT INTO machinesensor (datetime, machine_id, working, faulty)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                sql_timestamp(&machine.datetime),
                machine.machine_id,
                machine.working,
                machine.faulty
            ],
        )?;
        let machine_sensor = tx.last_insert_rowid();

        let general = &report.machinery.general;
        tx.execute(
            "INSERT INTO machinery (machinesensor_id, general_datetime, general_power)
             VALUES (?1, ?2, ?3)",
            params![machine_sensor, sql_timestamp(&general.datetime), general.power],
        )?;
        let machinery = tx.last_insert_rowid();

        tx.commit().context("Failed to commit sensor report")?;
        tracing::trace!("Committed report (office row {})", office_sensor);

        Ok(ReportIds {
            office_sensor,
            warehouse: warehouse_id,
            bay_sensor,
            transport_bay,
            machine_sensor,
            machinery,
        })
    }

    fn office_sensors(&self, query: &ReadingQuery) -> Result<Vec<OfficeSensor>> {
        self.select(
            Select {
                from: "SELECT id, datetime, lights, someone FROM officesensor",
                time_column: "datetime",
                id_column: "id",
                key: None,
            },
            query,
            |row| {
                Ok(OfficeSensor {
                    id: row.get(0)?,
                    datetime: row.get(1)?,
                    lights: row.get(2)?,
                    someone: row.get(3)?,
                })
            },
        )
    }

    fn warehouses(&self, query: &ReadingQuery) -> Result<Vec<Warehouse>> {
        self.select(
            Select {
                from: "SELECT id, datetime, power, temperature FROM warehouse",
                time_column: "datetime",
                id_column: "id",
                key: None,
            },
            query,
            |row| {
                Ok(Warehouse {
                    id: row.get(0)?,
                    datetime: row.get(1)?,
                    power: row.get(2)?,
                    temperature: row.get(3)?,
                })
            },
        )
    }

    fn bay_sensors(&self, query: &ReadingQuery, bay_id: Option<i64>) -> Result<Vec<BaySensor>> {
        self.select(
            Select {
                from: "SELECT id, datetime, occupied, bay_id FROM baysensor",
                time_column: "datetime",
                id_column: "id",
                key: bay_id.map(|id| ("bay_id", id)),
            },
            query,
            |row| {
                Ok(BaySensor {
                    id: row.get(0)?,
                    datetime: row.get(1)?,
                    occupied: row.get(2)?,
                    bay_id: row.get(3)?,
                })
            },
        )
    }

    fn transport_bays(&self, query: &ReadingQuery) -> Result<Vec<TransportBay>> {
        self.select(
            Select {
                from: "SELECT t.id, t.baysensor_id, t.general_datetime, t.general_power
                       FROM transportbay t
                       JOIN baysensor b ON t.baysensor_id = b.id",
                time_column: "t.general_datetime",
                id_column: "t.id",
                key: None,
            },
            query,
            |row| {
                Ok(TransportBay {
                    id: row.get(0)?,
                    baysensor_id: row.get(1)?,
                    general_datetime: row.get(2)?,
                    general_power: row.get(3)?,
                })
            },
        )
    }

    fn machine_sensors(
        &self,
        query: &ReadingQuery,
        machine_id: Option<i64>,
    ) -> Result<Vec<MachineSensor>> {
        self.select(
            Select {
                from: "SELECT id, datetime, machine_id, working, faulty FROM machinesensor",
                time_column: "datetime",
                id_column: "id",
                key: machine_id.map(|id| ("machine_id", id)),
            },
            query,
            |row| {
                Ok(MachineSensor {
                    id: row.get(0)?,
                    datetime: row.get(1)?,
                    machine_id: row.get(2)?,
                    working: row.get(3)?,
                    faulty: row.get(4)?,
                })
            },
        )
    }

    fn machinery(&self, query: &ReadingQuery) -> Result<Vec<Machinery>> {
        self.select(
            Select {
                from: "SELECT m.id, m.machinesensor_id, m.general_datetime, m.general_power
                       FROM machinery m
                       JOIN machinesensor s ON m.machinesensor_id = s.id",
                time_column: "m.general_datetime",
                id_column: "m.id",
                key: None,
            },
            query,
            |row| {
                Ok(Machinery {
                    id: row.get(0)?,
                    machinesensor_id: row.get(1)?,
                    general_datetime: row.get(2)?,
                    general_power: row.get(3)?,
                })
            },
        )
    }

    fn count(&self, table: SensorTable) -> Result<usize> {
        let conn = self.conn()?;
        let count: i64 = conn.query_row(
            &format!("SELECT COUNT(*) FROM {}", table.name()),
            [],
            |row| row.get(0),
        )?;

        Ok(count as usize)
    }

    fn clear(&self) -> Result<()> {
        let conn = self.conn()?;
        // Children first, foreign keys are enforced
        conn.execute_batch(
            "DELETE FROM transportbay;
             DELETE FROM machinery;
             DELETE FROM baysensor;
             DELETE FROM machinesensor;
             DELETE FROM officesensor;
             DELETE FROM warehouse;",
        )?;
        Ok(())
    }
}
