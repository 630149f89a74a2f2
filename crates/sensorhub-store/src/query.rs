// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Read filters shared by every sensor table.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Sort direction on the row timestamp.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Order {
    #[default]
    Ascendant,
    Descendant,
}

impl Order {
    pub(crate) fn as_sql(self) -> &'static str {
        match self {
            Order::Ascendant => "ASC",
            Order::Descendant => "DESC",
        }
    }
}

impl fmt::Display for Order {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Order::Ascendant => write!(f, "ascendant"),
            Order::Descendant => write!(f, "descendant"),
        }
    }
}

impl FromStr for Order {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ascendant" => Ok(Order::Ascendant),
            "descendant" => Ok(Order::Descendant),
            other => Err(format!(
                "unknown order '{}' (expected ascendant or descendant)",
                other
            )),
        }
    }
}

/// Ordering and optional date bounds for a table read.
///
/// Date bounds compare against midnight of the given day: `init_date`
/// keeps rows at or after `init_date 00:00:00`, `end_date` keeps rows at
/// or before `end_date 00:00:00`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadingQuery {
    #[serde(default)]
    pub order: Order,

    #[serde(default)]
    pub init_date: Option<NaiveDate>,

    #[serde(default)]
    pub end_date: Option<NaiveDate>,
}

impl ReadingQuery {
    /// Set the sort direction.
    pub fn order(mut self, order: Order) -> Self {
        self.order = order;
        self
    }

    /// Keep rows from this date on.
    pub fn init_date(mut self, date: NaiveDate) -> Self {
        self.init_date = Some(date);
        self
    }

    /// Keep rows up to this date.
    pub fn end_date(mut self, date: NaiveDate) -> Self {
        self.end_date = Some(date);
        self
    }

    /// Lower timestamp bound, if any.
    pub fn lower_bound(&self) -> Option<NaiveDateTime> {
        self.init_date.and_then(|d| d.and_hms_opt(0, 0, 0))
    }

    /// Upper timestamp bound, if any.
    pub fn upper_bound(&self) -> Option<NaiveDateTime> {
        self.end_date.and_then(|d| d.and_hms_opt(0, 0, 0))
    }
}
