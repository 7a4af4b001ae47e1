// /////////////////////////////////////////////////////////////////////////////
// ETL Engine
// Copyright (c) 2025 Data Platform Engineering
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Business Date and Date-Range Iteration (C1)
//!
//! A business date is external-facing in two shapes: `YYYYMMDD` on the CLI
//! and in file paths, `YYYY.MM.DD` embedded in records (spec §3). Calendars
//! are naive — every calendar date in `[from, to]` is included, weekends and
//! holidays are not special-cased (spec §4.1).

use crate::error::ConfigError;
use chrono::NaiveDate;
use std::fmt;

/// A single business day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BusinessDate(NaiveDate);

impl BusinessDate {
    /// Parse a `YYYYMMDD` string, as used on the CLI and in object keys.
    pub fn parse_yyyymmdd(arg: &'static str, value: &str) -> Result<Self, ConfigError> {
        NaiveDate::parse_from_str(value, "%Y%m%d")
            .map(BusinessDate)
            .map_err(|e| ConfigError::MalformedDate {
                arg,
                value: value.to_string(),
                reason: e.to_string(),
            })
    }

    /// `YYYYMMDD`, used on the CLI and when resolving file-selection templates.
    pub fn to_yyyymmdd(self) -> String {
        self.0.format("%Y%m%d").to_string()
    }

    /// `YYYY.MM.DD`, stamped into every `TargetRecord` (spec §4.5 step 6).
    pub fn to_dotted(self) -> String {
        self.0.format("%Y.%m.%d").to_string()
    }

    pub fn succ(self) -> Self {
        BusinessDate(self.0.succ_opt().expect("date range bounded well within chrono's range"))
    }
}

impl fmt::Display for BusinessDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_yyyymmdd())
    }
}

/// Expand `[from, to]` into an ordered, inclusive, ascending sequence of
/// business dates (spec §4.1). Fails with `ConfigError` on malformed input
/// or `from > to`.
pub fn date_range(from: &str, to: &str) -> Result<Vec<BusinessDate>, ConfigError> {
    let from = BusinessDate::parse_yyyymmdd("from", from)?;
    let to = BusinessDate::parse_yyyymmdd("to", to)?;

    if from > to {
        return Err(ConfigError::InvalidDateRange {
            from: from.to_yyyymmdd(),
            to: to.to_yyyymmdd(),
        });
    }

    let mut dates = Vec::new();
    let mut current = from;
    loop {
        dates.push(current);
        if current == to {
            break;
        }
        current = current.succ();
    }
    Ok(dates)
}
