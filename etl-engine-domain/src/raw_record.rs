// /////////////////////////////////////////////////////////////////////////////
// ETL Engine
// Copyright (c) 2025 Data Platform Engineering
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Raw Record (C4 output, spec §3)
//!
//! Mirrors one CSV row before business transformations. Optional fields
//! remain unset rather than defaulted, so level/side-keyed folding (spec
//! §4.5 step 5) can tell "absent" from "zero".

use std::collections::BTreeMap;

/// One column value as read from the delimited source, before any
/// business-type conversion.
#[derive(Debug, Clone, PartialEq)]
pub enum RawValue {
    Text(String),
    Number(f64),
    /// Present in the header but blank, or failed to parse (recorded, not
    /// discarded, so the parser can log a per-row warning with context).
    Unset,
}

/// One row, keyed by the header-derived column name (spec §4.4: "builds a
/// `columnName → index` map, then yields one `RawRecord`-shaped map per
/// subsequent row").
#[derive(Debug, Clone, Default)]
pub struct RawRecord {
    pub columns: BTreeMap<String, RawValue>,
}

impl RawRecord {
    pub fn get(&self, column: &str) -> Option<&RawValue> {
        self.columns.get(column)
    }

    pub fn text(&self, column: &str) -> Option<&str> {
        match self.columns.get(column) {
            Some(RawValue::Text(s)) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn number(&self, column: &str) -> Option<f64> {
        match self.columns.get(column) {
            Some(RawValue::Number(n)) => Some(*n),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unset_field_is_distinct_from_absent_column() {
        let mut record = RawRecord::default();
        record.columns.insert("bid1Price".into(), RawValue::Unset);
        assert!(record.get("bid1Price").is_some());
        assert!(record.get("bid2Price").is_none());
        assert_eq!(record.number("bid1Price"), None);
    }
}
