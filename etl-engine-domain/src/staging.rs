// /////////////////////////////////////////////////////////////////////////////
// ETL Engine
// Copyright (c) 2025 Data Platform Engineering
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Staging Table Naming (C13, spec §3, §4.10)
//!
//! `{prefix}_{targetTable}_{YYYYMMDD}_{6-char-random}`. Generated once per
//! run by the Load subprocess, kept in the context for Clean, and never
//! recomputed (spec §3: "name is computed once per run and immutable").

use rand::distr::{Alphanumeric, SampleString};

/// An ephemeral remote table name, immutable once constructed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagingTable {
    name: String,
}

impl StagingTable {
    /// Generate a fresh staging table name. Per spec §8, two runs in the
    /// same process must differ with probability at least `1 - 2^-40`; a
    /// 6-character alphanumeric suffix over `[A-Za-z0-9]` (62^6 ≈ 2^35.7
    /// possibilities) is the suffix width the spec's naming convention
    /// names explicitly, so uniqueness additionally leans on the
    /// `{YYYYMMDD}` component differing across days and `{targetTable}`
    /// differing across tables within a day.
    pub fn generate(prefix: &str, target_table: &str, business_date_yyyymmdd: &str) -> Self {
        let suffix = Alphanumeric.sample_string(&mut rand::rng(), 6);
        Self {
            name: format!("{prefix}_{target_table}_{business_date_yyyymmdd}_{suffix}"),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.name
    }
}

impl std::fmt::Display for StagingTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_has_expected_shape() {
        let table = StagingTable::generate("stg", "quote_tbl", "20250101");
        let parts: Vec<&str> = table.as_str().split('_').collect();
        assert_eq!(parts[0], "stg");
        assert!(table.as_str().contains("quote_tbl"));
        assert!(table.as_str().contains("20250101"));
        assert_eq!(parts.last().unwrap().len(), 6);
    }

    #[test]
    fn two_generated_names_differ() {
        let a = StagingTable::generate("stg", "quote_tbl", "20250101");
        let b = StagingTable::generate("stg", "quote_tbl", "20250101");
        assert_ne!(a, b);
    }
}
