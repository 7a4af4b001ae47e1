// /////////////////////////////////////////////////////////////////////////////
// ETL Engine
// Copyright (c) 2025 Data Platform Engineering
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Result Types (C15, C16)
//!
//! Immutable records produced by the sequencer, the daily workflow, and the
//! workflow engine (spec §3, §4.12, §4.13).

use crate::error::Stage;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

/// Result of a single subprocess (spec §3). Immutable after construction.
#[derive(Debug, Clone)]
pub struct SubprocessResult {
    pub success: bool,
    pub processed: u64,
    pub error: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl SubprocessResult {
    pub fn success(processed: u64, timestamp: DateTime<Utc>) -> Self {
        Self {
            success: true,
            processed,
            error: None,
            timestamp,
        }
    }

    pub fn failure(error: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            success: false,
            processed: 0,
            error: Some(error.into()),
            timestamp,
        }
    }
}

/// Per-day outcome (spec §3). `results_by_stage` is empty when the sequencer
/// short-circuited before any stage produced a result; `final_context` is
/// `None` on failure.
#[derive(Debug, Clone)]
pub struct DailyProcessResult {
    pub date: String,
    pub success: bool,
    pub results_by_stage: BTreeMap<Stage, SubprocessResult>,
}

impl DailyProcessResult {
    pub fn failed(date: impl Into<String>) -> Self {
        Self {
            date: date.into(),
            success: false,
            results_by_stage: BTreeMap::new(),
        }
    }

    pub fn succeeded(date: impl Into<String>, results_by_stage: BTreeMap<Stage, SubprocessResult>) -> Self {
        Self {
            date: date.into(),
            success: true,
            results_by_stage,
        }
    }
}

/// Aggregate outcome of a range run (spec §3, §4.13). `processed_days`
/// reflects only the days actually attempted before a fail-stop, not the
/// full requested range.
#[derive(Debug, Clone)]
pub struct WorkflowResult {
    pub processed_days: usize,
    pub successful_days: usize,
    pub failed_days: usize,
    pub per_day: Vec<DailyProcessResult>,
    pub start_date: String,
    pub end_date: String,
    pub success: bool,
}

impl WorkflowResult {
    pub fn from_days(per_day: Vec<DailyProcessResult>, start_date: String, end_date: String) -> Self {
        let successful_days = per_day.iter().filter(|d| d.success).count();
        let failed_days = per_day.len() - successful_days;
        Self {
            processed_days: per_day.len(),
            successful_days,
            failed_days,
            success: failed_days == 0,
            per_day,
            start_date,
            end_date,
        }
    }
}

impl PartialOrd for Stage {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Stage {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        fn rank(s: &Stage) -> u8 {
            match s {
                Stage::Extract => 0,
                Stage::Transform => 1,
                Stage::Load => 2,
                Stage::Validate => 3,
                Stage::Clean => 4,
            }
        }
        rank(self).cmp(&rank(other))
    }
}
