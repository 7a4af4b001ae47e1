// /////////////////////////////////////////////////////////////////////////////
// ETL Engine
// Copyright (c) 2025 Data Platform Engineering
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Per-Day Context (C2, spec §4.2)
//!
//! Owned by the daily workflow, passed as a mutable handle to the
//! sequencer, and read-only to extractor tasks — their results return
//! out-of-band through the Extract stage's consolidation buffer rather than
//! through the context itself (spec §9 design note on shared mutable
//! context).

use crate::error::Stage;
use crate::records::{SourceRecord, TargetRecord};
use std::sync::Arc;

/// A connection to the remote store, owned by the engine for the duration
/// of a single day. Opened by the Load subprocess, closed by Clean;
/// single-writer (the loader) within the day and never shared across days
/// (spec §5). The concrete driver is an external collaborator (spec §1);
/// this is the thin handle the domain layer reasons about.
pub trait SharedStoreConnection: Send + Sync {
    fn is_open(&self) -> bool;

    /// Release the connection. Called exactly once, by the Clean
    /// subprocess, after the drop script has run (spec §4.10).
    fn close(&self);
}

/// Per-day mutable state (spec §3, §4.2).
///
/// Invariant: on entry to stage X, counters for stages `< X` are fully
/// set; on failure the context is not reused — the daily workflow
/// constructs a fresh one for the next date.
pub struct Context {
    pub current_date: String,
    pub current_stage: Option<Stage>,
    pub extracted: Option<Vec<SourceRecord>>,
    pub extracted_count: usize,
    pub transformed: Option<Vec<TargetRecord>>,
    pub transformed_count: usize,
    pub loaded_count: u64,
    pub validation_passed: bool,
    pub cleanup_performed: bool,
    pub shared_store_connection: Option<Arc<dyn SharedStoreConnection>>,
    /// Set once by the Load subprocess (spec §4.10), read by Clean.
    pub staging_table_names: Vec<String>,
}

impl Context {
    pub fn new(current_date: impl Into<String>) -> Self {
        Self {
            current_date: current_date.into(),
            current_stage: None,
            extracted: None,
            extracted_count: 0,
            transformed: None,
            transformed_count: 0,
            loaded_count: 0,
            validation_passed: false,
            cleanup_performed: false,
            shared_store_connection: None,
            staging_table_names: Vec::new(),
        }
    }

    /// Asserts all counters are zero and no stage has run yet (spec §4.2).
    pub fn validate_initial(&self) -> bool {
        self.current_stage.is_none()
            && self.extracted.is_none()
            && self.extracted_count == 0
            && self.transformed.is_none()
            && self.transformed_count == 0
            && self.loaded_count == 0
            && !self.validation_passed
            && !self.cleanup_performed
            && self.shared_store_connection.is_none()
    }

    pub fn enter_stage(&mut self, stage: Stage) {
        self.current_stage = Some(stage);
    }

    pub fn record_extraction(&mut self, records: Vec<SourceRecord>) {
        self.extracted_count = records.len();
        self.extracted = Some(records);
    }

    pub fn record_transformation(&mut self, records: Vec<TargetRecord>) {
        self.transformed_count = records.len();
        self.transformed = Some(records);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_context_validates_as_initial() {
        let ctx = Context::new("20250101");
        assert!(ctx.validate_initial());
    }

    #[test]
    fn context_after_extraction_is_not_initial() {
        let mut ctx = Context::new("20250101");
        ctx.record_extraction(vec![]);
        assert!(!ctx.validate_initial());
        assert_eq!(ctx.extracted_count, 0);
        assert!(ctx.extracted.is_some());
    }

    #[test]
    fn enter_stage_tracks_current_stage() {
        let mut ctx = Context::new("20250101");
        ctx.enter_stage(Stage::Extract);
        assert_eq!(ctx.current_stage, Some(Stage::Extract));
    }
}
