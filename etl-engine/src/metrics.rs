// /////////////////////////////////////////////////////////////////////////////
// ETL Engine
// Copyright (c) 2025 Data Platform Engineering
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Run Metrics (ambient, spec §10.6)
//!
//! Prometheus-backed counters/gauges for records extracted, transformed and
//! loaded per day, plus per-source extraction failure counts. Spec §1 only
//! excludes concrete transform/validate/driver logic, not observability, so
//! this mirrors the teacher's `MetricsService` (own `Registry`, one set of
//! named/namespaced metrics, a thin recording API) scaled to what the
//! workflow engine and daily workflow actually report.

use etl_engine_domain::{EtlError, Stage};
use prometheus::{IntCounter, IntCounterVec, IntGauge, Opts, Registry};

/// Owns a dedicated `Registry` rather than the process-wide default so
/// tests can construct independent instances without metric-name
/// collisions (same reasoning as the teacher's `MetricsService::new`).
pub struct RunMetrics {
    registry: Registry,
    records_extracted_total: IntCounter,
    records_transformed_total: IntCounter,
    records_loaded_total: IntCounter,
    days_processed_total: IntCounter,
    days_failed_total: IntCounter,
    source_failures_total: IntCounterVec,
    stage_failures_total: IntCounterVec,
    active_day: IntGauge,
}

impl RunMetrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let records_extracted_total = IntCounter::with_opts(
            Opts::new("records_extracted_total", "Total records returned by the Extract stage").namespace("etl_engine"),
        )?;
        let records_transformed_total = IntCounter::with_opts(
            Opts::new("records_transformed_total", "Total records kept by the Transform stage")
                .namespace("etl_engine"),
        )?;
        let records_loaded_total = IntCounter::with_opts(
            Opts::new("records_loaded_total", "Total records appended to target tables by the Load stage")
                .namespace("etl_engine"),
        )?;
        let days_processed_total = IntCounter::with_opts(
            Opts::new("days_processed_total", "Total business days attempted").namespace("etl_engine"),
        )?;
        let days_failed_total = IntCounter::with_opts(
            Opts::new("days_failed_total", "Total business days that ended in failure").namespace("etl_engine"),
        )?;
        let source_failures_total = IntCounterVec::new(
            Opts::new("source_failures_total", "Extraction failures per configured source").namespace("etl_engine"),
            &["source"],
        )?;
        let stage_failures_total = IntCounterVec::new(
            Opts::new("stage_failures_total", "Subprocess failures per stage").namespace("etl_engine"),
            &["stage"],
        )?;
        let active_day = IntGauge::with_opts(
            Opts::new("active_day", "1 while a business day is being processed, 0 otherwise").namespace("etl_engine"),
        )?;

        registry.register(Box::new(records_extracted_total.clone()))?;
        registry.register(Box::new(records_transformed_total.clone()))?;
        registry.register(Box::new(records_loaded_total.clone()))?;
        registry.register(Box::new(days_processed_total.clone()))?;
        registry.register(Box::new(days_failed_total.clone()))?;
        registry.register(Box::new(source_failures_total.clone()))?;
        registry.register(Box::new(stage_failures_total.clone()))?;
        registry.register(Box::new(active_day.clone()))?;

        Ok(Self {
            registry,
            records_extracted_total,
            records_transformed_total,
            records_loaded_total,
            days_processed_total,
            days_failed_total,
            source_failures_total,
            stage_failures_total,
            active_day,
        })
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn record_extracted(&self, count: u64) {
        self.records_extracted_total.inc_by(count);
    }

    pub fn record_transformed(&self, count: u64) {
        self.records_transformed_total.inc_by(count);
    }

    pub fn record_loaded(&self, count: u64) {
        self.records_loaded_total.inc_by(count);
    }

    pub fn record_source_failure(&self, source: &str) {
        self.source_failures_total.with_label_values(&[source]).inc();
    }

    pub fn record_day_start(&self) {
        self.active_day.set(1);
    }

    pub fn record_day_end(&self, success: bool) {
        self.active_day.set(0);
        self.days_processed_total.inc();
        if !success {
            self.days_failed_total.inc();
        }
    }

    /// Records a stage failure by the `EtlError`'s own stage classification
    /// (`Cancel` carries its own stage; everything else falls back to
    /// `default_stage`).
    pub fn record_stage_failure(&self, error: &EtlError) {
        let stage = match error {
            EtlError::Cancel(inner) => inner.stage,
            other => other.default_stage(),
        };
        self.stage_failures_total.with_label_values(&[stage_label(stage)]).inc();
    }
}

fn stage_label(stage: Stage) -> &'static str {
    match stage {
        Stage::Extract => "extract",
        Stage::Transform => "transform",
        Stage::Load => "load",
        Stage::Validate => "validate",
        Stage::Clean => "clean",
    }
}
