// /////////////////////////////////////////////////////////////////////////////
// ETL Engine
// Copyright (c) 2025 Data Platform Engineering
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Workflow Engine (C16, spec §4.13)
//!
//! Expands the date range, runs each day sequentially through the
//! [`DailyWorkflow`], and fail-stops the range on the first failing day —
//! `processed_days` then reflects only the days actually attempted, not the
//! full requested range. A connection is opened fresh per day and handed to
//! `DailyWorkflow::run`, since the shared store connection is single-writer
//! within a day and never shared across days (spec §5, `Context` doc note).

use crate::loader::RemoteConnection;
use crate::metrics::RunMetrics;
use crate::workflow::DailyWorkflow;
use etl_engine_domain::{date_range, DailyProcessResult, EtlError, WorkflowResult};
use std::sync::Arc;
use std::time::Instant;

/// Opens a fresh shared-store connection for one business day. Injected
/// rather than hardcoded so the engine stays agnostic to the concrete
/// remote-store driver (spec §1 external collaborator).
#[async_trait::async_trait]
pub trait ConnectionFactory: Send + Sync {
    async fn open(&self) -> Result<Arc<dyn RemoteConnection>, EtlError>;
}

pub struct WorkflowEngine {
    pub workflow: DailyWorkflow,
    pub connections: Box<dyn ConnectionFactory>,
    pub metrics: RunMetrics,
}

impl WorkflowEngine {
    /// Run every business date in `[from, to]` sequentially, stopping after
    /// the first day whose `DailyProcessResult::success` is `false` (spec
    /// §4.13). Returns the aggregate [`WorkflowResult`] and logs a final
    /// summary of counts and wall-clock duration.
    pub async fn run(
        &self,
        from: &str,
        to: &str,
        cancel: etl_engine_bootstrap::shutdown::CancellationToken,
    ) -> Result<WorkflowResult, EtlError> {
        let dates = date_range(from, to)?;
        let started = Instant::now();

        let mut per_day: Vec<DailyProcessResult> = Vec::new();
        for date in &dates {
            if cancel.is_cancelled() {
                tracing::warn!(date = %date, "stopping before next day: cancellation requested");
                break;
            }

            let connection = self.connections.open().await?;
            self.metrics.record_day_start();
            let result = self.workflow.run(&date.to_yyyymmdd(), connection, cancel.clone()).await;
            self.metrics.record_day_end(result.success);
            let day_succeeded = result.success;
            per_day.push(result);

            if !day_succeeded {
                tracing::error!(date = %date, "fail-stopping date range at first failing day");
                break;
            }
        }

        let attempted_to = per_day.last().map(|d| d.date.clone()).unwrap_or_else(|| from.to_string());
        let result = WorkflowResult::from_days(per_day, from.to_string(), attempted_to);

        tracing::info!(
            processed_days = result.processed_days,
            successful_days = result.successful_days,
            failed_days = result.failed_days,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "workflow run complete"
        );

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::SqliteRemoteConnection;
    use crate::staging_lifecycle::StagingScripts;
    use crate::transform::QuoteIdentity;
    use etl_engine_domain::{Configuration, TargetConfig};
    use std::collections::HashMap;

    struct SqliteFactory;

    #[async_trait::async_trait]
    impl ConnectionFactory for SqliteFactory {
        async fn open(&self) -> Result<Arc<dyn RemoteConnection>, EtlError> {
            let conn = SqliteRemoteConnection::connect("sqlite::memory:").await?;
            Ok(Arc::new(conn))
        }
    }

    fn workflow() -> DailyWorkflow {
        let target = TargetConfig {
            name: "store".into(),
            target_type: "columnar".into(),
            connection_url: "sqlite::memory:".into(),
            connection_username: String::new(),
            connection_password: String::new(),
            sort_fields: vec!["receiveTime".into()],
            max_memory_mb: 64,
            temporary_table_prefix: "stg".into(),
            target_table_mappings: HashMap::new(),
        };
        DailyWorkflow {
            config: Configuration { date_field_name: "businessDate".into(), sources: vec![], targets: vec![target.clone()] },
            target,
            extractor_factory: crate::extractor::ExtractorFactory::new(std::env::temp_dir()),
            quote_identity: QuoteIdentity {
                source: "etl-engine".into(),
                category: "AllPriceDepth".into(),
                currency: "USD".into(),
                venue: "TEST".into(),
            },
            scripts: StagingScripts { create_template: String::new(), drop_template: String::new() },
            temp_root: std::env::temp_dir(),
            source_filter: None,
            dry_run: false,
        }
    }

    #[tokio::test]
    async fn empty_source_range_produces_zero_loaded_and_succeeds() {
        let engine = WorkflowEngine {
            workflow: workflow(),
            connections: Box::new(SqliteFactory),
            metrics: RunMetrics::new().unwrap(),
        };
        let cancel = etl_engine_bootstrap::shutdown::ShutdownCoordinator::default().token();
        let result = engine.run("20250101", "20250101", cancel).await.unwrap();
        assert_eq!(result.processed_days, 1);
        assert!(result.success);
    }

    #[tokio::test]
    async fn dry_run_succeeds_without_a_reachable_target() {
        let mut day = workflow();
        day.dry_run = true;
        // No target table mapping at all; a dry run never reaches Load to
        // notice, unlike a normal run against this same configuration.
        let engine = WorkflowEngine { workflow: day, connections: Box::new(SqliteFactory), metrics: RunMetrics::new().unwrap() };
        let cancel = etl_engine_bootstrap::shutdown::ShutdownCoordinator::default().token();
        let result = engine.run("20250101", "20250101", cancel).await.unwrap();
        assert!(result.success);
    }

    #[tokio::test]
    async fn cancellation_before_the_range_starts_stops_immediately() {
        let engine = WorkflowEngine {
            workflow: workflow(),
            connections: Box::new(SqliteFactory),
            metrics: RunMetrics::new().unwrap(),
        };
        let coordinator = etl_engine_bootstrap::shutdown::ShutdownCoordinator::default();
        coordinator.initiate_shutdown();
        let result = engine.run("20250101", "20250103", coordinator.token()).await.unwrap();
        assert_eq!(result.processed_days, 0);
    }
}
