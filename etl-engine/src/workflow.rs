// /////////////////////////////////////////////////////////////////////////////
// ETL Engine
// Copyright (c) 2025 Data Platform Engineering
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Daily Workflow (C15, spec §4.12)
//!
//! Creates the context, asserts it validates as initial, runs the five
//! subprocesses in order through the sequencer's precondition checks, and
//! folds the outcome into a [`DailyProcessResult`]. A failing stage never
//! propagates past this function — it is captured as `success=false` with
//! an empty subprocess map, logged via `tracing`; the workflow engine (C16)
//! alone decides whether to stop the date range.

use crate::extract_stage::run_extract_stage;
use crate::extractor::ExtractorFactory;
use crate::loader::RemoteConnection;
use crate::sequencer::{self, StageResults};
use crate::staging_lifecycle::{run_clean_subprocess, run_load_subprocess, StagingScripts};
use crate::transform::{transform, QuoteIdentity};
use etl_engine_bootstrap::shutdown::CancellationToken;
use etl_engine_domain::{Configuration, Context, DailyProcessResult, EtlError, Extractor, Loader, Stage, TargetConfig};
use std::path::PathBuf;
use std::sync::Arc;

/// Everything the daily workflow needs to build and run one day, injected
/// rather than reached for as a global (spec §9 design note on global
/// singletons).
pub struct DailyWorkflow {
    pub config: Configuration,
    pub target: TargetConfig,
    pub extractor_factory: ExtractorFactory,
    pub quote_identity: QuoteIdentity,
    pub scripts: StagingScripts,
    pub temp_root: PathBuf,
    /// Restrict extraction to the one configured source with this name;
    /// `None` runs every configured source.
    pub source_filter: Option<String>,
    /// Stop after Transform; Load, Validate, and Clean never run.
    pub dry_run: bool,
}

impl DailyWorkflow {
    /// Run one business date end to end. Never returns `Err`: a failing
    /// stage is captured into the returned `DailyProcessResult` instead
    /// (spec §4.12).
    pub async fn run(
        &self,
        date: &str,
        connection: Arc<dyn RemoteConnection>,
        cancel: CancellationToken,
    ) -> DailyProcessResult {
        let span = tracing::info_span!("daily_workflow", date = %date);
        let _entered = span.enter();

        let mut ctx = Context::new(date.to_string());
        if !ctx.validate_initial() {
            tracing::error!(date = %date, "fresh context failed validate_initial invariant");
            return DailyProcessResult::failed(date);
        }

        let mut results: StageResults = StageResults::new();
        match self.run_all_stages(&mut ctx, &mut results, connection, cancel).await {
            Ok(()) => {
                tracing::info!(date = %date, "day completed successfully");
                DailyProcessResult::succeeded(date, results)
            }
            Err(error) => {
                tracing::error!(date = %date, error = %error, stage = %error.default_stage(), "day failed");
                DailyProcessResult::failed(date)
            }
        }
    }

    async fn run_all_stages(
        &self,
        ctx: &mut Context,
        results: &mut StageResults,
        connection: Arc<dyn RemoteConnection>,
        cancel: CancellationToken,
    ) -> Result<(), EtlError> {
        self.run_extract(ctx, results, cancel.clone()).await?;
        self.run_transform(ctx, results, cancel.is_cancelled())?;

        if self.dry_run {
            tracing::info!(date = %ctx.current_date, "dry run requested; skipping load, validate, and clean");
            return Ok(());
        }

        let loader = self.run_load(ctx, results, connection.clone()).await?;
        let loader = self.run_validate(ctx, results, loader).await?;
        self.run_clean(ctx, results, connection, loader).await?;
        Ok(())
    }

    async fn run_extract(
        &self,
        ctx: &mut Context,
        results: &mut StageResults,
        cancel: CancellationToken,
    ) -> Result<(), EtlError> {
        sequencer::check_not_cancelled(cancel.is_cancelled(), Stage::Extract)?;
        sequencer::check_precondition(ctx, Stage::Extract)?;
        ctx.enter_stage(Stage::Extract);

        let mut extractors: Vec<(String, Box<dyn Extractor>)> = Vec::new();
        for source in &self.config.sources {
            if let Some(wanted) = &self.source_filter {
                if source.name != *wanted {
                    continue;
                }
            }
            let category = source.property("category").unwrap_or_default().to_string();
            let extractor = self.extractor_factory.build(source, &category).map_err(EtlError::from)?;
            extractors.push((source.name.clone(), extractor));
        }

        let read_only_ctx = Context::new(ctx.current_date.clone());
        match run_extract_stage(extractors, &read_only_ctx, cancel).await {
            Ok(outcome) => {
                let count = outcome.records.len() as u64;
                ctx.record_extraction(outcome.records);
                sequencer::record_success(results, Stage::Extract, count);
                Ok(())
            }
            Err(error) => {
                sequencer::record_failure(results, Stage::Extract, &error);
                Err(error)
            }
        }
    }

    fn run_transform(&self, ctx: &mut Context, results: &mut StageResults, cancelled: bool) -> Result<(), EtlError> {
        sequencer::check_not_cancelled(cancelled, Stage::Transform)?;
        sequencer::check_precondition(ctx, Stage::Transform)?;
        ctx.enter_stage(Stage::Transform);

        let extracted = ctx.extracted.clone().unwrap_or_default();
        let transformed = transform(extracted, &self.quote_identity);
        let count = transformed.len() as u64;
        ctx.record_transformation(transformed);
        sequencer::record_success(results, Stage::Transform, count);
        Ok(())
    }

    async fn run_load(
        &self,
        ctx: &mut Context,
        results: &mut StageResults,
        connection: Arc<dyn RemoteConnection>,
    ) -> Result<Box<dyn Loader>, EtlError> {
        sequencer::check_precondition(ctx, Stage::Load)?;
        ctx.enter_stage(Stage::Load);

        let transformed = ctx.transformed.clone().unwrap_or_default();
        let temp_dir = self.temp_root.join(format!("load-{}", ctx.current_date));
        std::fs::create_dir_all(&temp_dir).map_err(|e| etl_engine_domain::LoadError {
            target: temp_dir.display().to_string(),
            message: "failed to create loader temp directory".to_string(),
            cause: Some(Box::new(e)),
        })?;

        match run_load_subprocess(ctx, &self.target, connection, &self.scripts, transformed, temp_dir).await {
            Ok((loaded, loader)) => {
                sequencer::record_success(results, Stage::Load, loaded);
                Ok(loader)
            }
            Err(error) => {
                sequencer::record_failure(results, Stage::Load, &error);
                Err(error)
            }
        }
    }

    /// Runs `loader.validate_load()` (spec §4.9) between Load and Clean;
    /// the loader must outlive this stage so Clean can still call
    /// `shutdown()` on it (spec §4.10).
    async fn run_validate(
        &self,
        ctx: &mut Context,
        results: &mut StageResults,
        mut loader: Box<dyn Loader>,
    ) -> Result<Box<dyn Loader>, EtlError> {
        sequencer::check_precondition(ctx, Stage::Validate)?;
        ctx.enter_stage(Stage::Validate);

        match loader.validate_load().await {
            Ok(()) => {
                ctx.validation_passed = true;
                sequencer::record_success(results, Stage::Validate, ctx.loaded_count);
                Ok(loader)
            }
            Err(error) => {
                sequencer::record_failure(results, Stage::Validate, &error);
                Err(error)
            }
        }
    }

    async fn run_clean(
        &self,
        ctx: &mut Context,
        results: &mut StageResults,
        connection: Arc<dyn RemoteConnection>,
        loader: Box<dyn Loader>,
    ) -> Result<(), EtlError> {
        sequencer::check_precondition(ctx, Stage::Clean)?;
        ctx.enter_stage(Stage::Clean);

        match run_clean_subprocess(ctx, connection, &self.scripts, loader).await {
            Ok(()) => {
                sequencer::record_success(results, Stage::Clean, ctx.staging_table_names.len() as u64);
                Ok(())
            }
            Err(error) => {
                // `CleanupError` is logged but does not retro-fail an
                // otherwise-successful load (spec §7); record it and
                // continue rather than propagating.
                tracing::warn!(date = %ctx.current_date, error = %error, "cleanup failed; day remains successful");
                sequencer::record_failure(results, Stage::Clean, &error);
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractor::CATEGORY_ALL_PRICE_DEPTH;
    use crate::staging_lifecycle::StagingScripts;
    use etl_engine_domain::{SourceConfig, TargetConfig};
    use std::collections::HashMap;

    fn source(name: &str) -> SourceConfig {
        SourceConfig {
            name: name.to_string(),
            source_type: "object_store".into(),
            connection_string: "memory://".into(),
            properties: HashMap::from([("category".to_string(), CATEGORY_ALL_PRICE_DEPTH.to_string())]),
        }
    }

    /// Not buildable by `ExtractorFactory`; stands in for "a source the
    /// filter must exclude, or building it would fail the whole stage".
    fn unbuildable_source(name: &str) -> SourceConfig {
        SourceConfig { name: name.to_string(), source_type: "sftp".into(), connection_string: "x".into(), properties: HashMap::new() }
    }

    fn workflow(sources: Vec<SourceConfig>, source_filter: Option<String>) -> DailyWorkflow {
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
            config: Configuration { date_field_name: "businessDate".into(), sources, targets: vec![target.clone()] },
            target,
            extractor_factory: ExtractorFactory::new(std::env::temp_dir()),
            quote_identity: QuoteIdentity {
                source: "etl-engine".into(),
                category: CATEGORY_ALL_PRICE_DEPTH.to_string(),
                currency: "USD".into(),
                venue: "TEST".into(),
            },
            scripts: StagingScripts { create_template: String::new(), drop_template: String::new() },
            temp_root: std::env::temp_dir(),
            source_filter,
            dry_run: false,
        }
    }

    /// A named source filter only builds an extractor for the matching
    /// configured source; an unfiltered run would try to build every
    /// source, including one the factory cannot construct, and fail.
    #[tokio::test]
    async fn source_filter_restricts_extraction_to_the_named_source() {
        let day = workflow(vec![source("ebs"), unbuildable_source("other")], Some("ebs".to_string()));
        let mut ctx = Context::new("20250101");
        let mut results = StageResults::new();
        let cancel = etl_engine_bootstrap::shutdown::ShutdownCoordinator::default().token();

        day.run_extract(&mut ctx, &mut results, cancel).await.unwrap();
        assert_eq!(ctx.extracted_count, 0);
    }

    /// With no filter, every configured source is built, including the one
    /// the factory rejects — this is the control proving the test above
    /// actually exercises exclusion rather than the factory being lenient.
    #[tokio::test]
    async fn no_filter_attempts_every_configured_source() {
        let day = workflow(vec![source("ebs"), unbuildable_source("other")], None);
        let mut ctx = Context::new("20250101");
        let mut results = StageResults::new();
        let cancel = etl_engine_bootstrap::shutdown::ShutdownCoordinator::default().token();

        let error = day.run_extract(&mut ctx, &mut results, cancel).await.unwrap_err();
        assert!(matches!(error, EtlError::Config(_)));
    }
}
