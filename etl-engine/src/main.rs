// /////////////////////////////////////////////////////////////////////////////
// ETL Engine
// Copyright (c) 2025 Data Platform Engineering
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # `etl-engine` Binary Entry Point
//!
//! Wires the bootstrap layer to the workflow engine: parse and validate the
//! CLI (spec §6), install the `tracing` subscriber, install signal handlers
//! that drive graceful shutdown, load and validate configuration, build the
//! daily workflow and run the requested date range, then map the outcome to
//! a Unix exit code (spec §6).

use etl_engine::config_loader::load_configuration;
use etl_engine::engine::{ConnectionFactory, WorkflowEngine};
use etl_engine::extractor::ExtractorFactory;
use etl_engine::loader::{RemoteConnection, SqliteRemoteConnection};
use etl_engine::metrics::RunMetrics;
use etl_engine::staging_lifecycle::StagingScripts;
use etl_engine::transform::QuoteIdentity;
use etl_engine::workflow::DailyWorkflow;
use etl_engine_bootstrap::shutdown::ShutdownCoordinator;
use etl_engine_bootstrap::{map_error_to_exit_code, result_to_exit_code, ExitCode};
use etl_engine_domain::EtlError;
use std::sync::Arc;
use std::time::Duration;

struct SqliteConnectionFactory {
    url: String,
}

#[async_trait::async_trait]
impl ConnectionFactory for SqliteConnectionFactory {
    async fn open(&self) -> Result<Arc<dyn RemoteConnection>, EtlError> {
        let conn = SqliteRemoteConnection::connect(&self.url)
            .await
            .map_err(EtlError::from)?;
        Ok(Arc::new(conn))
    }
}

const CREATE_STAGING_SCRIPT: &str = include_str!("../resources/create_staging.sql.tmpl");
const DROP_STAGING_SCRIPT: &str = include_str!("../resources/drop_staging.sql.tmpl");

/// Source types the extractor factory can build (`ExtractorFactory::build`).
const KNOWN_SOURCE_TYPES: &[&str] = &["object_store"];
/// Data types the loader appends in a fixed order (`columnar_loader::APPEND_ORDER`).
const PRODUCED_DATA_TYPES: &[&str] = &["quote", "trade"];

#[tokio::main]
async fn main() -> std::process::ExitCode {
    let code = run().await;
    code.into()
}

async fn run() -> ExitCode {
    let cli = match etl_engine_bootstrap::bootstrap_cli() {
        Ok(cli) => cli,
        Err(e) => {
            eprintln!("invalid arguments: {e}");
            return ExitCode::InvalidArgsOrConfig;
        }
    };

    if let Err(e) = etl_engine_bootstrap::logger::init_tracing(&cli.log_level, cli.log_file.as_deref()) {
        eprintln!("failed to initialize logging: {e}");
        return ExitCode::UnexpectedRuntimeError;
    }

    let coordinator = ShutdownCoordinator::new(Duration::from_secs(30));
    etl_engine_bootstrap::signals::install_signal_handlers(coordinator.clone());

    let config = match load_configuration(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "failed to load configuration");
            return map_error_to_exit_code(&EtlError::from(e));
        }
    };

    if let Err(e) = config.validate(KNOWN_SOURCE_TYPES, PRODUCED_DATA_TYPES) {
        tracing::error!(error = %e, "configuration failed cross-cutting validation");
        return map_error_to_exit_code(&EtlError::from(e));
    }

    let Some(target) = config.targets.first().cloned() else {
        tracing::error!("configuration has no targets");
        return ExitCode::InvalidArgsOrConfig;
    };

    let temp_root = std::env::temp_dir().join("etl-engine");
    if let Err(e) = std::fs::create_dir_all(&temp_root) {
        tracing::error!(error = %e, "failed to create temp root");
        return ExitCode::UnexpectedRuntimeError;
    }

    let workflow = DailyWorkflow {
        config: config.clone(),
        target: target.clone(),
        extractor_factory: ExtractorFactory::new(temp_root.clone()),
        quote_identity: QuoteIdentity {
            source: "etl-engine".to_string(),
            category: "AllPriceDepth".to_string(),
            currency: "USD".to_string(),
            venue: "PRIMARY".to_string(),
        },
        scripts: StagingScripts {
            create_template: CREATE_STAGING_SCRIPT.to_string(),
            drop_template: DROP_STAGING_SCRIPT.to_string(),
        },
        temp_root,
        source_filter: cli.source.clone(),
        dry_run: cli.dry_run,
    };

    let metrics = match RunMetrics::new() {
        Ok(metrics) => metrics,
        Err(e) => {
            tracing::error!(error = %e, "failed to initialize metrics registry");
            return ExitCode::UnexpectedRuntimeError;
        }
    };

    let engine = WorkflowEngine {
        workflow,
        connections: Box::new(SqliteConnectionFactory { url: target.connection_url.clone() }),
        metrics,
    };

    let result = engine.run(&cli.from, &cli.to, coordinator.token()).await;
    coordinator.complete_shutdown();
    result_to_exit_code(result)
}
