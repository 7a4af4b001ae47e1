// /////////////////////////////////////////////////////////////////////////////
// ETL Engine
// Copyright (c) 2025 Data Platform Engineering
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Staging Lifecycle — Load and Clean Subprocesses (C13, spec §4.10)
//!
//! Strict responsibility boundary: staging tables are created and dropped
//! here, never by the loader. The Load subprocess opens the shared
//! connection and runs the create script; the Clean subprocess runs the
//! drop script and closes it.

use crate::loader::{ColumnarLoader, RemoteConnection};
use etl_engine_domain::{
    CleanupError, Context, EtlError, Loader, SharedStoreConnection, StagingTable, TargetConfig, TargetRecord,
};
use std::sync::Arc;

/// Externally supplied create/drop scripts (spec §4.10: "an externally
/// supplied create script (embedded resource)"). Template placeholders
/// `{staging_table}` are substituted per target before execution.
pub struct StagingScripts {
    pub create_template: String,
    pub drop_template: String,
}

fn render(template: &str, staging_table: &str) -> String {
    template.replace("{staging_table}", staging_table)
}

/// Open the shared connection, create staging tables for every configured
/// target, and run `init → sortData → loadData` (spec §4.10). On any error
/// this propagates upward without touching staging — the tables it already
/// created are deliberately left behind for the Clean subprocess or, on an
/// earlier failure, for forensic inspection (spec §6: "persisted state ...
/// staging tables left by a failed run").
///
/// Returns the loader instance alongside the loaded count: per spec §4.10
/// `loader.shutdown()` is the Clean subprocess's responsibility, and
/// `validateLoad` runs in the Validate stage between Load and Clean — the
/// same loader has to survive both.
pub async fn run_load_subprocess(
    ctx: &mut Context,
    target: &TargetConfig,
    connection: Arc<dyn RemoteConnection>,
    scripts: &StagingScripts,
    transformed: Vec<TargetRecord>,
    temp_dir: std::path::PathBuf,
) -> Result<(u64, Box<dyn Loader>), EtlError> {
    ctx.shared_store_connection = Some(connection.clone());

    let business_date = ctx.current_date.replace('-', "").replace('.', "");
    let mut staging_table_names = Vec::new();
    for target_table in target.target_table_mappings.values() {
        let staging = StagingTable::generate(&target.temporary_table_prefix, target_table, &business_date);
        connection.run_script(&render(&scripts.create_template, staging.as_str())).await?;
        staging_table_names.push(staging.as_str().to_string());
    }
    ctx.staging_table_names = staging_table_names.clone();

    let mut loader = ColumnarLoader::new(target.clone(), connection as Arc<dyn crate::loader::ScriptExecutor>, temp_dir)
        .with_staging_tables(staging_table_map(target, &staging_table_names));

    loader.init(ctx).await?;
    let sorted = loader.sort_data(transformed).await?;
    let loaded = loader.load_data(sorted).await?;
    ctx.loaded_count = loaded;
    Ok((loaded, Box::new(loader)))
}

fn staging_table_map(
    target: &TargetConfig,
    staging_table_names: &[String],
) -> std::collections::HashMap<String, String> {
    let mut map = std::collections::HashMap::new();
    for (data_type, target_table) in &target.target_table_mappings {
        if let Some(name) = staging_table_names.iter().find(|n| n.contains(target_table.as_str())) {
            map.insert(data_type.clone(), name.clone());
        }
    }
    map
}

/// Run the drop script over every staging table this run generated, then
/// release loader-owned resources and close the connection (spec §4.10
/// order: drop script, `loader.shutdown()`, close). A drop failure is
/// logged but does not retro-fail an otherwise-successful load (spec §7:
/// `CleanupError` "does not retro-fail a successful load").
pub async fn run_clean_subprocess(
    ctx: &mut Context,
    connection: Arc<dyn RemoteConnection>,
    scripts: &StagingScripts,
    mut loader: Box<dyn Loader>,
) -> Result<(), EtlError> {
    let mut first_cleanup_error = None;
    for staging_table in &ctx.staging_table_names {
        if let Err(e) = connection.run_script(&render(&scripts.drop_template, staging_table)).await {
            let cleanup_err = CleanupError {
                staging_table: staging_table.clone(),
                message: "drop script failed".to_string(),
                cause: Some(Box::new(e)),
            };
            tracing::warn!(staging_table = %staging_table, error = %cleanup_err, "staging table drop failed");
            if first_cleanup_error.is_none() {
                first_cleanup_error = Some(cleanup_err);
            }
        }
    }

    loader.shutdown().await?;
    connection.close();
    ctx.cleanup_performed = true;

    if let Some(err) = first_cleanup_error {
        return Err(err.into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::SqliteRemoteConnection;
    use std::collections::HashMap;

    fn target() -> TargetConfig {
        TargetConfig {
            name: "store".into(),
            target_type: "columnar".into(),
            connection_url: "sqlite::memory:".into(),
            connection_username: String::new(),
            connection_password: String::new(),
            sort_fields: vec!["receiveTime".into()],
            max_memory_mb: 64,
            temporary_table_prefix: "stg".into(),
            target_table_mappings: HashMap::from([("trade".to_string(), "trade_target".to_string())]),
        }
    }

    fn scripts() -> StagingScripts {
        StagingScripts {
            create_template: "CREATE TABLE {staging_table} (exchProductId TEXT, businessDate TEXT, tradeId TEXT, eventTime TEXT, receiveTime TEXT, tradePrice REAL, tradeYield REAL, tradeYieldType TEXT, tradeVolume REAL, tradeSide TEXT, settleSpeed INTEGER); CREATE TABLE IF NOT EXISTS trade_target (exchProductId TEXT, businessDate TEXT, tradeId TEXT, eventTime TEXT, receiveTime TEXT, tradePrice REAL, tradeYield REAL, tradeYieldType TEXT, tradeVolume REAL, tradeSide TEXT, settleSpeed INTEGER)".into(),
            drop_template: "DROP TABLE {staging_table}".into(),
        }
    }

    #[tokio::test]
    async fn load_then_clean_round_trip() {
        let conn: Arc<dyn RemoteConnection> =
            Arc::new(SqliteRemoteConnection::connect("sqlite::memory:").await.unwrap());
        let mut ctx = Context::new("20250101");
        let (loaded, loader) =
            run_load_subprocess(&mut ctx, &target(), conn.clone(), &scripts(), vec![], std::env::temp_dir())
                .await
                .unwrap();
        assert_eq!(loaded, 0);
        assert_eq!(ctx.staging_table_names.len(), 1);

        ctx.validation_passed = true;
        run_clean_subprocess(&mut ctx, conn, &scripts(), loader).await.unwrap();
        assert!(ctx.cleanup_performed);
    }
}
