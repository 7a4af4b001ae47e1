// /////////////////////////////////////////////////////////////////////////////
// ETL Engine
// Copyright (c) 2025 Data Platform Engineering
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Crate-level integration tests exercising the literal end-to-end
//! scenarios documented for this engine: a two-file quote extraction
//! folded into target records, and a loader-reported row-count mismatch
//! that the Validate stage surfaces as a `ValidationError`.
//!
//! Unlike the in-module unit tests (per-source partial/total failure in
//! `extract_stage`, cancellation in `extract_stage`/`engine`, column-order
//! resolution in `column_order`), these wire real collaborators together:
//! an in-memory object store, the streaming CSV parser, the concrete
//! extractor, and the Transform stage.

use etl_engine::extract_stage::run_extract_stage;
use etl_engine::extractor::{ObjectStoreExtractor, CATEGORY_ALL_PRICE_DEPTH};
use etl_engine::loader::{ColumnarLoader, ScriptExecutor, SqliteRemoteConnection};
use etl_engine::object_store_client::ObjectStoreClient;
use etl_engine::transform::{transform, QuoteIdentity};
use etl_engine_bootstrap::shutdown::ShutdownCoordinator;
use etl_engine_domain::{Context, EtlError, Loader, SourceConfig, TargetConfig, TargetRecord, TargetRecordCapability};
use object_store::memory::InMemory;
use object_store::path::Path as ObjectPath;
use object_store::{ObjectStore, PutPayload};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

fn quote_source() -> SourceConfig {
    SourceConfig {
        name: "ebs".into(),
        source_type: "object_store".into(),
        connection_string: "memory://".into(),
        properties: HashMap::from([("category".to_string(), CATEGORY_ALL_PRICE_DEPTH.to_string())]),
    }
}

/// Two files under `AllPriceDepth/20250101/`, three message offsets total,
/// one bid/offer pair at level 1 each. Matches the literal values of the
/// first end-to-end scenario: `bid1Price=100.5`, `offer1Price=101.5`.
async fn seed_two_files(store: &InMemory) {
    let file_a = "mqOffset,productId,level,side,price,volume\n\
                  1,EURUSD,1,0,100.5,1000\n\
                  1,EURUSD,1,1,101.5,500\n\
                  2,EURUSD,1,0,100.5,1000\n";
    let file_b = "mqOffset,productId,level,side,price,volume\n\
                  2,EURUSD,1,1,101.5,500\n\
                  3,EURUSD,1,0,100.5,1000\n\
                  3,EURUSD,1,1,101.5,500\n";

    store
        .put(&ObjectPath::from("AllPriceDepth/20250101/a.csv"), PutPayload::from(file_a.as_bytes().to_vec()))
        .await
        .unwrap();
    store
        .put(&ObjectPath::from("AllPriceDepth/20250101/b.csv"), PutPayload::from(file_b.as_bytes().to_vec()))
        .await
        .unwrap();
}

#[tokio::test]
async fn scenario_one_two_files_fold_into_three_quote_target_records() {
    let store = InMemory::new();
    seed_two_files(&store).await;
    let store: Arc<dyn ObjectStore> = Arc::new(store);

    let temp_dir = tempfile::tempdir().unwrap();
    let client = Arc::new(ObjectStoreClient::new(store, temp_dir.path().to_path_buf()));
    let extractor: Box<dyn etl_engine_domain::Extractor> =
        Box::new(ObjectStoreExtractor::new(quote_source(), CATEGORY_ALL_PRICE_DEPTH, client));

    let ctx = Context::new("20250101");
    let coordinator = ShutdownCoordinator::new(Duration::from_secs(5));
    let outcome = run_extract_stage(vec![("ebs".to_string(), extractor)], &ctx, coordinator.token())
        .await
        .unwrap();
    assert_eq!(outcome.records.len(), 3);

    let identity = QuoteIdentity {
        source: "ebs".into(),
        category: CATEGORY_ALL_PRICE_DEPTH.to_string(),
        currency: "USD".into(),
        venue: "EBS".into(),
    };
    let targets = transform(outcome.records, &identity);
    assert_eq!(targets.len(), 3);

    for target in &targets {
        let TargetRecord::Quote(q) = target else { panic!("expected quote target record") };
        assert_eq!(q.business_date, "2025.01.01");
        assert!(q.exch_product_id.ends_with(".IB"));
        assert_eq!(q.levels[1].bid_price, Some(100.5));
        assert_eq!(q.levels[1].offer_price, Some(101.5));
        assert!(q.validate());
    }
}

fn target_config() -> TargetConfig {
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

/// One source returning records, the other configured with a size ceiling
/// its own files trip: the stage still succeeds on the surviving source's
/// output (second scenario's partial-failure policy).
#[tokio::test]
async fn scenario_two_one_source_failing_does_not_fail_the_stage() {
    let store = InMemory::new();
    seed_two_files(&store).await;
    let store: Arc<dyn ObjectStore> = Arc::new(store);
    let temp_dir = tempfile::tempdir().unwrap();
    let client = Arc::new(ObjectStoreClient::new(store, temp_dir.path().to_path_buf()));

    let good: Box<dyn etl_engine_domain::Extractor> =
        Box::new(ObjectStoreExtractor::new(quote_source(), CATEGORY_ALL_PRICE_DEPTH, client.clone()));

    let mut tiny_ceiling_props = HashMap::new();
    tiny_ceiling_props.insert("category".to_string(), CATEGORY_ALL_PRICE_DEPTH.to_string());
    tiny_ceiling_props.insert("maxFileSize".to_string(), "1".to_string());
    let tight_source =
        SourceConfig { name: "tight".into(), source_type: "object_store".into(), connection_string: "memory://".into(), properties: tiny_ceiling_props };
    let bad: Box<dyn etl_engine_domain::Extractor> =
        Box::new(ObjectStoreExtractor::new(tight_source, CATEGORY_ALL_PRICE_DEPTH, client));

    let ctx = Context::new("20250101");
    let coordinator = ShutdownCoordinator::new(Duration::from_secs(5));
    let outcome = run_extract_stage(
        vec![("ebs".to_string(), good), ("tight".to_string(), bad)],
        &ctx,
        coordinator.token(),
    )
    .await
    .unwrap();

    assert_eq!(outcome.records.len(), 3);
    assert!(matches!(
        outcome.per_source.get("tight"),
        Some(etl_engine::extract_stage::SourceOutcome::Failed { .. })
    ));
}

/// Third scenario's core assertion: the loader reports a row-count
/// mismatch, which the Validate stage surfaces as a `ValidationError`
/// rather than silently accepting a short append.
#[tokio::test]
async fn scenario_three_row_count_mismatch_surfaces_as_validation_error() {
    let conn = Arc::new(SqliteRemoteConnection::connect("sqlite::memory:").await.unwrap());
    conn.run_script(
        "CREATE TABLE staging_trade (exchProductId TEXT, tradeId TEXT); \
         CREATE TABLE trade_target (exchProductId TEXT, tradeId TEXT); \
         INSERT INTO staging_trade VALUES ('a.IB', 't1'); \
         INSERT INTO staging_trade VALUES ('a.IB', 't2');",
    )
    .await
    .unwrap();

    let mut loader = ColumnarLoader::new(target_config(), conn as Arc<dyn ScriptExecutor>, std::env::temp_dir())
        .with_staging_tables(HashMap::from([("trade".to_string(), "staging_trade".to_string())]));

    let error = loader.validate_load().await.unwrap_err();
    assert!(matches!(error, EtlError::Validation(_)));
}

/// Sixth scenario's cleanup guarantee: cancellation during extraction
/// leaves no per-source temp directory behind, since `cleanup()` always
/// runs regardless of how `extract()` resolved (`extract_stage::run_one_extractor`).
#[tokio::test]
async fn scenario_six_cancellation_removes_the_per_source_temp_directory() {
    let store = InMemory::new();
    seed_two_files(&store).await;
    let store: Arc<dyn ObjectStore> = Arc::new(store);
    let temp_dir = tempfile::tempdir().unwrap();
    let client = Arc::new(ObjectStoreClient::new(store, temp_dir.path().to_path_buf()));

    let extractor: Box<dyn etl_engine_domain::Extractor> =
        Box::new(ObjectStoreExtractor::new(quote_source(), CATEGORY_ALL_PRICE_DEPTH, client));

    let ctx = Context::new("20250101");
    let coordinator = ShutdownCoordinator::new(Duration::from_secs(5));
    coordinator.initiate_shutdown();

    let result = run_extract_stage(vec![("ebs".to_string(), extractor)], &ctx, coordinator.token()).await;
    assert!(matches!(result, Err(EtlError::Cancel(_))));

    // The extractor's own per-run temp directory is gone; only the shared
    // object-store-client temp directory (used for downloaded file bytes,
    // untouched by this run since nothing downloaded before cancellation)
    // remains on disk.
    let leftover_entries: Vec<_> = std::fs::read_dir(temp_dir.path()).unwrap().collect();
    assert!(leftover_entries.is_empty());
}
