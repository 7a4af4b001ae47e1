// /////////////////////////////////////////////////////////////////////////////
// ETL Engine
// Copyright (c) 2025 Data Platform Engineering
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Concurrent Extract Stage (C8, spec §4.6, §5)
//!
//! Fans out one task per configured source, fans the results back into a
//! single append-only buffer, and applies the partial-failure policy: the
//! stage succeeds if at least one extractor succeeds, with failed sources'
//! records simply absent; it fails only when every source fails. A cancel
//! signal asks every task to stop at its next safe suspension point and
//! discards whatever that task had extracted so far (spec §5).

use etl_engine_bootstrap::shutdown::CancellationToken;
use etl_engine_domain::{CancelError, Context, EtlError, Extractor, SourceRecord, Stage};
use std::collections::HashMap;

/// Outcome of one source's extraction attempt, tracked for per-source
/// metrics even when the stage as a whole succeeds (spec §4.6).
pub enum SourceOutcome {
    Succeeded { records: usize },
    Failed { error: EtlError },
    Cancelled,
}

pub struct ExtractStageResult {
    pub records: Vec<SourceRecord>,
    pub per_source: HashMap<String, SourceOutcome>,
}

/// Run every extractor's lifecycle concurrently against the same read-only
/// context handle (spec §4.6: "all tasks receive the same read-only ctx
/// handle; they must not mutate it").
pub async fn run_extract_stage(
    mut extractors: Vec<(String, Box<dyn Extractor>)>,
    ctx: &Context,
    cancel: CancellationToken,
) -> Result<ExtractStageResult, EtlError> {
    let date = ctx.current_date.clone();
    let tasks = extractors.drain(..).map(|(name, mut extractor)| {
        let date = date.clone();
        let cancel = cancel.clone();
        async move {
            let outcome = run_one_extractor(extractor.as_mut(), &date, cancel).await;
            (name, outcome)
        }
    });

    let results: Vec<(String, Result<Vec<SourceRecord>, EtlError>)> = futures::future::join_all(tasks).await;

    let mut buffer = Vec::new();
    let mut per_source = HashMap::new();
    let mut succeeded_count = 0usize;
    let mut first_failure: Option<EtlError> = None;

    for (name, outcome) in results {
        match outcome {
            Ok(records) => {
                succeeded_count += 1;
                per_source.insert(name, SourceOutcome::Succeeded { records: records.len() });
                buffer.extend(records);
            }
            Err(EtlError::Cancel(_)) => {
                per_source.insert(name, SourceOutcome::Cancelled);
            }
            Err(error) => {
                if first_failure.is_none() {
                    first_failure = Some(clone_for_aggregate(&error));
                }
                per_source.insert(name, SourceOutcome::Failed { error });
            }
        }
    }

    if cancel.is_cancelled() {
        tracing::warn!(date = %date, "extraction cancelled; discarding any partial results");
        return Err(EtlError::Cancel(CancelError { stage: Stage::Extract }));
    }

    if succeeded_count == 0 && !per_source.is_empty() {
        let cause = first_failure.unwrap_or(EtlError::Cancel(CancelError { stage: Stage::Extract }));
        tracing::error!(date = %date, error = %cause, "all extractors failed; stage failed");
        return Err(cause);
    }

    Ok(ExtractStageResult { records: buffer, per_source })
}

async fn run_one_extractor(
    extractor: &mut dyn Extractor,
    date: &str,
    cancel: CancellationToken,
) -> Result<Vec<SourceRecord>, EtlError> {
    // Placeholder context: extractors only read `current_date`, which the
    // stage already owns a copy of, so a throwaway per-task context
    // satisfies the "read-only handle" contract without sharing mutable
    // state across tasks (spec §9 design note on shared mutable context).
    let task_ctx = Context::new(date.to_string());

    extractor.validate(&task_ctx).await?;
    extractor.setup(&task_ctx).await?;

    let result = tokio::select! {
        biased;
        _ = cancel.cancelled() => {
            Err(EtlError::Cancel(CancelError { stage: Stage::Extract }))
        }
        extracted = extractor.extract(&task_ctx) => extracted,
    };

    // Cleanup runs regardless of outcome so per-task resources never leak.
    let cleanup_result = extractor.cleanup().await;
    if let Err(cleanup_err) = cleanup_result {
        tracing::warn!(error = %cleanup_err, "extractor cleanup failed");
    }

    result
}

fn clone_for_aggregate(error: &EtlError) -> EtlError {
    // `EtlError`'s inner kinds carry `Box<dyn Error>` causes that are not
    // `Clone`; the aggregate-failure path only needs the *first* cause's
    // message, so it is re-rendered as a fresh `Download`-shaped error
    // carrying no further source chain.
    EtlError::Download(etl_engine_domain::DownloadError {
        key: "aggregate".to_string(),
        message: error.to_string(),
        cause: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use etl_engine_bootstrap::shutdown::ShutdownCoordinator;
    use std::time::Duration;

    struct AlwaysSucceeds(usize);
    #[async_trait]
    impl Extractor for AlwaysSucceeds {
        fn category(&self) -> &str {
            "test"
        }
        async fn validate(&self, _ctx: &Context) -> Result<(), EtlError> {
            Ok(())
        }
        async fn setup(&mut self, _ctx: &Context) -> Result<(), EtlError> {
            Ok(())
        }
        async fn extract(&mut self, _ctx: &Context) -> Result<Vec<SourceRecord>, EtlError> {
            Ok((0..self.0)
                .map(|i| {
                    SourceRecord::Trade(etl_engine_domain::TradeSourceRecord {
                        exch_product_id: "EURUSD.IB".into(),
                        business_date: "2025.01.01".into(),
                        trade_id: format!("t{i}"),
                        event_time: String::new(),
                        receive_time: String::new(),
                        net_price: 1.0,
                        deal_size: 1.0,
                        set_days: "T+0".into(),
                        side: etl_engine_domain::RawTradeSide::Done,
                    })
                })
                .collect())
        }
        async fn cleanup(&mut self) -> Result<(), EtlError> {
            Ok(())
        }
    }

    struct AlwaysFails;
    #[async_trait]
    impl Extractor for AlwaysFails {
        fn category(&self) -> &str {
            "test"
        }
        async fn validate(&self, _ctx: &Context) -> Result<(), EtlError> {
            Ok(())
        }
        async fn setup(&mut self, _ctx: &Context) -> Result<(), EtlError> {
            Ok(())
        }
        async fn extract(&mut self, _ctx: &Context) -> Result<Vec<SourceRecord>, EtlError> {
            Err(EtlError::Download(etl_engine_domain::DownloadError {
                key: "k".into(),
                message: "boom".into(),
                cause: None,
            }))
        }
        async fn cleanup(&mut self) -> Result<(), EtlError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn partial_failure_keeps_the_succeeding_sources_records() {
        let ctx = Context::new("20250101");
        let coordinator = ShutdownCoordinator::new(Duration::from_secs(1));
        let extractors: Vec<(String, Box<dyn Extractor>)> =
            vec![("ok".into(), Box::new(AlwaysSucceeds(10))), ("bad".into(), Box::new(AlwaysFails))];

        let result = run_extract_stage(extractors, &ctx, coordinator.token()).await.unwrap();
        assert_eq!(result.records.len(), 10);
        assert!(matches!(result.per_source.get("bad"), Some(SourceOutcome::Failed { .. })));
    }

    #[tokio::test]
    async fn zero_configured_sources_succeeds_with_no_records() {
        let ctx = Context::new("20250101");
        let coordinator = ShutdownCoordinator::new(Duration::from_secs(1));
        let extractors: Vec<(String, Box<dyn Extractor>)> = Vec::new();

        let result = run_extract_stage(extractors, &ctx, coordinator.token()).await.unwrap();
        assert!(result.records.is_empty());
    }

    #[tokio::test]
    async fn total_failure_fails_the_stage() {
        let ctx = Context::new("20250101");
        let coordinator = ShutdownCoordinator::new(Duration::from_secs(1));
        let extractors: Vec<(String, Box<dyn Extractor>)> =
            vec![("bad1".into(), Box::new(AlwaysFails)), ("bad2".into(), Box::new(AlwaysFails))];

        let result = run_extract_stage(extractors, &ctx, coordinator.token()).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn cancellation_before_run_discards_results() {
        let ctx = Context::new("20250101");
        let coordinator = ShutdownCoordinator::new(Duration::from_secs(1));
        coordinator.initiate_shutdown();
        let extractors: Vec<(String, Box<dyn Extractor>)> = vec![("ok".into(), Box::new(AlwaysSucceeds(3)))];

        let result = run_extract_stage(extractors, &ctx, coordinator.token()).await;
        assert!(matches!(result, Err(EtlError::Cancel(_))));
    }
}
