// /////////////////////////////////////////////////////////////////////////////
// ETL Engine
// Copyright (c) 2025 Data Platform Engineering
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Subprocess Sequencer (C14, spec §4.11)
//!
//! Enforces `EXTRACT → TRANSFORM → LOAD → VALIDATE → CLEAN`. Before each
//! stage the daily workflow asserts (via [`check_precondition`]) that the
//! predecessor's postcondition is visible in `ctx`; a stage failure
//! short-circuits the day. This module owns the precondition rules and the
//! `StageResults` bookkeeping; the daily workflow (C15) drives the actual
//! stage bodies since each one needs different inputs and mutates `ctx`
//! differently.

use chrono::Utc;
use etl_engine_domain::{CancelError, Context, EtlError, LoadError, Stage, SubprocessResult};
use std::collections::BTreeMap;

pub type StageResults = BTreeMap<Stage, SubprocessResult>;

/// Asserts the predecessor's postcondition is visible in `ctx` (spec §4.11).
pub fn check_precondition(ctx: &Context, stage: Stage) -> Result<(), EtlError> {
    let met = match stage {
        Stage::Extract => true,
        Stage::Transform => ctx.extracted_count > 0 || ctx.extracted.is_some(),
        Stage::Load => ctx.transformed_count > 0 || ctx.transformed.is_some(),
        Stage::Validate => true, // `loaded_count` is `u64`, always >= 0.
        Stage::Clean => ctx.validation_passed,
    };
    if met {
        Ok(())
    } else {
        Err(LoadError {
            target: stage.to_string(),
            message: format!("precondition for stage {stage} was not met"),
            cause: None,
        }
        .into())
    }
}

/// Checked by the daily workflow before starting each stage (spec §5:
/// "asked to stop at the next safe suspension point").
pub fn check_not_cancelled(cancelled: bool, stage: Stage) -> Result<(), EtlError> {
    if cancelled {
        Err(CancelError { stage }.into())
    } else {
        Ok(())
    }
}

pub fn record_success(results: &mut StageResults, stage: Stage, processed: u64) {
    results.insert(stage, SubprocessResult::success(processed, Utc::now()));
}

pub fn record_failure(results: &mut StageResults, stage: Stage, error: &EtlError) {
    results.insert(stage, SubprocessResult::failure(error.to_string(), Utc::now()));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transform_without_extraction_fails_precondition() {
        let ctx = Context::new("20250101");
        assert!(check_precondition(&ctx, Stage::Transform).is_err());
    }

    #[test]
    fn transform_after_extraction_passes_precondition() {
        let mut ctx = Context::new("20250101");
        ctx.record_extraction(vec![]);
        ctx.extracted_count = 1;
        assert!(check_precondition(&ctx, Stage::Transform).is_ok());
    }

    #[test]
    fn clean_requires_validation_passed() {
        let mut ctx = Context::new("20250101");
        assert!(check_precondition(&ctx, Stage::Clean).is_err());
        ctx.validation_passed = true;
        assert!(check_precondition(&ctx, Stage::Clean).is_ok());
    }

    #[test]
    fn cancellation_check_raises_cancel_error() {
        let err = check_not_cancelled(true, Stage::Extract).unwrap_err();
        assert!(matches!(err, EtlError::Cancel(_)));
        assert!(check_not_cancelled(false, Stage::Extract).is_ok());
    }

    #[test]
    fn results_record_success_and_failure() {
        let mut results = StageResults::new();
        record_success(&mut results, Stage::Extract, 10);
        assert!(results.get(&Stage::Extract).unwrap().success);
        record_failure(
            &mut results,
            Stage::Load,
            &LoadError { target: "t".into(), message: "boom".into(), cause: None }.into(),
        );
        assert!(!results.get(&Stage::Load).unwrap().success);
    }
}
