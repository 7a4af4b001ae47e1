// /////////////////////////////////////////////////////////////////////////////
// ETL Engine
// Copyright (c) 2025 Data Platform Engineering
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Exit Code Management
//!
//! Maps the engine's outcome to the four exit codes specified in spec §6.
//!
//! ## Exit Code Conventions
//!
//! - **0**: success — every day in the range processed successfully
//! - **1**: at least one day in the range failed
//! - **2**: invalid CLI arguments or configuration, before any day started
//! - **3**: unexpected runtime error outside the normal per-day failure path

use etl_engine_domain::{EtlError, WorkflowResult};
use std::fmt;

/// Exit codes matching spec §6.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(i32)]
pub enum ExitCode {
    #[default]
    Success = 0,
    DayFailed = 1,
    InvalidArgsOrConfig = 2,
    UnexpectedRuntimeError = 3,
}

impl ExitCode {
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    pub fn description(self) -> &'static str {
        match self {
            ExitCode::Success => "success",
            ExitCode::DayFailed => "at least one day failed",
            ExitCode::InvalidArgsOrConfig => "invalid arguments or configuration",
            ExitCode::UnexpectedRuntimeError => "unexpected runtime error",
        }
    }

    pub fn is_success(self) -> bool {
        matches!(self, ExitCode::Success)
    }
}

impl fmt::Display for ExitCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.description(), self.as_i32())
    }
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> i32 {
        code.as_i32()
    }
}

impl From<ExitCode> for std::process::ExitCode {
    fn from(code: ExitCode) -> std::process::ExitCode {
        std::process::ExitCode::from(code.as_i32() as u8)
    }
}

/// Map an [`EtlError`] raised before any day started to an exit code.
///
/// `ConfigError` (malformed CLI/config, bad date range, schema errors
/// surfaced at composition time) maps to 2; everything else that escapes
/// the workflow engine is treated as an unexpected runtime error (3).
pub fn map_error_to_exit_code(error: &EtlError) -> ExitCode {
    match error {
        EtlError::Config(_) => ExitCode::InvalidArgsOrConfig,
        _ => ExitCode::UnexpectedRuntimeError,
    }
}

/// Map the engine's top-level result to a process exit code.
///
/// - `Err` means the engine could not even start the range (bad config) or
///   hit an unexpected runtime error: 2 or 3.
/// - `Ok(result)` means the range was attempted: 0 if every day succeeded,
///   1 if any day failed (spec §6).
pub fn result_to_exit_code(result: Result<WorkflowResult, EtlError>) -> ExitCode {
    match result {
        Ok(workflow) if workflow.success => ExitCode::Success,
        Ok(_) => ExitCode::DayFailed,
        Err(e) => map_error_to_exit_code(&e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use etl_engine_domain::ConfigError;

    #[test]
    fn exit_code_values_match_spec() {
        assert_eq!(ExitCode::Success.as_i32(), 0);
        assert_eq!(ExitCode::DayFailed.as_i32(), 1);
        assert_eq!(ExitCode::InvalidArgsOrConfig.as_i32(), 2);
        assert_eq!(ExitCode::UnexpectedRuntimeError.as_i32(), 3);
    }

    #[test]
    fn config_error_maps_to_two() {
        let err = EtlError::Config(ConfigError::InvalidDateRange {
            from: "20250105".into(),
            to: "20250101".into(),
        });
        assert_eq!(map_error_to_exit_code(&err), ExitCode::InvalidArgsOrConfig);
    }

    #[test]
    fn successful_workflow_maps_to_zero() {
        let workflow = WorkflowResult {
            processed_days: 2,
            successful_days: 2,
            failed_days: 0,
            per_day: vec![],
            start_date: "20250101".into(),
            end_date: "20250102".into(),
            success: true,
        };
        assert_eq!(result_to_exit_code(Ok(workflow)), ExitCode::Success);
    }

    #[test]
    fn failed_day_maps_to_one() {
        let workflow = WorkflowResult {
            processed_days: 2,
            successful_days: 1,
            failed_days: 1,
            per_day: vec![],
            start_date: "20250101".into(),
            end_date: "20250102".into(),
            success: false,
        };
        assert_eq!(result_to_exit_code(Ok(workflow)), ExitCode::DayFailed);
    }
}
