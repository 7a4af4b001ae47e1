// /////////////////////////////////////////////////////////////////////////////
// ETL Engine
// Copyright (c) 2025 Data Platform Engineering
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Error Taxonomy
//!
//! The error kinds of spec §7, each carrying enough context to reconstruct
//! the `(stage, date, message, cause)` tuple the propagation policy
//! requires. [`EtlError`] is the single structured error every stage raises;
//! the sequencer (C14) short-circuits a day on any variant except local
//! per-row parser warnings, which never reach this type.

use std::fmt;
use thiserror::Error;

/// One of the five ordered subprocesses (spec §4.11, §7).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Extract,
    Transform,
    Load,
    Validate,
    Clean,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Stage::Extract => "EXTRACT",
            Stage::Transform => "TRANSFORM",
            Stage::Load => "LOAD",
            Stage::Validate => "VALIDATE",
            Stage::Clean => "CLEAN",
        };
        write!(f, "{s}")
    }
}

/// Malformed config, missing required keys, partial credentials.
/// Surfaced before any day starts; maps to exit code 2.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid date range: from `{from}` is after to `{to}`")]
    InvalidDateRange { from: String, to: String },

    #[error("malformed date `{value}` for argument `{arg}`: {reason}")]
    MalformedDate {
        arg: &'static str,
        value: String,
        reason: String,
    },

    #[error("missing required key `{key}` in section `{section}`")]
    MissingKey { section: String, key: String },

    #[error("partial credentials for source `{source}`: only one of secretId/secretKey is set")]
    PartialCredentials { source: String },

    #[error("source `{source}` has unregistered type `{source_type}`")]
    UnknownSourceType { source: String, source_type: String },

    #[error("source type `{source_type}` has no extractor for category `{category}`")]
    UnknownCategory {
        source_type: String,
        category: String,
    },

    #[error("data type `{data_type}` is produced by extraction but is not mapped by any target")]
    UnmappedDataType { data_type: String },
}

/// Object-store listing/fetch/auth failure. Fails the day.
#[derive(Debug, Error)]
#[error("download failed for key `{key}`: {message}")]
pub struct DownloadError {
    pub key: String,
    pub message: String,
    #[source]
    pub cause: Option<Box<dyn std::error::Error + Send + Sync>>,
}

/// A candidate file exceeds the configured ceiling. Fails the day.
#[derive(Debug, Error)]
#[error("file `{key}` is {size} bytes, exceeds ceiling of {ceiling} bytes")]
pub struct FileTooLargeError {
    pub key: String,
    pub size: u64,
    pub ceiling: u64,
}

/// Fatal parse error at file level (missing required column, encoding).
/// Per-row warnings are recovered locally and never become this type.
#[derive(Debug, Error)]
#[error("parse error in `{source}`: {message}")]
pub struct FileParseError {
    pub source: String,
    pub message: String,
    #[source]
    pub cause: Option<Box<dyn std::error::Error + Send + Sync>>,
}

/// Duplicate/missing field order annotations. Fatal at first use, process-wide.
#[derive(Debug, Clone, Error)]
pub enum SchemaError {
    #[error("duplicate column order {order} on type `{type_name}` (fields `{first_field}`, `{second_field}`)")]
    DuplicateOrder {
        type_name: &'static str,
        order: u32,
        first_field: &'static str,
        second_field: &'static str,
    },

    #[error("type `{type_name}` declares no ordered fields")]
    EmptyOrder { type_name: &'static str },
}

/// Bulk insert / append failure. Fails the day; staging left intact.
#[derive(Debug, Error)]
#[error("load failed for target `{target}`: {message}")]
pub struct LoadError {
    pub target: String,
    pub message: String,
    #[source]
    pub cause: Option<Box<dyn std::error::Error + Send + Sync>>,
}

/// Post-load row-count mismatch. Fails the day; staging left intact.
#[derive(Debug, Error)]
#[error("validation failed for target `{target}`: expected {expected} rows, observed {observed}")]
pub struct ValidationError {
    pub target: String,
    pub expected: u64,
    pub observed: u64,
}

/// Drop script failure. Logged; does not retro-fail a successful load, but
/// is surfaced to the operator.
#[derive(Debug, Error)]
#[error("cleanup failed for staging table `{staging_table}`: {message}")]
pub struct CleanupError {
    pub staging_table: String,
    pub message: String,
    #[source]
    pub cause: Option<Box<dyn std::error::Error + Send + Sync>>,
}

/// User cancel. Collapses to a failed day.
#[derive(Debug, Error)]
#[error("run cancelled during stage {stage}")]
pub struct CancelError {
    pub stage: Stage,
}

/// The single structured error every stage raises (spec §7).
///
/// Each variant wraps one kind of the taxonomy above. The `(stage, date)`
/// half of the propagation policy's `(stageName, date, message, cause?)`
/// tuple is carried ambiently by the `tracing` span active when the error
/// is raised and logged (one span per day, one nested span per subprocess,
/// per §10.2) rather than duplicated as fields on every error value; the
/// sequencer (C14) and workflow engine (C16) always raise/log `EtlError`
/// from inside the stage/day span it belongs to.
#[derive(Debug, Error)]
pub enum EtlError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Download(#[from] DownloadError),
    #[error(transparent)]
    FileTooLarge(#[from] FileTooLargeError),
    #[error(transparent)]
    Parse(#[from] FileParseError),
    #[error(transparent)]
    Schema(#[from] SchemaError),
    #[error(transparent)]
    Load(#[from] LoadError),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Cleanup(#[from] CleanupError),
    #[error(transparent)]
    Cancel(#[from] CancelError),
}

impl EtlError {
    pub fn is_config(&self) -> bool {
        matches!(self, EtlError::Config(_))
    }

    pub fn is_cancel(&self) -> bool {
        matches!(self, EtlError::Cancel(_))
    }

    /// The stage in which this error kind always or typically occurs, used
    /// by logging call sites that don't already have an enclosing span
    /// (e.g. a config error raised before any day's span exists).
    pub fn default_stage(&self) -> Stage {
        match self {
            EtlError::Config(_) => Stage::Extract,
            EtlError::Download(_) => Stage::Extract,
            EtlError::FileTooLarge(_) => Stage::Extract,
            EtlError::Parse(_) => Stage::Extract,
            EtlError::Schema(_) => Stage::Transform,
            EtlError::Load(_) => Stage::Load,
            EtlError::Validation(_) => Stage::Validate,
            EtlError::Cleanup(_) => Stage::Clean,
            EtlError::Cancel(inner) => inner.stage,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_error_is_detected() {
        let err = EtlError::Config(ConfigError::InvalidDateRange {
            from: "20250105".into(),
            to: "20250101".into(),
        });
        assert!(err.is_config());
        assert!(!err.is_cancel());
        assert_eq!(err.default_stage(), Stage::Extract);
    }

    #[test]
    fn cancel_error_is_detected() {
        let err = EtlError::Cancel(CancelError { stage: Stage::Extract });
        assert!(err.is_cancel());
        assert!(!err.is_config());
    }

    #[test]
    fn stage_display_matches_sequencer_names() {
        assert_eq!(Stage::Extract.to_string(), "EXTRACT");
        assert_eq!(Stage::Transform.to_string(), "TRANSFORM");
        assert_eq!(Stage::Load.to_string(), "LOAD");
        assert_eq!(Stage::Validate.to_string(), "VALIDATE");
        assert_eq!(Stage::Clean.to_string(), "CLEAN");
    }
}
