// /////////////////////////////////////////////////////////////////////////////
// ETL Engine
// Copyright (c) 2025 Data Platform Engineering
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Command-Line Interface Module
//!
//! Parses the CLI surface described in spec §6:
//!
//! ```text
//! <tool> --config <path> --from YYYYMMDD --to YYYYMMDD
//!        [--source <name>] [--dry-run] [--log-level LEVEL] [--log-file PATH]
//! ```
//!
//! The concrete argument grammar is deliberately thin per spec §1 — the CLI
//! front end is an external collaborator from the core engine's point of
//! view. What lives here is just enough to get a [`ValidatedCli`] into the
//! hands of the workflow engine and to fail fast (exit code 2) on malformed
//! input, before any day is attempted.

use clap::Parser;
use std::path::PathBuf;
use thiserror::Error;

/// Raw CLI definition, parsed by `clap`.
#[derive(Debug, Parser)]
#[command(
    name = "etl-engine",
    version,
    about = "Daily ETL orchestration engine: extract, transform, load, validate, clean"
)]
struct Cli {
    /// Path to the INI configuration file.
    #[arg(long)]
    config: PathBuf,

    /// First business date to process, inclusive (YYYYMMDD).
    #[arg(long)]
    from: String,

    /// Last business date to process, inclusive (YYYYMMDD).
    #[arg(long)]
    to: String,

    /// Restrict the run to a single configured source by name.
    #[arg(long)]
    source: Option<String>,

    /// Run extraction and transformation without loading or cleaning.
    #[arg(long, default_value_t = false)]
    dry_run: bool,

    /// Log level (error, warn, info, debug, trace).
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Optional path to a log file; stderr is always used for the terse
    /// per-failure line described in spec §7.
    #[arg(long)]
    log_file: Option<PathBuf>,
}

/// CLI configuration after validation.
///
/// Dates are kept as `YYYYMMDD` strings here; the domain's date-range
/// iterator (C1) is the authority on whether they parse and whether
/// `from <= to`, so this layer does not duplicate that business rule beyond
/// a syntactic shape check.
#[derive(Debug, Clone)]
pub struct ValidatedCli {
    pub config: PathBuf,
    pub from: String,
    pub to: String,
    pub source: Option<String>,
    pub dry_run: bool,
    pub log_level: String,
    pub log_file: Option<PathBuf>,
}

/// CLI parsing/validation errors.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("invalid date argument `{arg}`: {reason}")]
    InvalidDate { arg: &'static str, reason: String },

    #[error("config path does not look like a file path: {0}")]
    InvalidConfigPath(String),

    #[error("unrecognized log level `{0}`")]
    InvalidLogLevel(String),
}

const VALID_LOG_LEVELS: &[&str] = &["error", "warn", "info", "debug", "trace"];

/// Parse `std::env::args()` and validate the result.
///
/// `clap` handles `--help`/`--version` itself (exit code 0); any other
/// parse failure exits via `clap`'s own usage-error path, which this binary
/// maps to exit code 2 (spec §6).
pub fn parse_and_validate() -> Result<ValidatedCli, ParseError> {
    let cli = Cli::parse();
    validate(cli)
}

fn validate(cli: Cli) -> Result<ValidatedCli, ParseError> {
    validate_date_shape("from", &cli.from)?;
    validate_date_shape("to", &cli.to)?;

    if cli.config.as_os_str().is_empty() {
        return Err(ParseError::InvalidConfigPath("empty path".to_string()));
    }

    let log_level = cli.log_level.to_lowercase();
    if !VALID_LOG_LEVELS.contains(&log_level.as_str()) {
        return Err(ParseError::InvalidLogLevel(cli.log_level));
    }

    Ok(ValidatedCli {
        config: cli.config,
        from: cli.from,
        to: cli.to,
        source: cli.source,
        dry_run: cli.dry_run,
        log_level,
        log_file: cli.log_file,
    })
}

fn validate_date_shape(arg: &'static str, value: &str) -> Result<(), ParseError> {
    if value.len() != 8 || !value.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ParseError::InvalidDate {
            arg,
            reason: "expected YYYYMMDD".to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_cli() -> Cli {
        Cli {
            config: PathBuf::from("config.ini"),
            from: "20250101".to_string(),
            to: "20250103".to_string(),
            source: None,
            dry_run: false,
            log_level: "INFO".to_string(),
            log_file: None,
        }
    }

    #[test]
    fn validates_well_formed_args() {
        let validated = validate(base_cli()).unwrap();
        assert_eq!(validated.from, "20250101");
        assert_eq!(validated.log_level, "info");
    }

    #[test]
    fn rejects_malformed_date() {
        let mut cli = base_cli();
        cli.from = "2025-01-01".to_string();
        assert!(matches!(validate(cli), Err(ParseError::InvalidDate { arg: "from", .. })));
    }

    #[test]
    fn rejects_unknown_log_level() {
        let mut cli = base_cli();
        cli.log_level = "verbose".to_string();
        assert!(matches!(validate(cli), Err(ParseError::InvalidLogLevel(_))));
    }

    #[test]
    fn rejects_empty_config_path() {
        let mut cli = base_cli();
        cli.config = PathBuf::new();
        assert!(matches!(validate(cli), Err(ParseError::InvalidConfigPath(_))));
    }
}
