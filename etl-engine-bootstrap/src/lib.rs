// /////////////////////////////////////////////////////////////////////////////
// ETL Engine
// Copyright (c) 2025 Data Platform Engineering
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

// Production code safety enforced via CI and `make lint-strict`
// (lib/bins checked separately from tests - tests may use unwrap/expect)

//! # Bootstrap Module
//!
//! The bootstrap module sits **outside** the orchestration engine's
//! domain/application/infrastructure layers and provides everything needed
//! to turn the engine into a runnable process:
//!
//! - **Entry point** - process lifecycle management
//! - **Platform abstraction** - OS-specific operations (temp dir, CPU count)
//! - **Signal handling** - graceful shutdown (SIGTERM, SIGINT, SIGHUP)
//! - **Argument parsing** - the CLI surface of spec §6
//! - **Error handling** - Unix exit code mapping (0/1/2/3 of spec §6)
//! - **Async coordination** - shutdown coordination and cancellation for the
//!   Extract stage's cancel signal (spec §5, §8 scenario 6)
//!
//! ## Architecture Position
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │          BOOTSTRAP (This Module)            │
//! │  - Entry Point / CLI / Signals / ExitCode   │
//! └─────────────────────────────────────────────┘
//!                      │
//!                      ▼
//! ┌─────────────────────────────────────────────┐
//! │         ETL ENGINE (etl-engine crate)       │
//! │  - Workflow engine, sequencer, extractors,  │
//! │    loaders, staging lifecycle               │
//! └─────────────────────────────────────────────┘
//!                      │
//!                      ▼
//! ┌─────────────────────────────────────────────┐
//! │         ETL ENGINE DOMAIN (domain crate)    │
//! │  - Configuration, Context, records, errors  │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! ## Module Structure
//!
//! - `platform` - OS abstraction (temp dir, CPU count, privilege check)
//! - `signals` - signal handling (SIGTERM, SIGINT, SIGHUP)
//! - `cli` - CLI argument parsing for spec §6's surface
//! - `exit_code` - Unix exit code enumeration matching spec §6
//! - `logger` - structured logging bootstrap (`tracing` init)
//! - `shutdown` - shutdown/cancellation coordination

pub mod cli;
pub mod exit_code;
pub mod logger;
pub mod platform;
pub mod shutdown;
pub mod signals;

pub use cli::{parse_and_validate, ParseError, ValidatedCli};
pub use exit_code::{map_error_to_exit_code, result_to_exit_code, ExitCode};

/// Bootstrap and parse CLI arguments.
///
/// This is the main entry point for the bootstrap layer: it parses the CLI
/// surface of spec §6 and returns a validated, ready-to-run configuration.
/// The caller is responsible for running the workflow engine and mapping its
/// result to an exit code with [`result_to_exit_code`].
///
/// # Errors
///
/// Returns [`cli::ParseError`] if CLI parsing or validation fails. `clap`
/// handles `--help` and exits the process with code 0 on its own.
pub fn bootstrap_cli() -> Result<ValidatedCli, cli::ParseError> {
    cli::parse_and_validate()
}
