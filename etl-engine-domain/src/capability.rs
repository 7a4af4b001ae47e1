// /////////////////////////////////////////////////////////////////////////////
// ETL Engine
// Copyright (c) 2025 Data Platform Engineering
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Extractor and Loader Capabilities (C5, C11, spec §4.5, §4.9)
//!
//! Source-agnostic and target-agnostic capability traits. Concrete
//! implementations (object-store extractors, the columnar loader) live in
//! the application crate; these ports are infrastructure-facing (I/O-bound)
//! so, unlike the rest of the domain, they are `async_trait`-based (spec §9
//! design note: "infrastructure ports remain async").

use crate::context::Context;
use crate::error::EtlError;
use crate::records::{SourceRecord, TargetRecord};
use async_trait::async_trait;

/// One instance per configured source (spec §4.5).
#[async_trait]
pub trait Extractor: Send + Sync {
    /// Identifies the data flavor, e.g. `"AllPriceDepth"`, `"TradeData"`.
    fn category(&self) -> &str;

    /// Cheap pre-flight: credentials complete, date present.
    async fn validate(&self, ctx: &Context) -> Result<(), EtlError>;

    /// Connect, generate a per-run temp directory.
    async fn setup(&mut self, ctx: &Context) -> Result<(), EtlError>;

    /// The work: list, download, parse, group, convert.
    async fn extract(&mut self, ctx: &Context) -> Result<Vec<SourceRecord>, EtlError>;

    /// Delete temp files, close the client. Called even after a failed
    /// `extract` so per-task resources never leak (spec §5 cancellation
    /// model: "release its per-task resources").
    async fn cleanup(&mut self) -> Result<(), EtlError>;
}

/// Single loader instance, single-threaded; parallelism across data types
/// is not required (spec §4.9).
#[async_trait]
pub trait Loader: Send + Sync {
    /// Capture configuration and a connection the loader does not own.
    async fn init(&mut self, ctx: &Context) -> Result<(), EtlError>;

    /// Stable sort by the configured sort field list, spilling to temp
    /// files above the configured memory ceiling.
    async fn sort_data(&mut self, records: Vec<TargetRecord>) -> Result<Vec<TargetRecord>, EtlError>;

    /// Group by data type, bulk-insert into staging, then append staging
    /// into target in a fixed data-type order.
    async fn load_data(&mut self, sorted: Vec<TargetRecord>) -> Result<u64, EtlError>;

    /// Compare staging row count against the target's post-append delta.
    async fn validate_load(&mut self) -> Result<(), EtlError>;

    /// Release loader-owned resources only (sort temp files); the shared
    /// connection is closed by the engine, not the loader.
    async fn shutdown(&mut self) -> Result<(), EtlError>;
}
