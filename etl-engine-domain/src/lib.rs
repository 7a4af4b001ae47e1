// /////////////////////////////////////////////////////////////////////////////
// ETL Engine
// Copyright (c) 2025 Data Platform Engineering
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # ETL Engine Domain
//!
//! Pure business logic for the daily ETL orchestration engine: no I/O, no
//! async runtime beyond the infrastructure-facing capability ports (which
//! are traits only — no implementation lives here).
//!
//! ## Module Structure
//!
//! - `error` - the `EtlError` taxonomy (spec §7)
//! - `date` - business dates and the date-range iterator (C1)
//! - `config` - `Configuration`/`SourceConfig`/`TargetConfig` (spec §3, §6)
//! - `context` - per-day mutable state (C2)
//! - `raw_record` - intermediate CSV-row shape (C4 output)
//! - `records` - `SourceRecord`/`TargetRecord` sum types and capabilities
//! - `column_order` - the column-order resolver (C10)
//! - `file_metadata` - object-store file metadata and the size ceiling check
//! - `staging` - staging table naming (C13)
//! - `capability` - `Extractor`/`Loader` capability traits (C5, C11)
//! - `results` - `SubprocessResult`/`DailyProcessResult`/`WorkflowResult`

pub mod capability;
pub mod column_order;
pub mod config;
pub mod context;
pub mod date;
pub mod error;
pub mod file_metadata;
pub mod raw_record;
pub mod records;
pub mod results;
pub mod staging;

pub use capability::{Extractor, Loader};
pub use column_order::ColumnOrdered;
pub use config::{Configuration, SourceConfig, TargetConfig};
pub use context::{Context, SharedStoreConnection};
pub use date::{date_range, BusinessDate};
pub use error::{
    CancelError, CleanupError, ConfigError, DownloadError, EtlError, FileParseError, FileTooLargeError, LoadError,
    SchemaError, Stage, ValidationError,
};
pub use file_metadata::FileMetadata;
pub use raw_record::{RawRecord, RawValue};
pub use records::{
    QuoteLevel, QuoteSourceRecord, QuoteTargetRecord, RawTradeSide, SourceRecord, SourceRecordCapability,
    TargetRecord, TargetRecordCapability, TradeSide, TradeSourceRecord, TradeTargetRecord, WireValue,
};
pub use results::{DailyProcessResult, SubprocessResult, WorkflowResult};
pub use staging::StagingTable;
