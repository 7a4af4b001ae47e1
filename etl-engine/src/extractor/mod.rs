// /////////////////////////////////////////////////////////////////////////////
// ETL Engine
// Copyright (c) 2025 Data Platform Engineering
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Extractor Capability, Concrete Extractors, and Factory (C5, C6, C7)
//!
//! `getCategory`/`validate`/`setup`/`extract`/`cleanup` lifecycle (spec
//! §4.5) is the [`etl_engine_domain::Extractor`] trait; this module
//! supplies the object-store-backed implementations and the factory that
//! builds them from a [`etl_engine_domain::SourceConfig`].

pub mod factory;
pub mod object_store_extractor;

pub use factory::ExtractorFactory;
pub use object_store_extractor::ObjectStoreExtractor;

/// Category identifiers dispatched on by the factory (spec §4.5, glossary).
pub const CATEGORY_ALL_PRICE_DEPTH: &str = "AllPriceDepth";
pub const CATEGORY_TRADE_DATA: &str = "TradeData";
