// /////////////////////////////////////////////////////////////////////////////
// ETL Engine
// Copyright (c) 2025 Data Platform Engineering
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Transform Stage (C9, spec §4.7)
//!
//! A pure function: consumes extracted `SourceRecord`s, produces
//! `TargetRecord`s. Variants that cannot be mapped are dropped with a
//! warning rather than failing the whole batch (spec §4.7: "transform never
//! fails unless the whole input is invalid").

use etl_engine_domain::{
    QuoteLevel, QuoteSourceRecord, QuoteTargetRecord, SourceRecord, TargetRecord, TradeSourceRecord,
    TradeTargetRecord,
};

/// Identifying metadata a quote target carries that has no counterpart on
/// the source side (spec §6 external shape: `source`, `category`,
/// `currency`, `venue`) — supplied by the caller from the owning
/// `SourceConfig` rather than invented here.
#[derive(Debug, Clone)]
pub struct QuoteIdentity {
    pub source: String,
    pub category: String,
    pub currency: String,
    pub venue: String,
}

/// `T+0`/`T+1` settlement speed translation (spec §4.5 step 5).
fn settle_speed(set_days: &str) -> Option<i32> {
    match set_days {
        "T+0" => Some(0),
        "T+1" => Some(1),
        _ => None,
    }
}

fn transform_quote(record: QuoteSourceRecord, identity: &QuoteIdentity) -> Option<TargetRecord> {
    if !record.exch_product_id.ends_with(".IB") {
        tracing::warn!(product = %record.exch_product_id, "quote record missing .IB suffix at transform; dropped");
        return None;
    }
    Some(TargetRecord::Quote(QuoteTargetRecord {
        exch_product_id: record.exch_product_id,
        business_date: record.business_date,
        message_offset: record.message_offset,
        source: identity.source.clone(),
        category: identity.category.clone(),
        currency: identity.currency.clone(),
        venue: identity.venue.clone(),
        sequence: record.message_offset,
        event_time: record.event_time,
        receive_time: record.receive_time,
        levels: record.levels,
    }))
}

fn transform_trade(record: TradeSourceRecord) -> Option<TargetRecord> {
    let Some(settle_speed) = settle_speed(&record.set_days) else {
        tracing::warn!(set_days = %record.set_days, trade_id = %record.trade_id, "unrecognized settlement code; trade dropped");
        return None;
    };
    Some(TargetRecord::Trade(TradeTargetRecord {
        exch_product_id: record.exch_product_id,
        business_date: record.business_date,
        trade_id: record.trade_id,
        event_time: record.event_time,
        receive_time: record.receive_time,
        trade_price: record.net_price,
        trade_yield: 0.0,
        trade_yield_type: String::new(),
        trade_volume: record.deal_size,
        trade_side: record.side.into(),
        settle_speed,
    }))
}

/// Map one extracted batch into target records. `quote_identity` supplies
/// the per-source metadata quote targets need but quote sources don't
/// carry; trade records need none. Drops (not failures) are logged and
/// simply absent from the result.
pub fn transform(records: Vec<SourceRecord>, quote_identity: &QuoteIdentity) -> Vec<TargetRecord> {
    records
        .into_iter()
        .filter_map(|record| match record {
            SourceRecord::Quote(q) => transform_quote(q, quote_identity),
            SourceRecord::Trade(t) => transform_trade(t),
        })
        .collect()
}
