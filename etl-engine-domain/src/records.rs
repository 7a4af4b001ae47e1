// /////////////////////////////////////////////////////////////////////////////
// ETL Engine
// Copyright (c) 2025 Data Platform Engineering
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Source and Target Records (spec §3, §6, §9)
//!
//! `SourceRecord` and `TargetRecord` are tagged variants with a shared
//! capability set rather than a class hierarchy (spec §9 design note on sum
//! types): variants are enumerated at compile time, no runtime subclassing.

use crate::column_order::ColumnOrdered;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A single wire-format cell value (spec §6: "Unfilled fields are NaN
/// (floats) or nil (strings/integers)").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum WireValue {
    Str(String),
    F64(f64),
    I64(i64),
    Null,
}

impl fmt::Display for WireValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WireValue::Str(s) => write!(f, "{s}"),
            WireValue::F64(v) => write!(f, "{v}"),
            WireValue::I64(v) => write!(f, "{v}"),
            WireValue::Null => write!(f, "null"),
        }
    }
}

/// Shared capability of every `SourceRecord` variant (spec §3, §9).
pub trait SourceRecordCapability {
    /// Cheap structural validation (not business-rule validation).
    fn validate(&self) -> bool;
    fn primary_key(&self) -> String;
    fn source_type(&self) -> &'static str;
}

/// One bid/offer depth level of a quote (spec §6: level 0 = best, 1..5 =
/// tradable depth). `None` fields render as `Null` on the wire.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QuoteLevel {
    pub bid_price: Option<f64>,
    pub bid_yield: Option<f64>,
    pub bid_yield_type: Option<String>,
    pub bid_volume: Option<f64>,
    pub offer_price: Option<f64>,
    pub offer_yield: Option<f64>,
    pub offer_yield_type: Option<String>,
    pub offer_volume: Option<f64>,
}

/// Grouped quote record before Transform (spec §4.5 step 5): raw rows
/// sharing a message-offset key, folded into one structured record with six
/// depth levels.
#[derive(Debug, Clone)]
pub struct QuoteSourceRecord {
    pub exch_product_id: String,
    pub business_date: String,
    pub message_offset: i64,
    pub event_time: String,
    pub receive_time: String,
    /// Indexed by level, 0..=5.
    pub levels: [QuoteLevel; 6],
}

impl SourceRecordCapability for QuoteSourceRecord {
    fn validate(&self) -> bool {
        !self.exch_product_id.is_empty() && !self.business_date.is_empty()
    }

    fn primary_key(&self) -> String {
        format!("{}:{}", self.exch_product_id, self.message_offset)
    }

    fn source_type(&self) -> &'static str {
        "AllPriceDepth"
    }
}

/// Raw trade side code from the source file (spec §4.5 step 5).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RawTradeSide {
    Taken,  // X
    Given,  // Y
    Traded, // Z
    Done,   // D
}

/// One-to-one conversion target of a trade row (spec §4.5 step 5).
#[derive(Debug, Clone)]
pub struct TradeSourceRecord {
    pub exch_product_id: String,
    pub business_date: String,
    pub trade_id: String,
    pub event_time: String,
    pub receive_time: String,
    pub net_price: f64,
    pub deal_size: f64,
    /// `T+0` / `T+1`, translated to 0 / 1 for the target shape.
    pub set_days: String,
    pub side: RawTradeSide,
}

impl SourceRecordCapability for TradeSourceRecord {
    fn validate(&self) -> bool {
        !self.trade_id.is_empty() && self.deal_size >= 0.0
    }

    fn primary_key(&self) -> String {
        self.trade_id.clone()
    }

    fn source_type(&self) -> &'static str {
        "TradeData"
    }
}

/// Sum type over source record variants (spec §3).
#[derive(Debug, Clone)]
pub enum SourceRecord {
    Quote(QuoteSourceRecord),
    Trade(TradeSourceRecord),
}

impl SourceRecordCapability for SourceRecord {
    fn validate(&self) -> bool {
        match self {
            SourceRecord::Quote(r) => r.validate(),
            SourceRecord::Trade(r) => r.validate(),
        }
    }

    fn primary_key(&self) -> String {
        match self {
            SourceRecord::Quote(r) => r.primary_key(),
            SourceRecord::Trade(r) => r.primary_key(),
        }
    }

    fn source_type(&self) -> &'static str {
        match self {
            SourceRecord::Quote(r) => r.source_type(),
            SourceRecord::Trade(r) => r.source_type(),
        }
    }
}

/// Shared capability of every `TargetRecord` variant (spec §3, §9).
pub trait TargetRecordCapability {
    fn validate(&self) -> bool;
    fn data_type(&self) -> &'static str;
}

/// Quote target shape (spec §6): 8 identifying fields, two timestamps, and
/// for each level 0..5 four bid fields and four offer fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuoteTargetRecord {
    pub exch_product_id: String,
    pub business_date: String,
    pub message_offset: i64,
    pub source: String,
    pub category: String,
    pub currency: String,
    pub venue: String,
    pub sequence: i64,
    pub event_time: String,
    pub receive_time: String,
    pub levels: [QuoteLevel; 6],
}

impl TargetRecordCapability for QuoteTargetRecord {
    fn validate(&self) -> bool {
        self.exch_product_id.ends_with(".IB")
    }

    fn data_type(&self) -> &'static str {
        "quote"
    }
}

impl ColumnOrdered for QuoteTargetRecord {
    fn type_name() -> &'static str {
        "QuoteTargetRecord"
    }

    fn column_spec() -> Vec<(u32, String)> {
        let mut spec = vec![
            (0, "exchProductId".to_string()),
            (1, "businessDate".to_string()),
            (2, "messageOffset".to_string()),
            (3, "source".to_string()),
            (4, "category".to_string()),
            (5, "currency".to_string()),
            (6, "venue".to_string()),
            (7, "sequence".to_string()),
            (8, "eventTime".to_string()),
            (9, "receiveTime".to_string()),
        ];
        let mut order = spec.len() as u32;
        for level in 0..6u32 {
            for suffix in ["Price", "Yield", "YieldType", "Volume"] {
                spec.push((order, format!("bid{level}{suffix}")));
                order += 1;
            }
            for suffix in ["Price", "Yield", "YieldType", "Volume"] {
                spec.push((order, format!("offer{level}{suffix}")));
                order += 1;
            }
        }
        spec
    }

    fn column_value(&self, name: &str) -> WireValue {
        match name {
            "exchProductId" => WireValue::Str(self.exch_product_id.clone()),
            "businessDate" => WireValue::Str(self.business_date.clone()),
            "messageOffset" => WireValue::I64(self.message_offset),
            "source" => WireValue::Str(self.source.clone()),
            "category" => WireValue::Str(self.category.clone()),
            "currency" => WireValue::Str(self.currency.clone()),
            "venue" => WireValue::Str(self.venue.clone()),
            "sequence" => WireValue::I64(self.sequence),
            "eventTime" => WireValue::Str(self.event_time.clone()),
            "receiveTime" => WireValue::Str(self.receive_time.clone()),
            other => self.level_column_value(other),
        }
    }
}

impl QuoteTargetRecord {
    fn level_column_value(&self, name: &str) -> WireValue {
        let (side, rest) = if let Some(rest) = name.strip_prefix("bid") {
            (true, rest)
        } else if let Some(rest) = name.strip_prefix("offer") {
            (false, rest)
        } else {
            return WireValue::Null;
        };
        let level_digits: String = rest.chars().take_while(|c| c.is_ascii_digit()).collect();
        let Ok(level) = level_digits.parse::<usize>() else {
            return WireValue::Null;
        };
        let suffix = &rest[level_digits.len()..];
        let Some(level) = self.levels.get(level) else {
            return WireValue::Null;
        };
        let (price, yld, yield_type, volume) = if side {
            (level.bid_price, level.bid_yield, &level.bid_yield_type, level.bid_volume)
        } else {
            (level.offer_price, level.offer_yield, &level.offer_yield_type, level.offer_volume)
        };
        match suffix {
            "Price" => price.map(WireValue::F64).unwrap_or(WireValue::Null),
            "Yield" => yld.map(WireValue::F64).unwrap_or(WireValue::Null),
            "YieldType" => yield_type.clone().map(WireValue::Str).unwrap_or(WireValue::Null),
            "Volume" => volume.map(WireValue::F64).unwrap_or(WireValue::Null),
            _ => WireValue::Null,
        }
    }
}

/// Trade side after translation (spec §4.5 step 5: `X→TKN`, `Y→GVN`,
/// `Z→TRD`, `D→DONE`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TradeSide {
    Tkn,
    Gvn,
    Trd,
    Done,
}

impl fmt::Display for TradeSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TradeSide::Tkn => "TKN",
            TradeSide::Gvn => "GVN",
            TradeSide::Trd => "TRD",
            TradeSide::Done => "DONE",
        };
        write!(f, "{s}")
    }
}

impl From<RawTradeSide> for TradeSide {
    fn from(raw: RawTradeSide) -> Self {
        match raw {
            RawTradeSide::Taken => TradeSide::Tkn,
            RawTradeSide::Given => TradeSide::Gvn,
            RawTradeSide::Traded => TradeSide::Trd,
            RawTradeSide::Done => TradeSide::Done,
        }
    }
}

/// Trade target shape (spec §6): identifying fields, price/yield/volume,
/// translated side, trade id, event/receive time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeTargetRecord {
    pub exch_product_id: String,
    pub business_date: String,
    pub trade_id: String,
    pub event_time: String,
    pub receive_time: String,
    pub trade_price: f64,
    pub trade_yield: f64,
    pub trade_yield_type: String,
    pub trade_volume: f64,
    pub trade_side: TradeSide,
    /// Translated from `T+0`/`T+1` (spec §4.5 step 5).
    pub settle_speed: i32,
}

impl TargetRecordCapability for TradeTargetRecord {
    fn validate(&self) -> bool {
        self.exch_product_id.ends_with(".IB") && !self.trade_id.is_empty()
    }

    fn data_type(&self) -> &'static str {
        "trade"
    }
}

impl ColumnOrdered for TradeTargetRecord {
    fn type_name() -> &'static str {
        "TradeTargetRecord"
    }

    fn column_spec() -> Vec<(u32, String)> {
        vec![
            (0, "exchProductId".to_string()),
            (1, "businessDate".to_string()),
            (2, "tradeId".to_string()),
            (3, "eventTime".to_string()),
            (4, "receiveTime".to_string()),
            (5, "tradePrice".to_string()),
            (6, "tradeYield".to_string()),
            (7, "tradeYieldType".to_string()),
            (8, "tradeVolume".to_string()),
            (9, "tradeSide".to_string()),
            (10, "settleSpeed".to_string()),
        ]
    }

    fn column_value(&self, name: &str) -> WireValue {
        match name {
            "exchProductId" => WireValue::Str(self.exch_product_id.clone()),
            "businessDate" => WireValue::Str(self.business_date.clone()),
            "tradeId" => WireValue::Str(self.trade_id.clone()),
            "eventTime" => WireValue::Str(self.event_time.clone()),
            "receiveTime" => WireValue::Str(self.receive_time.clone()),
            "tradePrice" => WireValue::F64(self.trade_price),
            "tradeYield" => WireValue::F64(self.trade_yield),
            "tradeYieldType" => WireValue::Str(self.trade_yield_type.clone()),
            "tradeVolume" => WireValue::F64(self.trade_volume),
            "tradeSide" => WireValue::Str(self.trade_side.to_string()),
            "settleSpeed" => WireValue::I64(self.settle_speed as i64),
            _ => WireValue::Null,
        }
    }
}

/// Sum type over target record variants (spec §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TargetRecord {
    Quote(QuoteTargetRecord),
    Trade(TradeTargetRecord),
}

impl TargetRecordCapability for TargetRecord {
    fn validate(&self) -> bool {
        match self {
            TargetRecord::Quote(r) => r.validate(),
            TargetRecord::Trade(r) => r.validate(),
        }
    }

    fn data_type(&self) -> &'static str {
        match self {
            TargetRecord::Quote(r) => r.data_type(),
            TargetRecord::Trade(r) => r.data_type(),
        }
    }
}
