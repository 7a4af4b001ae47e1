// /////////////////////////////////////////////////////////////////////////////
// ETL Engine
// Copyright (c) 2025 Data Platform Engineering
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Object-Store Extractor (C6, spec §4.5)
//!
//! One instance per configured source. Implements the six-step algorithm
//! of spec §4.5: resolve the file-selection template, list + size-check,
//! download sequentially, parse, convert (folding quote depth levels or
//! mapping trade fields one-to-one), and post-process (`.IB` suffix,
//! `YYYY.MM.DD` business date stamp).

use crate::csv_parser::{ColumnSchema, CsvRowStream, Delimiter};
use crate::extractor::{CATEGORY_ALL_PRICE_DEPTH, CATEGORY_TRADE_DATA};
use crate::object_store_client::ObjectStoreClient;
use async_trait::async_trait;
use etl_engine_domain::{
    Context, DownloadError, EtlError, Extractor, FileParseError, QuoteLevel, QuoteSourceRecord, RawRecord,
    RawTradeSide, SourceConfig, SourceRecord, TradeSourceRecord,
};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

/// Resolves `/{category}/{businessDate}/*.ext` into a concrete prefix and
/// suffix filter, formatting the business date per `date_format` (spec
/// §4.5 step 1; default `YYYYMMDD`).
fn resolve_template(category: &str, business_date_yyyymmdd: &str, extension: &str) -> (String, String) {
    let prefix = format!("{category}/{business_date_yyyymmdd}/");
    (prefix, extension.to_string())
}

pub struct ObjectStoreExtractor {
    source: SourceConfig,
    category: &'static str,
    client: Arc<ObjectStoreClient>,
    temp_dir: Option<tempfile::TempDir>,
    downloaded: Vec<PathBuf>,
    max_file_size: u64,
    extension: String,
    delimiter: Delimiter,
}

impl ObjectStoreExtractor {
    pub fn new(source: SourceConfig, category: &'static str, client: Arc<ObjectStoreClient>) -> Self {
        let max_file_size = source
            .property("maxFileSize")
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(100 * 1024 * 1024);
        let delimiter = match source.property("delimiter") {
            Some("pipe") => Delimiter::Pipe,
            _ => Delimiter::Comma,
        };
        Self {
            source,
            category,
            client,
            temp_dir: None,
            downloaded: Vec::new(),
            max_file_size,
            extension: ".csv".to_string(),
            delimiter,
        }
    }

    fn numeric_schema(&self) -> ColumnSchema {
        match self.category {
            CATEGORY_ALL_PRICE_DEPTH => ColumnSchema {
                numeric_columns: vec![
                    "mqOffset".into(),
                    "level".into(),
                    "side".into(),
                    "price".into(),
                    "yield".into(),
                    "volume".into(),
                ],
            },
            _ => ColumnSchema {
                numeric_columns: vec!["netPrice".into(), "dealSize".into()],
            },
        }
    }

    fn convert_quote(&self, rows: Vec<RawRecord>, business_date_dotted: &str) -> Vec<SourceRecord> {
        let mut grouped: BTreeMap<i64, QuoteSourceRecord> = BTreeMap::new();

        for row in rows {
            let Some(offset) = row.number("mqOffset") else {
                tracing::warn!("quote row missing mqOffset, skipping");
                continue;
            };
            let offset = offset as i64;
            let entry = grouped.entry(offset).or_insert_with(|| QuoteSourceRecord {
                exch_product_id: post_process_product_id(row.text("productId").unwrap_or_default()),
                business_date: business_date_dotted.to_string(),
                message_offset: offset,
                event_time: row.text("eventTime").unwrap_or_default().to_string(),
                receive_time: row.text("receiveTime").unwrap_or_default().to_string(),
                levels: Default::default(),
            });

            let Some(level) = row.number("level") else { continue };
            let Some(side) = row.number("side") else { continue };
            let level = level as usize;
            if level > 5 {
                continue;
            }
            let price = row.number("price");
            let yld = row.number("yield");
            let yield_type = row.text("yieldType").map(str::to_string);
            let volume = row.number("volume");

            let slot = &mut entry.levels[level];
            if side == 0.0 {
                slot.bid_price = price;
                slot.bid_yield = yld;
                slot.bid_yield_type = yield_type;
                slot.bid_volume = volume;
            } else {
                slot.offer_price = price;
                slot.offer_yield = yld;
                slot.offer_yield_type = yield_type;
                slot.offer_volume = volume;
            }
        }

        grouped.into_values().map(SourceRecord::Quote).collect()
    }

    fn convert_trade(&self, rows: Vec<RawRecord>, business_date_dotted: &str) -> Vec<SourceRecord> {
        rows.into_iter()
            .filter_map(|row| {
                let side = match row.text("side") {
                    Some("X") => RawTradeSide::Taken,
                    Some("Y") => RawTradeSide::Given,
                    Some("Z") => RawTradeSide::Traded,
                    Some("D") => RawTradeSide::Done,
                    other => {
                        tracing::warn!(side = ?other, "unrecognized trade side code, skipping row");
                        return None;
                    }
                };
                Some(SourceRecord::Trade(TradeSourceRecord {
                    exch_product_id: post_process_product_id(row.text("productId").unwrap_or_default()),
                    business_date: business_date_dotted.to_string(),
                    trade_id: row.text("tradeId").unwrap_or_default().to_string(),
                    event_time: row.text("eventTime").unwrap_or_default().to_string(),
                    receive_time: row.text("receiveTime").unwrap_or_default().to_string(),
                    net_price: row.number("netPrice").unwrap_or(f64::NAN),
                    deal_size: row.number("dealSize").unwrap_or(0.0),
                    set_days: row.text("setDays").unwrap_or("T+0").to_string(),
                    side,
                }))
            })
            .collect()
    }
}

/// Step 6 of spec §4.5: ensure product identifiers carry the `.IB` suffix.
fn post_process_product_id(id: &str) -> String {
    if id.ends_with(".IB") {
        id.to_string()
    } else {
        format!("{id}.IB")
    }
}

#[async_trait]
impl Extractor for ObjectStoreExtractor {
    fn category(&self) -> &str {
        self.category
    }

    async fn validate(&self, ctx: &Context) -> Result<(), EtlError> {
        self.source.validate_credentials().map_err(EtlError::Config)?;
        if ctx.current_date.is_empty() {
            return Err(EtlError::Config(etl_engine_domain::ConfigError::MissingKey {
                section: self.source.name.clone(),
                key: "currentDate".to_string(),
            }));
        }
        Ok(())
    }

    async fn setup(&mut self, _ctx: &Context) -> Result<(), EtlError> {
        let temp_dir = tempfile::tempdir().map_err(|e| {
            EtlError::Download(DownloadError {
                key: self.source.name.clone(),
                message: "failed to create per-run temp directory".to_string(),
                cause: Some(Box::new(e)),
            })
        })?;
        self.temp_dir = Some(temp_dir);
        Ok(())
    }

    async fn extract(&mut self, ctx: &Context) -> Result<Vec<SourceRecord>, EtlError> {
        let business_date_yyyymmdd = ctx.current_date.clone();
        let business_date_dotted = dotted_from_yyyymmdd(&business_date_yyyymmdd);

        let (prefix, extension) = resolve_template(self.category, &business_date_yyyymmdd, &self.extension);
        let files = self
            .client
            .list(&prefix, |key| key.ends_with(extension.as_str()))
            .await
            .map_err(EtlError::Download)?;

        for file in &files {
            file.size_check(self.max_file_size).map_err(EtlError::FileTooLarge)?;
        }

        let mut local_paths = Vec::new();
        for file in &files {
            let local_path = self.client.download(&file.key).await.map_err(EtlError::Download)?;
            local_paths.push(local_path);
        }
        self.downloaded = local_paths.clone();

        let mut all_rows = Vec::new();
        for path in &local_paths {
            let bytes = tokio::fs::read(path).await.map_err(|e| {
                EtlError::Download(DownloadError {
                    key: path.display().to_string(),
                    message: "failed to reread downloaded temp file".to_string(),
                    cause: Some(Box::new(e)),
                })
            })?;
            let mut stream = CsvRowStream::new(
                std::io::Cursor::new(bytes),
                self.delimiter,
                self.numeric_schema(),
                path.display().to_string(),
            )
            .map_err(EtlError::Parse)?;
            let rows = stream.read_all().map_err(EtlError::Parse)?;
            all_rows.extend(rows);
        }

        // Mixed-date files: only rows matching ctx.currentDate appear (spec §4.5 step 4).
        let filtered: Vec<RawRecord> = all_rows
            .into_iter()
            .filter(|row| match row.text("businessDate") {
                Some(date) => date == business_date_yyyymmdd,
                None => true,
            })
            .collect();

        let records = match self.category {
            CATEGORY_ALL_PRICE_DEPTH => self.convert_quote(filtered, &business_date_dotted),
            CATEGORY_TRADE_DATA => self.convert_trade(filtered, &business_date_dotted),
            other => {
                return Err(EtlError::Config(etl_engine_domain::ConfigError::UnknownCategory {
                    source_type: self.source.source_type.clone(),
                    category: other.to_string(),
                }))
            }
        };

        Ok(records)
    }

    async fn cleanup(&mut self) -> Result<(), EtlError> {
        self.downloaded.clear();
        self.temp_dir = None; // dropping the TempDir removes the directory and its contents
        Ok(())
    }
}

fn dotted_from_yyyymmdd(value: &str) -> String {
    if value.len() != 8 {
        return value.to_string();
    }
    format!("{}.{}.{}", &value[0..4], &value[4..6], &value[6..8])
}
