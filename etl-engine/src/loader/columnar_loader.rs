// /////////////////////////////////////////////////////////////////////////////
// ETL Engine
// Copyright (c) 2025 Data Platform Engineering
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Columnar Loader (C12, spec §4.9)
//!
//! Stable sort with spill-to-disk above a configured memory ceiling,
//! grouped chunked bulk insert, staging-to-target append in a fixed
//! data-type order, and post-load row-count validation.

use crate::loader::remote_connection::ScriptExecutor;
use async_trait::async_trait;
use etl_engine_domain::{
    ColumnOrdered, Context, EtlError, LoadError, Loader, QuoteTargetRecord, TargetConfig, TargetRecord,
    TargetRecordCapability, TradeTargetRecord, ValidationError, WireValue,
};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::mem;
use std::path::{Path, PathBuf};
use std::sync::Arc;

const DEFAULT_CHUNK_SIZE: usize = 1000;
/// Fixed data-type append order (spec §4.9: "e.g., quote before trade").
const APPEND_ORDER: [&str; 2] = ["quote", "trade"];

fn sort_key(record: &TargetRecord, sort_fields: &[String]) -> Option<String> {
    for field in sort_fields {
        let value = match record {
            TargetRecord::Quote(q) => q.column_value(field),
            TargetRecord::Trade(t) => t.column_value(field),
        };
        if !matches!(value, WireValue::Null) {
            return Some(value.to_string());
        }
    }
    None
}

#[derive(Serialize, Deserialize)]
struct SpillEntry {
    key: String,
    record: TargetRecord,
}

impl PartialEq for SpillEntry {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}
impl Eq for SpillEntry {}
impl PartialOrd for SpillEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for SpillEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed: `BinaryHeap` is a max-heap, the merge wants the smallest key on top.
        other.key.cmp(&self.key)
    }
}

/// One run's on-disk representation: newline-delimited JSON, ascending by key.
struct Run {
    path: PathBuf,
    reader: BufReader<File>,
    peeked: Option<SpillEntry>,
}

impl Run {
    fn open(path: PathBuf) -> std::io::Result<Self> {
        let file = File::open(&path)?;
        let mut run = Run { path, reader: BufReader::new(file), peeked: None };
        run.advance()?;
        Ok(run)
    }

    fn advance(&mut self) -> std::io::Result<()> {
        let mut line = String::new();
        let bytes = self.reader.read_line(&mut line)?;
        self.peeked = if bytes == 0 {
            None
        } else {
            Some(serde_json::from_str(line.trim_end()).expect("spill run entry is valid json"))
        };
        Ok(())
    }
}

/// Concrete `Loader`: groups target records by data type into staging
/// tables, bulk-inserts them chunked, then appends each staging table into
/// its target in a fixed order (spec §4.9).
pub struct ColumnarLoader {
    config: TargetConfig,
    connection: Arc<dyn ScriptExecutor>,
    staging_table_names: HashMap<String, String>,
    chunk_size: usize,
    temp_dir: PathBuf,
    spill_runs: Vec<PathBuf>,
    /// Rows actually added to each target table by this run's append step
    /// (post-append count minus the count captured immediately before the
    /// append), keyed by data type. Populated by `load_data`, read by
    /// `validate_load` (spec §4.9: "compare staging row count against the
    /// target's post-append delta" -- not the target's absolute count).
    append_deltas: HashMap<String, u64>,
}

impl ColumnarLoader {
    pub fn new(config: TargetConfig, connection: Arc<dyn ScriptExecutor>, temp_dir: PathBuf) -> Self {
        Self {
            config,
            connection,
            staging_table_names: HashMap::new(),
            chunk_size: DEFAULT_CHUNK_SIZE,
            temp_dir,
            spill_runs: Vec::new(),
            append_deltas: HashMap::new(),
        }
    }

    pub fn with_staging_tables(mut self, staging_table_names: HashMap<String, String>) -> Self {
        self.staging_table_names = staging_table_names;
        self
    }

    fn memory_ceiling_bytes(&self) -> u64 {
        self.config.max_memory_mb * 1024 * 1024
    }

    fn spill_run(&mut self, mut batch: Vec<SpillEntry>) -> Result<(), LoadError> {
        batch.sort_by(|a, b| a.key.cmp(&b.key));
        let path = self.temp_dir.join(format!("sort-run-{}.ndjson", self.spill_runs.len()));
        let file = File::create(&path).map_err(|e| io_err(&path, e))?;
        let mut writer = BufWriter::new(file);
        for entry in &batch {
            let line = serde_json::to_string(entry).expect("spill entry serializes");
            writeln!(writer, "{line}").map_err(|e| io_err(&path, e))?;
        }
        writer.flush().map_err(|e| io_err(&path, e))?;
        self.spill_runs.push(path);
        Ok(())
    }

    fn merge_runs(&self) -> Result<Vec<TargetRecord>, LoadError> {
        let mut heap: BinaryHeap<(SpillEntry, usize)> = BinaryHeap::new();
        let mut runs: Vec<Run> = self
            .spill_runs
            .iter()
            .map(|p| Run::open(p.clone()).map_err(|e| io_err(p, e)))
            .collect::<Result<_, _>>()?;

        for (i, run) in runs.iter().enumerate() {
            if let Some(entry) = &run.peeked {
                heap.push((clone_entry(entry), i));
            }
        }

        let mut merged = Vec::new();
        while let Some((entry, run_idx)) = heap.pop() {
            merged.push(entry.record);
            let run = &mut runs[run_idx];
            run.advance().map_err(|e| io_err(&run.path, e))?;
            if let Some(next) = &run.peeked {
                heap.push((clone_entry(next), run_idx));
            }
        }

        for run in &runs {
            let _ = std::fs::remove_file(&run.path);
        }

        Ok(merged)
    }
}

fn clone_entry(entry: &SpillEntry) -> SpillEntry {
    SpillEntry { key: entry.key.clone(), record: entry.record.clone() }
}

fn io_err(path: &Path, cause: std::io::Error) -> LoadError {
    LoadError {
        target: path.display().to_string(),
        message: "sort spill I/O failed".to_string(),
        cause: Some(Box::new(cause)),
    }
}

fn column_values(record: &TargetRecord, columns: &[String]) -> Vec<WireValue> {
    columns
        .iter()
        .map(|name| match record {
            TargetRecord::Quote(q) => q.column_value(name),
            TargetRecord::Trade(t) => t.column_value(name),
        })
        .collect()
}

#[async_trait]
impl Loader for ColumnarLoader {
    async fn init(&mut self, ctx: &Context) -> Result<(), EtlError> {
        let connection_open = ctx.shared_store_connection.as_ref().map(|c| c.is_open()).unwrap_or(false);
        if !connection_open {
            return Err(LoadError {
                target: self.config.name.clone(),
                message: "loader initialized without an open shared connection".to_string(),
                cause: None,
            }
            .into());
        }
        if !ctx.staging_table_names.is_empty() {
            // Keyed by `{dataType}` prefix of the generated name (spec §4.10 naming: `{prefix}_{targetTable}_{date}_{random6}`).
            for name in &ctx.staging_table_names {
                for data_type in self.config.target_table_mappings.keys() {
                    if let Some(table) = self.config.table_for(data_type) {
                        if name.contains(table) {
                            self.staging_table_names.insert(data_type.clone(), name.clone());
                        }
                    }
                }
            }
        }
        Ok(())
    }

    async fn sort_data(&mut self, records: Vec<TargetRecord>) -> Result<Vec<TargetRecord>, EtlError> {
        let sort_fields = if self.config.sort_fields.is_empty() {
            vec!["receive_time".to_string()]
        } else {
            self.config.sort_fields.clone()
        };

        let mut in_memory: Vec<SpillEntry> = Vec::new();
        let mut approx_bytes: u64 = 0;
        let ceiling = self.memory_ceiling_bytes();

        for record in records {
            let Some(key) = sort_key(&record, &sort_fields) else {
                tracing::warn!("record missing every configured sort key; dropped");
                continue;
            };
            approx_bytes += (mem::size_of::<TargetRecord>() + key.len()) as u64;
            in_memory.push(SpillEntry { key, record });

            if ceiling > 0 && approx_bytes > ceiling {
                let batch = mem::take(&mut in_memory);
                self.spill_run(batch)?;
                approx_bytes = 0;
            }
        }

        if self.spill_runs.is_empty() {
            in_memory.sort_by(|a, b| a.key.cmp(&b.key));
            return Ok(in_memory.into_iter().map(|e| e.record).collect());
        }

        if !in_memory.is_empty() {
            self.spill_run(in_memory)?;
        }
        Ok(self.merge_runs()?)
    }

    async fn load_data(&mut self, sorted: Vec<TargetRecord>) -> Result<u64, EtlError> {
        let mut quotes = Vec::new();
        let mut trades = Vec::new();
        for record in sorted {
            match record {
                TargetRecord::Quote(q) => quotes.push(q),
                TargetRecord::Trade(t) => trades.push(t),
            }
        }

        let mut total_loaded = 0u64;
        total_loaded += self.load_group("quote", quotes, QuoteTargetRecord::column_spec_names()).await?;
        total_loaded += self.load_group("trade", trades, TradeTargetRecord::column_spec_names()).await?;

        for data_type in APPEND_ORDER {
            let Some(staging_table) = self.staging_table_names.get(data_type).cloned() else {
                continue;
            };
            let Some(target_table) = self.config.table_for(data_type) else {
                continue;
            };
            let before = self.connection.count_rows(target_table).await.map_err(EtlError::from)?;
            self.connection
                .append_staging_to_target(&staging_table, target_table)
                .await
                .map_err(EtlError::from)?;
            let after = self.connection.count_rows(target_table).await.map_err(EtlError::from)?;
            self.append_deltas.insert(data_type.to_string(), after.saturating_sub(before));
        }

        Ok(total_loaded)
    }

    async fn validate_load(&mut self) -> Result<(), EtlError> {
        for data_type in APPEND_ORDER {
            let Some(staging_table) = self.staging_table_names.get(data_type) else {
                continue;
            };
            let Some(target_table) = self.config.table_for(data_type) else {
                continue;
            };
            let staged = self.connection.count_rows(staging_table).await.map_err(EtlError::from)?;
            let delta = self.append_deltas.get(data_type).copied().unwrap_or(0);
            if staged > delta {
                return Err(ValidationError { target: target_table.to_string(), expected: staged, observed: delta }
                    .into());
            }
        }
        Ok(())
    }

    async fn shutdown(&mut self) -> Result<(), EtlError> {
        for run in self.spill_runs.drain(..) {
            let _ = std::fs::remove_file(run);
        }
        Ok(())
    }
}

impl ColumnarLoader {
    async fn load_group<T>(&self, data_type: &str, group: Vec<T>, columns: Vec<String>) -> Result<u64, EtlError>
    where
        T: TargetRecordCapability + Clone,
        TargetRecord: From<T>,
    {
        if group.is_empty() {
            return Ok(0);
        }
        let Some(staging_table) = self.staging_table_names.get(data_type) else {
            return Err(LoadError {
                target: data_type.to_string(),
                message: "no staging table generated for this data type".to_string(),
                cause: None,
            }
            .into());
        };

        let mut total = 0u64;
        for chunk in group.chunks(self.chunk_size) {
            let rows: Vec<Vec<WireValue>> = chunk
                .iter()
                .cloned()
                .map(TargetRecord::from)
                .map(|record| column_values(&record, &columns))
                .collect();
            total += self.connection.bulk_insert(staging_table, &columns, &rows).await.map_err(EtlError::from)?;
        }
        Ok(total)
    }
}

impl From<QuoteTargetRecord> for TargetRecord {
    fn from(value: QuoteTargetRecord) -> Self {
        TargetRecord::Quote(value)
    }
}
impl From<TradeTargetRecord> for TargetRecord {
    fn from(value: TradeTargetRecord) -> Self {
        TargetRecord::Trade(value)
    }
}

trait ColumnSpecNames {
    fn column_spec_names() -> Vec<String>;
}
impl<T: ColumnOrdered> ColumnSpecNames for T {
    fn column_spec_names() -> Vec<String> {
        etl_engine_domain::column_order::resolve::<T>()
            .expect("target record column order resolves without duplicates")
    }
}
