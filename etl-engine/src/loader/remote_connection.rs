// /////////////////////////////////////////////////////////////////////////////
// ETL Engine
// Copyright (c) 2025 Data Platform Engineering
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Scripted Remote Connection (spec §6 staging/load wire protocol)
//!
//! `createScript → bulkInsert(batch, columns)* → appendStagingToTarget →
//! countRows → dropScript`, over a single connection the Load subprocess
//! opens and the Clean subprocess closes (spec §4.10). `sqlx`'s sqlite
//! driver stands in for whichever concrete remote-store driver a
//! deployment wires in (spec §1: the driver itself is an external
//! collaborator).

use async_trait::async_trait;
use etl_engine_domain::{LoadError, SharedStoreConnection, WireValue};
use sqlx::{Row, SqlitePool};
use std::sync::atomic::{AtomicBool, Ordering};

/// The scripted-call surface the loader drives (spec §6). Kept separate
/// from `SharedStoreConnection` so the domain layer only sees the thin
/// `is_open` handle while the application layer drives the actual script.
#[async_trait]
pub trait ScriptExecutor: Send + Sync {
    async fn run_script(&self, script: &str) -> Result<(), LoadError>;
    async fn bulk_insert(&self, table: &str, columns: &[String], rows: &[Vec<WireValue>]) -> Result<u64, LoadError>;
    async fn append_staging_to_target(&self, staging_table: &str, target_table: &str) -> Result<u64, LoadError>;
    async fn count_rows(&self, table: &str) -> Result<u64, LoadError>;
}

/// Combined capability a concrete remote-store connection offers: the
/// domain-facing `is_open` handle plus the scripted-call surface the
/// loader drives. Staging lifecycle code depends on this rather than a
/// concrete connection type so a future live driver only needs to
/// implement both traits (spec §1 external collaborator).
pub trait RemoteConnection: SharedStoreConnection + ScriptExecutor {}
impl<T: SharedStoreConnection + ScriptExecutor> RemoteConnection for T {}

/// Sqlite-backed test double for the remote store connection.
pub struct SqliteRemoteConnection {
    pool: SqlitePool,
    open: AtomicBool,
}

impl SqliteRemoteConnection {
    pub async fn connect(url: &str) -> Result<Self, LoadError> {
        let pool = SqlitePool::connect(url).await.map_err(|e| LoadError {
            target: url.to_string(),
            message: "failed to open remote store connection".to_string(),
            cause: Some(Box::new(e)),
        })?;
        Ok(Self { pool, open: AtomicBool::new(true) })
    }

}

impl SharedStoreConnection for SqliteRemoteConnection {
    fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    fn close(&self) {
        self.open.store(false, Ordering::SeqCst);
        self.pool.close_event();
    }
}

#[async_trait]
impl ScriptExecutor for SqliteRemoteConnection {
    async fn run_script(&self, script: &str) -> Result<(), LoadError> {
        for statement in script.split(';').map(str::trim).filter(|s| !s.is_empty()) {
            sqlx::query(statement).execute(&self.pool).await.map_err(|e| LoadError {
                target: "script".to_string(),
                message: format!("script statement failed: {statement}"),
                cause: Some(Box::new(e)),
            })?;
        }
        Ok(())
    }

    async fn bulk_insert(&self, table: &str, columns: &[String], rows: &[Vec<WireValue>]) -> Result<u64, LoadError> {
        if rows.is_empty() {
            return Ok(0);
        }
        let placeholders = columns.iter().map(|_| "?").collect::<Vec<_>>().join(", ");
        let sql = format!("INSERT INTO {table} ({}) VALUES ({placeholders})", columns.join(", "));
        let mut inserted = 0u64;
        for row in rows {
            let mut query = sqlx::query(&sql);
            for value in row {
                query = match value {
                    WireValue::Str(s) => query.bind(s.clone()),
                    WireValue::F64(v) => query.bind(*v),
                    WireValue::I64(v) => query.bind(*v),
                    WireValue::Null => query.bind(Option::<String>::None),
                };
            }
            query.execute(&self.pool).await.map_err(|e| LoadError {
                target: table.to_string(),
                message: "bulk insert row failed".to_string(),
                cause: Some(Box::new(e)),
            })?;
            inserted += 1;
        }
        Ok(inserted)
    }

    async fn append_staging_to_target(&self, staging_table: &str, target_table: &str) -> Result<u64, LoadError> {
        let sql = format!("INSERT INTO {target_table} SELECT * FROM {staging_table}");
        let result = sqlx::query(&sql).execute(&self.pool).await.map_err(|e| LoadError {
            target: target_table.to_string(),
            message: format!("append from {staging_table} failed"),
            cause: Some(Box::new(e)),
        })?;
        Ok(result.rows_affected())
    }

    async fn count_rows(&self, table: &str) -> Result<u64, LoadError> {
        let row = sqlx::query(&format!("SELECT COUNT(*) as n FROM {table}"))
            .fetch_one(&self.pool)
            .await
            .map_err(|e| LoadError {
                target: table.to_string(),
                message: "row count query failed".to_string(),
                cause: Some(Box::new(e)),
            })?;
        let n: i64 = row.try_get("n").map_err(|e| LoadError {
            target: table.to_string(),
            message: "row count column missing".to_string(),
            cause: Some(Box::new(e)),
        })?;
        Ok(n as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn create_insert_count_round_trip() {
        let conn = SqliteRemoteConnection::connect("sqlite::memory:").await.unwrap();
        conn.run_script("CREATE TABLE staging_trade (trade_id TEXT, trade_price REAL)").await.unwrap();
        let rows = vec![vec![WireValue::Str("t1".into()), WireValue::F64(98.4289)]];
        let inserted = conn
            .bulk_insert("staging_trade", &["trade_id".to_string(), "trade_price".to_string()], &rows)
            .await
            .unwrap();
        assert_eq!(inserted, 1);
        assert_eq!(conn.count_rows("staging_trade").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn append_staging_to_target_moves_rows() {
        let conn = SqliteRemoteConnection::connect("sqlite::memory:").await.unwrap();
        conn.run_script(
            "CREATE TABLE staging_trade (trade_id TEXT); CREATE TABLE trade_target (trade_id TEXT)",
        )
        .await
        .unwrap();
        conn.bulk_insert("staging_trade", &["trade_id".to_string()], &[vec![WireValue::Str("t1".into())]])
            .await
            .unwrap();
        let appended = conn.append_staging_to_target("staging_trade", "trade_target").await.unwrap();
        assert_eq!(appended, 1);
        assert_eq!(conn.count_rows("trade_target").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn close_marks_connection_not_open() {
        let conn = SqliteRemoteConnection::connect("sqlite::memory:").await.unwrap();
        assert!(conn.is_open());
        conn.close();
        assert!(!conn.is_open());
    }
}
