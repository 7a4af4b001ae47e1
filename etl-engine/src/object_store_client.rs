// /////////////////////////////////////////////////////////////////////////////
// ETL Engine
// Copyright (c) 2025 Data Platform Engineering
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Object-Store Client Wrapper (C3, spec §4.3)
//!
//! Thin wrapper over the `object_store` crate: list objects by prefix,
//! download to a bounded local temp file, and the file-size precheck
//! extractors run before spending I/O on a download (spec §4.3, §8:
//! "exactly-at-ceiling... accepted; one byte above: rejected").

use chrono::Utc;
use etl_engine_domain::{DownloadError, FileMetadata, SourceConfig};
use object_store::path::Path as ObjectPath;
use object_store::{ObjectStore, PutPayload};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;

/// Credentials for an object-store bucket, read from a source's
/// `secretId`/`secretKey` properties. Anonymous when both are absent
/// (spec §4.3); a partial pair is a `ConfigError` from
/// `SourceConfig::validate_credentials`, which the caller must run before
/// trusting this as complete.
#[derive(Debug, Clone, Default)]
pub struct ObjectStoreCredentials {
    pub secret_id: Option<String>,
    pub secret_key: Option<String>,
}

impl ObjectStoreCredentials {
    pub fn from_source(source: &SourceConfig) -> Self {
        Self {
            secret_id: source.property("secretId").map(str::to_string),
            secret_key: source.property("secretKey").map(str::to_string),
        }
    }

    pub fn is_anonymous(&self) -> bool {
        self.secret_id.is_none() && self.secret_key.is_none()
    }
}

/// Wraps a concrete `object_store::ObjectStore` with the three operations
/// the extractors need (spec §4.3). The `ObjectStore` trait itself already
/// models the `aws`/`gcp`/local-fs backends uniformly, so this wrapper adds
/// only the ETL-specific `list`/`download`/`size_check` contract and error
/// mapping to [`DownloadError`]/[`etl_engine_domain::FileTooLargeError`].
pub struct ObjectStoreClient {
    store: Arc<dyn ObjectStore>,
    temp_dir: PathBuf,
}

impl ObjectStoreClient {
    pub fn new(store: Arc<dyn ObjectStore>, temp_dir: PathBuf) -> Self {
        Self { store, temp_dir }
    }

    /// Returns all objects under `prefix` whose key matches `filter`
    /// (already resolved against the current date by the caller).
    /// Ordering: deterministic by key ascending (spec §4.3).
    pub async fn list(&self, prefix: &str, filter: impl Fn(&str) -> bool) -> Result<Vec<FileMetadata>, DownloadError> {
        use futures::stream::StreamExt;

        let object_path = ObjectPath::from(prefix);
        let mut stream = self.store.list(Some(&object_path));
        let mut matched = Vec::new();

        while let Some(entry) = stream.next().await {
            let meta = entry.map_err(|e| DownloadError {
                key: prefix.to_string(),
                message: "listing failed".to_string(),
                cause: Some(Box::new(e)),
            })?;
            let key = meta.location.to_string();
            if filter(&key) {
                matched.push(FileMetadata {
                    key,
                    size: meta.size as u64,
                    last_modified: meta.last_modified,
                    content_hash: meta.e_tag,
                });
            }
        }

        matched.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(matched)
    }

    /// Stream the object into a file in the per-run temp directory. The
    /// caller owns the returned path. Any I/O or auth failure maps to
    /// `DownloadError` (spec §4.3: "one failure fails the day").
    pub async fn download(&self, key: &str) -> Result<PathBuf, DownloadError> {
        let object_path = ObjectPath::from(key);
        let get_result = self.store.get(&object_path).await.map_err(|e| DownloadError {
            key: key.to_string(),
            message: "fetch failed".to_string(),
            cause: Some(Box::new(e)),
        })?;

        let bytes = get_result.bytes().await.map_err(|e| DownloadError {
            key: key.to_string(),
            message: "streaming body failed".to_string(),
            cause: Some(Box::new(e)),
        })?;

        let file_name = key.rsplit('/').next().unwrap_or(key);
        let local_path = self.temp_dir.join(format!("{}-{}", Utc::now().timestamp_nanos_opt().unwrap_or(0), file_name));

        let mut file = File::create(&local_path).await.map_err(|e| DownloadError {
            key: key.to_string(),
            message: "could not create local temp file".to_string(),
            cause: Some(Box::new(e)),
        })?;
        file.write_all(&bytes).await.map_err(|e| DownloadError {
            key: key.to_string(),
            message: "could not write local temp file".to_string(),
            cause: Some(Box::new(e)),
        })?;

        Ok(local_path)
    }

    /// Write-side counterpart used only by integration tests seeding an
    /// in-memory store; production extraction never writes to the source.
    #[cfg(test)]
    pub async fn put_for_test(&self, key: &str, bytes: Vec<u8>) -> Result<(), DownloadError> {
        let object_path = ObjectPath::from(key);
        self.store
            .put(&object_path, PutPayload::from(bytes))
            .await
            .map(|_| ())
            .map_err(|e| DownloadError {
                key: key.to_string(),
                message: "seed put failed".to_string(),
                cause: Some(Box::new(e)),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use etl_engine_domain::FileTooLargeError;
    use object_store::memory::InMemory;

    fn check_size(meta: &FileMetadata, ceiling: u64) -> Result<(), FileTooLargeError> {
        meta.size_check(ceiling)
    }

    #[tokio::test]
    async fn list_returns_keys_matching_filter_in_ascending_order() {
        let store: Arc<dyn ObjectStore> = Arc::new(InMemory::new());
        let temp_dir = tempfile::tempdir().unwrap();
        let client = ObjectStoreClient::new(store, temp_dir.path().to_path_buf());

        client.put_for_test("AllPriceDepth/20250101/b.csv", b"x".to_vec()).await.unwrap();
        client.put_for_test("AllPriceDepth/20250101/a.csv", b"y".to_vec()).await.unwrap();
        client.put_for_test("AllPriceDepth/20250102/c.csv", b"z".to_vec()).await.unwrap();

        let files = client
            .list("AllPriceDepth/20250101", |k| k.ends_with(".csv"))
            .await
            .unwrap();

        assert_eq!(files.len(), 2);
        assert!(files[0].key < files[1].key);
    }

    #[tokio::test]
    async fn download_writes_bytes_to_local_temp_file() {
        let store: Arc<dyn ObjectStore> = Arc::new(InMemory::new());
        let temp_dir = tempfile::tempdir().unwrap();
        let client = ObjectStoreClient::new(store, temp_dir.path().to_path_buf());

        client.put_for_test("TradeData/20250101/trades.csv", b"a,b\n1,2\n".to_vec()).await.unwrap();
        let path = client.download("TradeData/20250101/trades.csv").await.unwrap();
        let contents = tokio::fs::read_to_string(&path).await.unwrap();
        assert_eq!(contents, "a,b\n1,2\n");
    }

    #[test]
    fn size_check_accepts_exactly_at_ceiling_rejects_over() {
        let meta = FileMetadata {
            key: "k".into(),
            size: 100,
            last_modified: Utc::now(),
            content_hash: None,
        };
        assert!(check_size(&meta, 100).is_ok());
        assert!(check_size(&meta, 99).is_err());
    }

    #[test]
    fn anonymous_when_both_secrets_absent() {
        let creds = ObjectStoreCredentials::default();
        assert!(creds.is_anonymous());
    }

    #[test]
    fn from_source_reads_secret_properties() {
        let source = etl_engine_domain::SourceConfig {
            name: "ebs".into(),
            source_type: "object_store".into(),
            connection_string: "memory://".into(),
            properties: std::collections::HashMap::from([
                ("secretId".to_string(), "id".to_string()),
                ("secretKey".to_string(), "key".to_string()),
            ]),
        };
        let creds = ObjectStoreCredentials::from_source(&source);
        assert!(!creds.is_anonymous());
        assert_eq!(creds.secret_id.as_deref(), Some("id"));
        assert_eq!(creds.secret_key.as_deref(), Some("key"));
    }
}
