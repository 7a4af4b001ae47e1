// /////////////////////////////////////////////////////////////////////////////
// ETL Engine
// Copyright (c) 2025 Data Platform Engineering
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # File Metadata (spec §3, §4.3)

use crate::error::FileTooLargeError;
use chrono::{DateTime, Utc};

/// Metadata for one object-store entry, as returned by `list` (spec §4.3).
#[derive(Debug, Clone, PartialEq)]
pub struct FileMetadata {
    pub key: String,
    pub size: u64,
    pub last_modified: DateTime<Utc>,
    pub content_hash: Option<String>,
}

impl FileMetadata {
    /// Fails with `FileTooLarge` when `size > ceiling` (spec §4.3, §8:
    /// "exactly-at-ceiling... accepted; one byte above: rejected").
    pub fn size_check(&self, ceiling: u64) -> Result<(), FileTooLargeError> {
        if self.size > ceiling {
            return Err(FileTooLargeError {
                key: self.key.clone(),
                size: self.size,
                ceiling,
            });
        }
        Ok(())
    }
}
