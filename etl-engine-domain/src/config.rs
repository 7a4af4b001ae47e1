// /////////////////////////////////////////////////////////////////////////////
// ETL Engine
// Copyright (c) 2025 Data Platform Engineering
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Configuration (spec §3, §6)
//!
//! Immutable per run. The concrete INI loader is an external collaborator
//! (spec §1 non-goal); this module defines only the validated shape the
//! engine consumes, plus the invariant checks spec §3 requires of it.

use crate::error::ConfigError;
use std::collections::HashMap;

/// One configured extraction source.
#[derive(Debug, Clone)]
pub struct SourceConfig {
    pub name: String,
    pub source_type: String,
    pub connection_string: String,
    /// Category-specific keys: `*.endpoint`, `*.bucket`, `*.region`,
    /// `*.prefix`, `*.secretId`, `*.secretKey`, `*.maxFileSize`, `dateField`
    /// (spec §6), plus any per-source extras.
    pub properties: HashMap<String, String>,
}

impl SourceConfig {
    pub fn property(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(String::as_str)
    }

    /// Anonymous credentials are allowed when both secret components are
    /// absent; presence of only one is a `ConfigError` (spec §4.3).
    pub fn validate_credentials(&self) -> Result<(), ConfigError> {
        let id = self.property("secretId");
        let key = self.property("secretKey");
        match (id, key) {
            (Some(_), Some(_)) | (None, None) => Ok(()),
            _ => Err(ConfigError::PartialCredentials {
                source: self.name.clone(),
            }),
        }
    }
}

/// One configured load target.
#[derive(Debug, Clone)]
pub struct TargetConfig {
    pub name: String,
    pub target_type: String,
    pub connection_url: String,
    pub connection_username: String,
    pub connection_password: String,
    /// Stable sort key order (defaults to `["receive_time"]`, spec §4.9).
    pub sort_fields: Vec<String>,
    /// In-memory ceiling for the loader's sort buffer, in megabytes.
    pub max_memory_mb: u64,
    pub temporary_table_prefix: String,
    /// `dataType → table name` (spec §3, §4.9).
    pub target_table_mappings: HashMap<String, String>,
}

impl TargetConfig {
    pub fn table_for(&self, data_type: &str) -> Option<&str> {
        self.target_table_mappings.get(data_type).map(String::as_str)
    }
}

/// Immutable per-run configuration (spec §3).
#[derive(Debug, Clone)]
pub struct Configuration {
    /// Date field name used by each source when filtering rows to the
    /// current business date (spec §4.5 step 4); may be overridden per
    /// source via `SourceConfig::properties["dateField"]`.
    pub date_field_name: String,
    pub sources: Vec<SourceConfig>,
    pub targets: Vec<TargetConfig>,
}

impl Configuration {
    /// Validate the cross-cutting invariants of spec §3:
    /// - every source type referenced must be constructible by the
    ///   extractor factory (checked against `known_source_types`, since the
    ///   factory itself lives in the `etl-engine` crate);
    /// - every `dataType` produced by extraction must appear as a key in
    ///   some target's `targetTableMappings`.
    pub fn validate(&self, known_source_types: &[&str], produced_data_types: &[&str]) -> Result<(), ConfigError> {
        for source in &self.sources {
            source.validate_credentials()?;
            if !known_source_types.contains(&source.source_type.as_str()) {
                return Err(ConfigError::UnknownSourceType {
                    source: source.name.clone(),
                    source_type: source.source_type.clone(),
                });
            }
        }

        for data_type in produced_data_types {
            let mapped = self
                .targets
                .iter()
                .any(|t| t.target_table_mappings.contains_key(*data_type));
            if !mapped {
                return Err(ConfigError::UnmappedDataType {
                    data_type: (*data_type).to_string(),
                });
            }
        }

        Ok(())
    }
}
