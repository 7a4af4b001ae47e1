// /////////////////////////////////////////////////////////////////////////////
// ETL Engine
// Copyright (c) 2025 Data Platform Engineering
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Configuration Loader (ambient, spec §1 external collaborator)
//!
//! `Configuration`/`SourceConfig`/`TargetConfig` are domain types; loading
//! them from disk is named in spec §1 as an external collaborator and the
//! concrete INI grammar is out of scope. What ships here is a `config`-crate
//! backed reference loader sufficient for integration tests and local runs:
//! layered file + environment sources, `${NAME}` interpolation for
//! credentials (spec §6), and the same build-then-validate shape the
//! bootstrap crate's `AppConfig` builder uses.

use config::{Config, File};
use etl_engine_domain::{ConfigError, Configuration, SourceConfig, TargetConfig};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

#[derive(Debug, Deserialize)]
struct RawSource {
    name: String,
    source_type: String,
    connection_string: String,
    #[serde(default)]
    properties: HashMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct RawTarget {
    name: String,
    target_type: String,
    connection_url: String,
    #[serde(default)]
    connection_username: String,
    #[serde(default)]
    connection_password: String,
    #[serde(default)]
    sort_fields: Vec<String>,
    #[serde(default = "default_max_memory_mb")]
    max_memory_mb: u64,
    temporary_table_prefix: String,
    #[serde(default)]
    target_table_mappings: HashMap<String, String>,
}

fn default_max_memory_mb() -> u64 {
    256
}

#[derive(Debug, Deserialize)]
struct RawConfiguration {
    date_field_name: String,
    #[serde(default)]
    sources: Vec<RawSource>,
    #[serde(default)]
    targets: Vec<RawTarget>,
}

/// Load a [`Configuration`] from a file (TOML/YAML/JSON, dispatched by
/// extension via the `config` crate) layered with `ETL_`-prefixed
/// environment overrides, then interpolate `${NAME}` references against the
/// process environment in every `connection_string`/`connection_password`
/// value (spec §6 credential handling).
///
/// Missing required keys surface as [`ConfigError::MissingKey`] rather than
/// a `config`-crate error, so callers see the same taxonomy the rest of the
/// engine raises.
pub fn load_configuration(path: &Path) -> Result<Configuration, ConfigError> {
    let settings = Config::builder()
        .add_source(File::from(path))
        .add_source(config::Environment::with_prefix("ETL").separator("__"))
        .build()
        .map_err(|e| ConfigError::MissingKey {
            section: path.display().to_string(),
            key: e.to_string(),
        })?;

    let raw: RawConfiguration = settings.try_deserialize().map_err(|e| ConfigError::MissingKey {
        section: "root".to_string(),
        key: e.to_string(),
    })?;

    let sources = raw
        .sources
        .into_iter()
        .map(|s| SourceConfig {
            name: s.name,
            source_type: s.source_type,
            connection_string: interpolate(&s.connection_string),
            properties: s.properties.into_iter().map(|(k, v)| (k, interpolate(&v))).collect(),
        })
        .collect();

    let targets = raw
        .targets
        .into_iter()
        .map(|t| TargetConfig {
            name: t.name,
            target_type: t.target_type,
            connection_url: interpolate(&t.connection_url),
            connection_username: interpolate(&t.connection_username),
            connection_password: interpolate(&t.connection_password),
            sort_fields: t.sort_fields,
            max_memory_mb: t.max_memory_mb,
            temporary_table_prefix: t.temporary_table_prefix,
            target_table_mappings: t.target_table_mappings,
        })
        .collect();

    Ok(Configuration {
        date_field_name: raw.date_field_name,
        sources,
        targets,
    })
}

/// Replace every `${NAME}` with the value of the `NAME` environment
/// variable; an unset variable is left as a literal, empty string rather
/// than failing the load, since not every deployment sets every credential.
fn interpolate(value: &str) -> String {
    let mut result = String::with_capacity(value.len());
    let mut rest = value;
    while let Some(start) = rest.find("${") {
        result.push_str(&rest[..start]);
        let Some(end) = rest[start..].find('}') else {
            result.push_str(&rest[start..]);
            rest = "";
            break;
        };
        let name = &rest[start + 2..start + end];
        result.push_str(&std::env::var(name).unwrap_or_default());
        rest = &rest[start + end + 1..];
    }
    result.push_str(rest);
    result
}
