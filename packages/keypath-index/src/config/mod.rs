//! Index configuration
//!
//! Two ways to configure a pipeline:
//! - In code: `IndexConfig::default().index("byEmail", ["value.email"])`
//! - From YAML (schema v1):
//!
//! ```yaml
//! version: 1
//! read_concurrency: 32
//! missing_placeholder: undefined
//! sync_writes: false
//! indexes:
//!   byEmail: [value.email]
//!   lastLogin: [value.user, $latest]
//! ```

pub mod error;

pub use error::{ConfigError, ConfigResult};

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use crate::domain::{IndexDefinition, IndexSet, OrderedStore, WriteOptions, LATEST};
use crate::pipeline::IndexPipeline;
use crate::resolver::MISSING_PLACEHOLDER;

pub const DEFAULT_READ_CONCURRENCY: usize = 16;
pub const MAX_READ_CONCURRENCY: usize = 1024;

const SUPPORTED_VERSIONS: &[u32] = &[1];

/// Validated-on-demand pipeline configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexConfig {
    /// Primary lookups in flight per read
    pub read_concurrency: usize,
    /// Segment written for keypaths that do not resolve
    pub missing_placeholder: String,
    /// Default for [`WriteOptions::sync`]
    pub sync_writes: bool,
    /// Index name → keypaths
    pub indexes: BTreeMap<String, Vec<String>>,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            read_concurrency: DEFAULT_READ_CONCURRENCY,
            missing_placeholder: MISSING_PLACEHOLDER.to_string(),
            sync_writes: false,
            indexes: BTreeMap::new(),
        }
    }
}

/// YAML Schema v1
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFileV1 {
    #[serde(skip_serializing_if = "Option::is_none")]
    version: Option<u32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    read_concurrency: Option<usize>,

    #[serde(skip_serializing_if = "Option::is_none")]
    missing_placeholder: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    sync_writes: Option<bool>,

    #[serde(default)]
    indexes: BTreeMap<String, Vec<String>>,
}

impl IndexConfig {
    pub fn read_concurrency(mut self, read_concurrency: usize) -> Self {
        self.read_concurrency = read_concurrency;
        self
    }

    pub fn missing_placeholder(mut self, placeholder: impl Into<String>) -> Self {
        self.missing_placeholder = placeholder.into();
        self
    }

    pub fn sync_writes(mut self, sync: bool) -> Self {
        self.sync_writes = sync;
        self
    }

    /// Add (or replace) an index definition
    pub fn index<I, S>(mut self, name: impl Into<String>, keypaths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.indexes
            .insert(name.into(), keypaths.into_iter().map(Into::into).collect());
        self
    }

    /// Range checks plus index definition sanity
    pub fn validate(&self) -> ConfigResult<()> {
        if self.read_concurrency == 0 || self.read_concurrency > MAX_READ_CONCURRENCY {
            return Err(ConfigError::range_with_hint(
                "read_concurrency",
                self.read_concurrency,
                1,
                MAX_READ_CONCURRENCY,
                "Lookups are buffered in scan order; 16 is a good default.",
            ));
        }

        for (name, keypaths) in &self.indexes {
            validate_index(name, keypaths)?;
        }
        Ok(())
    }

    pub fn index_set(&self) -> IndexSet {
        self.indexes
            .iter()
            .map(|(name, keypaths)| IndexDefinition::new(name.clone(), keypaths.iter().cloned()))
            .collect()
    }

    pub fn write_options(&self) -> WriteOptions {
        WriteOptions {
            sync: self.sync_writes,
        }
    }

    /// Pipeline over `store` using these settings
    pub fn build_pipeline<S>(&self, store: Arc<S>) -> crate::Result<IndexPipeline<S>>
    where
        S: OrderedStore + ?Sized + 'static,
    {
        IndexPipeline::from_config(store, self)
    }

    /// Load and validate a YAML file
    pub fn from_yaml(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }

    /// Parse and validate YAML text
    pub fn from_yaml_str(content: &str) -> ConfigResult<Self> {
        let file: ConfigFileV1 = serde_yaml::from_str(content)?;

        let version = file.version.ok_or(ConfigError::MissingVersion)?;
        if !SUPPORTED_VERSIONS.contains(&version) {
            return Err(ConfigError::UnsupportedVersion {
                found: version,
                supported: SUPPORTED_VERSIONS.to_vec(),
            });
        }

        let defaults = Self::default();
        let config = Self {
            read_concurrency: file.read_concurrency.unwrap_or(defaults.read_concurrency),
            missing_placeholder: file
                .missing_placeholder
                .unwrap_or(defaults.missing_placeholder),
            sync_writes: file.sync_writes.unwrap_or(defaults.sync_writes),
            indexes: file.indexes,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn to_yaml(&self) -> ConfigResult<String> {
        let file = ConfigFileV1 {
            version: Some(1),
            read_concurrency: Some(self.read_concurrency),
            missing_placeholder: Some(self.missing_placeholder.clone()),
            sync_writes: Some(self.sync_writes),
            indexes: self.indexes.clone(),
        };
        Ok(serde_yaml::to_string(&file)?)
    }
}

fn validate_index(name: &str, keypaths: &[String]) -> ConfigResult<()> {
    if name.is_empty() {
        return Err(ConfigError::invalid_index(name, "index name is empty"));
    }
    if keypaths.is_empty() {
        return Err(ConfigError::invalid_index(name, "no keypaths"));
    }
    if keypaths.iter().any(String::is_empty) {
        return Err(ConfigError::invalid_index(name, "empty keypath"));
    }

    let markers = keypaths.iter().filter(|k| *k == LATEST).count();
    if markers > 1 {
        return Err(ConfigError::invalid_index(
            name,
            format!("{} may appear at most once", LATEST),
        ));
    }
    if markers == keypaths.len() {
        return Err(ConfigError::invalid_index(
            name,
            format!("{} needs at least one field keypath", LATEST),
        ));
    }
    Ok(())
}
