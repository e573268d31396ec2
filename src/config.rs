//! Profile configuration
//!
//! Loads profile options from YAML:
//!
//! ```yaml
//! sparse_data: false
//! vectors_as_binary: true
//! key_case: snake_case
//! transform_nested_keys: false
//! numeric:
//!   "*": number
//!   stats.*: bigdecimal
//!   ledger.balance: string
//! ```
//!
//! Codecs are code and are added to the returned builders.

use anyhow::{Context, Result};
use indexmap::IndexMap;
use serde::Deserialize;
use std::path::Path;
use tracing::info;

use crate::error::SerDesError;
use crate::keys::CamelSnakeCase;
use crate::numeric::{NumericPolicy, Representation, RepresentationTable};
use crate::profile::{CollectionSerDes, CollectionSerDesBuilder, TableSerDes, TableSerDesBuilder};

/// Env var naming a YAML config file.
pub const CONFIG_ENV: &str = "DATA_API_SERDES_CONFIG";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyCase {
    /// Keys are sent as written.
    #[default]
    Preserve,
    /// camelCase host keys, snake_case wire keys.
    SnakeCase,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SerDesConfig {
    /// Tables only: omit absent columns instead of filling defaults.
    pub sparse_data: bool,
    pub vectors_as_binary: bool,
    pub key_case: KeyCase,
    /// Rename keys of nested objects too, not just the root.
    pub transform_nested_keys: bool,
    /// Rename `_id` along with the other keys.
    pub transform_id: bool,
    /// Path pattern to representation name, `"*"` for the default.
    pub numeric: IndexMap<String, String>,
}

impl Default for SerDesConfig {
    fn default() -> Self {
        Self {
            sparse_data: false,
            vectors_as_binary: true,
            key_case: KeyCase::Preserve,
            transform_nested_keys: false,
            transform_id: false,
            numeric: IndexMap::new(),
        }
    }
}

impl SerDesConfig {
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml).context("Failed to parse serdes config")?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        info!("Loading serdes configuration from {}", path.display());

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let config: Self = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        config
            .validate()
            .with_context(|| format!("Invalid serdes config in {}", path.display()))?;

        info!(
            "Loaded serdes config: key_case={:?}, {} numeric rules",
            config.key_case,
            config.numeric.len()
        );
        Ok(config)
    }

    /// Load the file named by `DATA_API_SERDES_CONFIG`, if set.
    pub fn from_env() -> Result<Option<Self>> {
        match std::env::var(CONFIG_ENV) {
            Ok(path) if !path.trim().is_empty() => Self::from_file(path.trim()).map(Some),
            _ => Ok(None),
        }
    }

    /// Check every numeric rule.
    pub fn validate(&self) -> Result<(), SerDesError> {
        self.numeric_rules().map(|_| ())
    }

    fn numeric_rules(&self) -> Result<Vec<(&str, Representation)>, SerDesError> {
        self.numeric
            .iter()
            .map(|(pattern, repr)| {
                check_pattern(pattern).and_then(|pattern| {
                    repr.parse::<Representation>()
                        .map(|repr| (pattern, repr))
                })
            })
            .collect()
    }

    pub fn numeric_policy(&self) -> Result<NumericPolicy, SerDesError> {
        self.numeric_rules()
            .map(|rules| NumericPolicy::from(rules.into_iter().collect::<RepresentationTable>()))
    }

    pub fn key_transformer(&self) -> Option<CamelSnakeCase> {
        match self.key_case {
            KeyCase::Preserve => None,
            KeyCase::SnakeCase => {
                let mut keys = CamelSnakeCase::new();
                if self.transform_id {
                    keys = keys.transform_id();
                }
                if self.transform_nested_keys {
                    keys = keys.deep();
                }
                Some(keys)
            }
        }
    }

    pub fn collection_builder(&self) -> Result<CollectionSerDesBuilder, SerDesError> {
        let builder = CollectionSerDes::builder()
            .numeric(self.numeric_policy()?)
            .vectors_as_binary(self.vectors_as_binary);
        Ok(match self.key_transformer() {
            Some(keys) => builder.key_transformer(keys),
            None => builder,
        })
    }

    pub fn table_builder(&self) -> Result<TableSerDesBuilder, SerDesError> {
        let builder = TableSerDes::builder()
            .numeric(self.numeric_policy()?)
            .vectors_as_binary(self.vectors_as_binary)
            .sparse_data(self.sparse_data);
        Ok(match self.key_transformer() {
            Some(keys) => builder.key_transformer(keys),
            None => builder,
        })
    }
}

fn check_pattern(pattern: &str) -> Result<&str, SerDesError> {
    if pattern == "*" {
        return Ok(pattern);
    }
    if pattern.split('.').any(|segment| segment.trim().is_empty()) {
        return Err(SerDesError::Config(format!(
            "numeric path pattern '{}' has an empty segment",
            pattern
        )));
    }
    Ok(pattern)
}
