//! Collection and table profiles.
//!
//! A profile is an engine configured with its built-in codecs, numeric
//! policy, key transformer and output options. Profiles are immutable once
//! built and can be shared across threads.

mod collection;
mod table;

pub use collection::{CollectionSerDes, CollectionSerDesBuilder};
pub use table::{TableSerDes, TableSerDesBuilder};

use std::sync::Arc;
use tracing::debug;

use crate::codec::{Codec, CodecRegistry};
use crate::engine::{Engine, ProfileKind};
use crate::error::SerDesError;
use crate::keys::KeyTransformer;
use crate::numeric::NumericPolicy;
use crate::value::Value;

/// Result of a non-mutating serialize call.
#[derive(Debug, Clone, PartialEq)]
pub struct Serialized {
    /// Wire value, JSON subset only.
    pub value: Value,
    /// A user codec produced output somewhere in the tree.
    pub used_custom_codec: bool,
    /// Some number needs exact text on the wire.
    pub big_numbers: bool,
}

impl Serialized {
    fn new(value: Value, report: SerializeReport) -> Self {
        Self {
            value,
            used_custom_codec: report.used_custom_codec,
            big_numbers: report.big_numbers,
        }
    }

    pub fn to_json(&self) -> Result<serde_json::Value, SerDesError> {
        self.value.to_json()
    }

    pub fn to_json_string(&self) -> Result<String, SerDesError> {
        self.value.to_json_string()
    }
}

/// Flags from a serialize call that rewrote the caller's value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SerializeReport {
    pub used_custom_codec: bool,
    pub big_numbers: bool,
}

/// Options shared by both profile builders.
#[derive(Debug, Clone)]
struct ProfileOptions {
    codecs: Vec<Codec>,
    numeric: NumericPolicy,
    keys: Option<Arc<dyn KeyTransformer>>,
    vectors_as_binary: bool,
}

impl Default for ProfileOptions {
    fn default() -> Self {
        Self {
            codecs: Vec::new(),
            numeric: NumericPolicy::default(),
            keys: None,
            vectors_as_binary: true,
        }
    }
}

impl ProfileOptions {
    fn into_engine(self, kind: ProfileKind, builtins: Vec<Codec>) -> Engine {
        let user = self.codecs.len();
        let mut registry = CodecRegistry::new(self.codecs, builtins);
        if kind == ProfileKind::Table {
            registry = registry.without_name_tier();
        }
        debug!(
            ?kind,
            user_codecs = user,
            builtin_codecs = registry.len() - user,
            numeric = ?self.numeric,
            key_transformer = self.keys.is_some(),
            vectors_as_binary = self.vectors_as_binary,
            "serdes profile built"
        );
        Engine::new(
            kind,
            registry,
            self.numeric,
            self.keys,
            self.vectors_as_binary,
        )
    }
}
