//! JSON boundary: conversion to and from `serde_json` and JSON text.
//!
//! Exact number text survives both directions (`arbitrary_precision`), and
//! object key order is preserved (`preserve_order`).

use serde::ser::{Error as _, SerializeMap, SerializeSeq};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::{display_path, Number, PathSegment, Value};
use crate::error::SerDesError;

impl Value {
    /// Parse JSON text.
    ///
    /// # Errors
    /// Returns `Json` for malformed text.
    pub fn from_json_str(text: &str) -> Result<Self, SerDesError> {
        let json: serde_json::Value = serde_json::from_str(text)?;
        Ok(Self::from(json))
    }

    /// Convert to a `serde_json::Value`.
    ///
    /// # Errors
    /// Returns `Unserializable` when a host-only variant or a non-finite float
    /// is still present.
    pub fn to_json(&self) -> Result<serde_json::Value, SerDesError> {
        let mut path = Vec::new();
        to_json_at(self, &mut path)
    }

    /// Render as compact JSON text.
    ///
    /// # Errors
    /// Same conditions as [`Value::to_json`].
    pub fn to_json_string(&self) -> Result<String, SerDesError> {
        Ok(serde_json::to_string(&self.to_json()?)?)
    }
}

fn to_json_at(
    value: &Value,
    path: &mut Vec<PathSegment>,
) -> Result<serde_json::Value, SerDesError> {
    Ok(match value {
        Value::Null => serde_json::Value::Null,
        Value::Bool(b) => serde_json::Value::Bool(*b),
        Value::String(s) => serde_json::Value::String(s.clone()),
        Value::Number(n) => match n {
            Number::Int(i) => serde_json::Value::from(*i),
            Number::Float(f) => serde_json::Number::from_f64(*f)
                .map(serde_json::Value::Number)
                .ok_or_else(|| unserializable(path.as_slice(), "non-finite number"))?,
            Number::Exact(text) => serde_json::Value::Number(text.parse()?),
        },
        Value::Array(items) => {
            let mut out = Vec::with_capacity(items.len());
            for (idx, item) in items.iter().enumerate() {
                path.push(PathSegment::Index(idx));
                out.push(to_json_at(item, path)?);
                path.pop();
            }
            serde_json::Value::Array(out)
        }
        Value::Object(fields) => {
            let mut out = serde_json::Map::with_capacity(fields.len());
            for (key, item) in fields {
                path.push(PathSegment::Field(key.clone()));
                out.insert(key.clone(), to_json_at(item, path)?);
                path.pop();
            }
            serde_json::Value::Object(out)
        }
        other => return Err(unserializable(path.as_slice(), other.type_name())),
    })
}

fn unserializable(path: &[PathSegment], type_name: &str) -> SerDesError {
    SerDesError::Unserializable {
        path: display_path(path),
        type_name: type_name.to_string(),
    }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Self::Null,
            serde_json::Value::Bool(b) => Self::Bool(b),
            serde_json::Value::Number(n) => Self::Number(Number::from(n)),
            serde_json::Value::String(s) => Self::String(s),
            serde_json::Value::Array(items) => {
                Self::Array(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(fields) => {
                Self::Object(fields.into_iter().map(|(k, v)| (k, Value::from(v))).collect())
            }
        }
    }
}

impl From<serde_json::Number> for Number {
    fn from(n: serde_json::Number) -> Self {
        if let Some(int) = n.as_i64() {
            return Number::Int(int);
        }
        let text = n.to_string();
        // serde_json only hands out syntactically valid numbers
        Number::from_text(&text).unwrap_or(Number::Exact(text))
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Null => serializer.serialize_unit(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::String(s) => serializer.serialize_str(s),
            Value::Number(Number::Int(i)) => serializer.serialize_i64(*i),
            Value::Number(Number::Float(f)) if !f.is_finite() => Err(S::Error::custom(format!(
                "non-finite number {} must pass through the numeric policy before it is written",
                f
            ))),
            Value::Number(Number::Float(f)) => serializer.serialize_f64(*f),
            Value::Number(Number::Exact(text)) => text
                .parse::<serde_json::Number>()
                .map_err(S::Error::custom)?
                .serialize(serializer),
            Value::Array(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Value::Object(fields) => {
                let mut map = serializer.serialize_map(Some(fields.len()))?;
                for (key, item) in fields {
                    map.serialize_entry(key, item)?;
                }
                map.end()
            }
            other => Err(S::Error::custom(format!(
                "host value of type `{}` must pass through a codec before it is written",
                other.type_name()
            ))),
        }
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        serde_json::Value::deserialize(deserializer).map(Value::from)
    }
}
