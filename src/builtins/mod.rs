//! Built-in codecs for the Data API datatypes.
//!
//! Each profile registers its own set after the user codecs, so a user codec
//! in the same tier always gets the first look.

pub(crate) mod collection;
pub(crate) mod table;

use crate::codec::Verb;
use crate::datatypes::{decode_base64, encode_base64, DataApiVector};
use crate::engine::Context;
use crate::error::SerDesError;
use crate::value::{Object, Value};

pub(crate) const BINARY: &str = "$binary";

fn done(value: Value) -> anyhow::Result<Verb> {
    Ok(Verb::Done(value))
}

fn nevermind() -> anyhow::Result<Verb> {
    Ok(Verb::Nevermind)
}

/// `{ key: payload }`
pub(crate) fn marker(key: &str, payload: Value) -> Value {
    let mut fields = Object::with_capacity(1);
    fields.insert(key.to_string(), payload);
    Value::Object(fields)
}

/// Payload of a `{ key: payload }` marker object.
pub(crate) fn marker_payload<'v>(value: &'v Value, key: &str) -> Option<&'v Value> {
    match value.marker_key() {
        Some(found) if found == key => value.get(key),
        _ => None,
    }
}

fn vector_to_wire(vector: &DataApiVector, ctx: &Context<'_>) -> Value {
    if ctx.vectors_as_binary() {
        marker(BINARY, Value::String(vector.to_base64()))
    } else {
        Value::Array(
            vector
                .components()
                .iter()
                .map(|c| Value::from(f64::from(*c)))
                .collect(),
        )
    }
}

/// A vector from either a number array or a `$binary` marker.
fn vector_from_wire(value: &Value, ctx: &Context<'_>) -> Result<Option<DataApiVector>, SerDesError> {
    if let Some(items) = value.as_array() {
        return items
            .iter()
            .map(|item| {
                item.as_number()
                    .map(|n| n.as_f64() as f32)
                    .ok_or_else(|| ctx.type_mismatch("vector component", item))
            })
            .collect::<Result<Vec<_>, _>>()
            .map(|components| Some(DataApiVector::new(components)));
    }
    match marker_payload(value, BINARY) {
        Some(Value::String(encoded)) => DataApiVector::from_base64(encoded).map(Some),
        Some(other) => Err(ctx.type_mismatch("base64 string", other)),
        None => Ok(None),
    }
}

fn blob_to_wire(bytes: &[u8]) -> Value {
    marker(BINARY, Value::String(encode_base64(bytes)))
}

fn blob_from_wire(value: &Value, ctx: &Context<'_>) -> Result<Value, SerDesError> {
    match marker_payload(value, BINARY) {
        Some(Value::String(encoded)) => decode_base64(encoded).map(Value::Blob),
        _ => Err(ctx.type_mismatch("{\"$binary\": base64}", value)),
    }
}
