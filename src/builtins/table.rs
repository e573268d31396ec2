//! Table profile built-ins.
//!
//! Serialization is driven by the host type. Deserialization is driven by the
//! declared column type; container columns pass their element types down to
//! the elements so nested values decode the same way.

use bigdecimal::num_bigint::{BigInt, ToBigInt};
use bigdecimal::BigDecimal;
use chrono::{DateTime, SecondsFormat, Utc};
use std::str::FromStr;

use super::collection::parse_uuid;
use super::{blob_from_wire, blob_to_wire, done, nevermind, vector_from_wire, vector_to_wire};
use crate::codec::Codec;
use crate::engine::Context;
use crate::error::SerDesError;
use crate::numeric::MAX_BIGINT_DIGITS;
use crate::schema::ColumnType;
use crate::value::{is_integer, magnitude, Number, Object, PathSegment, Value};

const INTEGER_TYPES: &[&str] = &["int", "smallint", "tinyint", "bigint", "counter"];
const FLOAT_TYPES: &[&str] = &["float", "double"];
const TEXT_TYPES: &[&str] = &["text", "ascii", "varchar"];
const UUID_TYPES: &[&str] = &["uuid", "timeuuid"];

pub(crate) fn codecs() -> Vec<Codec> {
    let mut codecs = serializers();
    codecs.extend(deserializers());
    codecs
}

fn serializers() -> Vec<Codec> {
    vec![
        Codec::for_type("timestamp")
            .named("timestamp")
            .serialize(|_, value, _| match value {
                Value::Timestamp(at) => done(Value::String(format_timestamp(at))),
                _ => nevermind(),
            }),
        Codec::for_type("uuid")
            .named("uuid")
            .serialize(|_, value, _| match value {
                Value::Uuid(id) => done(Value::String(id.hyphenated().to_string())),
                _ => nevermind(),
            }),
        Codec::for_type("objectId")
            .named("objectId")
            .serialize(|_, value, _| match value {
                Value::ObjectId(id) => done(Value::String(id.to_hex())),
                _ => nevermind(),
            }),
        Codec::for_type("vector")
            .named("vector")
            .serialize(|_, value, ctx| match value {
                Value::Vector(vector) => done(vector_to_wire(vector, ctx)),
                _ => nevermind(),
            }),
        Codec::for_type("blob")
            .named("blob")
            .serialize(|_, value, _| match value {
                Value::Blob(bytes) => done(blob_to_wire(bytes)),
                _ => nevermind(),
            }),
        Codec::for_type("map")
            .named("map")
            .serialize(|_, value, ctx| match value {
                Value::Map(entries) => done(serialize_map(entries, ctx)?),
                _ => nevermind(),
            }),
        Codec::for_type("set")
            .named("set")
            .serialize(|_, value, ctx| match value {
                Value::Set(items) => done(Value::Array(process_items(items, None, ctx)?)),
                _ => nevermind(),
            }),
    ]
}

/// Column codec: only offered non-null values of columns declared `name`.
fn column(name: &str) -> Codec {
    Codec::for_type(name)
        .named(name)
        .when(|value, _| !value.is_null())
}

fn deserializers() -> Vec<Codec> {
    let mut codecs = Vec::new();
    for name in INTEGER_TYPES {
        codecs.push(column(name).deserialize(|_, value, ctx| match value {
            Value::Number(n) => n
                .as_i64()
                .map(|int| Value::Number(Number::Int(int)))
                .ok_or_else(|| ctx.type_mismatch("integer", value).into())
                .and_then(done),
            other => Err(ctx.type_mismatch("integer", other).into()),
        }));
    }
    for name in FLOAT_TYPES {
        codecs.push(column(name).deserialize(|_, value, ctx| match value {
            Value::Number(n) => done(Value::Number(Number::Float(n.as_f64()))),
            Value::String(text) => done(Value::Number(Number::Float(non_finite(text, ctx)?))),
            other => Err(ctx.type_mismatch("float", other).into()),
        }));
    }
    for name in TEXT_TYPES {
        codecs.push(column(name).deserialize(|_, value, ctx| match value {
            Value::String(_) => done(value.clone()),
            other => Err(ctx.type_mismatch("text", other).into()),
        }));
    }
    for name in UUID_TYPES {
        codecs.push(column(name).deserialize(|_, value, ctx| match value {
            Value::String(text) => done(Value::Uuid(parse_uuid(text)?)),
            other => Err(ctx.type_mismatch("uuid", other).into()),
        }));
    }
    codecs.extend([
        column("boolean").deserialize(|_, value, ctx| match value {
            Value::Bool(_) => done(value.clone()),
            other => Err(ctx.type_mismatch("boolean", other).into()),
        }),
        column("varint").deserialize(|_, value, ctx| done(Value::BigInt(parse_varint(value, ctx)?))),
        column("decimal").deserialize(|_, value, ctx| {
            done(Value::Decimal(parse_decimal(value, ctx)?))
        }),
        column("timestamp").deserialize(|_, value, ctx| match value {
            Value::String(text) => done(Value::Timestamp(parse_timestamp(text)?)),
            other => Err(ctx.type_mismatch("timestamp string", other).into()),
        }),
        column("blob").deserialize(|_, value, ctx| done(blob_from_wire(value, ctx)?)),
        column("vector").deserialize(|_, value, ctx| {
            let vector = vector_from_wire(value, ctx)?
                .ok_or_else(|| ctx.type_mismatch("vector", value))?;
            if let Some(ColumnType::Vector {
                dimension: Some(expected),
            }) = ctx.column_type()
            {
                if vector.len() != *expected {
                    return Err(ctx
                        .type_mismatch(format!("vector of dimension {}", expected), value)
                        .into());
                }
            }
            done(Value::Vector(vector))
        }),
        column("map").deserialize(|_, value, ctx| match ctx.column_type() {
            Some(ColumnType::Map { key, value: item }) => {
                done(Value::Map(deserialize_map(value, key, item, ctx)?))
            }
            _ => nevermind(),
        }),
        column("set").deserialize(|_, value, ctx| match (ctx.column_type(), value) {
            (Some(ColumnType::Set(element)), Value::Array(items)) => {
                done(Value::Set(process_items(items, Some(element.as_ref()), ctx)?))
            }
            (_, other) => Err(ctx.type_mismatch("set", other).into()),
        }),
        column("list").deserialize(|_, value, ctx| match (ctx.column_type(), value) {
            (Some(ColumnType::List(element)), Value::Array(items)) => {
                done(Value::Array(process_items(items, Some(element.as_ref()), ctx)?))
            }
            (_, other) => Err(ctx.type_mismatch("list", other).into()),
        }),
    ]);
    codecs
}

/// RFC 3339 with at least millisecond digits, more when the value carries them.
fn format_timestamp(at: &DateTime<Utc>) -> String {
    let format = if at.timestamp_subsec_nanos() % 1_000_000 == 0 {
        SecondsFormat::Millis
    } else {
        SecondsFormat::AutoSi
    };
    at.to_rfc3339_opts(format, true)
}

fn parse_timestamp(text: &str) -> Result<DateTime<Utc>, SerDesError> {
    DateTime::parse_from_rfc3339(text)
        .map(|at| at.with_timezone(&Utc))
        .map_err(|e| SerDesError::InvalidLiteral {
            kind: "timestamp",
            message: format!("'{}': {}", text, e),
        })
}

fn non_finite(text: &str, ctx: &Context<'_>) -> Result<f64, SerDesError> {
    match text {
        "NaN" => Ok(f64::NAN),
        "Infinity" => Ok(f64::INFINITY),
        "-Infinity" => Ok(f64::NEG_INFINITY),
        _ => Err(ctx.type_mismatch("float", &Value::String(text.to_string()))),
    }
}

fn parse_varint(value: &Value, ctx: &Context<'_>) -> Result<BigInt, SerDesError> {
    let decimal = parse_decimal(value, ctx)?;
    if !is_integer(&decimal) || magnitude(&decimal) > MAX_BIGINT_DIGITS {
        return Err(ctx.type_mismatch("varint", value));
    }
    decimal
        .to_bigint()
        .ok_or_else(|| ctx.type_mismatch("varint", value))
}

fn parse_decimal(value: &Value, ctx: &Context<'_>) -> Result<BigDecimal, SerDesError> {
    match value {
        Value::Number(n) => n.to_bigdecimal(),
        Value::String(text) => BigDecimal::from_str(text).ok(),
        _ => None,
    }
    .ok_or_else(|| ctx.type_mismatch("decimal", value))
}

/// Run each element through the engine under its index.
fn process_items<'a>(
    items: &[Value],
    element: Option<&'a ColumnType>,
    ctx: &Context<'a>,
) -> Result<Vec<Value>, SerDesError> {
    items
        .iter()
        .enumerate()
        .map(|(idx, item)| ctx.process_child(idx, item.clone(), element))
        .collect()
}

/// Object when every key serializes to a string, else `[[k, v], ..]`.
fn serialize_map(entries: &[(Value, Value)], ctx: &Context<'_>) -> Result<Value, SerDesError> {
    let mut pairs = Vec::with_capacity(entries.len());
    for (idx, (key, item)) in entries.iter().enumerate() {
        let segment = entry_segment(key, idx);
        let key = ctx.process_child(segment.clone(), key.clone(), None)?;
        let item = ctx.process_child(segment, item.clone(), None)?;
        pairs.push((key, item));
    }
    if pairs.iter().all(|(key, _)| key.as_str().is_some()) {
        let fields: Object = pairs
            .into_iter()
            .filter_map(|(key, item)| match key {
                Value::String(key) => Some((key, item)),
                _ => None,
            })
            .collect();
        return Ok(Value::Object(fields));
    }
    Ok(Value::Array(
        pairs
            .into_iter()
            .map(|(key, item)| Value::Array(vec![key, item]))
            .collect(),
    ))
}

fn entry_segment(key: &Value, idx: usize) -> PathSegment {
    match key {
        Value::String(name) => PathSegment::Field(name.clone()),
        _ => PathSegment::Index(idx),
    }
}

fn deserialize_map<'a>(
    value: &Value,
    key_type: &'a ColumnType,
    item_type: &'a ColumnType,
    ctx: &Context<'a>,
) -> Result<Vec<(Value, Value)>, SerDesError> {
    match value {
        Value::Object(fields) => fields
            .iter()
            .map(|(name, item)| {
                let segment = PathSegment::Field(name.clone());
                let key =
                    ctx.process_child(segment.clone(), field_key(name, key_type), Some(key_type))?;
                let item = ctx.process_child(segment, item.clone(), Some(item_type))?;
                Ok((key, item))
            })
            .collect(),
        Value::Array(pairs) => pairs
            .iter()
            .enumerate()
            .map(|(idx, pair)| match pair.as_array().map(Vec::as_slice) {
                Some([key, item]) => Ok((
                    ctx.process_child(idx, key.clone(), Some(key_type))?,
                    ctx.process_child(idx, item.clone(), Some(item_type))?,
                )),
                _ => Err(ctx.type_mismatch("[key, value] pair", pair)),
            })
            .collect(),
        other => Err(ctx.type_mismatch("map", other)),
    }
}

/// Object keys are always text on the wire; numeric and boolean key types
/// are recovered from it.
fn field_key(name: &str, key_type: &ColumnType) -> Value {
    let ty = key_type.type_name();
    if INTEGER_TYPES.contains(&ty) || FLOAT_TYPES.contains(&ty) || ty == "varint" || ty == "decimal" {
        if let Ok(n) = Number::from_text(name) {
            return Value::Number(n);
        }
    }
    match (ty, name) {
        ("boolean", "true") => Value::Bool(true),
        ("boolean", "false") => Value::Bool(false),
        _ => Value::String(name.to_string()),
    }
}
