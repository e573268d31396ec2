//! Collection profile built-ins.
//!
//! | host        | wire                          |
//! |-------------|-------------------------------|
//! | `Timestamp` | `{"$date": <epoch millis>}`   |
//! | `Uuid`      | `{"$uuid": "<hyphenated>"}`   |
//! | `ObjectId`  | `{"$objectId": "<24 hex>"}`   |
//! | `Vector`    | `{"$binary": ..}` or `[f32..]`|
//! | `Blob`      | `{"$binary": "<base64>"}`     |
//!
//! The `$vector` field decodes to a vector whichever form it arrives in.
//!
//! `$date` holds whole milliseconds. Timestamps with finer digits are
//! truncated toward the past on the way out and come back at millisecond
//! precision.

use chrono::{DateTime, Utc};
use tracing::debug;
use uuid::Uuid;

use super::{
    blob_from_wire, blob_to_wire, done, marker, marker_payload, nevermind, vector_from_wire,
    vector_to_wire, BINARY,
};
use crate::codec::Codec;
use crate::datatypes::ObjectId;
use crate::engine::Context;
use crate::error::SerDesError;
use crate::value::Value;

pub(crate) const DATE: &str = "$date";
pub(crate) const UUID: &str = "$uuid";
pub(crate) const OBJECT_ID: &str = "$objectId";
pub(crate) const VECTOR_FIELD: &str = "$vector";

pub(crate) fn codecs() -> Vec<Codec> {
    vec![
        Codec::for_name(VECTOR_FIELD)
            .named("$vector")
            .serialize(|_, value, ctx| match value {
                Value::Array(_) if ctx.vectors_as_binary() => match vector_from_wire(value, ctx) {
                    Ok(Some(vector)) => done(vector_to_wire(&vector, ctx)),
                    _ => nevermind(),
                },
                _ => nevermind(),
            })
            .deserialize(|_, value, ctx| match vector_from_wire(value, ctx)? {
                Some(vector) => done(Value::Vector(vector)),
                None => nevermind(),
            }),
        Codec::for_type("timestamp")
            .named("timestamp")
            .serialize(|_, value, _| match value {
                Value::Timestamp(at) => {
                    if at.timestamp_subsec_nanos() % 1_000_000 != 0 {
                        debug!(%at, "$date drops sub-millisecond digits");
                    }
                    done(marker(DATE, Value::from(at.timestamp_millis())))
                }
                _ => nevermind(),
            }),
        Codec::for_type(DATE)
            .named("$date")
            .deserialize(|_, value, ctx| done(Value::Timestamp(parse_date(value, ctx)?))),
        Codec::for_type("uuid")
            .named("uuid")
            .serialize(|_, value, _| match value {
                Value::Uuid(id) => done(marker(UUID, Value::String(id.hyphenated().to_string()))),
                _ => nevermind(),
            }),
        Codec::for_type(UUID)
            .named("$uuid")
            .deserialize(|_, value, ctx| match marker_payload(value, UUID) {
                Some(Value::String(text)) => done(Value::Uuid(parse_uuid(text)?)),
                _ => Err(ctx.type_mismatch("{\"$uuid\": string}", value).into()),
            }),
        Codec::for_type("objectId")
            .named("objectId")
            .serialize(|_, value, _| match value {
                Value::ObjectId(id) => done(marker(OBJECT_ID, Value::String(id.to_hex()))),
                _ => nevermind(),
            }),
        Codec::for_type(OBJECT_ID)
            .named("$objectId")
            .deserialize(|_, value, ctx| match marker_payload(value, OBJECT_ID) {
                Some(Value::String(hex)) => done(Value::ObjectId(ObjectId::parse(hex)?)),
                _ => Err(ctx.type_mismatch("{\"$objectId\": string}", value).into()),
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
        Codec::for_type(BINARY)
            .named("$binary")
            .deserialize(|_, value, ctx| done(blob_from_wire(value, ctx)?)),
    ]
}

/// `$date` payloads are epoch millis; RFC 3339 text is accepted too.
fn parse_date(value: &Value, ctx: &Context<'_>) -> Result<DateTime<Utc>, SerDesError> {
    let invalid = |message: String| SerDesError::InvalidLiteral {
        kind: "timestamp",
        message,
    };
    match marker_payload(value, DATE) {
        Some(Value::Number(n)) => n
            .as_i64()
            .and_then(DateTime::from_timestamp_millis)
            .ok_or_else(|| invalid(format!("{} is not a millisecond timestamp", n))),
        Some(Value::String(text)) => DateTime::parse_from_rfc3339(text)
            .map(|at| at.with_timezone(&Utc))
            .map_err(|e| invalid(format!("'{}': {}", text, e))),
        _ => Err(ctx.type_mismatch("{\"$date\": number}", value)),
    }
}

pub(crate) fn parse_uuid(text: &str) -> Result<Uuid, SerDesError> {
    Uuid::parse_str(text).map_err(|e| SerDesError::InvalidLiteral {
        kind: "uuid",
        message: format!("'{}': {}", text, e),
    })
}
