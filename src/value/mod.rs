//! Value model shared by both directions of the engine.
//!
//! One enum covers wire and host values. Wire values are the JSON subset
//! (`Null`, `Bool`, `Number`, `String`, `Array`, `Object`); everything else
//! is a host-only variant that a codec must turn into wire shape before the
//! value leaves the process.
//!
//! ```text
//! host  ──serialize──►  wire (JSON subset)  ──► transport
//! host  ◄─deserialize── wire (JSON subset)  ◄── transport
//! ```

mod json;
mod number;
mod path;

pub use number::Number;
pub(crate) use number::{is_integer, magnitude};
pub use path::{display_path, PathPattern, PathSegment, PatternSegment};

use bigdecimal::num_bigint::BigInt;
use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use std::any::Any;
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

use crate::datatypes::{DataApiVector, ObjectId};

/// Insertion-ordered object fields.
pub type Object = IndexMap<String, Value>;

/// A user domain object carried through the engine.
///
/// Implemented for every `'static` type that is `Debug + PartialEq + Send +
/// Sync`; class codecs recover the concrete type with
/// [`Value::downcast_ref`].
pub trait HostObject: Any + fmt::Debug + Send + Sync {
    /// Short type name, matched by type-selected codecs.
    fn type_name(&self) -> &'static str;

    fn dyn_eq(&self, other: &dyn HostObject) -> bool;
}

impl<T> HostObject for T
where
    T: Any + fmt::Debug + PartialEq + Send + Sync,
{
    fn type_name(&self) -> &'static str {
        let full = std::any::type_name::<T>();
        let base = full.split('<').next().unwrap_or(full);
        base.rsplit("::").next().unwrap_or(base)
    }

    fn dyn_eq(&self, other: &dyn HostObject) -> bool {
        (other as &dyn Any)
            .downcast_ref::<T>()
            .is_some_and(|other| other == self)
    }
}

#[derive(Clone, Debug, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Number(Number),
    String(String),
    Array(Vec<Value>),
    Object(Object),

    // Host-only variants
    BigInt(BigInt),
    Decimal(BigDecimal),
    Timestamp(DateTime<Utc>),
    Uuid(Uuid),
    ObjectId(ObjectId),
    Vector(DataApiVector),
    Blob(Vec<u8>),
    /// CQL `map<k, v>`; keys need not be strings.
    Map(Vec<(Value, Value)>),
    /// CQL `set<t>`, in wire order.
    Set(Vec<Value>),
    Custom(Arc<dyn HostObject>),
}

impl Value {
    /// Wrap a domain object.
    pub fn custom<T: HostObject>(object: T) -> Self {
        Self::Custom(Arc::new(object))
    }

    /// Name used by type-selected codecs on the serialize side.
    pub fn type_name(&self) -> &str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "boolean",
            Self::Number(_) => "number",
            Self::String(_) => "string",
            Self::Array(_) => "array",
            Self::Object(_) => "object",
            Self::BigInt(_) => "bigint",
            Self::Decimal(_) => "decimal",
            Self::Timestamp(_) => "timestamp",
            Self::Uuid(_) => "uuid",
            Self::ObjectId(_) => "objectId",
            Self::Vector(_) => "vector",
            Self::Blob(_) => "blob",
            Self::Map(_) => "map",
            Self::Set(_) => "set",
            Self::Custom(object) => object.type_name(),
        }
    }

    /// True for the JSON subset, checked recursively.
    pub fn is_wire(&self) -> bool {
        match self {
            Self::Null | Self::Bool(_) | Self::String(_) => true,
            Self::Number(n) => !n.is_non_finite(),
            Self::Array(items) => items.iter().all(Value::is_wire),
            Self::Object(fields) => fields.values().all(Value::is_wire),
            _ => false,
        }
    }

    /// Number, big integer, or decimal.
    pub fn is_numeric(&self) -> bool {
        matches!(self, Self::Number(_) | Self::BigInt(_) | Self::Decimal(_))
    }

    /// Key of a single-key object whose key starts with `$`.
    pub fn marker_key(&self) -> Option<&str> {
        match self {
            Self::Object(fields) if fields.len() == 1 => fields
                .keys()
                .next()
                .map(String::as_str)
                .filter(|k| k.starts_with('$')),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Number(n) => n.as_i64(),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<&Number> {
        match self {
            Self::Number(n) => Some(n),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&Vec<Value>> {
        match self {
            Self::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_array_mut(&mut self) -> Option<&mut Vec<Value>> {
        match self {
            Self::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&Object> {
        match self {
            Self::Object(fields) => Some(fields),
            _ => None,
        }
    }

    pub fn as_object_mut(&mut self) -> Option<&mut Object> {
        match self {
            Self::Object(fields) => Some(fields),
            _ => None,
        }
    }

    /// Field lookup on objects.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.as_object().and_then(|fields| fields.get(key))
    }

    /// Concrete domain object, if this is a `Custom` of type `T`.
    pub fn downcast_ref<T: HostObject>(&self) -> Option<&T> {
        match self {
            Self::Custom(object) => (object.as_ref() as &dyn Any).downcast_ref::<T>(),
            _ => None,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Null, Self::Null) => true,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Number(a), Self::Number(b)) => a == b,
            (Self::String(a), Self::String(b)) => a == b,
            (Self::Array(a), Self::Array(b)) => a == b,
            // order-sensitive: key order is part of the value
            (Self::Object(a), Self::Object(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x == y)
            }
            (Self::BigInt(a), Self::BigInt(b)) => a == b,
            (Self::Decimal(a), Self::Decimal(b)) => a == b,
            (Self::Timestamp(a), Self::Timestamp(b)) => a == b,
            (Self::Uuid(a), Self::Uuid(b)) => a == b,
            (Self::ObjectId(a), Self::ObjectId(b)) => a == b,
            (Self::Vector(a), Self::Vector(b)) => a == b,
            (Self::Blob(a), Self::Blob(b)) => a == b,
            (Self::Map(a), Self::Map(b)) => a == b,
            (Self::Set(a), Self::Set(b)) => a == b,
            (Self::Custom(a), Self::Custom(b)) => Arc::ptr_eq(a, b) || a.dyn_eq(b.as_ref()),
            _ => false,
        }
    }
}

macro_rules! impl_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from(v: $ty) -> Self {
                    Self::$variant(v.into())
                }
            }
        )*
    };
}

impl_from! {
    bool => Bool,
    i64 => Number,
    f64 => Number,
    Number => Number,
    String => String,
    &str => String,
    Vec<Value> => Array,
    Object => Object,
    BigInt => BigInt,
    BigDecimal => Decimal,
    DateTime<Utc> => Timestamp,
    Uuid => Uuid,
    ObjectId => ObjectId,
    DataApiVector => Vector,
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Self::Number(Number::Int(v as i64))
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Self::Null)
    }
}

impl FromIterator<(String, Value)> for Value {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self::Object(iter.into_iter().collect())
    }
}
