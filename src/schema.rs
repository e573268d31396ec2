//! Table column types as reported by the service.
//!
//! The service describes result rows with a `projectionSchema` object:
//!
//! ```json
//! {
//!   "name":  { "type": "text" },
//!   "tags":  { "type": "set", "valueType": "text" },
//!   "attrs": { "type": "map", "keyType": "text", "valueType": "int" },
//!   "embed": { "type": "vector", "dimension": 3 }
//! }
//! ```
//!
//! Column types can also be written in CQL form (`map<text, int>`) through
//! [`ColumnType::from_str`].

use indexmap::IndexMap;
use nom::{
    bytes::complete::take_while1,
    character::complete::{char, multispace0},
    combinator::{all_consuming, cut, opt},
    error::{context, convert_error, ContextError, ParseError as NomParseError, VerboseError},
    multi::separated_list1,
    sequence::{preceded, terminated},
    IResult,
};
use serde::Deserialize;
use std::fmt;
use std::str::FromStr;

use crate::error::SerDesError;
use crate::value::Value;

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(try_from = "ColumnDesc")]
pub enum ColumnType {
    /// Any non-container type, by its lowercase CQL name.
    Scalar(String),
    Vector { dimension: Option<usize> },
    Map {
        key: Box<ColumnType>,
        value: Box<ColumnType>,
    },
    Set(Box<ColumnType>),
    List(Box<ColumnType>),
}

impl ColumnType {
    pub fn scalar(name: impl Into<String>) -> Self {
        Self::Scalar(name.into().to_ascii_lowercase())
    }

    pub fn map(key: ColumnType, value: ColumnType) -> Self {
        Self::Map {
            key: Box::new(key),
            value: Box::new(value),
        }
    }

    pub fn set(element: ColumnType) -> Self {
        Self::Set(Box::new(element))
    }

    pub fn list(element: ColumnType) -> Self {
        Self::List(Box::new(element))
    }

    /// Name matched by type-selected codecs when deserializing.
    pub fn type_name(&self) -> &str {
        match self {
            Self::Scalar(name) => name,
            Self::Vector { .. } => "vector",
            Self::Map { .. } => "map",
            Self::Set(_) => "set",
            Self::List(_) => "list",
        }
    }

    /// Value filled in for an absent column when sparse data is off.
    pub fn default_value(&self) -> Value {
        match self {
            Self::Map { .. } => Value::Map(Vec::new()),
            Self::Set(_) => Value::Set(Vec::new()),
            Self::List(_) => Value::Array(Vec::new()),
            _ => Value::Null,
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Scalar(name) => f.write_str(name),
            Self::Vector { dimension: Some(d) } => write!(f, "vector<float, {}>", d),
            Self::Vector { dimension: None } => f.write_str("vector"),
            Self::Map { key, value } => write!(f, "map<{}, {}>", key, value),
            Self::Set(element) => write!(f, "set<{}>", element),
            Self::List(element) => write!(f, "list<{}>", element),
        }
    }
}

fn invalid(input: &str, reason: &str) -> SerDesError {
    SerDesError::InvalidLiteral {
        kind: "column type",
        message: format!("{}: `{}`", reason, input),
    }
}

impl FromStr for ColumnType {
    type Err = SerDesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match all_consuming(type_expr::<VerboseError<&str>>)(s) {
            Ok((_, expr)) => expr.build(s),
            Err(nom::Err::Error(e)) | Err(nom::Err::Failure(e)) => {
                Err(invalid(s, convert_error(s, e).trim_end()))
            }
            Err(nom::Err::Incomplete(_)) => Err(invalid(s, "incomplete input")),
        }
    }
}

/// `name` or `name<param, ...>`, before parameter arity is checked.
struct TypeExpr<'a> {
    name: &'a str,
    params: Vec<TypeExpr<'a>>,
}

impl TypeExpr<'_> {
    fn build(self, input: &str) -> Result<ColumnType, SerDesError> {
        let params = self
            .params
            .into_iter()
            .map(|param| param.build(input))
            .collect::<Result<Vec<_>, _>>()?;
        build(&self.name.to_ascii_lowercase(), params, input)
    }
}

fn type_expr<'a, E>(input: &'a str) -> IResult<&'a str, TypeExpr<'a>, E>
where
    E: NomParseError<&'a str> + ContextError<&'a str>,
{
    let (input, _) = multispace0(input)?;
    let (input, name) = context(
        "type name",
        take_while1(|c: char| c.is_ascii_alphanumeric() || c == '_'),
    )(input)?;
    let (input, _) = multispace0(input)?;
    let (input, params) = opt(preceded(
        char('<'),
        cut(terminated(
            separated_list1(char(','), type_expr),
            context("closing `>`", char('>')),
        )),
    ))(input)?;
    let (input, _) = multispace0(input)?;
    Ok((
        input,
        TypeExpr {
            name,
            params: params.unwrap_or_default(),
        },
    ))
}

fn build(name: &str, params: Vec<ColumnType>, input: &str) -> Result<ColumnType, SerDesError> {
    let mut params = params.into_iter();
    let ty = match (name, params.len()) {
        ("map", 2) => {
            let key = params.next();
            let value = params.next();
            key.zip(value).map(|(k, v)| ColumnType::map(k, v))
        }
        ("set", 1) => params.next().map(ColumnType::set),
        ("list", 1) => params.next().map(ColumnType::list),
        ("frozen", 1) => params.next(),
        ("vector", 0) => Some(ColumnType::Vector { dimension: None }),
        ("vector", 2) => params
            .nth(1)
            .and_then(|dim| dim.type_name().parse().ok())
            .map(|d| ColumnType::Vector { dimension: Some(d) }),
        (_, 0) => Some(ColumnType::Scalar(name.to_string())),
        _ => None,
    };
    ty.ok_or_else(|| invalid(input, "wrong type parameters"))
}

/// Wire shape of one `projectionSchema` entry.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ColumnDesc {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    key_type: Option<TypeRef>,
    #[serde(default)]
    value_type: Option<TypeRef>,
    #[serde(default)]
    dimension: Option<usize>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TypeRef {
    Name(String),
    Desc(Box<ColumnDesc>),
}

impl TryFrom<TypeRef> for ColumnType {
    type Error = SerDesError;

    fn try_from(r: TypeRef) -> Result<Self, Self::Error> {
        match r {
            TypeRef::Name(name) => name.parse(),
            TypeRef::Desc(desc) => ColumnType::try_from(*desc),
        }
    }
}

impl TryFrom<ColumnDesc> for ColumnType {
    type Error = SerDesError;

    fn try_from(desc: ColumnDesc) -> Result<Self, Self::Error> {
        let element = |r: Option<TypeRef>, what: &str| {
            r.ok_or_else(|| invalid(&desc.kind, &format!("missing {}", what)))
                .and_then(ColumnType::try_from)
        };
        match desc.kind.to_ascii_lowercase().as_str() {
            "map" => Ok(ColumnType::map(
                element(desc.key_type, "keyType")?,
                element(desc.value_type, "valueType")?,
            )),
            "set" => element(desc.value_type, "valueType").map(ColumnType::set),
            "list" => element(desc.value_type, "valueType").map(ColumnType::list),
            "vector" => Ok(ColumnType::Vector {
                dimension: desc.dimension,
            }),
            other => Ok(ColumnType::scalar(other)),
        }
    }
}

/// Ordered column name to type mapping for one result shape.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct TableSchema {
    columns: IndexMap<String, ColumnType>,
}

impl TableSchema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_column(mut self, name: impl Into<String>, ty: ColumnType) -> Self {
        self.columns.insert(name.into(), ty);
        self
    }

    /// Schema from `(name, "cql type")` pairs.
    pub fn from_definitions<'a, I>(defs: I) -> Result<Self, SerDesError>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        defs.into_iter()
            .map(|(name, ty)| ty.parse::<ColumnType>().map(|ty| (name.to_string(), ty)))
            .collect()
    }

    /// Schema from a `projectionSchema` / `primaryKeySchema` object.
    pub fn from_projection(json: &serde_json::Value) -> Result<Self, SerDesError> {
        Ok(Self::deserialize(json)?)
    }

    pub fn from_projection_str(json: &str) -> Result<Self, SerDesError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn column(&self, name: &str) -> Option<&ColumnType> {
        self.columns.get(name)
    }

    pub fn columns(&self) -> impl Iterator<Item = (&str, &ColumnType)> {
        self.columns.iter().map(|(name, ty)| (name.as_str(), ty))
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

impl FromIterator<(String, ColumnType)> for TableSchema {
    fn from_iter<I: IntoIterator<Item = (String, ColumnType)>>(iter: I) -> Self {
        Self {
            columns: iter.into_iter().collect(),
        }
    }
}
