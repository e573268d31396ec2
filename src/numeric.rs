//! Numeric representation policy.
//!
//! Decides, per node path, which host variant a wire number becomes on the
//! way in. Paths are matched against dotted patterns by longest prefix, so
//! `"items"` covers every number under `items` unless a longer pattern such
//! as `"items.*.qty"` claims it. `"*"` alone is the universal default.
//!
//! Serialization is lossless regardless of policy: machine numbers stay
//! plain, non-finite floats become `"NaN"`/`"Infinity"`/`"-Infinity"`, and
//! big integers and decimals are written as exact number text.

use bigdecimal::num_bigint::{BigInt, ToBigInt};
use bigdecimal::{BigDecimal, ToPrimitive};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::warn;

use crate::error::SerDesError;
use crate::value::{display_path, is_integer, magnitude, Number, PathPattern, PathSegment, Value};

/// Widest integer the `BigInt` representation will expand, in decimal digits.
pub(crate) const MAX_BIGINT_DIGITS: i64 = 4096;

/// Host form for wire numbers.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Representation {
    /// `i64` when integral and in range, otherwise `f64` (may round).
    #[default]
    Number,
    /// Like `Number`, but rounding is an error.
    StrictNumber,
    /// Canonical decimal text.
    String,
    /// Arbitrary-precision integer; fractions are an error.
    BigInt,
    /// Arbitrary-precision decimal.
    BigDecimal,
    /// Machine number when exact, otherwise the exact text.
    NumberOrString,
}

impl Representation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Number => "number",
            Self::StrictNumber => "strict_number",
            Self::String => "string",
            Self::BigInt => "bigint",
            Self::BigDecimal => "bigdecimal",
            Self::NumberOrString => "number_or_string",
        }
    }
}

impl fmt::Display for Representation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Representation {
    type Err = SerDesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "number" => Ok(Self::Number),
            "strict_number" => Ok(Self::StrictNumber),
            "string" => Ok(Self::String),
            "bigint" => Ok(Self::BigInt),
            "bigdecimal" | "decimal" => Ok(Self::BigDecimal),
            "number_or_string" => Ok(Self::NumberOrString),
            other => Err(SerDesError::Config(format!(
                "unknown numeric representation '{}'",
                other
            ))),
        }
    }
}

/// Declarative longest-prefix table.
#[derive(Clone, Debug, Default)]
pub struct RepresentationTable {
    default: Representation,
    entries: Vec<(PathPattern, Representation)>,
}

impl RepresentationTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an entry. `"*"` sets the universal default.
    pub fn with(mut self, pattern: &str, repr: Representation) -> Self {
        self.insert(pattern, repr);
        self
    }

    pub fn insert(&mut self, pattern: &str, repr: Representation) {
        if pattern == "*" {
            self.default = repr;
            return;
        }
        let pattern = PathPattern::parse(pattern);
        match self.entries.iter_mut().find(|(p, _)| *p == pattern) {
            Some(entry) => {
                warn!(
                    pattern = %pattern,
                    old = %entry.1,
                    new = %repr,
                    "numeric pattern declared twice"
                );
                entry.1 = repr;
            }
            None => self.entries.push((pattern, repr)),
        }
    }

    pub fn default_representation(&self) -> Representation {
        self.default
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Longest matching prefix wins; ties go to fewer wildcards, then to the
    /// earlier entry.
    pub fn lookup(&self, path: &[PathSegment]) -> Representation {
        let mut best: Option<(&PathPattern, Representation)> = None;
        for (pattern, repr) in &self.entries {
            if !pattern.matches_prefix(path) {
                continue;
            }
            let better = match best {
                None => true,
                Some((current, _)) => {
                    pattern.len() > current.len()
                        || (pattern.len() == current.len()
                            && pattern.wildcards() < current.wildcards())
                }
            };
            if better {
                best = Some((pattern, *repr));
            }
        }
        best.map(|(_, repr)| repr).unwrap_or(self.default)
    }
}

impl<'a> FromIterator<(&'a str, Representation)> for RepresentationTable {
    fn from_iter<I: IntoIterator<Item = (&'a str, Representation)>>(iter: I) -> Self {
        let mut table = Self::new();
        for (pattern, repr) in iter {
            table.insert(pattern, repr);
        }
        table
    }
}

type RepresentationFn = dyn Fn(&[PathSegment]) -> Representation + Send + Sync;

/// Per-path representation: a table or a function.
#[derive(Clone)]
pub enum NumericPolicy {
    Table(RepresentationTable),
    Function(Arc<RepresentationFn>),
}

impl NumericPolicy {
    /// Same representation everywhere.
    pub fn uniform(repr: Representation) -> Self {
        Self::Table(RepresentationTable::new().with("*", repr))
    }

    pub fn from_fn<F>(f: F) -> Self
    where
        F: Fn(&[PathSegment]) -> Representation + Send + Sync + 'static,
    {
        Self::Function(Arc::new(f))
    }

    pub fn representation_for(&self, path: &[PathSegment]) -> Representation {
        match self {
            Self::Table(table) => table.lookup(path),
            Self::Function(f) => f(path),
        }
    }
}

impl Default for NumericPolicy {
    fn default() -> Self {
        Self::Table(RepresentationTable::default())
    }
}

impl From<RepresentationTable> for NumericPolicy {
    fn from(table: RepresentationTable) -> Self {
        Self::Table(table)
    }
}

impl fmt::Debug for NumericPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Table(table) => f.debug_tuple("Table").field(table).finish(),
            Self::Function(_) => f.write_str("Function(..)"),
        }
    }
}

/// Wire number to host value under `repr`.
pub(crate) fn decode(
    number: &Number,
    repr: Representation,
    path: &[PathSegment],
) -> Result<Value, SerDesError> {
    match repr {
        Representation::Number => Ok(Value::Number(narrow(number))),
        Representation::StrictNumber => match number {
            Number::Exact(text) => match number.as_i64() {
                Some(int) => Ok(Value::Number(Number::Int(int))),
                None => Err(SerDesError::PrecisionLoss {
                    path: display_path(path),
                    value: text.clone(),
                    target: "f64",
                }),
            },
            other => Ok(Value::Number(other.clone())),
        },
        Representation::String => Ok(Value::String(number.to_string())),
        Representation::BigInt => {
            let decimal = to_decimal(number, path)?;
            if !is_integer(&decimal) {
                return Err(SerDesError::TypeMismatch {
                    path: display_path(path),
                    expected: "integer".to_string(),
                    found: number.to_string(),
                });
            }
            if magnitude(&decimal) > MAX_BIGINT_DIGITS {
                return Err(SerDesError::PrecisionLoss {
                    path: display_path(path),
                    value: number.to_string(),
                    target: "bigint",
                });
            }
            decimal
                .to_bigint()
                .map(Value::BigInt)
                .ok_or_else(|| SerDesError::PrecisionLoss {
                    path: display_path(path),
                    value: number.to_string(),
                    target: "bigint",
                })
        }
        Representation::BigDecimal => to_decimal(number, path).map(Value::Decimal),
        Representation::NumberOrString => match number {
            Number::Exact(text) => Ok(number
                .as_i64()
                .map(|int| Value::Number(Number::Int(int)))
                .unwrap_or_else(|| Value::String(text.clone()))),
            other => Ok(Value::Number(other.clone())),
        },
    }
}

/// Exact text past the `f64` range stays exact rather than becoming infinity.
fn narrow(number: &Number) -> Number {
    match number {
        Number::Exact(_) => match number.as_i64() {
            Some(int) => Number::Int(int),
            None => match number.as_f64() {
                float if float.is_finite() => Number::Float(float),
                _ => number.clone(),
            },
        },
        other => other.clone(),
    }
}

fn to_decimal(number: &Number, path: &[PathSegment]) -> Result<BigDecimal, SerDesError> {
    number
        .to_bigdecimal()
        .ok_or_else(|| SerDesError::TypeMismatch {
            path: display_path(path),
            expected: "finite number".to_string(),
            found: number.to_string(),
        })
}

/// Host numeric value to wire shape. Non-numeric values are returned as is.
pub(crate) fn encode(value: Value) -> Result<Value, SerDesError> {
    Ok(match value {
        Value::Number(Number::Float(f)) if !f.is_finite() => Value::String(
            if f.is_nan() {
                "NaN"
            } else if f > 0.0 {
                "Infinity"
            } else {
                "-Infinity"
            }
            .to_string(),
        ),
        Value::BigInt(int) => Value::Number(bigint_to_number(&int)),
        Value::Decimal(decimal) => Value::Number(Number::from_text(&decimal.to_string())?),
        other => other,
    })
}

fn bigint_to_number(int: &BigInt) -> Number {
    int.to_i64()
        .map(Number::Int)
        .unwrap_or_else(|| Number::Exact(int.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(dotted: &str) -> Vec<PathSegment> {
        dotted
            .split('.')
            .map(|s| match s.parse::<usize>() {
                Ok(idx) => PathSegment::Index(idx),
                Err(_) => PathSegment::Field(s.to_string()),
            })
            .collect()
    }

    #[test]
    fn test_longest_prefix_wins() {
        let table: RepresentationTable = [
            ("*", Representation::String),
            ("items", Representation::BigDecimal),
            ("items.*.qty", Representation::BigInt),
        ]
        .into_iter()
        .collect();

        assert_eq!(table.lookup(&p("total")), Representation::String);
        assert_eq!(table.lookup(&p("items.0.price")), Representation::BigDecimal);
        assert_eq!(table.lookup(&p("items.3.qty")), Representation::BigInt);
    }

    #[test]
    fn test_exact_segment_beats_wildcard_at_equal_length() {
        let table = RepresentationTable::new()
            .with("a.*", Representation::String)
            .with("a.b", Representation::BigInt);
        assert_eq!(table.lookup(&p("a.b")), Representation::BigInt);
        assert_eq!(table.lookup(&p("a.c")), Representation::String);
    }

    #[test]
    fn test_default_is_number() {
        assert_eq!(
            NumericPolicy::default().representation_for(&p("x")),
            Representation::Number
        );
    }

    #[test]
    fn test_function_policy() {
        let policy = NumericPolicy::from_fn(|path| {
            if path.last().and_then(PathSegment::as_field) == Some("id") {
                Representation::BigInt
            } else {
                Representation::Number
            }
        });
        assert_eq!(policy.representation_for(&p("user.id")), Representation::BigInt);
        assert_eq!(policy.representation_for(&p("user.age")), Representation::Number);
    }

    #[test]
    fn test_decode_big_integer() {
        let n = Number::Exact("123456789012345678901234567890".into());
        let big = decode(&n, Representation::BigInt, &p("x")).unwrap();
        assert_eq!(
            big,
            Value::BigInt("123456789012345678901234567890".parse().unwrap())
        );
        assert!(matches!(
            decode(&n, Representation::Number, &p("x")).unwrap(),
            Value::Number(Number::Float(_))
        ));
        assert_eq!(
            decode(&n, Representation::NumberOrString, &p("x")).unwrap(),
            Value::String("123456789012345678901234567890".into())
        );
        assert_eq!(
            decode(&n, Representation::StrictNumber, &p("x")).unwrap_err().code(),
            "PRECISION_LOSS"
        );
    }

    #[test]
    fn test_decode_out_of_range_exponent() {
        let huge = Number::from_text("1e100000000").unwrap();
        assert_eq!(
            decode(&huge, Representation::Number, &p("x")).unwrap(),
            Value::Number(huge.clone())
        );
        assert_eq!(
            decode(&huge, Representation::BigInt, &p("x")).unwrap_err().code(),
            "PRECISION_LOSS"
        );

        let tiny = Number::from_text("1e-100000000").unwrap();
        assert_eq!(
            decode(&tiny, Representation::BigInt, &p("x")).unwrap_err().code(),
            "TYPE_MISMATCH"
        );
        assert_eq!(
            decode(&tiny, Representation::StrictNumber, &p("x")).unwrap_err().code(),
            "PRECISION_LOSS"
        );
    }

    #[test]
    fn test_decode_bigint_rejects_fraction() {
        let err = decode(&Number::Float(1.5), Representation::BigInt, &p("x")).unwrap_err();
        assert_eq!(err.code(), "TYPE_MISMATCH");
    }

    #[test]
    fn test_encode_non_finite_and_big() {
        assert_eq!(encode(Value::from(f64::NAN)).unwrap(), Value::from("NaN"));
        assert_eq!(encode(Value::from(f64::NEG_INFINITY)).unwrap(), Value::from("-Infinity"));
        let big: BigInt = "98765432109876543210".parse().unwrap();
        assert!(matches!(
            encode(Value::BigInt(big)).unwrap(),
            Value::Number(Number::Exact(text)) if text == "98765432109876543210"
        ));
        assert_eq!(encode(Value::BigInt(BigInt::from(7))).unwrap(), Value::from(7i64));
    }

    #[test]
    fn test_representation_parse() {
        assert_eq!("BigInt".parse::<Representation>().unwrap(), Representation::BigInt);
        assert_eq!(
            "number_or_string".parse::<Representation>().unwrap(),
            Representation::NumberOrString
        );
        assert!("nope".parse::<Representation>().is_err());
    }
}
