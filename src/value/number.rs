//! Wire numbers.
//!
//! JSON numbers are kept in the narrowest form that holds them exactly:
//! `i64`, then `f64` (when the shortest decimal rendering of the float equals
//! the wire text numerically), otherwise the exact decimal text.

use bigdecimal::{BigDecimal, ToPrimitive, Zero};
use std::fmt;
use std::str::FromStr;

use crate::error::SerDesError;

#[derive(Clone, Debug)]
pub enum Number {
    Int(i64),
    Float(f64),
    /// Exact JSON number text that neither `i64` nor `f64` holds losslessly.
    Exact(String),
}

impl Number {
    /// Classify JSON number text.
    ///
    /// # Errors
    /// Returns `InvalidLiteral` when `text` is not a decimal number.
    pub fn from_text(text: &str) -> Result<Self, SerDesError> {
        let text = text.trim();
        if let Ok(int) = text.parse::<i64>() {
            return Ok(Self::Int(int));
        }
        let exact = BigDecimal::from_str(text).map_err(|_| SerDesError::InvalidLiteral {
            kind: "number",
            message: format!("'{}' is not a decimal number", text),
        })?;
        match text.parse::<f64>() {
            Ok(float) if float.is_finite() && float_matches(float, &exact) => {
                Ok(Self::Float(float))
            }
            _ => Ok(Self::Exact(text.to_string())),
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            Self::Float(f) if f.fract() == 0.0 && f.abs() < 9.2e18 => Some(*f as i64),
            Self::Float(_) => None,
            Self::Exact(text) => {
                let exact = BigDecimal::from_str(text).ok()?;
                if exact.is_zero() {
                    return Some(0);
                }
                // i64 holds at most 19 integer digits
                let digits = magnitude(&exact);
                if !(1..=19).contains(&digits) || !exact.is_integer() {
                    return None;
                }
                exact.to_i64()
            }
        }
    }

    /// Nearest `f64`. Lossy for `Exact`.
    pub fn as_f64(&self) -> f64 {
        match self {
            Self::Int(i) => *i as f64,
            Self::Float(f) => *f,
            Self::Exact(text) => text.parse().unwrap_or(f64::NAN),
        }
    }

    pub fn to_bigdecimal(&self) -> Option<BigDecimal> {
        match self {
            Self::Int(i) => Some(BigDecimal::from(*i)),
            Self::Float(f) if f.is_finite() => BigDecimal::from_str(&f.to_string()).ok(),
            Self::Float(_) => None,
            Self::Exact(text) => BigDecimal::from_str(text).ok(),
        }
    }

    pub fn is_integral(&self) -> bool {
        match self {
            Self::Int(_) => true,
            Self::Float(f) => f.is_finite() && f.fract() == 0.0,
            Self::Exact(_) => self.to_bigdecimal().is_some_and(|d| is_integer(&d)),
        }
    }

    /// Exact text when this number is held as text.
    pub fn is_exact_text(&self) -> bool {
        matches!(self, Self::Exact(_))
    }

    /// True for NaN and the infinities.
    pub fn is_non_finite(&self) -> bool {
        matches!(self, Self::Float(f) if !f.is_finite())
    }
}

/// Position of the leading digit: 3 for `123.4`, 0 for `0.5`, -2 for `0.001`.
///
/// Computed from the stored digits and scale, so it stays cheap for text
/// such as `1e100000000`.
pub(crate) fn magnitude(decimal: &BigDecimal) -> i64 {
    let (_, scale) = decimal.as_bigint_and_exponent();
    (decimal.digits() as i64).saturating_sub(scale)
}

/// `BigDecimal::is_integer` without building `10^scale` for tiny values.
pub(crate) fn is_integer(decimal: &BigDecimal) -> bool {
    let (_, scale) = decimal.as_bigint_and_exponent();
    scale <= 0 || decimal.is_zero() || (magnitude(decimal) > 0 && decimal.is_integer())
}

/// The float's shortest round-trip rendering equals `exact` numerically.
fn float_matches(float: f64, exact: &BigDecimal) -> bool {
    BigDecimal::from_str(&float.to_string()).is_ok_and(|shortest| {
        if shortest.is_zero() || exact.is_zero() {
            return shortest.is_zero() && exact.is_zero();
        }
        magnitude(&shortest) == magnitude(exact) && &shortest == exact
    })
}

impl PartialEq for Number {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Int(a), Self::Int(b)) => a == b,
            (Self::Float(a), Self::Float(b)) => a == b,
            _ => match (self.to_bigdecimal(), other.to_bigdecimal()) {
                (Some(a), Some(b)) if a.is_zero() || b.is_zero() => a.is_zero() && b.is_zero(),
                // scales are aligned only when the leading digits line up
                (Some(a), Some(b)) => magnitude(&a) == magnitude(&b) && a == b,
                _ => false,
            },
        }
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(i) => write!(f, "{}", i),
            Self::Float(x) => write!(f, "{}", x),
            Self::Exact(text) => f.write_str(text),
        }
    }
}

impl From<i64> for Number {
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}

impl From<f64> for Number {
    fn from(x: f64) -> Self {
        Self::Float(x)
    }
}
