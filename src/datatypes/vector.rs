//! Float vectors and their `$binary` encoding.
//!
//! The binary form is the base64 of each component as a big-endian `f32`.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::{Deserialize, Serialize};

use crate::error::SerDesError;

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DataApiVector(Vec<f32>);

impl DataApiVector {
    pub fn new(components: Vec<f32>) -> Self {
        Self(components)
    }

    pub fn components(&self) -> &[f32] {
        &self.0
    }

    pub fn into_inner(self) -> Vec<f32> {
        self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn to_base64(&self) -> String {
        let bytes: Vec<u8> = self.0.iter().flat_map(|c| c.to_be_bytes()).collect();
        STANDARD.encode(bytes)
    }

    /// Decode the `$binary` form.
    ///
    /// # Errors
    /// Returns `InvalidLiteral` for bad base64 or a byte length that is not a
    /// multiple of four.
    pub fn from_base64(encoded: &str) -> Result<Self, SerDesError> {
        let bytes = decode_base64(encoded)?;
        if bytes.len() % 4 != 0 {
            return Err(SerDesError::InvalidLiteral {
                kind: "vector",
                message: format!("{} bytes is not a whole number of f32s", bytes.len()),
            });
        }
        Ok(Self(
            bytes
                .chunks_exact(4)
                .map(|c| f32::from_be_bytes([c[0], c[1], c[2], c[3]]))
                .collect(),
        ))
    }
}

impl From<Vec<f32>> for DataApiVector {
    fn from(components: Vec<f32>) -> Self {
        Self(components)
    }
}

pub(crate) fn encode_base64(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

pub(crate) fn decode_base64(encoded: &str) -> Result<Vec<u8>, SerDesError> {
    STANDARD
        .decode(encoded)
        .map_err(|e| SerDesError::InvalidLiteral {
            kind: "base64",
            message: e.to_string(),
        })
}
