//! Error types for the SerDes engine.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SerDesError {
    /// A codec handler returned an error. Never caught by the engine.
    #[error("codec failed at `{path}`: {source}")]
    Codec {
        path: String,
        #[source]
        source: anyhow::Error,
    },

    /// Wire data does not match the declared or expected type.
    #[error("type mismatch at `{path}`: expected {expected}, found {found}")]
    TypeMismatch {
        path: String,
        expected: String,
        found: String,
    },

    /// A strict representation could not hold the wire number exactly.
    #[error("precision lost at `{path}`: {value} does not fit {target}")]
    PrecisionLoss {
        path: String,
        value: String,
        target: &'static str,
    },

    /// A host-only value reached the wire without a codec.
    #[error("value of type `{type_name}` at `{path}` has no codec to serialize it")]
    Unserializable { path: String, type_name: String },

    /// A codec kept answering `Recurse`.
    #[error("codec recursion limit ({limit}) exceeded at `{path}`")]
    RecurseLimit { path: String, limit: usize },

    #[error("invalid {kind}: {message}")]
    InvalidLiteral { kind: &'static str, message: String },

    #[error("json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl SerDesError {
    /// Stable error code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Codec { .. } => "CODEC_FAILED",
            Self::TypeMismatch { .. } => "TYPE_MISMATCH",
            Self::PrecisionLoss { .. } => "PRECISION_LOSS",
            Self::Unserializable { .. } => "UNSERIALIZABLE",
            Self::RecurseLimit { .. } => "RECURSE_LIMIT",
            Self::InvalidLiteral { .. } => "INVALID_LITERAL",
            Self::Json(_) => "JSON",
            Self::Config(_) => "CONFIG",
        }
    }

    /// Path of the node that failed, when the error is tied to one.
    pub fn path(&self) -> Option<&str> {
        match self {
            Self::Codec { path, .. }
            | Self::TypeMismatch { path, .. }
            | Self::PrecisionLoss { path, .. }
            | Self::Unserializable { path, .. }
            | Self::RecurseLimit { path, .. } => Some(path),
            _ => None,
        }
    }

    /// Wrap a codec failure, passing engine errors from nested calls through
    /// unchanged.
    pub(crate) fn from_codec(path: String, err: anyhow::Error) -> Self {
        match err.downcast::<SerDesError>() {
            Ok(inner) => inner,
            Err(source) => Self::Codec { path, source },
        }
    }
}
