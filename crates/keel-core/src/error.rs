//! Core error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    /// Encoded input is not valid YAML/JSON or does not fit the kind's schema
    #[error("failed to decode {kind}: {message}")]
    Decode { kind: String, message: String },

    /// A loosely-typed document could not be converted into the typed schema
    #[error("failed to convert document into {kind}: {message}")]
    Conversion { kind: String, message: String },

    /// The resolved object is not of the kind the handler is bound to
    #[error("type mismatch: expected {expected}, found {found}")]
    TypeMismatch { expected: String, found: String },

    /// The input value does not map to any accepted input shape
    #[error(
        "unsupported input type for {kind}: expected a file path, bytes, a typed {kind}, a dynamic object or a document"
    )]
    UnsupportedInputType { kind: String },

    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("serialization error: {0}")]
    Serialization(String),

    /// A patch could not be computed or applied
    #[error("patch error: {0}")]
    Patch(String),

    #[error("{kind} is missing metadata.name")]
    MissingName { kind: String },
}

impl CoreError {
    pub(crate) fn decode(kind: &str, message: impl ToString) -> Self {
        Self::Decode {
            kind: kind.to_string(),
            message: message.to_string(),
        }
    }

    pub(crate) fn conversion(kind: &str, message: impl ToString) -> Self {
        Self::Conversion {
            kind: kind.to_string(),
            message: message.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;
