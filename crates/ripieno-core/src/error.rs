//! Error types for ripieno-core.

use thiserror::Error;

/// Error type for runtime operations.
#[derive(Error, Debug)]
pub enum Error {
    #[error("no hub registered for tag {0:?}")]
    NoSuchHub(&'static str),

    #[error("hub {0:?} already registered")]
    DuplicateHub(&'static str),

    #[error("hub {0:?} does not host message components")]
    IncompatibleHub(&'static str),
}

/// Result type alias.
pub type Result<T> = core::result::Result<T, Error>;

/// Errors from decoding a wire message.
///
/// A single malformed line from a remote controller is logged and dropped,
/// never fatal for the bridge.
#[derive(Error, Debug)]
pub enum WireError {
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("missing type tag {0:?}")]
    MissingTag(&'static str),

    #[error("unknown message type {module}.{class}")]
    UnknownType { module: String, class: String },

    #[error("missing field {0:?}")]
    MissingField(&'static str),

    #[error("field {0:?} has the wrong type")]
    BadField(&'static str),
}
