//! Error types for the composer
//!
//! - **Resolution**: the document or the assembly could not be found, or the
//!   assembly is not of the kind the dialog expects
//! - **Validation**: a dialog model could not be overlaid onto a configuration
//! - **Compute**: chart layout rebuild or script checking failed

use thiserror::Error;

use crate::assembly::AssemblyKind;

/// Result type alias for composer operations
pub type Result<T> = std::result::Result<T, ComposerError>;

/// Main error type for composer operations
#[derive(Error, Debug)]
pub enum ComposerError {
    /// Unknown (or not visible) document handle
    #[error("viewsheet not found: {0}")]
    DocumentNotFound(String),

    /// No assembly with this name in the viewsheet
    #[error("assembly not found: {0}")]
    AssemblyNotFound(String),

    /// The assembly exists but is of another kind
    #[error("assembly {name} is a {actual}, expected {expected}")]
    TypeMismatch {
        name: String,
        expected: AssemblyKind,
        actual: AssemblyKind,
    },

    /// Dialog model could not be applied
    #[error("validation error: {0}")]
    Validation(String),

    /// Chart area rebuild or script check failure
    #[error("compute error: {0}")]
    Compute(String),

    /// Missing or expired session
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Invalid configuration file or value
    #[error("configuration error: {0}")]
    Config(String),

    /// A lock guarding document state was poisoned by a panicking writer
    #[error("lock poisoned: {0}")]
    Lock(String),

    /// Generic IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Document (de)serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    /// JSON error
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ComposerError {
    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a compute error
    pub fn compute(msg: impl Into<String>) -> Self {
        Self::Compute(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Whether the error means the request addressed something that does not exist
    pub fn is_resolution(&self) -> bool {
        matches!(
            self,
            Self::DocumentNotFound(_) | Self::AssemblyNotFound(_) | Self::TypeMismatch { .. }
        )
    }
}

impl From<toml::de::Error> for ComposerError {
    fn from(err: toml::de::Error) -> Self {
        Self::Config(err.to_string())
    }
}

impl<T> From<std::sync::PoisonError<T>> for ComposerError {
    fn from(err: std::sync::PoisonError<T>) -> Self {
        Self::Lock(err.to_string())
    }
}
