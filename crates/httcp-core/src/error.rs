//! Error types for httcp

use thiserror::Error;

/// httcp error type
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML parsing error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),

    /// Validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// Inconsistent array shapes (event counts, offsets, reduction axis)
    #[error("Shape error: {0}")]
    Shape(String),

    /// Fewer suffixes than selection stages were supplied
    #[error("suffix list exhausted: {stages} selection stage(s) but only {suffixes} suffix(es)")]
    SuffixExhausted {
        /// Number of stage dictionaries passed in.
        stages: usize,
        /// Number of suffixes available.
        suffixes: usize,
    },

    /// Two steps map to the same key after suffixing
    #[error("duplicate selection step: '{0}'")]
    DuplicateStep(String),

    /// Computation error
    #[error("Computation error: {0}")]
    Computation(String),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
