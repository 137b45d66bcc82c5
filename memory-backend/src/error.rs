//! Error taxonomy for the memory store.
//!
//! Only argument-level failures (bad category, missing name) and failures on the
//! document a caller explicitly targeted escalate. Scans and engine calls absorb
//! their own failures and degrade to partial results.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MemoryError {
    #[error("invalid memory type: {0} (expected one of facts, context, patterns, reflections, soul)")]
    InvalidCategory(String),

    #[error("memory not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("missing required field: {0}")]
    MissingField(&'static str),

    #[error("search engine unavailable: {0}")]
    EngineUnavailable(String),

    #[error("malformed metadata field `{field}`: {value:?}")]
    MalformedMetadata { field: String, value: String },

    #[error("io error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl MemoryError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        MemoryError::Io {
            path: path.into(),
            source,
        }
    }

    pub fn malformed(field: &str, value: impl Into<String>) -> Self {
        MemoryError::MalformedMetadata {
            field: field.to_string(),
            value: value.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, MemoryError>;
