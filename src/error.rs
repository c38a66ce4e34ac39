//! LineDB Error Types

use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Malformed log line {line}: {reason}")]
    MalformedLine { line: usize, reason: String },

    #[error("Unrecognized query shape: {0}")]
    QueryShape(String),
}

pub type Result<T> = std::result::Result<T, StoreError>;
