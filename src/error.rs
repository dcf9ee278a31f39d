//! # Errors
//!
//! Single error type shared by every stage of the compiler.

use thiserror::Error;

/// Errors produced while loading blocks, generating code or talking to the
/// storage collaborators.
#[derive(Debug, Error)]
pub enum GoBlocksError {
    #[error("Unknown block type: {0}")]
    UnknownBlockType(String),

    #[error("Field '{field}' not found on block '{block}'")]
    FieldNotFound { block: String, field: String },

    #[error("Invalid value for field '{field}' on block '{block}': {reason}")]
    InvalidField {
        block: String,
        field: String,
        reason: String,
    },

    #[error("Invalid descriptor '{name}': {reason}")]
    InvalidDescriptor { name: String, reason: String },

    #[error("Invalid package path: '{0}'")]
    InvalidPackagePath(String),

    #[error("Malformed program data: {0}")]
    MalformedProgram(String),

    #[error("Request to {url} failed with status {status}")]
    Transport { url: String, status: u16 },

    #[error("No stored program for key '{0}'")]
    UnknownStorageKey(String),

    #[error("Code generation failed: {0}")]
    CodeGeneration(String),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Archive(#[from] zip::result::ZipError),

    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

pub type Result<T, E = GoBlocksError> = std::result::Result<T, E>;
