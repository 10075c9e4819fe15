//! Error types for the indexing service client.

use std::path::PathBuf;
use thiserror::Error;

/// Remote operation a [`ServiceError`] originated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceOperation {
    CreateIndex,
    DeleteIndex,
    PostBatch,
    CountMatching,
}

impl std::fmt::Display for ServiceOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ServiceOperation::CreateIndex => write!(f, "create index"),
            ServiceOperation::DeleteIndex => write!(f, "delete index"),
            ServiceOperation::PostBatch => write!(f, "post batch"),
            ServiceOperation::CountMatching => write!(f, "count matching"),
        }
    }
}

/// A remote call did not succeed.
#[derive(Error, Debug)]
pub enum ServiceError {
    /// The service answered with a non-success status.
    #[error("{operation} failed with status {status}: {body}")]
    Status {
        operation: ServiceOperation,
        status: u16,
        body: String,
    },

    /// The request never produced a response (connect, timeout, TLS, ...).
    #[error("{operation} request failed: {source}")]
    Transport {
        operation: ServiceOperation,
        #[source]
        source: reqwest::Error,
    },

    /// A success response could not be interpreted.
    #[error("{operation} returned an invalid response: {reason}")]
    InvalidResponse {
        operation: ServiceOperation,
        reason: String,
    },

    /// The client could not be constructed.
    #[error("Invalid client configuration: {0}")]
    Configuration(String),
}

impl ServiceError {
    /// Operation that failed, if the error came from a remote call.
    pub fn operation(&self) -> Option<ServiceOperation> {
        match self {
            ServiceError::Status { operation, .. }
            | ServiceError::Transport { operation, .. }
            | ServiceError::InvalidResponse { operation, .. } => Some(*operation),
            ServiceError::Configuration(_) => None,
        }
    }

    /// HTTP status code, if the service answered.
    pub fn status(&self) -> Option<u16> {
        match self {
            ServiceError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Errors loading an index schema.
#[derive(Error, Debug)]
pub enum SchemaError {
    #[error("Failed to read schema file {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse schema YAML: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("Invalid schema: {0}")]
    Invalid(String),
}
