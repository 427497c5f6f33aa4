//! Error types shared by the tree engine, collaborators and tooling.

use crate::sync::CreatedNode;
use thiserror::Error;

/// Errors surfaced by collection operations
#[derive(Debug, Error)]
pub enum ApiError {
    /// Source collection or target request absent
    #[error("Not found: {0}")]
    NotFound(String),

    /// No credential supplied for a collaborator
    #[error("Missing credential: {0}")]
    MissingCredential(String),

    /// Collaborator rejected the supplied credential
    #[error("Authentication failed: {0}")]
    AuthFailure(String),

    /// Collaborator call failed (network, validation, server error)
    #[error("Remote error: {0}")]
    RemoteError(String),

    /// Call reached the collaborator but its outcome could not be read back;
    /// repeating it may apply it twice
    #[error("Remote outcome unknown: {0}")]
    RemoteOutcomeUnknown(String),

    /// Collaborator throttled the call
    #[error("Remote rate limit: {0}")]
    RemoteRateLimit(String),

    /// Collaborator does not offer the requested operation
    #[error("Unsupported operation: {0}")]
    Unsupported(String),

    /// Content generator call itself failed
    #[error("Generation failed: {0}")]
    GenerationError(String),

    /// Generator responded but the output did not have the expected shape
    #[error("Malformed generation output: {0}")]
    MalformedGenerationOutput(String),

    /// Synchronization stopped part way; nothing already created was rolled back
    #[error("Synchronization aborted after creating {} node(s): {source}", created.len())]
    SyncAborted {
        #[source]
        source: Box<ApiError>,
        created: Vec<CreatedNode>,
    },

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ApiError {
    /// Whether a failed remote call is worth attempting again
    pub fn is_retryable(&self) -> bool {
        match self {
            ApiError::RemoteRateLimit(_) => true,
            ApiError::RemoteError(_) => true,
            ApiError::GenerationError(_) => true,
            ApiError::NotFound(_)
            | ApiError::RemoteOutcomeUnknown(_)
            | ApiError::MissingCredential(_)
            | ApiError::AuthFailure(_)
            | ApiError::Unsupported(_)
            | ApiError::MalformedGenerationOutput(_)
            | ApiError::SyncAborted { .. }
            | ApiError::ConfigError(_)
            | ApiError::Serialization(_) => false,
        }
    }

    /// Whether the failure should be reported to users as "not found"
    pub fn is_not_found(&self) -> bool {
        match self {
            ApiError::NotFound(_) => true,
            ApiError::SyncAborted { source, .. } => source.is_not_found(),
            _ => false,
        }
    }
}

impl From<config::ConfigError> for ApiError {
    fn from(err: config::ConfigError) -> Self {
        ApiError::ConfigError(err.to_string())
    }
}
