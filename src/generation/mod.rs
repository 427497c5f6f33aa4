//! Content generation
//!
//! A [`ContentGenerator`] turns structured facts about a request or a
//! collection into text: example bodies, query parameters, test scripts and
//! reports. The Gemini-backed implementation lives in [`gemini`]; tests use
//! scripted generators.

pub mod config;
pub mod gemini;
pub mod parse;
pub mod prompt;

use crate::error::ApiError;
use crate::types::ApiKey;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub use config::GeneratorConfig;
pub use gemini::GeminiGenerator;

/// What a generation call is asked to produce
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationKind {
    ExampleBody,
    ExampleQueryParams,
    TestScript,
    SecurityAudit,
    ApiDocs,
    CollectionAnalysis,
}

/// Generation kind together with the facts it is generated from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GenerationTask {
    ExampleBody {
        name: String,
        method: String,
        path: String,
        original_body: Option<Value>,
    },
    ExampleQueryParams {
        name: String,
        path: String,
    },
    TestScript {
        name: String,
        request: Value,
    },
    SecurityAudit {
        summary: String,
    },
    ApiDocs {
        summary: String,
    },
    CollectionAnalysis {
        summary: String,
    },
}

impl GenerationTask {
    pub fn kind(&self) -> GenerationKind {
        match self {
            GenerationTask::ExampleBody { .. } => GenerationKind::ExampleBody,
            GenerationTask::ExampleQueryParams { .. } => GenerationKind::ExampleQueryParams,
            GenerationTask::TestScript { .. } => GenerationKind::TestScript,
            GenerationTask::SecurityAudit { .. } => GenerationKind::SecurityAudit,
            GenerationTask::ApiDocs { .. } => GenerationKind::ApiDocs,
            GenerationTask::CollectionAnalysis { .. } => GenerationKind::CollectionAnalysis,
        }
    }
}

/// Text generation collaborator
#[async_trait]
pub trait ContentGenerator: Send + Sync {
    /// Produce text for `task`.
    ///
    /// Fails with `GenerationError` when the call itself fails; unusable text
    /// is returned as-is and judged by the caller.
    async fn generate(&self, task: &GenerationTask, credential: &ApiKey)
        -> Result<String, ApiError>;
}
