//! Gemini `generateContent` client

use crate::error::ApiError;
use crate::generation::prompt::build_prompt;
use crate::generation::{ContentGenerator, GenerationTask, GeneratorConfig};
use crate::types::ApiKey;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

pub struct GeminiGenerator {
    http: reqwest::Client,
    endpoint: String,
    model: String,
    temperature: Option<f32>,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    #[serde(default)]
    text: Option<String>,
}

impl GenerateResponse {
    fn into_text(self) -> Option<String> {
        let content = self.candidates.into_iter().next()?.content?;
        let text: String = content.parts.into_iter().filter_map(|p| p.text).collect();
        Some(text)
    }
}

impl GeminiGenerator {
    pub fn new(config: &GeneratorConfig) -> Result<Self, ApiError> {
        config.validate().map_err(ApiError::ConfigError)?;
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ApiError::ConfigError(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self {
            http,
            endpoint: config.normalized_endpoint(),
            model: config.model.clone(),
            temperature: config.temperature,
        })
    }

    fn url(&self) -> String {
        format!("{}/models/{}:generateContent", self.endpoint, self.model)
    }
}

#[async_trait]
impl ContentGenerator for GeminiGenerator {
    async fn generate(
        &self,
        task: &GenerationTask,
        credential: &ApiKey,
    ) -> Result<String, ApiError> {
        let mut body = json!({
            "contents": [{ "parts": [{ "text": build_prompt(task) }] }]
        });
        if let Some(temperature) = self.temperature {
            body["generationConfig"] = json!({ "temperature": temperature });
        }

        let start = Instant::now();
        let response = self
            .http
            .post(self.url())
            .header("x-goog-api-key", credential.expose())
            .json(&body)
            .send()
            .await
            .map_err(|e| ApiError::GenerationError(format!("request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            warn!(kind = ?task.kind(), status = status.as_u16(), "Generator call rejected");
            return Err(match status.as_u16() {
                401 | 403 => ApiError::AuthFailure(format!("generator rejected credential: {}", detail)),
                _ => ApiError::GenerationError(format!("generator returned {}: {}", status, detail)),
            });
        }

        let parsed: GenerateResponse = response
            .json()
            .await
            .map_err(|e| ApiError::GenerationError(format!("unreadable generator response: {}", e)))?;
        let text = parsed
            .into_text()
            .ok_or_else(|| ApiError::GenerationError("generator returned no candidates".to_string()))?;

        debug!(
            kind = ?task.kind(),
            chars = text.len(),
            duration_ms = start.elapsed().as_millis(),
            "Generation completed"
        );
        Ok(text)
    }
}
