use crate::error::ApiError;
use crate::types::ApiKey;
use serde::{Deserialize, Serialize};

/// Environment variable consulted when no generator key is configured
pub const GENERATOR_API_KEY_ENV: &str = "GOOGLE_API_KEY";

fn default_model() -> String {
    "gemini-2.0-flash".to_string()
}

fn default_endpoint() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}

fn default_timeout_secs() -> u64 {
    60
}

/// Content generator configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratorConfig {
    /// Model identifier
    #[serde(default = "default_model")]
    pub model: String,

    /// Base URL of the generative language API
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// API key; falls back to GOOGLE_API_KEY
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Sampling temperature passed to the model
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,

    /// Per-call timeout
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            endpoint: default_endpoint(),
            api_key: None,
            temperature: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Scheme and host check shared by every configured endpoint
pub fn endpoint_url_is_valid(endpoint: &str) -> bool {
    let endpoint = endpoint.trim();
    let Some(rest) = endpoint
        .strip_prefix("https://")
        .or_else(|| endpoint.strip_prefix("http://"))
    else {
        return false;
    };
    if rest.is_empty() || rest.chars().any(char::is_whitespace) {
        return false;
    }

    let authority = rest.split('/').next().unwrap_or_default();
    let host = authority
        .rsplit('@')
        .next()
        .unwrap_or(authority)
        .split(':')
        .next()
        .unwrap_or_default();

    host == "localhost" || host.contains('.') || host.parse::<std::net::IpAddr>().is_ok()
}

impl GeneratorConfig {
    /// Endpoint without a trailing slash
    pub fn normalized_endpoint(&self) -> String {
        self.endpoint.trim().trim_end_matches('/').to_string()
    }

    /// Validate generator configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.model.trim().is_empty() {
            return Err("Model name cannot be empty".to_string());
        }

        if !endpoint_url_is_valid(&self.endpoint) {
            return Err(format!("Invalid generator endpoint URL: {}", self.endpoint));
        }

        if let Some(temp) = self.temperature {
            if !(0.0..=2.0).contains(&temp) {
                return Err(format!(
                    "Temperature must be between 0.0 and 2.0, got {}",
                    temp
                ));
            }
        }

        if self.timeout_secs == 0 {
            return Err("Generator timeout must be positive".to_string());
        }

        Ok(())
    }

    /// Resolve the credential from config, then the environment.
    pub fn resolve_api_key(&self) -> Result<ApiKey, ApiError> {
        self.api_key
            .clone()
            .filter(|key| !key.trim().is_empty())
            .or_else(|| std::env::var(GENERATOR_API_KEY_ENV).ok())
            .filter(|key| !key.trim().is_empty())
            .map(ApiKey::new)
            .ok_or_else(|| {
                ApiError::MissingCredential(format!(
                    "Generator API key required (set generator.api_key in config or {} env var)",
                    GENERATOR_API_KEY_ENV
                ))
            })
    }
}
