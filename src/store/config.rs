use crate::error::ApiError;
use crate::generation::config::endpoint_url_is_valid;
use crate::types::ApiKey;
use serde::{Deserialize, Serialize};

/// Environment variable consulted when no store key is configured
pub const STORE_API_KEY_ENV: &str = "POSTMAN_API_KEY";

fn default_base_url() -> String {
    "https://api.getpostman.com".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

/// Collection store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// API key; falls back to POSTMAN_API_KEY
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl StoreConfig {
    pub fn validate(&self) -> Result<(), String> {
        if !endpoint_url_is_valid(&self.base_url) {
            return Err(format!("Invalid store base URL: {}", self.base_url));
        }
        if self.timeout_secs == 0 {
            return Err("Store timeout must be positive".to_string());
        }
        Ok(())
    }

    pub fn resolve_api_key(&self) -> Result<ApiKey, ApiError> {
        self.api_key
            .clone()
            .filter(|key| !key.trim().is_empty())
            .or_else(|| std::env::var(STORE_API_KEY_ENV).ok())
            .filter(|key| !key.trim().is_empty())
            .map(ApiKey::new)
            .ok_or_else(|| {
                ApiError::MissingCredential(format!(
                    "Postman API key required (set store.api_key in config or {} env var)",
                    STORE_API_KEY_ENV
                ))
            })
    }
}
