//! Configuration
//!
//! Layered with the `config` crate: built-in defaults, then an optional TOML
//! file, then `SCRIBE_*` environment variables (`__` separates nested keys,
//! e.g. `SCRIBE_SYNC__MAX_CONCURRENT_CALLS=8`).

pub mod loader;

use crate::error::ApiError;
use crate::generation::GeneratorConfig;
use crate::logging::LoggingConfig;
use crate::store::StoreConfig;
use crate::sync::SyncConfig;
use crate::types::Credentials;
use serde::{Deserialize, Serialize};

pub use loader::ConfigLoader;

const REDACTED: &str = "<redacted>";

/// Complete application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub store: StoreConfig,

    #[serde(default)]
    pub generator: GeneratorConfig,

    #[serde(default)]
    pub sync: SyncConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    pub fn validate(&self) -> Result<(), ApiError> {
        self.store
            .validate()
            .and_then(|_| self.generator.validate())
            .and_then(|_| self.sync.validate())
            .and_then(|_| self.logging.validate())
            .map_err(ApiError::ConfigError)
    }

    /// Both credentials, from config or their environment variables
    pub fn credentials(&self) -> Result<Credentials, ApiError> {
        Ok(Credentials {
            store: self.store.resolve_api_key()?,
            generator: self.generator.resolve_api_key()?,
        })
    }

    /// Copy safe to print: configured keys are masked
    pub fn redacted(&self) -> AppConfig {
        let mut copy = self.clone();
        if copy.store.api_key.is_some() {
            copy.store.api_key = Some(REDACTED.to_string());
        }
        if copy.generator.api_key.is_some() {
            copy.generator.api_key = Some(REDACTED.to_string());
        }
        copy
    }

    /// Redacted configuration rendered as TOML
    pub fn to_toml(&self) -> Result<String, ApiError> {
        toml::to_string_pretty(&self.redacted())
            .map_err(|e| ApiError::ConfigError(format!("Failed to render configuration: {}", e)))
    }
}
