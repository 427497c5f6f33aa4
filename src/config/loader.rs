//! ConfigLoader: composes file and environment sources into an [`AppConfig`].

use super::AppConfig;
use crate::error::ApiError;
use config::builder::DefaultState;
use config::{ConfigBuilder, Environment, File, FileFormat};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Environment prefix for configuration overrides
pub const ENV_PREFIX: &str = "SCRIBE";

pub struct ConfigLoader;

impl ConfigLoader {
    /// Default config file: `<platform config dir>/collection-scribe/config.toml`
    pub fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "collection-scribe")
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Load configuration.
    ///
    /// Precedence: defaults (lowest), then `explicit` or the default config
    /// file, then environment (highest). An explicit file must exist; the
    /// default one is optional.
    pub fn load(explicit: Option<&Path>) -> Result<AppConfig, ApiError> {
        let builder = ConfigBuilder::<DefaultState>::default();
        let builder = match explicit {
            Some(path) => {
                debug!(path = %path.display(), "Loading configuration file");
                builder.add_source(File::from(path).format(FileFormat::Toml).required(true))
            }
            None => match Self::default_config_path() {
                Some(path) => {
                    builder.add_source(File::from(path).format(FileFormat::Toml).required(false))
                }
                None => builder,
            },
        };
        Self::finish(builder)
    }

    /// Load from TOML text plus the environment overlay
    pub fn load_from_str(toml: &str) -> Result<AppConfig, ApiError> {
        let builder = ConfigBuilder::<DefaultState>::default()
            .add_source(File::from_str(toml, FileFormat::Toml));
        Self::finish(builder)
    }

    fn finish(builder: ConfigBuilder<DefaultState>) -> Result<AppConfig, ApiError> {
        let config: AppConfig = builder
            .add_source(environment())
            .build()?
            .try_deserialize()?;
        config.validate()?;
        Ok(config)
    }
}

/// SCRIBE_ prefix, `__` between nested keys
fn environment() -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true)
}
