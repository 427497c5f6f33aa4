//! CLI Tooling
//!
//! Command-line interface over the collection workflows. Every command loads
//! the layered configuration, resolves the credentials it needs and renders
//! its result as text or JSON.

use crate::config::{AppConfig, ConfigLoader};
use crate::error::ApiError;
use crate::generation::GeminiGenerator;
use crate::store::PostmanStore;
use crate::tooling::format::{
    format_collection_text, format_collections_text, format_generated_text, format_report_text,
    format_test_script_text,
};
use crate::workflows::CollectionService;
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::runtime::Runtime;
use tracing::info;

/// Scribe - AI-assisted scaffolding for API collections
#[derive(Parser, Debug)]
#[command(name = "scribe")]
#[command(about = "Generate example requests, test scripts and reports for Postman collections")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration file path (overrides default config loading)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text, global = true)]
    pub format: OutputFormat,

    /// Log level (trace, debug, info, warn, error, off)
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Log format (json, text)
    #[arg(long, global = true)]
    pub log_format: Option<String>,

    /// Log output (stdout, stderr, file, file+stderr, both)
    #[arg(long, global = true)]
    pub log_output: Option<String>,

    /// Log file path (if output includes "file")
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// List collections visible to the API key
    Collections,
    /// Show a collection and its request endpoints
    Show {
        collection_id: String,
    },
    /// Explain what the API in a collection does
    Analyze {
        collection_id: String,
    },
    /// Copy a collection, filling requests with generated example content
    GenerateExamples {
        collection_id: String,
        /// Workspace to create the new collection in
        #[arg(long)]
        workspace: Option<String>,
    },
    /// Generate a test script for one request and save it
    GenerateTest {
        collection_id: String,
        request_id: String,
    },
    /// Security and performance review of a collection
    Audit {
        collection_id: String,
    },
    /// Generate Markdown documentation for a collection
    Docs {
        collection_id: String,
    },
    /// Print the effective configuration with keys redacted
    Config,
}

impl Cli {
    /// Layered configuration with the `--log-*` flags applied
    pub fn load_config(&self) -> Result<AppConfig, ApiError> {
        let mut config = ConfigLoader::load(self.config.as_deref())?;
        self.apply_log_overrides(&mut config);
        config.validate()?;
        Ok(config)
    }

    /// Apply `--log-*` flags on top of the configured logging section
    pub fn apply_log_overrides(&self, config: &mut AppConfig) {
        if let Some(level) = &self.log_level {
            config.logging.level = level.clone();
        }
        if let Some(format) = &self.log_format {
            config.logging.format = format.clone();
        }
        if let Some(output) = &self.log_output {
            config.logging.output = output.clone();
        }
        if let Some(file) = &self.log_file {
            config.logging.file = Some(file.clone());
        }
    }
}

/// CLI context: configuration, collaborators and the runtime that drives them
pub struct CliContext {
    config: AppConfig,
    service: CollectionService,
    runtime: Runtime,
    format: OutputFormat,
}

impl CliContext {
    /// Build the Postman and Gemini clients from a loaded configuration
    pub fn new(cli: &Cli, config: AppConfig) -> Result<Self, ApiError> {
        let store = Arc::new(PostmanStore::new(&config.store)?);
        let generator = Arc::new(GeminiGenerator::new(&config.generator)?);
        let service = CollectionService::new(store, generator, config.sync.clone());
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
            .map_err(|e| ApiError::ConfigError(format!("Failed to start async runtime: {}", e)))?;

        Ok(Self {
            config,
            service,
            runtime,
            format: cli.format,
        })
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Execute a CLI command, returning the rendered output
    pub fn execute(&self, command: &Commands) -> Result<String, ApiError> {
        info!(command = command_name(command), "Executing command");
        self.runtime.block_on(self.execute_async(command))
    }

    async fn execute_async(&self, command: &Commands) -> Result<String, ApiError> {
        let service = &self.service;
        match command {
            Commands::Collections => {
                let key = self.config.store.resolve_api_key()?;
                let collections = service.list_collections(&key).await?;
                self.render(&collections, |c| format_collections_text(c))
            }
            Commands::Show { collection_id } => {
                let key = self.config.store.resolve_api_key()?;
                let collection = service.collection_details(&key, collection_id).await?;
                self.render(&collection, format_collection_text)
            }
            Commands::Analyze { collection_id } => {
                let credentials = self.config.credentials()?;
                let report = service.analyze_collection(&credentials, collection_id).await?;
                self.render(&report, |r| format_report_text("Analysis", r))
            }
            Commands::GenerateExamples {
                collection_id,
                workspace,
            } => {
                let credentials = self.config.credentials()?;
                let generated = service
                    .generate_examples(&credentials, collection_id, workspace.as_deref())
                    .await?;
                self.render(&generated, format_generated_text)
            }
            Commands::GenerateTest {
                collection_id,
                request_id,
            } => {
                let credentials = self.config.credentials()?;
                let outcome = service
                    .generate_test_script(&credentials, collection_id, request_id)
                    .await?;
                self.render(&outcome, format_test_script_text)
            }
            Commands::Audit { collection_id } => {
                let credentials = self.config.credentials()?;
                let report = service.audit_collection(&credentials, collection_id).await?;
                self.render(&report, |r| format_report_text("Security audit", r))
            }
            Commands::Docs { collection_id } => {
                let credentials = self.config.credentials()?;
                let report = service.document_collection(&credentials, collection_id).await?;
                match self.format {
                    // Documentation is Markdown already; print it as-is
                    OutputFormat::Text => Ok(report.content),
                    OutputFormat::Json => Ok(serde_json::to_string_pretty(&report)?),
                }
            }
            Commands::Config => match self.format {
                OutputFormat::Text => self.config.to_toml(),
                OutputFormat::Json => Ok(serde_json::to_string_pretty(&self.config.redacted())?),
            },
        }
    }

    fn render<T: Serialize>(&self, value: &T, text: impl Fn(&T) -> String) -> Result<String, ApiError> {
        match self.format {
            OutputFormat::Text => Ok(text(value)),
            OutputFormat::Json => Ok(serde_json::to_string_pretty(value)?),
        }
    }
}

fn command_name(command: &Commands) -> &'static str {
    match command {
        Commands::Collections => "collections",
        Commands::Show { .. } => "show",
        Commands::Analyze { .. } => "analyze",
        Commands::GenerateExamples { .. } => "generate-examples",
        Commands::GenerateTest { .. } => "generate-test",
        Commands::Audit { .. } => "audit",
        Commands::Docs { .. } => "docs",
        Commands::Config => "config",
    }
}
