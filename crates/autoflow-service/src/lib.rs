//! # AutoFlow Service
//!
//! Service binary for the AutoFlow deployment orchestration backend.
//!
//! This crate wires the pieces together at startup:
//! - clap CLI surface (`serve` and `config` subcommands)
//! - layered configuration (defaults, TOML file, `AUTOFLOW__*` environment)
//! - tracing initialisation
//! - production trigger clients and the in-memory store adapter
//! - the HTTP server from `autoflow-api`

use autoflow_core::{DeployTrigger, MemoryStore, TriggerSet, WebhookIntake, WebhookSecret};
use autoflow_api::{AppState, ServiceConfig, ServiceMetrics};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use url::Url;

pub mod config;
pub mod triggers;

pub use config::ConfigError;

use triggers::{GithubActionsTrigger, UnconfiguredTrigger, VercelTrigger};

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;

// ============================================================================
// CLI Structure
// ============================================================================

/// AutoFlow - deployment orchestration for tracked repositories
#[derive(Debug, Parser)]
#[command(name = "autoflow")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Webhook intake and deployment dispatch service")]
pub struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "AUTOFLOW_CONFIG")]
    pub config: Option<PathBuf>,

    /// Logging level override
    #[arg(short, long)]
    pub log_level: Option<String>,

    /// Enable JSON logging
    #[arg(long)]
    pub json_logs: bool,

    /// Subcommand to execute; defaults to `serve`
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available CLI commands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Start the HTTP service
    Serve {
        /// Port to bind the HTTP server
        #[arg(short, long)]
        port: Option<u16>,

        /// Host to bind the HTTP server
        #[arg(long)]
        host: Option<String>,
    },

    /// Validate configuration
    Config {
        /// Print the resolved configuration
        #[arg(short, long)]
        show: bool,
    },
}

// ============================================================================
// Error Types
// ============================================================================

/// Top-level CLI errors with distinct exit codes.
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigError),

    #[error("service error: {0}")]
    Service(#[from] autoflow_api::ServiceError),

    #[error("startup failed: {message}")]
    Startup { message: String },
}

// ============================================================================
// Entry Point
// ============================================================================

/// Run the CLI to completion.
pub async fn run(cli: Cli) -> Result<(), CliError> {
    let mut service_config = config::load(cli.config.as_deref())?;

    if let Some(level) = &cli.log_level {
        service_config.logging.level = level.clone();
    }
    if cli.json_logs {
        service_config.logging.json_format = true;
    }

    match cli.command.unwrap_or(Commands::Serve {
        port: None,
        host: None,
    }) {
        Commands::Serve { port, host } => {
            if let Some(port) = port {
                service_config.server.port = port;
            }
            if let Some(host) = host {
                service_config.server.host = host;
            }

            init_tracing(&service_config);
            let state = build_state(service_config)?;
            autoflow_api::start_server(state).await?;
            Ok(())
        }
        Commands::Config { show } => {
            if show {
                let rendered =
                    toml::to_string_pretty(&service_config).map_err(|e| CliError::Startup {
                        message: format!("failed to render configuration: {e}"),
                    })?;
                println!("{rendered}");
            } else {
                println!("configuration OK");
            }
            Ok(())
        }
    }
}

/// Initialise the tracing subscriber from the logging configuration.
fn init_tracing(config: &ServiceConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.logging.level));

    if config.logging.json_format {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

/// Assemble the application state from configuration.
pub fn build_state(service_config: ServiceConfig) -> Result<AppState, CliError> {
    let metrics = ServiceMetrics::new().map_err(|e| CliError::Startup {
        message: format!("failed to initialize metrics: {e}"),
    })?;

    // The relational store is an external collaborator; this binary runs on
    // the in-memory adapter, so state does not survive a restart.
    warn!("Using in-memory storage adapter; state is not persisted across restarts");
    let store = Arc::new(MemoryStore::new());

    let trigger_timeout = Duration::from_secs(service_config.triggers.timeout_seconds);
    let http_client =
        triggers::build_http_client(trigger_timeout).map_err(|e| CliError::Startup {
            message: format!("failed to build HTTP client: {e}"),
        })?;

    let vercel: Arc<dyn DeployTrigger> = match &service_config.triggers.vercel_deploy_hook_url {
        Some(raw) => {
            let hook_url = Url::parse(raw).map_err(|e| {
                CliError::Configuration(ConfigError::Invalid {
                    message: format!("invalid triggers.vercel_deploy_hook_url: {e}"),
                })
            })?;
            Arc::new(VercelTrigger::new(hook_url, http_client.clone()))
        }
        None => Arc::new(UnconfiguredTrigger::new("vercel")),
    };

    let workflow_dispatch: Arc<dyn DeployTrigger> = match &service_config.triggers.github_token {
        Some(token) => {
            let api_base = Url::parse(&service_config.triggers.github_api_url).map_err(|e| {
                CliError::Configuration(ConfigError::Invalid {
                    message: format!("invalid triggers.github_api_url: {e}"),
                })
            })?;
            Arc::new(GithubActionsTrigger::new(
                api_base,
                token.clone(),
                service_config.triggers.workflow_file.clone(),
                service_config.triggers.callback_url.clone(),
                http_client,
            ))
        }
        None => Arc::new(UnconfiguredTrigger::new("workflow-dispatch")),
    };

    let secret = service_config
        .webhooks
        .secret
        .as_ref()
        .map(|s| WebhookSecret::new(s.clone()));
    if secret.is_none() {
        warn!("No webhook secret configured; the push intake path will refuse all requests");
    }

    let intake = Arc::new(WebhookIntake::new(
        secret,
        store.clone(),
        store.clone(),
        store,
        TriggerSet::new(vercel, workflow_dispatch),
        trigger_timeout,
    ));

    info!(
        host = %service_config.server.host,
        port = service_config.server.port,
        "Service state assembled"
    );

    Ok(AppState::new(service_config, intake, metrics))
}
