//! Layered configuration loading.
//!
//! Resolution order, later sources winning:
//! 1. Compiled-in defaults (`ServiceConfig::default()`)
//! 2. An optional TOML file (`--config` / `AUTOFLOW_CONFIG`)
//! 3. `AUTOFLOW__*` environment variables, with `__` separating nested keys
//!    (e.g. `AUTOFLOW__SERVER__PORT=9090` sets `server.port`)

use autoflow_api::ServiceConfig;
use std::path::Path;

/// Environment variable prefix for configuration overrides.
pub const ENV_PREFIX: &str = "AUTOFLOW";

// ============================================================================
// Error Types
// ============================================================================

/// Configuration loading and validation errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("invalid configuration: {message}")]
    Invalid { message: String },
}

// ============================================================================
// Loading
// ============================================================================

/// Load and validate the service configuration.
pub fn load(path: Option<&Path>) -> Result<ServiceConfig, ConfigError> {
    let mut builder =
        config::Config::builder().add_source(config::Config::try_from(&ServiceConfig::default())?);

    if let Some(path) = path {
        builder = builder.add_source(config::File::from(path));
    }

    let settings = builder
        .add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    let service_config: ServiceConfig = settings.try_deserialize()?;
    validate(&service_config)?;
    Ok(service_config)
}

/// Reject configurations that would fail at the first request instead of at
/// startup.
fn validate(service_config: &ServiceConfig) -> Result<(), ConfigError> {
    if service_config.triggers.timeout_seconds == 0 {
        return Err(ConfigError::Invalid {
            message: "triggers.timeout_seconds must be positive".to_string(),
        });
    }

    if service_config.webhooks.secret.as_deref() == Some("") {
        return Err(ConfigError::Invalid {
            message: "webhooks.secret must not be empty when set".to_string(),
        });
    }

    if service_config.triggers.workflow_file.is_empty() {
        return Err(ConfigError::Invalid {
            message: "triggers.workflow_file must not be empty".to_string(),
        });
    }

    Ok(())
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
