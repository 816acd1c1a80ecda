//! Production [`DeployTrigger`] implementations for the service binary.
//!
//! Both clients share one pooled `reqwest` client built by
//! [`build_http_client`]. A trigger whose configuration is absent is wired as
//! an [`UnconfiguredTrigger`], which fails on use rather than at startup;
//! the other trigger path keeps working.

use autoflow_core::{DeployRequest, DeployTrigger, TriggerError};
use async_trait::async_trait;
use std::time::Duration;
use tracing::warn;

mod github_actions;
mod vercel;

pub use github_actions::GithubActionsTrigger;
pub use vercel::VercelTrigger;

/// Build the shared outbound HTTP client with timeout and user agent.
pub fn build_http_client(timeout: Duration) -> Result<reqwest::Client, reqwest::Error> {
    reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(concat!("autoflow/", env!("CARGO_PKG_VERSION")))
        .build()
}

/// Convert a transport-level failure into a [`TriggerError`].
pub(crate) fn map_reqwest_error(error: reqwest::Error) -> TriggerError {
    TriggerError::Transport {
        message: error.to_string(),
    }
}

// ============================================================================
// UnconfiguredTrigger
// ============================================================================

/// Placeholder for a trigger path with no configuration.
///
/// Every invocation fails with a [`TriggerError::Request`], which the
/// dispatcher records as a failed deployment like any other trigger fault.
#[derive(Debug)]
pub struct UnconfiguredTrigger {
    name: &'static str,
}

impl UnconfiguredTrigger {
    /// Create the placeholder, warning operators once at startup
    pub fn new(name: &'static str) -> Self {
        warn!(
            trigger = name,
            "Deploy trigger is not configured; dispatches selecting it will fail"
        );
        Self { name }
    }
}

#[async_trait]
impl DeployTrigger for UnconfiguredTrigger {
    async fn trigger_deploy(&self, _request: &DeployRequest) -> Result<(), TriggerError> {
        Err(TriggerError::Request {
            message: format!("{} trigger is not configured", self.name),
        })
    }
}
