//! Vercel-style deploy-hook trigger.

use crate::triggers::map_reqwest_error;
use autoflow_core::{DeployRequest, DeployTrigger, TriggerError};
use async_trait::async_trait;
use tracing::{info, instrument};
use url::Url;

/// Trigger that POSTs the project identity to a Vercel-style deploy hook.
///
/// Deploy-hook URLs embed a capability token, so the URL itself is treated
/// as a secret and redacted from `Debug` output.
pub struct VercelTrigger {
    deploy_hook_url: Url,
    client: reqwest::Client,
}

impl VercelTrigger {
    /// Create a trigger for the given deploy hook
    pub fn new(deploy_hook_url: Url, client: reqwest::Client) -> Self {
        Self {
            deploy_hook_url,
            client,
        }
    }
}

impl std::fmt::Debug for VercelTrigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VercelTrigger")
            .field("deploy_hook_url", &"<REDACTED>")
            .finish()
    }
}

#[async_trait]
impl DeployTrigger for VercelTrigger {
    /// POST the deploy request to the hook URL.
    ///
    /// # Errors
    ///
    /// Returns [`TriggerError::Status`] on a non-2xx response and
    /// [`TriggerError::Transport`] on a network fault.
    #[instrument(skip(self, request), fields(deployment_id = %request.deployment_id))]
    async fn trigger_deploy(&self, request: &DeployRequest) -> Result<(), TriggerError> {
        let response = self
            .client
            .post(self.deploy_hook_url.clone())
            .json(&serde_json::json!({
                "name": request.project_name,
                "repository": request.repository_name,
                "branch": request.branch,
                "framework": request.framework,
            }))
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(TriggerError::Status {
                status: status.as_u16(),
            });
        }

        info!(deployment_id = %request.deployment_id, "Vercel deploy hook accepted");
        Ok(())
    }
}

#[cfg(test)]
#[path = "vercel_tests.rs"]
mod tests;
