//! Workflow-dispatch trigger.
//!
//! Invokes a CI workflow through the GitHub workflow-dispatch API, passing
//! the deployment ID and the status-callback URL as workflow inputs so the
//! run can report its terminal outcome back to this service.

use crate::triggers::map_reqwest_error;
use autoflow_core::{DeployRequest, DeployTrigger, TriggerError};
use async_trait::async_trait;
use tracing::{info, instrument};
use url::Url;

/// Trigger that POSTs a workflow-dispatch call for the project's repository.
pub struct GithubActionsTrigger {
    api_base: Url,
    token: String,
    workflow_file: String,
    callback_url: Option<String>,
    client: reqwest::Client,
}

impl GithubActionsTrigger {
    /// Create a trigger for the given API base and bearer token
    pub fn new(
        api_base: Url,
        token: String,
        workflow_file: String,
        callback_url: Option<String>,
        client: reqwest::Client,
    ) -> Self {
        Self {
            api_base,
            token,
            workflow_file,
            callback_url,
            client,
        }
    }
}

impl std::fmt::Debug for GithubActionsTrigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GithubActionsTrigger")
            .field("api_base", &self.api_base.as_str())
            .field("token", &"<REDACTED>")
            .field("workflow_file", &self.workflow_file)
            .finish()
    }
}

#[async_trait]
impl DeployTrigger for GithubActionsTrigger {
    /// POST `/repos/{owner}/{repo}/actions/workflows/{file}/dispatches`.
    ///
    /// # Errors
    ///
    /// Returns [`TriggerError::Request`] when the repository name is not in
    /// `owner/repo` form, [`TriggerError::Status`] on a non-2xx response, and
    /// [`TriggerError::Transport`] on a network fault.
    #[instrument(skip(self, request), fields(deployment_id = %request.deployment_id))]
    async fn trigger_deploy(&self, request: &DeployRequest) -> Result<(), TriggerError> {
        let (owner, repo) = request
            .repository_name
            .split_once('/')
            .filter(|(owner, repo)| !owner.is_empty() && !repo.is_empty())
            .ok_or_else(|| TriggerError::Request {
                message: format!(
                    "repository name '{}' is not in owner/repo form",
                    request.repository_name
                ),
            })?;

        let url = self
            .api_base
            .join(&format!(
                "repos/{owner}/{repo}/actions/workflows/{}/dispatches",
                self.workflow_file
            ))
            .map_err(|e| TriggerError::Request {
                message: format!("failed to build workflow-dispatch URL: {e}"),
            })?;

        let mut inputs = serde_json::json!({
            "deployment_id": request.deployment_id.to_string(),
        });
        if let Some(callback_url) = &self.callback_url {
            inputs["webhook_url"] = serde_json::json!(callback_url);
        }

        let response = self
            .client
            .post(url)
            .bearer_auth(&self.token)
            .header("accept", "application/vnd.github+json")
            .json(&serde_json::json!({
                "ref": request.branch,
                "inputs": inputs,
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

        info!(
            deployment_id = %request.deployment_id,
            repository = %request.repository_name,
            "Workflow dispatch accepted"
        );
        Ok(())
    }
}

#[cfg(test)]
#[path = "github_actions_tests.rs"]
mod tests;
