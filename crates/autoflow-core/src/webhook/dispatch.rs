//! Deployment dispatch.
//!
//! Creates the deployment record, transitions project state, and invokes the
//! selected outbound trigger. The sequence is best-effort, not transactional:
//! each write commits individually and is immediately visible to concurrent
//! requests, and a trigger failure appends compensating writes instead of
//! rolling anything back.
//!
//! There is no mutual exclusion around the read-modify-write sequence; two
//! concurrent pushes for the same `(repository, branch)` each create their
//! own deployment and each flip the project's status.

use crate::{
    store::{ActivityStore, DeploymentPatch, DeploymentStore, ProjectPatch, ProjectStore},
    trigger::{DeployRequest, TriggerError, TriggerSet},
    webhook::IntakeError,
    ActivityKind, Deployment, DeploymentStatus, NewActivity, NewDeployment, Project,
    ProjectStatus, Timestamp,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, instrument, warn};

/// Upper bound on a single outbound trigger call.
pub const DEFAULT_TRIGGER_TIMEOUT: Duration = Duration::from_secs(30);

/// Drives the create-and-trigger sequence for one deployment.
pub struct DeploymentDispatcher {
    projects: Arc<dyn ProjectStore>,
    deployments: Arc<dyn DeploymentStore>,
    activities: Arc<dyn ActivityStore>,
    triggers: TriggerSet,
    trigger_timeout: Duration,
}

impl DeploymentDispatcher {
    /// Create a dispatcher over the storage collaborators and trigger set
    pub fn new(
        projects: Arc<dyn ProjectStore>,
        deployments: Arc<dyn DeploymentStore>,
        activities: Arc<dyn ActivityStore>,
        triggers: TriggerSet,
        trigger_timeout: Duration,
    ) -> Self {
        Self {
            projects,
            deployments,
            activities,
            triggers,
            trigger_timeout,
        }
    }

    /// Dispatch a deployment for a resolved project.
    ///
    /// Sequence:
    /// 1. Create the deployment row in `building` state.
    /// 2. Move the project to `building`.
    /// 3. Emit a `deployment_started` activity.
    /// 4. Select the trigger path from the project's framework label.
    /// 5. Invoke the trigger, bounded by the configured timeout.
    /// 6. On trigger failure, append compensating writes: deployment and
    ///    project move to `failed` and a `deployment_failed` activity is
    ///    emitted. Steps 1-3 are not rolled back.
    ///
    /// A trigger failure is absorbed here; the returned deployment carries
    /// `failed` state, but the call itself succeeds so the inbound sender
    /// still gets an affirmative response.
    ///
    /// # Errors
    ///
    /// Only storage faults surface as errors, as [`IntakeError::Unexpected`].
    #[instrument(skip(self, project), fields(
        project_id = %project.id,
        repository = %project.repository_name,
        branch = %project.branch,
    ))]
    pub async fn dispatch(
        &self,
        project: &Project,
        commit_hash: &str,
        commit_message: &str,
    ) -> Result<Deployment, IntakeError> {
        let deployment = self
            .deployments
            .create_deployment(NewDeployment {
                project_id: project.id,
                status: DeploymentStatus::Building,
                commit_hash: commit_hash.to_string(),
                commit_message: commit_message.to_string(),
            })
            .await?;

        self.projects
            .update_project(
                project.id,
                ProjectPatch {
                    status: Some(ProjectStatus::Building),
                    last_deployment_at: Some(Timestamp::now()),
                    ..Default::default()
                },
            )
            .await?;

        self.activities
            .create_activity(NewActivity {
                user_id: project.user_id,
                project_id: Some(project.id),
                kind: ActivityKind::DeploymentStarted,
                description: format!("Deployment started for \"{}\"", project.name),
            })
            .await?;

        let (kind, trigger) = self.triggers.for_framework(&project.framework);
        info!(
            deployment_id = %deployment.id,
            trigger = %kind,
            framework = %project.framework,
            "Dispatching deployment"
        );

        let request = DeployRequest {
            deployment_id: deployment.id,
            project_name: project.name.clone(),
            repository_name: project.repository_name.clone(),
            branch: project.branch.clone(),
            framework: project.framework.clone(),
        };

        let outcome = match tokio::time::timeout(
            self.trigger_timeout,
            trigger.trigger_deploy(&request),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(TriggerError::TimedOut {
                seconds: self.trigger_timeout.as_secs(),
            }),
        };

        match outcome {
            Ok(()) => {
                info!(deployment_id = %deployment.id, "Deploy trigger accepted");
                Ok(deployment)
            }
            Err(trigger_error) => self.record_trigger_failure(project, deployment, trigger_error).await,
        }
    }

    /// Append the compensating writes for a failed trigger call.
    async fn record_trigger_failure(
        &self,
        project: &Project,
        deployment: Deployment,
        trigger_error: TriggerError,
    ) -> Result<Deployment, IntakeError> {
        warn!(
            deployment_id = %deployment.id,
            error = %trigger_error,
            "Deploy trigger failed; recording failure state"
        );

        let failed = self
            .deployments
            .update_deployment(
                deployment.id,
                DeploymentPatch {
                    status: Some(DeploymentStatus::Failed),
                    build_logs: Some(format!("Failed to trigger deployment: {trigger_error}")),
                    completed_at: Some(Timestamp::now()),
                    ..Default::default()
                },
            )
            .await?
            .ok_or_else(|| IntakeError::Unexpected {
                message: format!("deployment {} disappeared during dispatch", deployment.id),
            })?;

        self.projects
            .update_project(
                project.id,
                ProjectPatch {
                    status: Some(ProjectStatus::Failed),
                    ..Default::default()
                },
            )
            .await?;

        self.activities
            .create_activity(NewActivity {
                user_id: project.user_id,
                project_id: Some(project.id),
                kind: ActivityKind::DeploymentFailed,
                description: format!("Failed to trigger deployment for \"{}\"", project.name),
            })
            .await?;

        Ok(failed)
    }
}

#[cfg(test)]
#[path = "dispatch_tests.rs"]
mod tests;
