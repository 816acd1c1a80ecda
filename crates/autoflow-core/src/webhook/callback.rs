//! Status-callback recording.
//!
//! An external CI run that was handed a deployment ID at dispatch time calls
//! back with the terminal outcome. This module applies that report to the
//! deployment and its parent project and emits the matching activity.

use crate::{
    store::{ActivityStore, DeploymentPatch, DeploymentStore, ProjectPatch, ProjectStore},
    webhook::IntakeError,
    ActivityKind, Deployment, DeploymentId, DeploymentStatus, NewActivity, ProjectStatus,
    Timestamp,
};
use std::sync::Arc;
use tracing::{info, instrument, warn};

// ============================================================================
// Status Report
// ============================================================================

/// A status callback from an external CI run, already validated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusReport {
    pub deployment_id: DeploymentId,
    pub status: DeploymentStatus,
    pub logs: Option<String>,
    pub deployment_url: Option<String>,
}

// ============================================================================
// Recorder
// ============================================================================

/// Applies status reports to an existing deployment/project pair.
///
/// A second callback for the same deployment is treated as a normal update
/// and overwrites; there is no guard against duplicate or out-of-order
/// callbacks. Replaying an identical report converges on the same state.
pub struct CallbackRecorder {
    projects: Arc<dyn ProjectStore>,
    deployments: Arc<dyn DeploymentStore>,
    activities: Arc<dyn ActivityStore>,
}

impl CallbackRecorder {
    /// Create a recorder over the storage collaborators
    pub fn new(
        projects: Arc<dyn ProjectStore>,
        deployments: Arc<dyn DeploymentStore>,
        activities: Arc<dyn ActivityStore>,
    ) -> Self {
        Self {
            projects,
            deployments,
            activities,
        }
    }

    /// Record a reported outcome.
    ///
    /// Updates the deployment's status, logs, and URL; stamps `completed_at`
    /// when the reported status is terminal. If the parent project still
    /// exists, its status follows the report (`success` becomes `deployed`,
    /// anything else keeps the literal reported word), its deployment URL is
    /// set only on success, and exactly one outcome activity is emitted.
    ///
    /// # Errors
    ///
    /// Returns [`IntakeError::NotFound`] when the deployment ID resolves to
    /// nothing; no writes are performed in that case.
    #[instrument(skip(self), fields(deployment_id = %report.deployment_id, status = %report.status))]
    pub async fn record(&self, report: StatusReport) -> Result<Deployment, IntakeError> {
        let Some(existing) = self.deployments.get_deployment(report.deployment_id).await? else {
            return Err(IntakeError::NotFound {
                entity: "deployment",
            });
        };

        let updated = self
            .deployments
            .update_deployment(
                report.deployment_id,
                DeploymentPatch {
                    status: Some(report.status),
                    build_logs: report.logs.clone(),
                    deployment_url: report.deployment_url.clone(),
                    completed_at: report.status.is_terminal().then(Timestamp::now),
                },
            )
            .await?
            .ok_or(IntakeError::NotFound {
                entity: "deployment",
            })?;

        match self.projects.get_project(existing.project_id).await? {
            Some(project) => {
                let succeeded = report.status == DeploymentStatus::Success;
                self.projects
                    .update_project(
                        project.id,
                        ProjectPatch {
                            status: Some(ProjectStatus::from_reported(report.status)),
                            deployment_url: if succeeded {
                                report.deployment_url.clone()
                            } else {
                                None
                            },
                            ..Default::default()
                        },
                    )
                    .await?;

                let (kind, description) = if succeeded {
                    (
                        ActivityKind::DeploymentSuccess,
                        format!("Deployment completed successfully for \"{}\"", project.name),
                    )
                } else {
                    (
                        ActivityKind::DeploymentFailed,
                        format!("Deployment failed for \"{}\"", project.name),
                    )
                };
                self.activities
                    .create_activity(NewActivity {
                        user_id: project.user_id,
                        project_id: Some(project.id),
                        kind,
                        description,
                    })
                    .await?;

                info!(
                    deployment_id = %updated.id,
                    project_id = %project.id,
                    "Recorded deployment status callback"
                );
            }
            None => {
                // Orphaned deployment: record the status, skip project writes
                warn!(
                    deployment_id = %updated.id,
                    project_id = %existing.project_id,
                    "Status callback for deployment whose project no longer exists"
                );
            }
        }

        Ok(updated)
    }
}

#[cfg(test)]
#[path = "callback_tests.rs"]
mod tests;
