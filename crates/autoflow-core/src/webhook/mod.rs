//! # Webhook Intake Pipeline
//!
//! Admits inbound CI-provider events and drives deployment state.
//!
//! Data flows one direction: raw request body -> verify signature ->
//! normalize payload -> resolve project -> dispatch deployment -> persist
//! state transition -> emit activity record. Any stage failure
//! short-circuits with a stage-specific [`IntakeError`] and no further
//! writes occur.
//!
//! The status-callback path ([`CallbackRecorder`]) skips the creation logic
//! and instead applies a terminal outcome reported by an external CI run to
//! an existing deployment/project pair.

use crate::{
    store::{ActivityStore, DeploymentStore, ProjectStore, StoreError},
    trigger::{TriggerError, TriggerSet},
    Deployment, ProjectId,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::instrument;

mod callback;
mod dispatch;
mod normalize;
mod resolve;
mod signature;

pub use callback::{CallbackRecorder, StatusReport};
pub use dispatch::{DeploymentDispatcher, DEFAULT_TRIGGER_TIMEOUT};
pub use normalize::{normalize_push, PushEvent, PUSH_EVENT};
pub use resolve::ProjectResolver;
pub use signature::{SignatureVerifier, WebhookSecret};

// ============================================================================
// Error Types
// ============================================================================

/// Top-level error taxonomy for webhook intake.
///
/// The variants are distinguishable outcomes, not a collapsed failure bucket:
/// the HTTP layer maps them to distinct status codes and the metrics layer
/// counts them by category.
#[derive(Debug, thiserror::Error)]
pub enum IntakeError {
    /// Signature digest does not match the request body
    #[error("webhook signature does not match")]
    Unauthenticated,

    /// Missing or invalid fields, unsupported event type, undecodable body
    #[error("malformed request: {message}")]
    Malformed { message: String },

    /// No matching project or deployment
    #[error("{entity} not found")]
    NotFound { entity: &'static str },

    /// Server-side operability fault that blocks the entire intake path
    #[error("service misconfigured: {message}")]
    Misconfigured { message: String },

    /// Outbound trigger call failed or timed out
    #[error("deploy trigger failed: {0}")]
    Upstream(#[from] TriggerError),

    /// Anything uncaught; no partial state is assumed consistent
    #[error("unexpected failure: {message}")]
    Unexpected { message: String },
}

impl IntakeError {
    /// Shorthand for a [`IntakeError::Malformed`] error
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::Malformed {
            message: message.into(),
        }
    }

    /// Error category label for metrics and logs
    pub fn category(&self) -> &'static str {
        match self {
            Self::Unauthenticated => "unauthenticated",
            Self::Malformed { .. } => "malformed",
            Self::NotFound { .. } => "not_found",
            Self::Misconfigured { .. } => "misconfigured",
            Self::Upstream(_) => "upstream",
            Self::Unexpected { .. } => "unexpected",
        }
    }
}

impl From<StoreError> for IntakeError {
    fn from(error: StoreError) -> Self {
        Self::Unexpected {
            message: error.to_string(),
        }
    }
}

// ============================================================================
// Intake Facade
// ============================================================================

/// The composed intake pipeline, consumed by the HTTP layer as one injected
/// capability.
///
/// Holds no authoritative state of its own; every operation reconstructs what
/// it needs from the storage collaborators and writes results back before
/// returning.
pub struct WebhookIntake {
    verifier: SignatureVerifier,
    resolver: ProjectResolver,
    dispatcher: DeploymentDispatcher,
    recorder: CallbackRecorder,
    projects: Arc<dyn ProjectStore>,
}

impl WebhookIntake {
    /// Commit hash recorded for manual deploys that name no commit.
    pub const MANUAL_COMMIT_HASH: &'static str = "latest";

    /// Commit message recorded for manual deploys that carry none.
    pub const MANUAL_COMMIT_MESSAGE: &'static str = "Deploy to production";

    /// Assemble the pipeline from its collaborators.
    ///
    /// `secret` is the shared webhook secret; passing `None` leaves the
    /// push-event path unusable (every request fails `Misconfigured`) while
    /// the status-callback path keeps working.
    pub fn new(
        secret: Option<WebhookSecret>,
        projects: Arc<dyn ProjectStore>,
        deployments: Arc<dyn DeploymentStore>,
        activities: Arc<dyn ActivityStore>,
        triggers: TriggerSet,
        trigger_timeout: Duration,
    ) -> Self {
        Self {
            verifier: SignatureVerifier::new(secret),
            resolver: ProjectResolver::new(Arc::clone(&projects)),
            dispatcher: DeploymentDispatcher::new(
                Arc::clone(&projects),
                Arc::clone(&deployments),
                Arc::clone(&activities),
                triggers,
                trigger_timeout,
            ),
            recorder: CallbackRecorder::new(Arc::clone(&projects), deployments, activities),
            projects,
        }
    }

    /// Admit a push event: verify, normalize, resolve, dispatch.
    ///
    /// `body` must be the exact bytes as received; the signature is computed
    /// over the wire form, not a re-serialization.
    ///
    /// # Errors
    ///
    /// Each pipeline stage fails with its own [`IntakeError`] variant; no
    /// writes happen before the dispatch stage is reached.
    #[instrument(skip(self, body, signature), fields(event_type = %event_type))]
    pub async fn handle_push(
        &self,
        event_type: &str,
        signature: Option<&str>,
        body: &[u8],
    ) -> Result<Deployment, IntakeError> {
        self.verifier.verify(body, signature)?;

        let payload: serde_json::Value = serde_json::from_slice(body)
            .map_err(|e| IntakeError::malformed(format!("invalid payload: {e}")))?;
        let push = normalize_push(event_type, &payload)?;

        let project = self
            .resolver
            .resolve(&push.repository_full_name, &push.branch)
            .await?;

        self.dispatcher
            .dispatch(&project, &push.commit_hash, &push.commit_message)
            .await
    }

    /// Apply a status callback reported by an external CI run.
    pub async fn record_status(&self, report: StatusReport) -> Result<Deployment, IntakeError> {
        self.recorder.record(report).await
    }

    /// Dispatch a deployment for a project by ID (manual deploy).
    ///
    /// Missing commit metadata falls back to the documented placeholders.
    ///
    /// # Errors
    ///
    /// Returns [`IntakeError::NotFound`] when the project does not exist;
    /// no writes occur in that case.
    #[instrument(skip(self), fields(project_id = %project_id))]
    pub async fn deploy_project(
        &self,
        project_id: ProjectId,
        commit_hash: Option<String>,
        commit_message: Option<String>,
    ) -> Result<Deployment, IntakeError> {
        let project = self
            .projects
            .get_project(project_id)
            .await?
            .ok_or(IntakeError::NotFound { entity: "project" })?;

        let commit_hash = commit_hash.unwrap_or_else(|| Self::MANUAL_COMMIT_HASH.to_string());
        let commit_message =
            commit_message.unwrap_or_else(|| Self::MANUAL_COMMIT_MESSAGE.to_string());

        self.dispatcher
            .dispatch(&project, &commit_hash, &commit_message)
            .await
    }
}
