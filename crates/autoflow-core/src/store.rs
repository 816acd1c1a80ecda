//! # Storage Collaborator Traits
//!
//! The core does not own persistence: all project, deployment, and activity
//! state lives behind the traits defined here, injected as `Arc<dyn …Store>`
//! into every operation. Each request reconstructs what it needs from the
//! store and writes results back before returning; there is no cross-request
//! cache and no transaction held across multi-step sequences.
//!
//! Partial updates are expressed as patch structs: a `Some` field is written,
//! a `None` field is left untouched. None of the core's flows needs to clear
//! a field back to NULL.

use crate::{
    Activity, Deployment, DeploymentId, DeploymentStatus, NewActivity, NewDeployment, NewProject,
    Project, ProjectId, ProjectStatus, Timestamp, UserId,
};
use async_trait::async_trait;

// ============================================================================
// Error Types
// ============================================================================

/// Errors reported by a storage collaborator.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("storage operation failed: {message}")]
    Operation { message: String },

    #[error("storage not available: {message}")]
    Unavailable { message: String },
}

impl StoreError {
    /// Check if the error is transient and a retry could succeed
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Operation { .. } => false,
            Self::Unavailable { .. } => true,
        }
    }
}

// ============================================================================
// Patch Types
// ============================================================================

/// Partial update for a project row.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProjectPatch {
    pub status: Option<ProjectStatus>,
    pub deployment_url: Option<String>,
    pub last_deployment_at: Option<Timestamp>,
}

/// Partial update for a deployment row.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeploymentPatch {
    pub status: Option<DeploymentStatus>,
    pub build_logs: Option<String>,
    pub deployment_url: Option<String>,
    pub completed_at: Option<Timestamp>,
}

// ============================================================================
// Store Traits
// ============================================================================

/// Project lookup and mutation.
///
/// `get_projects_by_repository_name` returns rows in storage order, newest
/// first; the resolver relies on that order when several projects claim the
/// same `(repository, branch)` pair.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ProjectStore: Send + Sync {
    /// Fetch a project by ID
    async fn get_project(&self, id: ProjectId) -> Result<Option<Project>, StoreError>;

    /// Fetch all projects tracking the given `owner/repo` full name
    async fn get_projects_by_repository_name(
        &self,
        repository_name: &str,
    ) -> Result<Vec<Project>, StoreError>;

    /// Create a project, assigning its ID and creation time
    async fn create_project(&self, project: NewProject) -> Result<Project, StoreError>;

    /// Apply a partial update, returning the updated row or `None` if absent
    async fn update_project(
        &self,
        id: ProjectId,
        patch: ProjectPatch,
    ) -> Result<Option<Project>, StoreError>;
}

/// Deployment lookup and mutation.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DeploymentStore: Send + Sync {
    /// Fetch a deployment by ID
    async fn get_deployment(&self, id: DeploymentId) -> Result<Option<Deployment>, StoreError>;

    /// Fetch all deployments of a project, newest first
    async fn get_deployments_by_project(
        &self,
        project_id: ProjectId,
    ) -> Result<Vec<Deployment>, StoreError>;

    /// Create a deployment, assigning its ID and start time
    async fn create_deployment(&self, deployment: NewDeployment)
        -> Result<Deployment, StoreError>;

    /// Apply a partial update, returning the updated row or `None` if absent
    async fn update_deployment(
        &self,
        id: DeploymentId,
        patch: DeploymentPatch,
    ) -> Result<Option<Deployment>, StoreError>;
}

/// Append-only activity log.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ActivityStore: Send + Sync {
    /// Append an activity, assigning its ID and creation time
    async fn create_activity(&self, activity: NewActivity) -> Result<Activity, StoreError>;

    /// Fetch the most recent activities for a user, newest first
    async fn get_activities_by_user(
        &self,
        user_id: UserId,
        limit: usize,
    ) -> Result<Vec<Activity>, StoreError>;
}
