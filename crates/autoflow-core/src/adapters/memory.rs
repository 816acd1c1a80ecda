//! In-memory storage adapter.
//!
//! Implements all three store traits over `RwLock`-guarded maps with
//! monotonically assigned integer IDs. Query ordering mirrors the relational
//! store it stands in for: rows come back newest first (`created_at DESC`,
//! ID as the tie-break for rows created in the same instant).

use crate::{
    store::{
        ActivityStore, DeploymentPatch, DeploymentStore, ProjectPatch, ProjectStore, StoreError,
    },
    Activity, ActivityId, Deployment, DeploymentId, NewActivity, NewDeployment, NewProject,
    Project, ProjectId, ProjectStatus, Timestamp, UserId,
};
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

// ============================================================================
// State
// ============================================================================

#[derive(Debug, Default)]
struct MemoryState {
    projects: HashMap<i64, Project>,
    deployments: HashMap<i64, Deployment>,
    activities: Vec<Activity>,
    next_project_id: i64,
    next_deployment_id: i64,
    next_activity_id: i64,
}

impl MemoryState {
    fn next_project_id(&mut self) -> ProjectId {
        self.next_project_id += 1;
        ProjectId::new(self.next_project_id)
    }

    fn next_deployment_id(&mut self) -> DeploymentId {
        self.next_deployment_id += 1;
        DeploymentId::new(self.next_deployment_id)
    }

    fn next_activity_id(&mut self) -> ActivityId {
        self.next_activity_id += 1;
        ActivityId::new(self.next_activity_id)
    }
}

// ============================================================================
// MemoryStore
// ============================================================================

/// In-memory implementation of the storage collaborator traits.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RwLock<MemoryState>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }
}

fn apply_project_patch(project: &mut Project, patch: ProjectPatch) {
    if let Some(status) = patch.status {
        project.status = status;
    }
    if let Some(url) = patch.deployment_url {
        project.deployment_url = Some(url);
    }
    if let Some(at) = patch.last_deployment_at {
        project.last_deployment_at = Some(at);
    }
}

fn apply_deployment_patch(deployment: &mut Deployment, patch: DeploymentPatch) {
    if let Some(status) = patch.status {
        deployment.status = status;
    }
    if let Some(logs) = patch.build_logs {
        deployment.build_logs = Some(logs);
    }
    if let Some(url) = patch.deployment_url {
        deployment.deployment_url = Some(url);
    }
    if let Some(at) = patch.completed_at {
        deployment.completed_at = Some(at);
    }
}

#[async_trait]
impl ProjectStore for MemoryStore {
    async fn get_project(&self, id: ProjectId) -> Result<Option<Project>, StoreError> {
        let state = self.state.read().await;
        Ok(state.projects.get(&id.as_i64()).cloned())
    }

    async fn get_projects_by_repository_name(
        &self,
        repository_name: &str,
    ) -> Result<Vec<Project>, StoreError> {
        let state = self.state.read().await;
        let mut matches: Vec<Project> = state
            .projects
            .values()
            .filter(|p| p.repository_name == repository_name)
            .cloned()
            .collect();
        matches.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then(b.id.as_i64().cmp(&a.id.as_i64()))
        });
        Ok(matches)
    }

    async fn create_project(&self, project: NewProject) -> Result<Project, StoreError> {
        let mut state = self.state.write().await;
        let id = state.next_project_id();
        let record = Project {
            id,
            user_id: project.user_id,
            name: project.name,
            description: project.description,
            repository_url: project.repository_url,
            repository_name: project.repository_name,
            branch: project.branch,
            framework: project.framework,
            deployment_url: None,
            status: ProjectStatus::Pending,
            last_deployment_at: None,
            created_at: Timestamp::now(),
        };
        state.projects.insert(id.as_i64(), record.clone());
        Ok(record)
    }

    async fn update_project(
        &self,
        id: ProjectId,
        patch: ProjectPatch,
    ) -> Result<Option<Project>, StoreError> {
        let mut state = self.state.write().await;
        Ok(state.projects.get_mut(&id.as_i64()).map(|project| {
            apply_project_patch(project, patch);
            project.clone()
        }))
    }
}

#[async_trait]
impl DeploymentStore for MemoryStore {
    async fn get_deployment(&self, id: DeploymentId) -> Result<Option<Deployment>, StoreError> {
        let state = self.state.read().await;
        Ok(state.deployments.get(&id.as_i64()).cloned())
    }

    async fn get_deployments_by_project(
        &self,
        project_id: ProjectId,
    ) -> Result<Vec<Deployment>, StoreError> {
        let state = self.state.read().await;
        let mut matches: Vec<Deployment> = state
            .deployments
            .values()
            .filter(|d| d.project_id == project_id)
            .cloned()
            .collect();
        matches.sort_by(|a, b| {
            b.started_at
                .cmp(&a.started_at)
                .then(b.id.as_i64().cmp(&a.id.as_i64()))
        });
        Ok(matches)
    }

    async fn create_deployment(
        &self,
        deployment: NewDeployment,
    ) -> Result<Deployment, StoreError> {
        let mut state = self.state.write().await;
        let id = state.next_deployment_id();
        let record = Deployment {
            id,
            project_id: deployment.project_id,
            status: deployment.status,
            commit_hash: deployment.commit_hash,
            commit_message: deployment.commit_message,
            build_logs: None,
            deployment_url: None,
            started_at: Timestamp::now(),
            completed_at: None,
        };
        state.deployments.insert(id.as_i64(), record.clone());
        Ok(record)
    }

    async fn update_deployment(
        &self,
        id: DeploymentId,
        patch: DeploymentPatch,
    ) -> Result<Option<Deployment>, StoreError> {
        let mut state = self.state.write().await;
        Ok(state.deployments.get_mut(&id.as_i64()).map(|deployment| {
            apply_deployment_patch(deployment, patch);
            deployment.clone()
        }))
    }
}

#[async_trait]
impl ActivityStore for MemoryStore {
    async fn create_activity(&self, activity: NewActivity) -> Result<Activity, StoreError> {
        let mut state = self.state.write().await;
        let id = state.next_activity_id();
        let record = Activity {
            id,
            user_id: activity.user_id,
            project_id: activity.project_id,
            kind: activity.kind,
            description: activity.description,
            created_at: Timestamp::now(),
        };
        state.activities.push(record.clone());
        Ok(record)
    }

    async fn get_activities_by_user(
        &self,
        user_id: UserId,
        limit: usize,
    ) -> Result<Vec<Activity>, StoreError> {
        let state = self.state.read().await;
        Ok(state
            .activities
            .iter()
            .rev()
            .filter(|a| a.user_id == user_id)
            .take(limit)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
#[path = "memory_tests.rs"]
mod tests;
