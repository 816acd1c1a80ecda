//! Tests for [`MemoryStore`].

use super::*;
use crate::{DeploymentStatus, NewActivity, NewDeployment, NewProject};

fn new_project(repository_name: &str, branch: &str) -> NewProject {
    NewProject {
        user_id: UserId::new(1),
        name: "app".to_string(),
        description: Some("demo".to_string()),
        repository_url: format!("https://github.com/{repository_name}"),
        repository_name: repository_name.to_string(),
        branch: branch.to_string(),
        framework: "react".to_string(),
    }
}

// ============================================================================
// Project tests
// ============================================================================

mod project_tests {
    use super::*;
    use crate::ActivityKind;

    /// Created projects get sequential IDs and pending status.
    #[tokio::test]
    async fn test_create_assigns_id_and_pending_status() {
        let store = MemoryStore::new();

        let first = store.create_project(new_project("acme/app", "main")).await.unwrap();
        let second = store.create_project(new_project("acme/app", "dev")).await.unwrap();

        assert_eq!(first.id.as_i64(), 1);
        assert_eq!(second.id.as_i64(), 2);
        assert_eq!(first.status, ProjectStatus::Pending);
        assert!(first.deployment_url.is_none());
    }

    /// Lookup by ID distinguishes present and absent rows.
    #[tokio::test]
    async fn test_get_by_id() {
        let store = MemoryStore::new();
        let created = store.create_project(new_project("acme/app", "main")).await.unwrap();

        assert_eq!(
            store.get_project(created.id).await.unwrap().unwrap().id,
            created.id
        );
        assert!(store.get_project(ProjectId::new(99)).await.unwrap().is_none());
    }

    /// Repository queries return only matching rows, newest first.
    #[tokio::test]
    async fn test_repository_query_is_newest_first() {
        let store = MemoryStore::new();
        store.create_project(new_project("acme/app", "main")).await.unwrap();
        store.create_project(new_project("acme/other", "main")).await.unwrap();
        let newest = store.create_project(new_project("acme/app", "dev")).await.unwrap();

        let rows = store.get_projects_by_repository_name("acme/app").await.unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].id, newest.id);
    }

    /// Patch updates write `Some` fields and leave the rest untouched.
    #[tokio::test]
    async fn test_update_applies_partial_patch() {
        let store = MemoryStore::new();
        let created = store.create_project(new_project("acme/app", "main")).await.unwrap();

        let updated = store
            .update_project(
                created.id,
                ProjectPatch {
                    status: Some(ProjectStatus::Building),
                    ..Default::default()
                },
            )
            .await
            .unwrap()
            .unwrap();

        assert_eq!(updated.status, ProjectStatus::Building);
        assert_eq!(updated.name, created.name);
        assert!(updated.deployment_url.is_none());
    }

    /// Updating an absent row reports absence instead of creating one.
    #[tokio::test]
    async fn test_update_missing_row_returns_none() {
        let store = MemoryStore::new();

        let result = store
            .update_project(ProjectId::new(1), ProjectPatch::default())
            .await
            .unwrap();

        assert!(result.is_none());
    }

    /// Activities append with sequential IDs and come back newest first,
    /// bounded by the limit.
    #[tokio::test]
    async fn test_activities_append_and_list_newest_first() {
        let store = MemoryStore::new();
        for i in 0..3 {
            store
                .create_activity(NewActivity {
                    user_id: UserId::new(1),
                    project_id: None,
                    kind: ActivityKind::DeploymentStarted,
                    description: format!("activity {i}"),
                })
                .await
                .unwrap();
        }

        let activities = store.get_activities_by_user(UserId::new(1), 2).await.unwrap();

        assert_eq!(activities.len(), 2);
        assert_eq!(activities[0].description, "activity 2");
        assert_eq!(activities[1].description, "activity 1");

        // Other users see nothing
        assert!(store
            .get_activities_by_user(UserId::new(2), 10)
            .await
            .unwrap()
            .is_empty());
    }
}

// ============================================================================
// Deployment tests
// ============================================================================

mod deployment_tests {
    use super::*;

    fn new_deployment(project_id: ProjectId) -> NewDeployment {
        NewDeployment {
            project_id,
            status: DeploymentStatus::Building,
            commit_hash: "c1".to_string(),
            commit_message: "fix".to_string(),
        }
    }

    /// Created deployments carry their commit metadata and start time.
    #[tokio::test]
    async fn test_create_stamps_start_time() {
        let store = MemoryStore::new();

        let deployment = store.create_deployment(new_deployment(ProjectId::new(1))).await.unwrap();

        assert_eq!(deployment.id.as_i64(), 1);
        assert_eq!(deployment.status, DeploymentStatus::Building);
        assert!(deployment.completed_at.is_none());
        assert!(deployment.build_logs.is_none());
    }

    /// Project queries return only that project's deployments, newest first.
    #[tokio::test]
    async fn test_project_query_is_newest_first() {
        let store = MemoryStore::new();
        store.create_deployment(new_deployment(ProjectId::new(1))).await.unwrap();
        store.create_deployment(new_deployment(ProjectId::new(2))).await.unwrap();
        let newest = store.create_deployment(new_deployment(ProjectId::new(1))).await.unwrap();

        let rows = store.get_deployments_by_project(ProjectId::new(1)).await.unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].id, newest.id);
    }

    /// Patch updates mutate status, logs, URL, and completion time together.
    #[tokio::test]
    async fn test_update_applies_full_patch() {
        let store = MemoryStore::new();
        let created = store.create_deployment(new_deployment(ProjectId::new(1))).await.unwrap();

        let updated = store
            .update_deployment(
                created.id,
                DeploymentPatch {
                    status: Some(DeploymentStatus::Success),
                    build_logs: Some("done".to_string()),
                    deployment_url: Some("https://app.vercel.app".to_string()),
                    completed_at: Some(Timestamp::now()),
                },
            )
            .await
            .unwrap()
            .unwrap();

        assert_eq!(updated.status, DeploymentStatus::Success);
        assert_eq!(updated.build_logs.as_deref(), Some("done"));
        assert_eq!(updated.deployment_url.as_deref(), Some("https://app.vercel.app"));
        assert!(updated.completed_at.is_some());
        // Commit metadata is untouched
        assert_eq!(updated.commit_hash, "c1");
    }

    /// Updating an absent deployment reports absence.
    #[tokio::test]
    async fn test_update_missing_row_returns_none() {
        let store = MemoryStore::new();

        let result = store
            .update_deployment(DeploymentId::new(5), DeploymentPatch::default())
            .await
            .unwrap();

        assert!(result.is_none());
    }
}
