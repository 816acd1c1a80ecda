//! Tests for [`DeploymentDispatcher`].
//!
//! Covers the six-step dispatch sequence, two-way trigger selection, the
//! timeout bound, and the compensating writes appended on trigger failure.

use super::*;
use crate::{
    ActivityKind, DeploymentStatus, MemoryStore, NewProject, Project, ProjectStatus, UserId,
};
use std::sync::Mutex;

// ============================================================================
// Fakes
// ============================================================================

/// A trigger that records its calls and returns a configurable result.
struct RecordingTrigger {
    calls: Mutex<Vec<DeployRequest>>,
    failure: Mutex<Option<TriggerError>>,
}

impl RecordingTrigger {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            calls: Mutex::new(Vec::new()),
            failure: Mutex::new(None),
        })
    }

    fn failing(error: TriggerError) -> Arc<Self> {
        let trigger = Self::new();
        *trigger.failure.lock().unwrap() = Some(error);
        trigger
    }

    fn calls(&self) -> Vec<DeployRequest> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl crate::trigger::DeployTrigger for RecordingTrigger {
    async fn trigger_deploy(&self, request: &DeployRequest) -> Result<(), TriggerError> {
        self.calls.lock().unwrap().push(request.clone());
        match self.failure.lock().unwrap().take() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

/// A trigger that never completes, for exercising the timeout bound.
struct StalledTrigger;

#[async_trait::async_trait]
impl crate::trigger::DeployTrigger for StalledTrigger {
    async fn trigger_deploy(&self, _request: &DeployRequest) -> Result<(), TriggerError> {
        tokio::time::sleep(std::time::Duration::from_secs(3600)).await;
        Ok(())
    }
}

// ============================================================================
// Fixtures
// ============================================================================

struct Fixture {
    store: Arc<MemoryStore>,
    project: Project,
    vercel: Arc<RecordingTrigger>,
    workflow: Arc<RecordingTrigger>,
    dispatcher: DeploymentDispatcher,
}

async fn fixture(framework: &str) -> Fixture {
    let store = Arc::new(MemoryStore::new());
    let project = store
        .create_project(NewProject {
            user_id: UserId::new(1),
            name: "app".to_string(),
            description: None,
            repository_url: "https://github.com/acme/app".to_string(),
            repository_name: "acme/app".to_string(),
            branch: "main".to_string(),
            framework: framework.to_string(),
        })
        .await
        .unwrap();

    let vercel = RecordingTrigger::new();
    let workflow = RecordingTrigger::new();
    let dispatcher = DeploymentDispatcher::new(
        store.clone(),
        store.clone(),
        store.clone(),
        TriggerSet::new(vercel.clone(), workflow.clone()),
        DEFAULT_TRIGGER_TIMEOUT,
    );

    Fixture {
        store,
        project,
        vercel,
        workflow,
        dispatcher,
    }
}

async fn activities_for(fixture: &Fixture) -> Vec<ActivityKind> {
    let mut kinds: Vec<ActivityKind> = fixture
        .store
        .get_activities_by_user(fixture.project.user_id, 100)
        .await
        .unwrap()
        .into_iter()
        .map(|a| a.kind)
        .collect();
    kinds.reverse(); // oldest first for readable assertions
    kinds
}

// ============================================================================
// Success path
// ============================================================================

/// A successful dispatch creates exactly one building deployment, moves the
/// project to building, and emits one started activity.
#[tokio::test]
async fn test_successful_dispatch_writes_building_state() {
    let fixture = fixture("react").await;

    let deployment = fixture
        .dispatcher
        .dispatch(&fixture.project, "c1", "fix")
        .await
        .unwrap();

    assert_eq!(deployment.status, DeploymentStatus::Building);
    assert_eq!(deployment.commit_hash, "c1");
    assert_eq!(deployment.commit_message, "fix");
    assert!(deployment.completed_at.is_none());

    let project = fixture
        .store
        .get_project(fixture.project.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(project.status, ProjectStatus::Building);
    assert!(project.last_deployment_at.is_some());

    assert_eq!(
        activities_for(&fixture).await,
        vec![ActivityKind::DeploymentStarted]
    );
}

/// A `react` project takes the Vercel-style path, not the alternate one.
#[tokio::test]
async fn test_react_framework_selects_vercel_path() {
    let fixture = fixture("React").await;

    let deployment = fixture
        .dispatcher
        .dispatch(&fixture.project, "c1", "fix")
        .await
        .unwrap();

    let calls = fixture.vercel.calls();
    assert_eq!(calls.len(), 1);
    assert!(fixture.workflow.calls().is_empty());

    // The trigger sees the project's identity and the new deployment ID
    assert_eq!(calls[0].deployment_id, deployment.id);
    assert_eq!(calls[0].repository_name, "acme/app");
    assert_eq!(calls[0].branch, "main");
    assert_eq!(calls[0].framework, "React");
}

/// A `node` project takes the workflow-dispatch path.
#[tokio::test]
async fn test_node_framework_selects_workflow_path() {
    let fixture = fixture("node").await;

    fixture
        .dispatcher
        .dispatch(&fixture.project, "c1", "fix")
        .await
        .unwrap();

    assert!(fixture.vercel.calls().is_empty());
    assert_eq!(fixture.workflow.calls().len(), 1);
}

// ============================================================================
// Failure path
// ============================================================================

/// A trigger failure appends compensating writes: the deployment and project
/// move to failed and a failure activity joins the started one. Nothing is
/// rolled back.
#[tokio::test]
async fn test_trigger_failure_appends_compensating_writes() {
    let store = Arc::new(MemoryStore::new());
    let project = store
        .create_project(NewProject {
            user_id: UserId::new(1),
            name: "app".to_string(),
            description: None,
            repository_url: "https://github.com/acme/app".to_string(),
            repository_name: "acme/app".to_string(),
            branch: "main".to_string(),
            framework: "node".to_string(),
        })
        .await
        .unwrap();

    let vercel = RecordingTrigger::new();
    let workflow = RecordingTrigger::failing(TriggerError::Status { status: 502 });
    let dispatcher = DeploymentDispatcher::new(
        store.clone(),
        store.clone(),
        store.clone(),
        TriggerSet::new(vercel, workflow),
        DEFAULT_TRIGGER_TIMEOUT,
    );

    // The dispatch itself still succeeds; failure is visible only via state
    let deployment = dispatcher.dispatch(&project, "c1", "fix").await.unwrap();

    assert_eq!(deployment.status, DeploymentStatus::Failed);
    assert!(deployment
        .build_logs
        .as_deref()
        .unwrap()
        .contains("Failed to trigger deployment"));
    assert!(deployment.completed_at.is_some());

    let project = store.get_project(project.id).await.unwrap().unwrap();
    assert_eq!(project.status, ProjectStatus::Failed);

    let kinds: Vec<ActivityKind> = store
        .get_activities_by_user(UserId::new(1), 100)
        .await
        .unwrap()
        .into_iter()
        .map(|a| a.kind)
        .collect();
    assert_eq!(
        kinds,
        vec![ActivityKind::DeploymentFailed, ActivityKind::DeploymentStarted]
    );
}

/// A trigger that never responds is cut off at the timeout and treated
/// exactly like a trigger failure.
#[tokio::test(start_paused = true)]
async fn test_trigger_timeout_treated_as_failure() {
    let store = Arc::new(MemoryStore::new());
    let project = store
        .create_project(NewProject {
            user_id: UserId::new(1),
            name: "app".to_string(),
            description: None,
            repository_url: "https://github.com/acme/app".to_string(),
            repository_name: "acme/app".to_string(),
            branch: "main".to_string(),
            framework: "node".to_string(),
        })
        .await
        .unwrap();

    let dispatcher = DeploymentDispatcher::new(
        store.clone(),
        store.clone(),
        store.clone(),
        TriggerSet::new(Arc::new(StalledTrigger), Arc::new(StalledTrigger)),
        std::time::Duration::from_millis(100),
    );

    let deployment = dispatcher.dispatch(&project, "c1", "fix").await.unwrap();

    assert_eq!(deployment.status, DeploymentStatus::Failed);
    assert!(deployment.build_logs.as_deref().unwrap().contains("timed out"));

    let project = store.get_project(project.id).await.unwrap().unwrap();
    assert_eq!(project.status, ProjectStatus::Failed);
}

/// Each dispatch creates its own deployment row.
#[tokio::test]
async fn test_repeated_dispatch_creates_distinct_deployments() {
    let fixture = fixture("react").await;

    let first = fixture
        .dispatcher
        .dispatch(&fixture.project, "c1", "one")
        .await
        .unwrap();
    let second = fixture
        .dispatcher
        .dispatch(&fixture.project, "c2", "two")
        .await
        .unwrap();

    assert_ne!(first.id, second.id);
    assert_eq!(
        fixture
            .store
            .get_deployments_by_project(fixture.project.id)
            .await
            .unwrap()
            .len(),
        2
    );
}
