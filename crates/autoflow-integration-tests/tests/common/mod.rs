//! Common test utilities for the intake integration tests.
//!
//! Provides a harness wiring the real intake pipeline to the in-memory store
//! and recording fake triggers, plus signing and seeding helpers.

use autoflow_api::{AppState, ServiceConfig, ServiceMetrics};
use autoflow_core::{
    Activity, ActivityStore, DeployRequest, DeployTrigger, Deployment, DeploymentStatus,
    DeploymentStore, MemoryStore, NewDeployment, NewProject, Project, ProjectStore, TriggerError,
    TriggerSet, UserId, WebhookIntake, WebhookSecret,
};
use axum::http::HeaderMap;
use bytes::Bytes;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Webhook secret shared by the harness and the signing helper.
pub const TEST_SECRET: &str = "integration-test-secret";

// ============================================================================
// Recording trigger
// ============================================================================

/// A deploy trigger that records every request and fails on demand.
pub struct RecordingTrigger {
    calls: Mutex<Vec<DeployRequest>>,
    fail_with_status: Option<u16>,
}

impl RecordingTrigger {
    #[allow(dead_code)]
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            calls: Mutex::new(Vec::new()),
            fail_with_status: None,
        })
    }

    #[allow(dead_code)]
    pub fn failing(status: u16) -> Arc<Self> {
        Arc::new(Self {
            calls: Mutex::new(Vec::new()),
            fail_with_status: Some(status),
        })
    }

    #[allow(dead_code)]
    pub fn calls(&self) -> Vec<DeployRequest> {
        self.calls.lock().unwrap().clone()
    }

    #[allow(dead_code)]
    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait::async_trait]
impl DeployTrigger for RecordingTrigger {
    async fn trigger_deploy(&self, request: &DeployRequest) -> Result<(), TriggerError> {
        self.calls.lock().unwrap().push(request.clone());
        match self.fail_with_status {
            Some(status) => Err(TriggerError::Status { status }),
            None => Ok(()),
        }
    }
}

// ============================================================================
// Harness
// ============================================================================

/// The intake pipeline assembled over an in-memory store and fake triggers.
pub struct TestHarness {
    pub state: AppState,
    pub store: Arc<MemoryStore>,
    pub vercel: Arc<RecordingTrigger>,
    pub workflow: Arc<RecordingTrigger>,
}

impl TestHarness {
    #[allow(dead_code)]
    pub fn new() -> Self {
        Self::with_triggers(RecordingTrigger::new(), RecordingTrigger::new())
    }

    #[allow(dead_code)]
    pub fn with_failing_triggers(status: u16) -> Self {
        Self::with_triggers(
            RecordingTrigger::failing(status),
            RecordingTrigger::failing(status),
        )
    }

    pub fn with_triggers(
        vercel: Arc<RecordingTrigger>,
        workflow: Arc<RecordingTrigger>,
    ) -> Self {
        let store = Arc::new(MemoryStore::new());
        let intake = Arc::new(WebhookIntake::new(
            Some(WebhookSecret::new(TEST_SECRET)),
            store.clone(),
            store.clone(),
            store.clone(),
            TriggerSet::new(vercel.clone(), workflow.clone()),
            Duration::from_secs(5),
        ));
        let state = AppState::new(
            ServiceConfig::default(),
            intake,
            ServiceMetrics::new().unwrap(),
        );

        Self {
            state,
            store,
            vercel,
            workflow,
        }
    }

    /// Seed a project tracking `acme/app` at `main` with the given framework.
    #[allow(dead_code)]
    pub async fn seed_project(&self, framework: &str) -> Project {
        self.seed_project_at("acme/app", "main", framework).await
    }

    #[allow(dead_code)]
    pub async fn seed_project_at(
        &self,
        repository_name: &str,
        branch: &str,
        framework: &str,
    ) -> Project {
        self.store
            .create_project(NewProject {
                user_id: UserId::new(1),
                name: "app".to_string(),
                description: None,
                repository_url: format!("https://github.com/{repository_name}"),
                repository_name: repository_name.to_string(),
                branch: branch.to_string(),
                framework: framework.to_string(),
            })
            .await
            .unwrap()
    }

    /// Seed a deployment already in `building` state for the project.
    #[allow(dead_code)]
    pub async fn seed_building_deployment(&self, project: &Project) -> Deployment {
        self.store
            .create_deployment(NewDeployment {
                project_id: project.id,
                status: DeploymentStatus::Building,
                commit_hash: "c1".to_string(),
                commit_message: "fix".to_string(),
            })
            .await
            .unwrap()
    }

    /// All activities for the seeded user, oldest first.
    #[allow(dead_code)]
    pub async fn activities(&self) -> Vec<Activity> {
        let mut activities = self
            .store
            .get_activities_by_user(UserId::new(1), 100)
            .await
            .unwrap();
        activities.reverse();
        activities
    }
}

// ============================================================================
// Request builders
// ============================================================================

/// Sign `body` with `secret` in the `sha256=<hex>` wire format.
#[allow(dead_code)]
pub fn sign(secret: &str, body: &[u8]) -> String {
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes()).unwrap();
    mac.update(body);
    format!("sha256={}", hex::encode(mac.finalize().into_bytes()))
}

/// The push payload from the reference scenario: `acme/app` at `main`,
/// head commit `c1`.
#[allow(dead_code)]
pub fn push_body() -> Bytes {
    Bytes::from(
        r#"{"repository":{"full_name":"acme/app"},"ref":"refs/heads/main","head_commit":{"id":"c1","message":"fix"}}"#,
    )
}

/// Headers for a signed push event.
#[allow(dead_code)]
pub fn signed_push_headers(body: &Bytes) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(autoflow_api::EVENT_TYPE_HEADER, "push".parse().unwrap());
    headers.insert(
        autoflow_api::SIGNATURE_HEADER,
        sign(TEST_SECRET, body).parse().unwrap(),
    );
    headers
}
