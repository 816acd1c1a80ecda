//! # AutoFlow Core
//!
//! Core business logic for the AutoFlow deployment orchestration service.
//!
//! This crate contains the domain logic for admitting CI-provider webhooks,
//! validating signatures, normalizing push payloads, resolving projects, and
//! dispatching deployments to third-party deploy triggers.
//!
//! ## Architecture
//!
//! The core follows clean architecture principles:
//! - Business logic depends only on trait abstractions
//! - Storage and trigger implementations are injected at runtime
//! - No authoritative state is held in memory between requests
//!
//! ## Usage
//!
//! ```rust
//! use autoflow_core::{DeploymentStatus, ProjectStatus};
//!
//! // The two status vocabularies are distinct and never unified.
//! assert_eq!(ProjectStatus::Deployed.as_str(), "deployed");
//! assert_eq!(DeploymentStatus::Success.as_str(), "success");
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// Domain Identifier Types
// ============================================================================

/// Unique identifier for a project record.
///
/// Surrogate integer key assigned by the storage collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProjectId(i64);

impl ProjectId {
    /// Create a project ID from its raw value
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    /// Get numeric value
    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for ProjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ProjectId {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let id = s.parse::<i64>().map_err(|_| ParseError::InvalidFormat {
            expected: "integer identifier".to_string(),
            actual: s.to_string(),
        })?;
        Ok(Self::new(id))
    }
}

/// Unique identifier for a deployment record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeploymentId(i64);

impl DeploymentId {
    /// Create a deployment ID from its raw value
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    /// Get numeric value
    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for DeploymentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for DeploymentId {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let id = s.parse::<i64>().map_err(|_| ParseError::InvalidFormat {
            expected: "integer identifier".to_string(),
            actual: s.to_string(),
        })?;
        Ok(Self::new(id))
    }
}

/// Unique identifier for an activity record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActivityId(i64);

impl ActivityId {
    /// Create an activity ID from its raw value
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    /// Get numeric value
    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for ActivityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of the user owning a project, for attribution on activities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(i64);

impl UserId {
    /// Create a user ID from its raw value
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    /// Get numeric value
    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Time
// ============================================================================

/// UTC timestamp for record lifecycle fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Create timestamp for current moment
    pub fn now() -> Self {
        Self(Utc::now())
    }

    /// Parse timestamp from RFC3339 string
    pub fn from_rfc3339(s: &str) -> Result<Self, ParseError> {
        let dt = DateTime::parse_from_rfc3339(s)
            .map_err(|_| ParseError::InvalidFormat {
                expected: "RFC3339 datetime".to_string(),
                actual: s.to_string(),
            })?
            .with_timezone(&Utc);
        Ok(Self(dt))
    }

    /// Convert to RFC3339 string
    pub fn to_rfc3339(&self) -> String {
        self.0.to_rfc3339()
    }

    /// Get underlying DateTime
    pub fn as_datetime(&self) -> &DateTime<Utc> {
        &self.0
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.to_rfc3339())
    }
}

impl PartialOrd for Timestamp {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Timestamp {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.0.cmp(&other.0)
    }
}

// ============================================================================
// Status Vocabularies
// ============================================================================

/// Lifecycle status of a project.
///
/// Distinct vocabulary from [`DeploymentStatus`]: a project that finished a
/// deployment successfully is `deployed`, not `success`. The two vocabularies
/// are intentionally kept separate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProjectStatus {
    Pending,
    Building,
    Deployed,
    Failed,
}

impl ProjectStatus {
    /// Get string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Building => "building",
            Self::Deployed => "deployed",
            Self::Failed => "failed",
        }
    }

    /// Project status resulting from a reported deployment status.
    ///
    /// `success` maps to `deployed`; every other reported status carries its
    /// literal word through to the project.
    pub fn from_reported(status: DeploymentStatus) -> Self {
        match status {
            DeploymentStatus::Success => Self::Deployed,
            DeploymentStatus::Failed => Self::Failed,
            DeploymentStatus::Building => Self::Building,
            DeploymentStatus::Pending => Self::Pending,
        }
    }
}

impl fmt::Display for ProjectStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ProjectStatus {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "building" => Ok(Self::Building),
            "deployed" => Ok(Self::Deployed),
            "failed" => Ok(Self::Failed),
            _ => Err(ParseError::InvalidFormat {
                expected: "pending, building, deployed, or failed".to_string(),
                actual: s.to_string(),
            }),
        }
    }
}

/// Lifecycle status of a single deployment.
///
/// State machine: `pending -> building -> {success | failed}`. The terminal
/// states accept further status callbacks as plain overwrites; there is no
/// duplicate-callback guard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeploymentStatus {
    Pending,
    Building,
    Success,
    Failed,
}

impl DeploymentStatus {
    /// Get string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Building => "building",
            Self::Success => "success",
            Self::Failed => "failed",
        }
    }

    /// Whether this status ends the deployment lifecycle
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Success | Self::Failed)
    }
}

impl fmt::Display for DeploymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for DeploymentStatus {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "building" => Ok(Self::Building),
            "success" => Ok(Self::Success),
            "failed" => Ok(Self::Failed),
            _ => Err(ParseError::InvalidFormat {
                expected: "pending, building, success, or failed".to_string(),
                actual: s.to_string(),
            }),
        }
    }
}

/// Tag describing the kind of state change an activity records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityKind {
    DeploymentStarted,
    DeploymentSuccess,
    DeploymentFailed,
}

impl ActivityKind {
    /// Get string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DeploymentStarted => "deployment_started",
            Self::DeploymentSuccess => "deployment_success",
            Self::DeploymentFailed => "deployment_failed",
        }
    }
}

impl fmt::Display for ActivityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// Records
// ============================================================================

/// A tracked source repository configured for deployment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub id: ProjectId,
    pub user_id: UserId,
    pub name: String,
    pub description: Option<String>,
    pub repository_url: String,
    /// Repository full name in `owner/repo` form
    pub repository_name: String,
    pub branch: String,
    /// Free-form framework label used as the trigger dispatch key
    pub framework: String,
    pub deployment_url: Option<String>,
    pub status: ProjectStatus,
    pub last_deployment_at: Option<Timestamp>,
    pub created_at: Timestamp,
}

/// Input for creating a project.
///
/// The store assigns `id` and `created_at` and starts the project in
/// [`ProjectStatus::Pending`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewProject {
    pub user_id: UserId,
    pub name: String,
    pub description: Option<String>,
    pub repository_url: String,
    pub repository_name: String,
    pub branch: String,
    pub framework: String,
}

/// One deployment attempt for a project.
///
/// `commit_hash` and `commit_message` are immutable once created; the
/// remaining mutable fields are written at most once more by the status
/// callback. Deployments are never deleted by this core.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deployment {
    pub id: DeploymentId,
    pub project_id: ProjectId,
    pub status: DeploymentStatus,
    pub commit_hash: String,
    pub commit_message: String,
    pub build_logs: Option<String>,
    pub deployment_url: Option<String>,
    pub started_at: Timestamp,
    pub completed_at: Option<Timestamp>,
}

/// Input for creating a deployment. The store assigns `id` and `started_at`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewDeployment {
    pub project_id: ProjectId,
    pub status: DeploymentStatus,
    pub commit_hash: String,
    pub commit_message: String,
}

/// Append-only audit record describing a state change.
///
/// Every deployment-state transition driven by this core emits exactly one
/// activity. Activities are never mutated or deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Activity {
    pub id: ActivityId,
    pub user_id: UserId,
    pub project_id: Option<ProjectId>,
    pub kind: ActivityKind,
    pub description: String,
    pub created_at: Timestamp,
}

/// Input for appending an activity. The store assigns `id` and `created_at`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewActivity {
    pub user_id: UserId,
    pub project_id: Option<ProjectId>,
    pub kind: ActivityKind,
    pub description: String,
}

// ============================================================================
// Error Types
// ============================================================================

/// Error type for string parsing failures
#[derive(Debug, Clone, thiserror::Error)]
pub enum ParseError {
    #[error("Invalid format: expected {expected}, got '{actual}'")]
    InvalidFormat { expected: String, actual: String },
}

// ============================================================================
// Module declarations
// ============================================================================

/// Storage collaborator traits and patch types
pub mod store;

/// Outbound deploy-trigger abstraction and two-way selection
pub mod trigger;

/// Webhook intake pipeline: signature, normalization, resolution, dispatch
pub mod webhook;

/// Storage adapter implementations
pub mod adapters;

// Re-export key types for convenience
pub use adapters::MemoryStore;
pub use store::{
    ActivityStore, DeploymentPatch, DeploymentStore, ProjectPatch, ProjectStore, StoreError,
};
pub use trigger::{DeployRequest, DeployTrigger, TriggerError, TriggerKind, TriggerSet};
pub use webhook::{
    CallbackRecorder, DeploymentDispatcher, IntakeError, ProjectResolver, PushEvent,
    SignatureVerifier, StatusReport, WebhookIntake, WebhookSecret,
};

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;
