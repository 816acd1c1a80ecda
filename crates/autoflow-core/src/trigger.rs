//! # Deploy Trigger Abstraction
//!
//! A trigger is an outbound call to a third-party service that actually
//! performs or schedules a deployment. The core selects exactly one of two
//! trigger paths per dispatch, keyed by the project's framework label, and
//! invokes it once; no retry, no fan-out.
//!
//! The selection is a closed two-way dispatch ([`TriggerKind`]) resolved at
//! configuration time into a [`TriggerSet`], not an open-ended plugin
//! registry.

use crate::DeploymentId;
use async_trait::async_trait;
use std::sync::Arc;

// ============================================================================
// Error Types
// ============================================================================

/// Failure of an outbound trigger call.
///
/// All variants are treated identically by the dispatcher (compensating
/// writes); the distinction exists for logs and diagnostics.
#[derive(Debug, thiserror::Error)]
pub enum TriggerError {
    #[error("trigger endpoint returned HTTP {status}")]
    Status { status: u16 },

    #[error("trigger request failed: {message}")]
    Transport { message: String },

    #[error("trigger request timed out after {seconds}s")]
    TimedOut { seconds: u64 },

    #[error("invalid trigger request: {message}")]
    Request { message: String },
}

// ============================================================================
// Core Types
// ============================================================================

/// Payload handed to a trigger implementation for one dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployRequest {
    pub deployment_id: DeploymentId,
    pub project_name: String,
    /// Repository full name in `owner/repo` form
    pub repository_name: String,
    pub branch: String,
    pub framework: String,
}

/// Interface for third-party deployment-trigger clients.
#[async_trait]
pub trait DeployTrigger: Send + Sync {
    /// Perform the provider-specific deployment call.
    ///
    /// # Errors
    ///
    /// Returns [`TriggerError`] on a non-2xx response or a network fault.
    async fn trigger_deploy(&self, request: &DeployRequest) -> Result<(), TriggerError>;
}

/// The two trigger paths a project's framework label can select.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerKind {
    /// Vercel-style deploy hook
    Vercel,
    /// CI workflow-dispatch call
    WorkflowDispatch,
}

impl TriggerKind {
    /// Framework label that selects the Vercel-style path.
    pub const VERCEL_FRAMEWORK: &'static str = "react";

    /// Select the trigger path for a framework label.
    ///
    /// Comparison is ASCII case-insensitive; every label other than
    /// [`Self::VERCEL_FRAMEWORK`] takes the workflow-dispatch path.
    pub fn for_framework(framework: &str) -> Self {
        if framework.eq_ignore_ascii_case(Self::VERCEL_FRAMEWORK) {
            Self::Vercel
        } else {
            Self::WorkflowDispatch
        }
    }

    /// Get string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Vercel => "vercel",
            Self::WorkflowDispatch => "workflow_dispatch",
        }
    }
}

impl std::fmt::Display for TriggerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Both trigger implementations, resolved once at configuration time.
#[derive(Clone)]
pub struct TriggerSet {
    vercel: Arc<dyn DeployTrigger>,
    workflow_dispatch: Arc<dyn DeployTrigger>,
}

impl TriggerSet {
    /// Build a trigger set from the two configured implementations
    pub fn new(vercel: Arc<dyn DeployTrigger>, workflow_dispatch: Arc<dyn DeployTrigger>) -> Self {
        Self {
            vercel,
            workflow_dispatch,
        }
    }

    /// Get the implementation for a trigger kind
    pub fn select(&self, kind: TriggerKind) -> &dyn DeployTrigger {
        match kind {
            TriggerKind::Vercel => self.vercel.as_ref(),
            TriggerKind::WorkflowDispatch => self.workflow_dispatch.as_ref(),
        }
    }

    /// Resolve a framework label to its trigger kind and implementation
    pub fn for_framework(&self, framework: &str) -> (TriggerKind, &dyn DeployTrigger) {
        let kind = TriggerKind::for_framework(framework);
        (kind, self.select(kind))
    }
}

#[cfg(test)]
#[path = "trigger_tests.rs"]
mod tests;
