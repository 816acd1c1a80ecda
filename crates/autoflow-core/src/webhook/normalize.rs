//! Push-payload normalization.
//!
//! Inbound webhook JSON is loosely typed; nothing downstream of this module
//! is allowed to touch it. [`normalize_push`] extracts the minimal fields
//! needed to act and fails closed: anything missing or empty becomes a
//! [`IntakeError::Malformed`] before business logic runs.

use crate::webhook::IntakeError;
use serde_json::Value;

/// The only event type the intake accepts.
pub const PUSH_EVENT: &str = "push";

/// Ref prefix stripped to obtain the branch name.
const REF_PREFIX: &str = "refs/heads/";

// ============================================================================
// Normalized Event
// ============================================================================

/// The validated, minimal form of a push event.
///
/// All four fields are non-empty; an instance of this type is proof that
/// normalization succeeded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushEvent {
    /// Repository full name in `owner/repo` form
    pub repository_full_name: String,
    /// Branch name with the `refs/heads/` prefix stripped
    pub branch: String,
    pub commit_hash: String,
    pub commit_message: String,
}

// ============================================================================
// Normalization
// ============================================================================

/// Extract and validate the fields needed to dispatch a deployment.
///
/// Only `push` events are accepted; any other tag fails with "unsupported
/// event type". The payload must carry repository identity, a branch ref,
/// and head-commit metadata; partial payloads are rejected outright.
pub fn normalize_push(event_type: &str, payload: &Value) -> Result<PushEvent, IntakeError> {
    if event_type != PUSH_EVENT {
        return Err(IntakeError::malformed(format!(
            "unsupported event type '{event_type}'"
        )));
    }

    let repository_full_name = payload
        .get("repository")
        .and_then(|r| r.get("full_name"))
        .and_then(|v| v.as_str())
        .ok_or_else(|| IntakeError::malformed("invalid payload: missing repository info"))?;

    let raw_ref = payload
        .get("ref")
        .and_then(|v| v.as_str())
        .ok_or_else(|| IntakeError::malformed("invalid payload: missing ref"))?;
    let branch = raw_ref.strip_prefix(REF_PREFIX).unwrap_or(raw_ref);

    let head_commit = payload
        .get("head_commit")
        .filter(|v| !v.is_null())
        .ok_or_else(|| IntakeError::malformed("invalid payload: missing head commit"))?;
    let commit_hash = head_commit
        .get("id")
        .and_then(|v| v.as_str())
        .ok_or_else(|| IntakeError::malformed("invalid payload: missing head commit id"))?;
    let commit_message = head_commit
        .get("message")
        .and_then(|v| v.as_str())
        .ok_or_else(|| IntakeError::malformed("invalid payload: missing head commit message"))?;

    let event = PushEvent {
        repository_full_name: repository_full_name.to_string(),
        branch: branch.to_string(),
        commit_hash: commit_hash.to_string(),
        commit_message: commit_message.to_string(),
    };

    if event.repository_full_name.is_empty()
        || event.branch.is_empty()
        || event.commit_hash.is_empty()
        || event.commit_message.is_empty()
    {
        return Err(IntakeError::malformed("invalid payload: empty field"));
    }

    Ok(event)
}

#[cfg(test)]
#[path = "normalize_tests.rs"]
mod tests;
