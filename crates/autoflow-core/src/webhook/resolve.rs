//! Project resolution.
//!
//! Maps a `(repository full name, branch)` pair from a normalized push event
//! to at most one known project record.

use crate::{store::ProjectStore, webhook::IntakeError, Project};
use std::sync::Arc;
use tracing::{debug, instrument};

/// Resolves push events to the project they should deploy.
///
/// Uniqueness of `(repository, branch)` across projects is not enforced by
/// the store; when several projects claim the pair, the first row in
/// storage-return order (newest first) wins.
pub struct ProjectResolver {
    projects: Arc<dyn ProjectStore>,
}

impl ProjectResolver {
    /// Create a resolver over the project store
    pub fn new(projects: Arc<dyn ProjectStore>) -> Self {
        Self { projects }
    }

    /// Find the project tracking `repository_name` at `branch`.
    ///
    /// Fetches all projects for the repository and scans for the branch.
    /// The linear scan is fine for the expected fan-out of a handful of
    /// projects per repository; push it down into the store as an indexed
    /// `(repository, branch)` query if that ever changes.
    ///
    /// # Errors
    ///
    /// Returns [`IntakeError::NotFound`] when no project matches.
    #[instrument(skip(self))]
    pub async fn resolve(
        &self,
        repository_name: &str,
        branch: &str,
    ) -> Result<Project, IntakeError> {
        let candidates = self
            .projects
            .get_projects_by_repository_name(repository_name)
            .await?;

        debug!(
            candidates = candidates.len(),
            "Fetched projects for repository"
        );

        candidates
            .into_iter()
            .find(|project| project.branch == branch)
            .ok_or(IntakeError::NotFound { entity: "project" })
    }
}

#[cfg(test)]
#[path = "resolve_tests.rs"]
mod tests;
