//! Filtering and canonicalization of build events.
//!
//! [`extract_notification`] decides whether a decoded [`BuildEvent`] should
//! produce a notification and, if so, builds the [`NotificationRecord`] that
//! every dispatcher consumes. The policy inputs (which statuses matter, which
//! repository is targeted) are parameters so the git-host and Slack entry
//! points share one extractor.
//!
//! Filtering is never an error: builds that did not come from a mirrored
//! repository, statuses outside the whitelist, unsupported providers and
//! repository filter mismatches all yield `Ok(None)`. Only malformed events
//! produce an [`ExtractionError`].

use crate::{
    event::BuildEvent,
    provider::{GitProvider, RepoIdentity},
    BuildStatus, CommitSha, ValidationError,
};
use serde::Serialize;
use std::collections::HashSet;
use tracing::{debug, warn};

// ============================================================================
// Notification Record
// ============================================================================

/// Canonical description of one build state change, ready for delivery
///
/// Only constructed with every field present; there is no partially populated
/// record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NotificationRecord {
    id: String,
    status: BuildStatus,
    log_url: String,
    sha: CommitSha,
    provider: GitProvider,
    owner: String,
    repo: String,
    branch: String,
}

impl NotificationRecord {
    /// Create a record from its parts
    pub fn new(
        id: impl Into<String>,
        status: BuildStatus,
        log_url: impl Into<String>,
        sha: CommitSha,
        identity: RepoIdentity,
        branch: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            status,
            log_url: log_url.into(),
            sha,
            provider: identity.provider,
            owner: identity.owner,
            repo: identity.repo,
            branch: branch.into(),
        }
    }

    /// Build id
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn status(&self) -> &BuildStatus {
        &self.status
    }

    /// Link to the build log in the Cloud console
    pub fn log_url(&self) -> &str {
        &self.log_url
    }

    pub fn sha(&self) -> &CommitSha {
        &self.sha
    }

    pub fn provider(&self) -> &GitProvider {
        &self.provider
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn repo(&self) -> &str {
        &self.repo
    }

    pub fn branch(&self) -> &str {
        &self.branch
    }
}

// ============================================================================
// Policy Inputs
// ============================================================================

/// Set of statuses a destination wants to hear about
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusWhitelist(HashSet<BuildStatus>);

impl StatusWhitelist {
    /// Create a whitelist from explicit statuses
    pub fn new(statuses: impl IntoIterator<Item = BuildStatus>) -> Self {
        Self(statuses.into_iter().collect())
    }

    /// Every known status; used for commit status updates
    pub fn actionable() -> Self {
        Self::new(BuildStatus::KNOWN)
    }

    /// Failure-class statuses only; used for chat alerts
    pub fn failures() -> Self {
        Self::new(
            BuildStatus::KNOWN
                .into_iter()
                .filter(BuildStatus::is_failure),
        )
    }

    /// Check whether a status is whitelisted
    pub fn contains(&self, status: &BuildStatus) -> bool {
        self.0.contains(status)
    }
}

/// Restriction of notifications to one repository
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum RepoFilter {
    /// Notify for every repository
    #[default]
    All,
    /// Notify only for the repository with exactly this name
    Only(String),
}

impl RepoFilter {
    /// Target value that disables filtering
    pub const ALL_SENTINEL: &'static str = "all";

    /// Interpret the `TARGET_REPO` setting
    ///
    /// Unset, empty and [`RepoFilter::ALL_SENTINEL`] all disable filtering.
    pub fn from_target(target: Option<&str>) -> Self {
        match target {
            None => Self::All,
            Some(value) if value.is_empty() || value == Self::ALL_SENTINEL => Self::All,
            Some(value) => Self::Only(value.to_string()),
        }
    }

    /// Check whether a repository name passes the filter
    pub fn matches(&self, repo: &str) -> bool {
        match self {
            Self::All => true,
            Self::Only(target) => target == repo,
        }
    }
}

// ============================================================================
// Extraction
// ============================================================================

/// Decide whether an event warrants a notification and build the record
///
/// # Errors
///
/// Returns [`ExtractionError`] if the event comes from a tracked repository but
/// lacks a field every notification needs, or carries an invalid commit hash.
pub fn extract_notification(
    event: &BuildEvent,
    whitelist: &StatusWhitelist,
    repo_filter: &RepoFilter,
) -> Result<Option<NotificationRecord>, ExtractionError> {
    let build_id = event.id.as_deref().unwrap_or("<none>");

    let Some(sha) = event.resolved_commit_sha() else {
        debug!(build_id, "Build has no resolved source commit; skipping");
        return Ok(None);
    };

    let repo_name = required(event.repo_name(), "source.repoSource.repoName")?;
    let identity = match RepoIdentity::parse(repo_name) {
        Ok(identity) => identity,
        Err(e) => {
            warn!(build_id, error = %e, "Could not resolve repository provider; skipping");
            return Ok(None);
        }
    };

    let status = event
        .status
        .clone()
        .ok_or_else(|| ExtractionError::MissingField {
            field: "status".to_string(),
        })?;

    if !whitelist.contains(&status) {
        debug!(build_id, status = %status, "Status not whitelisted; skipping");
        return Ok(None);
    }

    if !identity.provider.is_supported() {
        debug!(build_id, provider = %identity.provider, "Unsupported provider; skipping");
        return Ok(None);
    }

    if !repo_filter.matches(&identity.repo) {
        debug!(build_id, repo = %identity.repo, "Repository filtered out; skipping");
        return Ok(None);
    }

    let id = required(event.id.as_deref(), "id")?;
    let log_url = required(event.log_url.as_deref(), "logUrl")?;
    let branch = required(event.branch_name(), "source.repoSource.branchName")?;
    let sha = CommitSha::new(sha).map_err(|source| ExtractionError::InvalidField {
        field: "sourceProvenance.resolvedRepoSource.commitSha".to_string(),
        source,
    })?;

    Ok(Some(NotificationRecord::new(
        id, status, log_url, sha, identity, branch,
    )))
}

fn required<'a>(value: Option<&'a str>, field: &str) -> Result<&'a str, ExtractionError> {
    value
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ExtractionError::MissingField {
            field: field.to_string(),
        })
}

// ============================================================================
// Error Types
// ============================================================================

/// A build event from a tracked repository that cannot be turned into a record
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExtractionError {
    #[error("Required field missing: {field}")]
    MissingField { field: String },

    #[error("Invalid field {field}: {source}")]
    InvalidField {
        field: String,
        #[source]
        source: ValidationError,
    },
}

#[cfg(test)]
#[path = "extract_tests.rs"]
mod tests;
