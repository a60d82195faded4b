//! # Build Notifier Core
//!
//! Core business logic for relaying Cloud Build lifecycle events to external
//! collaboration tools.
//!
//! This crate decodes build events delivered over Pub/Sub, derives a canonical
//! [`NotificationRecord`] from them, decides whether and where the record should
//! be delivered, and dispatches it to GitHub commit statuses, Bitbucket build
//! statuses, or a Slack incoming webhook.
//!
//! ## Architecture
//!
//! - Decoding, extraction and status mapping are pure functions
//! - Destinations implement the [`Notifier`] trait and receive their credentials
//!   from a [`NotifierConfig`] built once at startup
//! - Entry points ([`BuildEventHandler`]) hold no mutable state, so concurrent
//!   invocations never interact
//!
//! ## Usage
//!
//! ```rust
//! use build_notifier_core::{BuildStatus, CommitSha};
//!
//! let status: BuildStatus = "FAILURE".parse().unwrap();
//! assert!(status.is_failure());
//!
//! let sha = CommitSha::new("ad1ad09c81b6865a6135b38421b7fbe828a77eaa").unwrap();
//! assert_eq!(sha.short(), "ad1ad09");
//! ```

use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

// ============================================================================
// Build Status
// ============================================================================

/// Canonical build status as reported by Cloud Build.
///
/// The status vocabulary belongs to the upstream build system and may grow
/// over time. Values this crate does not know about are kept verbatim in
/// [`BuildStatus::Other`] instead of failing deserialization.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum BuildStatus {
    Queued,
    Working,
    Success,
    Failure,
    InternalError,
    Timeout,
    Cancelled,
    Other(String),
}

impl BuildStatus {
    /// Every status with a defined meaning in this crate
    pub const KNOWN: [BuildStatus; 7] = [
        BuildStatus::Queued,
        BuildStatus::Working,
        BuildStatus::Success,
        BuildStatus::Failure,
        BuildStatus::InternalError,
        BuildStatus::Timeout,
        BuildStatus::Cancelled,
    ];

    /// Get the upstream string representation
    pub fn as_str(&self) -> &str {
        match self {
            Self::Queued => "QUEUED",
            Self::Working => "WORKING",
            Self::Success => "SUCCESS",
            Self::Failure => "FAILURE",
            Self::InternalError => "INTERNAL_ERROR",
            Self::Timeout => "TIMEOUT",
            Self::Cancelled => "CANCELLED",
            Self::Other(value) => value,
        }
    }

    /// Check whether the status is one of [`BuildStatus::KNOWN`]
    pub fn is_known(&self) -> bool {
        !matches!(self, Self::Other(_))
    }

    /// Check whether the status reports a failed build
    ///
    /// Cancellation is a user action, not a failure.
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failure | Self::InternalError | Self::Timeout)
    }
}

impl From<String> for BuildStatus {
    fn from(value: String) -> Self {
        match value.as_str() {
            "QUEUED" => Self::Queued,
            "WORKING" => Self::Working,
            "SUCCESS" => Self::Success,
            "FAILURE" => Self::Failure,
            "INTERNAL_ERROR" => Self::InternalError,
            "TIMEOUT" => Self::Timeout,
            "CANCELLED" => Self::Cancelled,
            _ => Self::Other(value),
        }
    }
}

impl From<&str> for BuildStatus {
    fn from(value: &str) -> Self {
        Self::from(value.to_string())
    }
}

impl From<BuildStatus> for String {
    fn from(status: BuildStatus) -> Self {
        match status {
            BuildStatus::Other(value) => value,
            known => known.as_str().to_string(),
        }
    }
}

impl FromStr for BuildStatus {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::from(s))
    }
}

impl fmt::Display for BuildStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// Domain Identifier Types
// ============================================================================

/// Git commit hash of the built source
///
/// Must be at least [`CommitSha::SHORT_LEN`] hexadecimal characters so the
/// abbreviated form is always well defined.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct CommitSha(String);

impl CommitSha {
    /// Length of the abbreviated hash shown to humans
    pub const SHORT_LEN: usize = 7;

    /// Create a commit hash with validation
    ///
    /// # Validation Rules
    /// - Must not be empty
    /// - Must contain only ASCII hexadecimal digits
    /// - Must be at least [`CommitSha::SHORT_LEN`] characters long
    pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
        let value = value.into();

        if value.is_empty() {
            return Err(ValidationError::Required {
                field: "commit_sha".to_string(),
            });
        }

        if !value.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(ValidationError::InvalidCharacters {
                field: "commit_sha".to_string(),
                invalid_chars: "non-hexadecimal".to_string(),
            });
        }

        if value.len() < Self::SHORT_LEN {
            return Err(ValidationError::TooShort {
                field: "commit_sha".to_string(),
                min_length: Self::SHORT_LEN,
            });
        }

        Ok(Self(value))
    }

    /// Get the full hash
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Get the abbreviated hash (always exactly [`CommitSha::SHORT_LEN`] characters)
    pub fn short(&self) -> &str {
        // ASCII-only, so byte slicing is on a char boundary
        &self.0[..Self::SHORT_LEN]
    }
}

impl fmt::Display for CommitSha {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for CommitSha {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

// ============================================================================
// Error Types
// ============================================================================

/// High-level error categorization for alerting decisions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCategory {
    /// Destination unreachable or temporarily failing; redelivery may succeed
    Transient,
    /// Malformed input or a rejected request; redelivery will not help
    Permanent,
    /// Missing credentials or invalid settings; an operator must intervene
    Configuration,
}

/// Error type for input validation failures
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Field '{field}' is required")]
    Required { field: String },

    #[error("Field '{field}' is below minimum length of {min_length}")]
    TooShort { field: String, min_length: usize },

    #[error("Field '{field}' contains invalid characters: {invalid_chars}")]
    InvalidCharacters {
        field: String,
        invalid_chars: String,
    },
}

/// Top-level error type for a single notifier invocation
#[derive(Debug, thiserror::Error)]
pub enum NotifierError {
    #[error("Event decoding failed: {0}")]
    Decode(#[from] DecodeError),

    #[error("Notification extraction failed: {0}")]
    Extraction(#[from] ExtractionError),

    #[error("Notification dispatch failed: {0}")]
    Dispatch(#[from] DispatchError),

    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigError),
}

impl NotifierError {
    /// Check if error is transient and redelivery of the event may succeed
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Decode(_) => false,
            Self::Extraction(_) => false,
            Self::Dispatch(e) => e.is_transient(),
            Self::Configuration(_) => false,
        }
    }

    /// Get error category for monitoring and alerting
    pub fn error_category(&self) -> ErrorCategory {
        match self {
            Self::Decode(_) => ErrorCategory::Permanent,
            Self::Extraction(_) => ErrorCategory::Permanent,
            Self::Dispatch(e) => e.error_category(),
            Self::Configuration(_) => ErrorCategory::Configuration,
        }
    }
}

// ============================================================================
// Module declarations
// ============================================================================

/// Pub/Sub envelope and build event decoding
pub mod event;

/// Repository identifier parsing
pub mod provider;

/// Destination status vocabularies
pub mod status_map;

/// Filtering and canonicalization of build events
pub mod extract;

/// Process configuration and credentials
pub mod config;

/// Destination dispatchers
pub mod notifier;

/// Entry points consuming Pub/Sub messages
pub mod handler;

/// Deployment-completed announcements
pub mod deployment;

// Re-export key types for convenience
pub use crate::config::{
    ConfigError, DeploymentSettings, EndpointSettings, HttpSettings, NotifierConfig, SecretValue,
};
pub use deployment::DeploymentAnnouncement;
pub use event::{decode_build_event, BuildEvent, DecodeError, PubSubMessage};
pub use extract::{
    extract_notification, ExtractionError, NotificationRecord, RepoFilter, StatusWhitelist,
};
pub use handler::{BuildEventHandler, HandleOutcome, Route, Trigger};
pub use notifier::{
    bitbucket::BitbucketNotifier, github::GithubNotifier, slack::SlackMessage,
    slack::SlackNotifier, Destination, DispatchError, Notifier,
};
pub use provider::{GitProvider, RepoIdentity, ResolveError};
pub use status_map::StatusMap;

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;
