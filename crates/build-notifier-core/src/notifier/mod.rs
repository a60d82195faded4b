//! Destination dispatchers.
//!
//! Every destination implements [`Notifier`]: given a [`NotificationRecord`]
//! it performs exactly one outbound HTTP call. Credentials are bound at
//! construction from a [`NotifierConfig`](crate::NotifierConfig) and checked
//! on every call, before the status is mapped or any request is made.

use crate::{extract::NotificationRecord, ErrorCategory};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::warn;
use url::Url;

pub mod bitbucket;
pub mod github;
pub mod slack;

// ============================================================================
// Destinations
// ============================================================================

/// External service receiving a notification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Destination {
    GitHub,
    Bitbucket,
    Slack,
}

impl Destination {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::GitHub => "GitHub",
            Self::Bitbucket => "Bitbucket",
            Self::Slack => "Slack",
        }
    }
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Delivers notification records to one destination
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Destination this notifier delivers to
    fn destination(&self) -> Destination;

    /// Deliver one record
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError`] if a credential is missing, the status has no
    /// destination equivalent, the request cannot be sent, or the destination
    /// answers with a non-success status.
    async fn notify(&self, record: &NotificationRecord) -> Result<(), DispatchError>;
}

// ============================================================================
// Error Types
// ============================================================================

/// Failure to deliver a notification
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("{destination} credential not configured: {key}")]
    MissingCredential {
        destination: Destination,
        key: &'static str,
    },

    #[error("{destination} has no status mapped for build status {status}")]
    UnmappedStatus {
        destination: Destination,
        status: String,
    },

    #[error("{destination} rejected the request with HTTP {status}: {body}")]
    Rejected {
        destination: Destination,
        status: u16,
        body: String,
    },

    #[error("Request to {destination} failed: {source}")]
    Transport {
        destination: Destination,
        #[source]
        source: reqwest::Error,
    },

    #[error("Invalid {destination} endpoint: {message}")]
    InvalidEndpoint {
        destination: Destination,
        message: String,
    },
}

impl DispatchError {
    /// Destination the failed delivery was addressed to
    pub fn destination(&self) -> Destination {
        match self {
            Self::MissingCredential { destination, .. }
            | Self::UnmappedStatus { destination, .. }
            | Self::Rejected { destination, .. }
            | Self::Transport { destination, .. }
            | Self::InvalidEndpoint { destination, .. } => *destination,
        }
    }

    /// Check if a redelivery of the same event may succeed
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Rejected { status, .. } => is_transient_status(*status),
            Self::Transport { .. } => true,
            _ => false,
        }
    }

    /// Get error category for monitoring and alerting
    pub fn error_category(&self) -> ErrorCategory {
        match self {
            Self::MissingCredential { .. }
            | Self::UnmappedStatus { .. }
            | Self::InvalidEndpoint { .. } => ErrorCategory::Configuration,
            Self::Rejected { status, .. } if is_transient_status(*status) => {
                ErrorCategory::Transient
            }
            Self::Rejected { .. } => ErrorCategory::Permanent,
            Self::Transport { .. } => ErrorCategory::Transient,
        }
    }
}

fn is_transient_status(status: u16) -> bool {
    status == 429 || (500..600).contains(&status)
}

// ============================================================================
// Shared Request Helpers
// ============================================================================

/// Append percent-encoded path segments to an API base URL
pub(crate) fn endpoint_url(
    destination: Destination,
    base: &str,
    segments: &[&str],
) -> Result<Url, DispatchError> {
    let mut url = Url::parse(base).map_err(|e| DispatchError::InvalidEndpoint {
        destination,
        message: format!("{}: {}", base, e),
    })?;

    url.path_segments_mut()
        .map_err(|_| DispatchError::InvalidEndpoint {
            destination,
            message: format!("{} cannot be used as a base URL", base),
        })?
        .pop_if_empty()
        .extend(segments);

    Ok(url)
}

/// Send a prepared request and turn the outcome into a dispatch result
///
/// Transport errors are stripped of the request URL; a Slack webhook URL is
/// itself a credential.
pub(crate) async fn send(
    destination: Destination,
    request: reqwest::RequestBuilder,
) -> Result<(), DispatchError> {
    let response = request
        .send()
        .await
        .map_err(|source| DispatchError::Transport {
            destination,
            source: source.without_url(),
        })?;

    let status = response.status();
    if status.is_success() {
        return Ok(());
    }

    let body = response.text().await.unwrap_or_default();
    warn!(
        destination = %destination,
        status = status.as_u16(),
        "Destination rejected notification"
    );

    Err(DispatchError::Rejected {
        destination,
        status: status.as_u16(),
        body,
    })
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
