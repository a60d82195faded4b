//! # Event Decoding Module
//!
//! Turns the Pub/Sub envelope published by Cloud Build into a structured
//! [`BuildEvent`].
//!
//! Cloud Build publishes one message per build state change. The message `data`
//! is the base64 encoding of the build resource serialized as JSON. Only the
//! fields needed for notification are modelled; everything else in the build
//! document is ignored.

use crate::BuildStatus;
use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::Engine;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

/// Standard alphabet, padding optional on decode
const PAYLOAD_ENGINE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

// ============================================================================
// Envelope
// ============================================================================

/// A Pub/Sub message carrying one encoded build event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PubSubMessage {
    /// Base64-encoded JSON build resource
    pub data: String,

    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub attributes: HashMap<String, String>,

    #[serde(default, alias = "message_id", skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,

    #[serde(default, alias = "publish_time", skip_serializing_if = "Option::is_none")]
    pub publish_time: Option<DateTime<Utc>>,
}

/// Shape of a push-subscription request body, which wraps the message
#[derive(Deserialize)]
#[serde(untagged)]
enum EnvelopeDocument {
    Push {
        message: PubSubMessage,
        #[allow(dead_code)]
        subscription: Option<String>,
    },
    Bare(PubSubMessage),
}

impl PubSubMessage {
    /// Create a message from an already encoded payload
    pub fn new(data: impl Into<String>) -> Self {
        Self {
            data: data.into(),
            attributes: HashMap::new(),
            message_id: None,
            publish_time: None,
        }
    }

    /// Create a message carrying the given build event
    pub fn from_build_event(event: &BuildEvent) -> Result<Self, DecodeError> {
        let json = serde_json::to_vec(event).map_err(|e| DecodeError::Json {
            message: e.to_string(),
        })?;
        Ok(Self::new(PAYLOAD_ENGINE.encode(json)))
    }

    /// Parse an envelope document
    ///
    /// Accepts both a bare message (`{"data": ...}`) and the push-subscription
    /// form (`{"message": {"data": ...}, "subscription": ...}`).
    pub fn from_json(bytes: &[u8]) -> Result<Self, DecodeError> {
        let document: EnvelopeDocument =
            serde_json::from_slice(bytes).map_err(|e| DecodeError::Envelope {
                message: e.to_string(),
            })?;

        Ok(match document {
            EnvelopeDocument::Push { message, .. } => message,
            EnvelopeDocument::Bare(message) => message,
        })
    }

    /// Decode the carried build event
    pub fn decode(&self) -> Result<BuildEvent, DecodeError> {
        decode_build_event(&self.data)
    }
}

// ============================================================================
// Build Event
// ============================================================================

/// The subset of a Cloud Build resource used for notifications
///
/// Every field is optional here; which ones are required is decided by the
/// extractor, because a missing provenance is a normal condition while a
/// missing build id is not.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildEvent {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<BuildStatus>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_url: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<BuildSource>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_provenance: Option<SourceProvenance>,
}

impl BuildEvent {
    /// Repository identifier from `source.repoSource.repoName`
    pub fn repo_name(&self) -> Option<&str> {
        self.repo_source()?.repo_name.as_deref()
    }

    /// Branch from `source.repoSource.branchName`
    pub fn branch_name(&self) -> Option<&str> {
        self.repo_source()?.branch_name.as_deref()
    }

    /// Commit from `sourceProvenance.resolvedRepoSource.commitSha`
    ///
    /// Empty strings are reported as absent.
    pub fn resolved_commit_sha(&self) -> Option<&str> {
        self.source_provenance
            .as_ref()?
            .resolved_repo_source
            .as_ref()?
            .commit_sha
            .as_deref()
            .filter(|sha| !sha.is_empty())
    }

    fn repo_source(&self) -> Option<&RepoSource> {
        self.source.as_ref()?.repo_source.as_ref()
    }
}

/// Where the build's source came from
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildSource {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repo_source: Option<RepoSource>,
}

/// The exact source that was built
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceProvenance {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolved_repo_source: Option<RepoSource>,
}

/// A reference into a mirrored Cloud Source Repository
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepoSource {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub repo_name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub branch_name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub commit_sha: Option<String>,
}

// ============================================================================
// Decoding
// ============================================================================

/// Decode a base64-encoded JSON build resource
///
/// # Errors
///
/// Returns [`DecodeError`] naming the stage that failed. No partial event is
/// ever returned.
pub fn decode_build_event(data: &str) -> Result<BuildEvent, DecodeError> {
    let bytes = PAYLOAD_ENGINE.decode(data.trim())?;
    let text = String::from_utf8(bytes)?;

    let event: BuildEvent = serde_json::from_str(&text).map_err(|e| DecodeError::Json {
        message: e.to_string(),
    })?;

    debug!(
        build_id = event.id.as_deref().unwrap_or("<none>"),
        status = event.status.as_ref().map(|s| s.as_str()).unwrap_or("<none>"),
        "Decoded build event"
    );

    Ok(event)
}

// ============================================================================
// Error Types
// ============================================================================

/// Errors turning a raw payload into a [`BuildEvent`]
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("Payload is not valid base64: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("Payload is not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    #[error("Payload is not a valid build event: {message}")]
    Json { message: String },

    #[error("Envelope is not a valid Pub/Sub message: {message}")]
    Envelope { message: String },
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
