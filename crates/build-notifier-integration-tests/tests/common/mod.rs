//! Common test utilities for build-notifier integration tests
//!
//! This module provides:
//! - Builders for Cloud Build events and Pub/Sub messages
//! - Configuration pointing every destination at a mock server

use build_notifier_core::{NotifierConfig, PubSubMessage, SecretValue};
use serde_json::{json, Value};
use wiremock::MockServer;

pub const BUILD_ID: &str = "09858dba-2518-48c1-ad88-b7fe497cab64";
pub const LOG_URL: &str =
    "https://console.cloud.google.com/gcr/builds/09858dba-2518-48c1-ad88-b7fe497cab64?project=testing-kubails";
pub const COMMIT_SHA: &str = "8e9dd680f8c26ea41cc73866a1227bf0ec40e774";
pub const SLACK_PATH: &str = "/services/T00000000/B00000000/XXXXXXXXXXXXXXXXXXXXXXXX";

// ============================================================================
// Event Builders
// ============================================================================

/// Cloud Build resource as published on the `cloud-builds` topic
pub fn build_resource(status: &str, repo_name: &str) -> Value {
    json!({
        "id": BUILD_ID,
        "projectId": "testing-kubails",
        "status": status,
        "source": {
            "repoSource": {
                "projectId": "testing-kubails",
                "repoName": repo_name,
                "branchName": "master"
            }
        },
        "steps": [
            {"name": "gcr.io/cloud-builders/docker", "args": ["build", "."]}
        ],
        "createTime": "2019-02-24T21:43:53.411581432Z",
        "timeout": "1200s",
        "logsBucket": "gs://1234567890.cloudbuild-logs.googleusercontent.com",
        "sourceProvenance": {
            "resolvedRepoSource": {
                "projectId": "testing-kubails",
                "repoName": repo_name,
                "commitSha": COMMIT_SHA
            }
        },
        "logUrl": LOG_URL
    })
}

/// Push-subscription request body wrapping an encoded build resource
#[allow(dead_code)]
pub fn push_envelope(resource: &Value) -> Vec<u8> {
    let event = serde_json::from_value(resource.clone()).unwrap();
    let message = PubSubMessage::from_build_event(&event).unwrap();

    serde_json::to_vec(&json!({
        "message": {
            "data": message.data,
            "attributes": {"buildId": BUILD_ID, "status": resource["status"]},
            "messageId": "136969346945",
            "publishTime": "2019-02-24T21:44:01.123Z"
        },
        "subscription": "projects/testing-kubails/subscriptions/cloud-builds"
    }))
    .unwrap()
}

/// Pub/Sub message for a build resource
pub fn message(status: &str, repo_name: &str) -> PubSubMessage {
    let envelope = push_envelope(&build_resource(status, repo_name));
    PubSubMessage::from_json(&envelope).unwrap()
}

// ============================================================================
// Configuration
// ============================================================================

/// Configuration with every credential set and every endpoint on the mock server
pub fn config_for(server: &MockServer) -> NotifierConfig {
    let mut config = NotifierConfig::default();
    config.github_access_token = Some(SecretValue::new("ghp_integration_token"));
    config.bitbucket_access_token = Some(SecretValue::new("bb_app_password"));
    config.bitbucket_user = Some("dsrobo620".to_string());
    config.slack_webhook = Some(SecretValue::new(format!("{}{}", server.uri(), SLACK_PATH)));
    config.endpoints.github_api_url = server.uri();
    config.endpoints.bitbucket_api_url = server.uri();
    config
}
