//! Tests for the GitHub dispatcher.

use super::*;
use crate::{provider::RepoIdentity, BuildStatus, CommitSha};
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const SHA: &str = "ad1ad09c81b6865a6135b38421b7fbe828a77eaa";
const STATUS_PATH: &str = "/repos/devinsit/kubails/statuses/ad1ad09c81b6865a6135b38421b7fbe828a77eaa";

fn record(status: BuildStatus) -> NotificationRecord {
    NotificationRecord::new(
        "09858dba-2518-48c1-ad88-b7fe497cab64",
        status,
        "https://console.cloud.google.com/gcr/builds/09858dba",
        CommitSha::new(SHA).unwrap(),
        RepoIdentity::parse("github_devinsit_kubails").unwrap(),
        "master",
    )
}

fn notifier(api_url: &str, token: Option<&str>) -> GithubNotifier {
    let client = NotifierConfig::default().build_http_client().unwrap();
    GithubNotifier::new(
        client,
        api_url,
        token.map(SecretValue::new),
        StatusMap::github().unwrap(),
    )
}

#[test]
fn test_status_request_body() {
    let notifier = notifier("https://api.github.com", Some("token"));

    let request = notifier.status_request(&record(BuildStatus::Timeout)).unwrap();

    assert_eq!(
        request,
        CommitStatusRequest {
            state: "error".to_string(),
            description: "Cloud Build status: TIMEOUT".to_string(),
            target_url: "https://console.cloud.google.com/gcr/builds/09858dba".to_string(),
            context: "GCP Cloud Build".to_string(),
        }
    );
}

#[tokio::test]
async fn test_posts_commit_status() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(STATUS_PATH))
        .and(header("Authorization", "Bearer ghp_test_token"))
        .and(header("User-Agent", "Cloud Build Notifier"))
        .and(header("Accept", "application/vnd.github+json"))
        .and(body_json(json!({
            "state": "success",
            "description": "Cloud Build status: SUCCESS",
            "target_url": "https://console.cloud.google.com/gcr/builds/09858dba",
            "context": "GCP Cloud Build"
        })))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&mock_server)
        .await;

    let notifier = notifier(&mock_server.uri(), Some("ghp_test_token"));

    notifier.notify(&record(BuildStatus::Success)).await.unwrap();
}

#[tokio::test]
async fn test_missing_token_fails_before_request() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&mock_server)
        .await;

    for token in [None, Some("")] {
        let notifier = notifier(&mock_server.uri(), token);

        let result = notifier.notify(&record(BuildStatus::Success)).await;

        assert!(matches!(
            result,
            Err(DispatchError::MissingCredential {
                destination: Destination::GitHub,
                key: "GITHUB_ACCESS_TOKEN"
            })
        ));
    }
}

#[tokio::test]
async fn test_unmapped_status_fails_before_request() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&mock_server)
        .await;

    let notifier = notifier(&mock_server.uri(), Some("ghp_test_token"));

    let result = notifier
        .notify(&record(BuildStatus::Other("EXPIRED".to_string())))
        .await;

    assert!(matches!(
        result,
        Err(DispatchError::UnmappedStatus { status, .. }) if status == "EXPIRED"
    ));
}

#[tokio::test]
async fn test_rejected_request_is_reported() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(STATUS_PATH))
        .respond_with(
            ResponseTemplate::new(422).set_body_json(json!({"message": "No commit found"})),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let notifier = notifier(&mock_server.uri(), Some("ghp_test_token"));

    let result = notifier.notify(&record(BuildStatus::Failure)).await;

    match result {
        Err(DispatchError::Rejected { status, body, .. }) => {
            assert_eq!(status, 422);
            assert!(body.contains("No commit found"));
        }
        other => panic!("Expected Rejected, got {:?}", other),
    }
}

#[test]
fn test_from_config_uses_configured_endpoint_and_token() {
    let mut config = NotifierConfig::default();
    config.github_access_token = Some(SecretValue::new("ghp_from_config"));
    config.endpoints.github_api_url = "http://127.0.0.1:1".to_string();

    let notifier = GithubNotifier::from_config(&config, reqwest::Client::new()).unwrap();

    assert_eq!(notifier.destination(), Destination::GitHub);
    assert_eq!(notifier.api_url, "http://127.0.0.1:1");
    assert_eq!(
        notifier.token.as_ref().map(SecretValue::expose_secret),
        Some("ghp_from_config")
    );
}
