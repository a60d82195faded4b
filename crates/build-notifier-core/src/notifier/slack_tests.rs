//! Tests for the Slack dispatcher.

use super::*;
use crate::{provider::RepoIdentity, BuildStatus, CommitSha};
use serde_json::json;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn record(status: BuildStatus) -> NotificationRecord {
    NotificationRecord::new(
        "09858dba-2518-48c1-ad88-b7fe497cab64",
        status,
        "https://console.cloud.google.com/gcr/builds/09858dba",
        CommitSha::new("8e9dd680f8c26ea41cc73866a1227bf0ec40e774").unwrap(),
        RepoIdentity::parse("github_devinsit_kubails").unwrap(),
        "APU-20",
    )
}

#[test]
fn test_failure_message_layout() {
    let message = SlackMessage::build_failure(&record(BuildStatus::Failure));

    assert_eq!(
        serde_json::to_value(&message).unwrap(),
        json!({
            "mrkdwn": true,
            "attachments": [{
                "title": "Build `09858dba-2518-48c1-ad88-b7fe497cab64`",
                "title_link": "https://console.cloud.google.com/gcr/builds/09858dba",
                "color": "danger",
                "fields": [
                    {"title": "Status", "value": "FAILURE", "short": true},
                    {"title": "Repo", "value": "kubails", "short": true},
                    {"title": "Branch", "value": "APU-20", "short": true},
                    {"title": "Commit", "value": "8e9dd68", "short": true}
                ]
            }]
        })
    );
}

#[test]
fn test_commit_field_is_seven_characters() {
    let message = SlackMessage::build_failure(&record(BuildStatus::Timeout));

    let commit = message.attachments[0]
        .fields
        .iter()
        .find(|f| f.title == "Commit")
        .unwrap();
    assert_eq!(commit.value.len(), 7);
}

#[test]
fn test_message_without_title_link_omits_it() {
    let message = SlackMessage::with_attachment(SlackAttachment {
        title: "Hello".to_string(),
        title_link: None,
        color: "good".to_string(),
        fields: Vec::new(),
    });

    let value = serde_json::to_value(&message).unwrap();
    assert!(value["attachments"][0].get("title_link").is_none());
}

#[tokio::test]
async fn test_posts_failure_alert_to_webhook() {
    let mock_server = MockServer::start().await;
    let expected = SlackMessage::build_failure(&record(BuildStatus::InternalError));

    Mock::given(method("POST"))
        .and(path("/services/T000/B000/XXXX"))
        .and(body_json(&expected))
        .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let webhook = format!("{}/services/T000/B000/XXXX", mock_server.uri());
    let notifier = SlackNotifier::new(reqwest::Client::new(), Some(SecretValue::new(webhook)));

    notifier
        .notify(&record(BuildStatus::InternalError))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_missing_webhook_fails_before_request() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&mock_server)
        .await;

    let notifier = SlackNotifier::new(reqwest::Client::new(), None);

    let result = notifier.notify(&record(BuildStatus::Failure)).await;

    assert!(matches!(
        result,
        Err(DispatchError::MissingCredential {
            destination: Destination::Slack,
            key: "SLACK_WEBHOOK"
        })
    ));
}

#[tokio::test]
async fn test_invalid_webhook_does_not_leak_url() {
    let notifier = SlackNotifier::new(
        reqwest::Client::new(),
        Some(SecretValue::new("hooks.slack.com/secret-path")),
    );

    let error = notifier
        .notify(&record(BuildStatus::Failure))
        .await
        .unwrap_err();

    assert!(matches!(error, DispatchError::InvalidEndpoint { .. }));
    assert!(!error.to_string().contains("secret-path"));
}

#[tokio::test]
async fn test_unreachable_webhook_does_not_leak_url() {
    // Nothing listens on the discard port
    let notifier = SlackNotifier::new(
        reqwest::Client::new(),
        Some(SecretValue::new(
            "http://127.0.0.1:9/services/T000/B000/secret-token",
        )),
    );

    let error = notifier
        .notify(&record(BuildStatus::Failure))
        .await
        .unwrap_err();

    assert!(matches!(error, DispatchError::Transport { .. }));

    let message = crate::NotifierError::from(error).to_string();
    assert!(!message.contains("secret-token"));
    assert!(!message.contains("/services/"));
}
