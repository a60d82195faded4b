//! Tests for the event decoding module.

use super::*;
use base64::engine::general_purpose::{STANDARD, STANDARD_NO_PAD};
use serde_json::json;

fn sample_build_json() -> serde_json::Value {
    json!({
        "id": "ecec9d77-b929-4707-972c-c4fe2a40bc4c",
        "projectId": "devinsit-personal-projects",
        "status": "WORKING",
        "source": {
            "repoSource": {
                "projectId": "devinsit-personal-projects",
                "repoName": "bitbucket_dsrobo620_kubails",
                "branchName": "KBA-19"
            }
        },
        "steps": [{ "name": "kennethreitz/pipenv", "entrypoint": "bash" }],
        "createTime": "2018-12-14T04:17:23.162340120Z",
        "sourceProvenance": {
            "resolvedRepoSource": {
                "projectId": "devinsit-personal-projects",
                "repoName": "bitbucket_dsrobo620_kubails",
                "commitSha": "ad1ad09c81b6865a6135b38421b7fbe828a77eaa"
            }
        },
        "logUrl": "https://console.cloud.google.com/gcr/builds/ecec9d77?project=26871575867",
        "tags": ["event-a308a8f6", "trigger-daab55ff"]
    })
}

#[test]
fn test_decode_full_build_event() {
    let data = STANDARD.encode(sample_build_json().to_string());

    let event = decode_build_event(&data).unwrap();

    assert_eq!(
        event.id.as_deref(),
        Some("ecec9d77-b929-4707-972c-c4fe2a40bc4c")
    );
    assert_eq!(event.status, Some(BuildStatus::Working));
    assert_eq!(event.repo_name(), Some("bitbucket_dsrobo620_kubails"));
    assert_eq!(event.branch_name(), Some("KBA-19"));
    assert_eq!(
        event.resolved_commit_sha(),
        Some("ad1ad09c81b6865a6135b38421b7fbe828a77eaa")
    );
    assert!(event.log_url.unwrap().starts_with("https://console.cloud.google.com"));
}

#[test]
fn test_decode_accepts_unpadded_and_padded_base64() {
    let body = json!({ "id": "b1", "status": "SUCCESS" }).to_string();

    let padded = decode_build_event(&STANDARD.encode(&body)).unwrap();
    let unpadded = decode_build_event(&STANDARD_NO_PAD.encode(&body)).unwrap();

    assert_eq!(padded, unpadded);
}

#[test]
fn test_decode_trims_surrounding_whitespace() {
    let data = format!("  {}\n", STANDARD.encode(r#"{"id":"b1"}"#));

    let event = decode_build_event(&data).unwrap();
    assert_eq!(event.id.as_deref(), Some("b1"));
}

#[test]
fn test_decode_event_without_provenance() {
    // App Engine deployments create builds with no repository source
    let data = STANDARD.encode(r#"{"id":"b2","status":"SUCCESS","logUrl":"https://x"}"#);

    let event = decode_build_event(&data).unwrap();

    assert!(event.source_provenance.is_none());
    assert_eq!(event.resolved_commit_sha(), None);
    assert_eq!(event.repo_name(), None);
}

#[test]
fn test_empty_commit_sha_is_reported_absent() {
    let data = STANDARD.encode(
        r#"{"sourceProvenance":{"resolvedRepoSource":{"commitSha":""}}}"#,
    );

    let event = decode_build_event(&data).unwrap();
    assert_eq!(event.resolved_commit_sha(), None);
}

#[test]
fn test_decode_rejects_invalid_base64() {
    let result = decode_build_event("not base64 at all!");
    assert!(matches!(result, Err(DecodeError::Base64(_))));
}

#[test]
fn test_decode_rejects_invalid_utf8() {
    let data = STANDARD.encode([0xff, 0xfe, 0xfd]);
    let result = decode_build_event(&data);
    assert!(matches!(result, Err(DecodeError::Utf8(_))));
}

#[test]
fn test_decode_rejects_invalid_json() {
    let data = STANDARD.encode("{\"id\": \"truncated\"");
    let result = decode_build_event(&data);
    assert!(matches!(result, Err(DecodeError::Json { .. })));

    // Valid JSON that is not an object is also rejected
    let data = STANDARD.encode("[1, 2, 3]");
    assert!(matches!(
        decode_build_event(&data),
        Err(DecodeError::Json { .. })
    ));
}

#[test]
fn test_envelope_bare_message() {
    let encoded = STANDARD.encode(r#"{"id":"b3"}"#);
    let document = json!({
        "data": encoded,
        "attributes": { "buildId": "b3", "status": "QUEUED" },
        "messageId": "136969346945",
        "publishTime": "2018-12-14T04:17:23.162Z"
    });

    let message = PubSubMessage::from_json(document.to_string().as_bytes()).unwrap();

    assert_eq!(message.attributes.get("buildId").map(String::as_str), Some("b3"));
    assert_eq!(message.message_id.as_deref(), Some("136969346945"));
    assert!(message.publish_time.is_some());
    assert_eq!(message.decode().unwrap().id.as_deref(), Some("b3"));
}

#[test]
fn test_envelope_push_subscription_form() {
    let encoded = STANDARD.encode(r#"{"id":"b4"}"#);
    let document = json!({
        "message": { "data": encoded, "message_id": "42" },
        "subscription": "projects/p/subscriptions/cloud-builds"
    });

    let message = PubSubMessage::from_json(document.to_string().as_bytes()).unwrap();

    assert_eq!(message.message_id.as_deref(), Some("42"));
    assert_eq!(message.decode().unwrap().id.as_deref(), Some("b4"));
}

#[test]
fn test_envelope_without_data_is_rejected() {
    let result = PubSubMessage::from_json(br#"{"attributes":{}}"#);
    assert!(matches!(result, Err(DecodeError::Envelope { .. })));
}

#[test]
fn test_from_build_event_produces_decodable_message() {
    let event: BuildEvent = serde_json::from_value(sample_build_json()).unwrap();

    let message = PubSubMessage::from_build_event(&event).unwrap();

    assert_eq!(message.decode().unwrap(), event);
}
