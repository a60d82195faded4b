//! Tests for destination status maps.

use super::*;

#[test]
fn test_github_map_values() {
    let map = StatusMap::github().unwrap();

    let expected = [
        (BuildStatus::Queued, "pending"),
        (BuildStatus::Working, "pending"),
        (BuildStatus::Success, "success"),
        (BuildStatus::Failure, "failure"),
        (BuildStatus::InternalError, "error"),
        (BuildStatus::Timeout, "error"),
        (BuildStatus::Cancelled, "failure"),
    ];
    for (status, value) in expected {
        assert_eq!(map.lookup(&status).unwrap(), value, "status {}", status);
    }
    assert_eq!(map.destination(), Destination::GitHub);
}

#[test]
fn test_bitbucket_map_values() {
    let map = StatusMap::bitbucket().unwrap();

    let expected = [
        (BuildStatus::Queued, "INPROGRESS"),
        (BuildStatus::Working, "INPROGRESS"),
        (BuildStatus::Success, "SUCCESSFUL"),
        (BuildStatus::Failure, "FAILED"),
        (BuildStatus::InternalError, "FAILED"),
        (BuildStatus::Timeout, "FAILED"),
        (BuildStatus::Cancelled, "STOPPED"),
    ];
    for (status, value) in expected {
        assert_eq!(map.lookup(&status).unwrap(), value, "status {}", status);
    }
}

#[test]
fn test_unknown_status_is_unmapped() {
    let map = StatusMap::github().unwrap();

    let result = map.lookup(&BuildStatus::Other("EXPIRED".to_string()));

    match result {
        Err(DispatchError::UnmappedStatus {
            destination,
            status,
        }) => {
            assert_eq!(destination, Destination::GitHub);
            assert_eq!(status, "EXPIRED");
        }
        other => panic!("Expected UnmappedStatus, got {:?}", other),
    }
}

#[test]
fn test_incomplete_map_fails_at_construction() {
    let result = StatusMap::new(
        Destination::Bitbucket,
        [
            (BuildStatus::Success, "SUCCESSFUL"),
            (BuildStatus::Failure, "FAILED"),
        ],
    );

    match result {
        Err(ConfigError::IncompleteStatusMap {
            destination,
            missing,
        }) => {
            assert_eq!(destination, Destination::Bitbucket);
            assert_eq!(
                missing,
                vec!["QUEUED", "WORKING", "INTERNAL_ERROR", "TIMEOUT", "CANCELLED"]
            );
        }
        other => panic!("Expected IncompleteStatusMap, got {:?}", other),
    }
}

#[test]
fn test_extra_entries_for_unknown_statuses_are_used() {
    let mut entries: Vec<(BuildStatus, &str)> = BuildStatus::KNOWN
        .into_iter()
        .map(|status| (status, "pending"))
        .collect();
    entries.push((BuildStatus::Other("EXPIRED".to_string()), "error"));

    let map = StatusMap::new(Destination::GitHub, entries).unwrap();

    assert_eq!(
        map.lookup(&BuildStatus::Other("EXPIRED".to_string()))
            .unwrap(),
        "error"
    );
}
