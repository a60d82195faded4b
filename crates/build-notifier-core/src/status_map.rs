//! Destination status vocabularies.
//!
//! Each git host has its own set of commit status values. A [`StatusMap`]
//! translates the canonical [`BuildStatus`] into one of them. Maps are checked
//! for completeness when they are built, so a missing entry surfaces at startup
//! rather than in the middle of a dispatch.

use crate::{notifier::Destination, BuildStatus, ConfigError, DispatchError};
use std::collections::HashMap;

/// Total mapping from known build statuses to destination status strings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusMap {
    destination: Destination,
    entries: HashMap<BuildStatus, String>,
}

impl StatusMap {
    /// Build a map, checking that every known status is covered
    ///
    /// Entries for statuses outside [`BuildStatus::KNOWN`] are accepted and
    /// used as-is.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::IncompleteStatusMap`] listing every known status
    /// without an entry.
    pub fn new<I, S>(destination: Destination, entries: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (BuildStatus, S)>,
        S: Into<String>,
    {
        let entries: HashMap<BuildStatus, String> = entries
            .into_iter()
            .map(|(status, value)| (status, value.into()))
            .collect();

        let missing: Vec<String> = BuildStatus::KNOWN
            .into_iter()
            .filter(|status| !entries.contains_key(status))
            .map(String::from)
            .collect();

        if !missing.is_empty() {
            return Err(ConfigError::IncompleteStatusMap {
                destination,
                missing,
            });
        }

        Ok(Self {
            destination,
            entries,
        })
    }

    /// GitHub commit status `state` values
    pub fn github() -> Result<Self, ConfigError> {
        Self::new(
            Destination::GitHub,
            [
                (BuildStatus::Queued, "pending"),
                (BuildStatus::Working, "pending"),
                (BuildStatus::Success, "success"),
                (BuildStatus::Failure, "failure"),
                (BuildStatus::InternalError, "error"),
                (BuildStatus::Timeout, "error"),
                (BuildStatus::Cancelled, "failure"),
            ],
        )
    }

    /// Bitbucket build status `state` values
    pub fn bitbucket() -> Result<Self, ConfigError> {
        Self::new(
            Destination::Bitbucket,
            [
                (BuildStatus::Queued, "INPROGRESS"),
                (BuildStatus::Working, "INPROGRESS"),
                (BuildStatus::Success, "SUCCESSFUL"),
                (BuildStatus::Failure, "FAILED"),
                (BuildStatus::InternalError, "FAILED"),
                (BuildStatus::Timeout, "FAILED"),
                (BuildStatus::Cancelled, "STOPPED"),
            ],
        )
    }

    /// Destination this map translates for
    pub fn destination(&self) -> Destination {
        self.destination
    }

    /// Translate a canonical status
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::UnmappedStatus`] for statuses without an entry,
    /// which is only possible for [`BuildStatus::Other`].
    pub fn lookup(&self, status: &BuildStatus) -> Result<&str, DispatchError> {
        self.entries
            .get(status)
            .map(String::as_str)
            .ok_or_else(|| DispatchError::UnmappedStatus {
                destination: self.destination,
                status: status.to_string(),
            })
    }
}

#[cfg(test)]
#[path = "status_map_tests.rs"]
mod tests;
