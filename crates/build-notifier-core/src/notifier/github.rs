//! GitHub commit status dispatcher.

use super::{endpoint_url, send, Destination, DispatchError, Notifier};
use crate::{
    config::{ConfigError, NotifierConfig, SecretValue},
    extract::NotificationRecord,
    status_map::StatusMap,
};
use async_trait::async_trait;
use reqwest::header::ACCEPT;
use serde::Serialize;
use tracing::{info, instrument};

/// Body of `POST /repos/{owner}/{repo}/statuses/{sha}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommitStatusRequest {
    pub state: String,
    pub description: String,
    pub target_url: String,
    pub context: String,
}

/// Posts commit statuses through the GitHub REST API
#[derive(Debug, Clone)]
pub struct GithubNotifier {
    client: reqwest::Client,
    api_url: String,
    token: Option<SecretValue>,
    statuses: StatusMap,
}

impl GithubNotifier {
    /// Status context shown next to the commit
    pub const CONTEXT: &'static str = "GCP Cloud Build";

    /// Environment key holding the access token
    pub const TOKEN_KEY: &'static str = "GITHUB_ACCESS_TOKEN";

    pub fn new(
        client: reqwest::Client,
        api_url: impl Into<String>,
        token: Option<SecretValue>,
        statuses: StatusMap,
    ) -> Self {
        Self {
            client,
            api_url: api_url.into(),
            token,
            statuses,
        }
    }

    /// Create a notifier from loaded configuration
    pub fn from_config(
        config: &NotifierConfig,
        client: reqwest::Client,
    ) -> Result<Self, ConfigError> {
        Ok(Self::new(
            client,
            config.endpoints.github_api_url.clone(),
            config.github_token().cloned(),
            StatusMap::github()?,
        ))
    }

    /// Build the request body for a record
    pub fn status_request(
        &self,
        record: &NotificationRecord,
    ) -> Result<CommitStatusRequest, DispatchError> {
        let state = self.statuses.lookup(record.status())?;

        Ok(CommitStatusRequest {
            state: state.to_string(),
            description: format!("Cloud Build status: {}", record.status()),
            target_url: record.log_url().to_string(),
            context: Self::CONTEXT.to_string(),
        })
    }
}

#[async_trait]
impl Notifier for GithubNotifier {
    fn destination(&self) -> Destination {
        Destination::GitHub
    }

    #[instrument(
        skip(self, record),
        fields(build_id = %record.id(), status = %record.status(), repo = %record.repo())
    )]
    async fn notify(&self, record: &NotificationRecord) -> Result<(), DispatchError> {
        let token = self
            .token
            .as_ref()
            .filter(|t| !t.is_empty())
            .ok_or(DispatchError::MissingCredential {
                destination: Destination::GitHub,
                key: Self::TOKEN_KEY,
            })?;

        let body = self.status_request(record)?;
        let url = endpoint_url(
            Destination::GitHub,
            &self.api_url,
            &[
                "repos",
                record.owner(),
                record.repo(),
                "statuses",
                record.sha().as_str(),
            ],
        )?;

        let request = self
            .client
            .post(url)
            .bearer_auth(token.expose_secret())
            .header(ACCEPT, "application/vnd.github+json")
            .json(&body);

        send(Destination::GitHub, request).await?;

        info!(state = %body.state, sha = %record.sha().short(), "Updated GitHub commit status");
        Ok(())
    }
}

#[cfg(test)]
#[path = "github_tests.rs"]
mod tests;
