//! Bitbucket build status dispatcher.

use super::{endpoint_url, send, Destination, DispatchError, Notifier};
use crate::{
    config::{ConfigError, NotifierConfig, SecretValue},
    extract::NotificationRecord,
    status_map::StatusMap,
};
use async_trait::async_trait;
use serde::Serialize;
use tracing::{info, instrument};

/// Body of `POST /2.0/repositories/{owner}/{repo}/commit/{sha}/statuses/build`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuildStatusRequest {
    pub state: String,
    pub description: String,
    pub url: String,
    pub key: String,
}

/// Posts build statuses through the Bitbucket Cloud 2.0 API
///
/// Authenticates with HTTP Basic credentials made of the account name and an
/// app password.
#[derive(Debug, Clone)]
pub struct BitbucketNotifier {
    client: reqwest::Client,
    api_url: String,
    user: Option<String>,
    token: Option<SecretValue>,
    statuses: StatusMap,
}

impl BitbucketNotifier {
    /// Identifies this integration's status among others on the commit
    pub const KEY: &'static str = "GCP-CLOUD-BUILD";

    pub const TOKEN_KEY: &'static str = "BITBUCKET_ACCESS_TOKEN";
    pub const USER_KEY: &'static str = "BITBUCKET_USER";

    pub fn new(
        client: reqwest::Client,
        api_url: impl Into<String>,
        user: Option<String>,
        token: Option<SecretValue>,
        statuses: StatusMap,
    ) -> Self {
        Self {
            client,
            api_url: api_url.into(),
            user,
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
            config.endpoints.bitbucket_api_url.clone(),
            config.bitbucket_user().map(str::to_string),
            config.bitbucket_token().cloned(),
            StatusMap::bitbucket()?,
        ))
    }

    /// Build the request body for a record
    pub fn status_request(
        &self,
        record: &NotificationRecord,
    ) -> Result<BuildStatusRequest, DispatchError> {
        let state = self.statuses.lookup(record.status())?;

        Ok(BuildStatusRequest {
            state: state.to_string(),
            description: format!("Cloud Build status: {}", record.status()),
            url: record.log_url().to_string(),
            key: Self::KEY.to_string(),
        })
    }
}

#[async_trait]
impl Notifier for BitbucketNotifier {
    fn destination(&self) -> Destination {
        Destination::Bitbucket
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
                destination: Destination::Bitbucket,
                key: Self::TOKEN_KEY,
            })?;
        let user = self
            .user
            .as_deref()
            .filter(|u| !u.is_empty())
            .ok_or(DispatchError::MissingCredential {
                destination: Destination::Bitbucket,
                key: Self::USER_KEY,
            })?;

        let body = self.status_request(record)?;
        let url = endpoint_url(
            Destination::Bitbucket,
            &self.api_url,
            &[
                "2.0",
                "repositories",
                record.owner(),
                record.repo(),
                "commit",
                record.sha().as_str(),
                "statuses",
                "build",
            ],
        )?;

        let request = self
            .client
            .post(url)
            .basic_auth(user, Some(token.expose_secret()))
            .json(&body);

        send(Destination::Bitbucket, request).await?;

        info!(state = %body.state, sha = %record.sha().short(), "Updated Bitbucket build status");
        Ok(())
    }
}

#[cfg(test)]
#[path = "bitbucket_tests.rs"]
mod tests;
