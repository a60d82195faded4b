//! Slack incoming webhook dispatcher.
//!
//! Slack is not a status destination: the canonical status is reported
//! verbatim inside a formatted message, so no status map applies.

use super::{send, Destination, DispatchError, Notifier};
use crate::{
    config::{NotifierConfig, SecretValue},
    extract::NotificationRecord,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use url::Url;

// ============================================================================
// Message Types
// ============================================================================

/// Webhook payload using legacy attachments
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlackMessage {
    pub mrkdwn: bool,
    pub attachments: Vec<SlackAttachment>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlackAttachment {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title_link: Option<String>,
    /// `good`, `warning`, `danger` or a hex colour
    pub color: String,
    #[serde(default)]
    pub fields: Vec<SlackField>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlackField {
    pub title: String,
    pub value: String,
    pub short: bool,
}

impl SlackField {
    /// Field rendered side by side with its neighbour
    pub fn short(title: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            value: value.into(),
            short: true,
        }
    }
}

impl SlackMessage {
    /// Message with a single attachment
    pub fn with_attachment(attachment: SlackAttachment) -> Self {
        Self {
            mrkdwn: true,
            attachments: vec![attachment],
        }
    }

    /// Failure alert for a build
    pub fn build_failure(record: &NotificationRecord) -> Self {
        Self::with_attachment(SlackAttachment {
            title: format!("Build `{}`", record.id()),
            title_link: Some(record.log_url().to_string()),
            color: "danger".to_string(),
            fields: vec![
                SlackField::short("Status", record.status().as_str()),
                SlackField::short("Repo", record.repo()),
                SlackField::short("Branch", record.branch()),
                SlackField::short("Commit", record.sha().short()),
            ],
        })
    }
}

// ============================================================================
// Notifier
// ============================================================================

/// Posts messages to a Slack incoming webhook
#[derive(Debug, Clone)]
pub struct SlackNotifier {
    client: reqwest::Client,
    webhook: Option<SecretValue>,
}

impl SlackNotifier {
    pub const WEBHOOK_KEY: &'static str = "SLACK_WEBHOOK";

    pub fn new(client: reqwest::Client, webhook: Option<SecretValue>) -> Self {
        Self { client, webhook }
    }

    /// Create a notifier from loaded configuration
    pub fn from_config(config: &NotifierConfig, client: reqwest::Client) -> Self {
        Self::new(client, config.slack_webhook().cloned())
    }

    /// Post an arbitrary message to the webhook
    pub async fn send_message(&self, message: &SlackMessage) -> Result<(), DispatchError> {
        let webhook = self
            .webhook
            .as_ref()
            .filter(|w| !w.is_empty())
            .ok_or(DispatchError::MissingCredential {
                destination: Destination::Slack,
                key: Self::WEBHOOK_KEY,
            })?;

        // The webhook URL is itself the credential and never appears in errors
        let url =
            Url::parse(webhook.expose_secret()).map_err(|e| DispatchError::InvalidEndpoint {
                destination: Destination::Slack,
                message: format!("{} is not a valid URL: {}", Self::WEBHOOK_KEY, e),
            })?;

        send(Destination::Slack, self.client.post(url).json(message)).await
    }
}

#[async_trait]
impl Notifier for SlackNotifier {
    fn destination(&self) -> Destination {
        Destination::Slack
    }

    #[instrument(
        skip(self, record),
        fields(build_id = %record.id(), status = %record.status(), repo = %record.repo())
    )]
    async fn notify(&self, record: &NotificationRecord) -> Result<(), DispatchError> {
        self.send_message(&SlackMessage::build_failure(record))
            .await?;

        info!("Sent Slack build failure alert");
        Ok(())
    }
}

#[cfg(test)]
#[path = "slack_tests.rs"]
mod tests;
