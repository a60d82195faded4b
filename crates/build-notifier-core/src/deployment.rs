//! Deployment-completed announcements.
//!
//! After a cluster deployment finishes, the pipeline posts a Slack message
//! linking to the environments that were just rolled out. Production gets a
//! single link to the root domain; every other namespace gets a branch link
//! and a commit-pinned link.

use crate::{
    config::{ConfigError, NotifierConfig},
    notifier::{
        slack::{SlackAttachment, SlackField, SlackMessage, SlackNotifier},
        DispatchError,
    },
};
use regex::Regex;
use std::sync::OnceLock;
use tracing::{info, instrument};

static NAME_SEPARATORS: OnceLock<Regex> = OnceLock::new();

/// Turn a branch name into a DNS-label friendly namespace
///
/// Lower-cases the name and replaces every run of non-alphanumeric characters
/// with a single `-`.
///
/// ```rust
/// use build_notifier_core::deployment::sanitize_namespace;
///
/// assert_eq!(sanitize_namespace("feature/APU-20_login"), "feature-apu-20-login");
/// ```
pub fn sanitize_namespace(name: &str) -> String {
    let separators =
        NAME_SEPARATORS.get_or_init(|| Regex::new("[^0-9a-zA-Z]+").expect("pattern is valid"));
    separators
        .replace_all(&name.to_lowercase(), "-")
        .into_owned()
}

/// Builds "Cluster Deployment Completed" messages for one cluster
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeploymentAnnouncement {
    domain: String,
    production_namespace: Option<String>,
}

impl DeploymentAnnouncement {
    pub const TITLE: &'static str = "Cluster Deployment Completed";

    pub fn new(domain: impl Into<String>, production_namespace: Option<String>) -> Self {
        Self {
            domain: domain.into(),
            production_namespace,
        }
    }

    /// Create an announcement from the `[deployment]` settings
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] if no domain is configured.
    pub fn from_config(config: &NotifierConfig) -> Result<Self, ConfigError> {
        let domain = config
            .deployment
            .domain
            .as_deref()
            .filter(|d| !d.is_empty())
            .ok_or_else(|| ConfigError::InvalidValue {
                key: "deployment.domain".to_string(),
                message: "required for deployment announcements".to_string(),
            })?;

        Ok(Self::new(
            domain,
            config
                .deployment
                .production_namespace
                .clone()
                .filter(|ns| !ns.is_empty()),
        ))
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    /// Build the message for a deployed namespace and commit
    pub fn message(&self, namespace: &str, commit: &str) -> SlackMessage {
        let namespace = sanitize_namespace(namespace);
        let is_production = !namespace.is_empty()
            && self.production_namespace.as_deref() == Some(namespace.as_str());

        let fields = if is_production {
            vec![link("Production", format!("https://{}", self.domain))]
        } else {
            vec![
                link("Branch", format!("https://{}.{}", namespace, self.domain)),
                link(
                    "Commit",
                    format!("https://{}-{}.{}", commit, namespace, self.domain),
                ),
            ]
        };

        SlackMessage::with_attachment(SlackAttachment {
            title: Self::TITLE.to_string(),
            title_link: None,
            color: "good".to_string(),
            fields,
        })
    }

    /// Send the announcement through a Slack webhook
    #[instrument(skip(self, slack), fields(domain = %self.domain))]
    pub async fn announce(
        &self,
        slack: &SlackNotifier,
        namespace: &str,
        commit: &str,
    ) -> Result<(), DispatchError> {
        slack.send_message(&self.message(namespace, commit)).await?;
        info!("Sent deployment announcement");
        Ok(())
    }
}

fn link(title: &str, url: String) -> SlackField {
    SlackField {
        title: title.to_string(),
        value: url,
        short: false,
    }
}

#[cfg(test)]
#[path = "deployment_tests.rs"]
mod tests;
