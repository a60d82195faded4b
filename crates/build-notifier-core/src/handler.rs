//! Entry points consuming Pub/Sub messages.
//!
//! A [`BuildEventHandler`] ties together the pipeline for one trigger:
//! decode the envelope, extract a [`NotificationRecord`] under the trigger's
//! policy, pick the notifier and deliver. Handlers hold only read-only state,
//! so one instance can serve concurrent invocations.
//!
//! Two triggers exist:
//! - [`Trigger::GitHost`] updates commit statuses on GitHub or Bitbucket for
//!   every known status
//! - [`Trigger::SlackFailure`] posts a Slack alert for failure-class statuses

use crate::{
    config::{ConfigError, NotifierConfig},
    event::{BuildEvent, PubSubMessage},
    extract::{extract_notification, NotificationRecord, RepoFilter, StatusWhitelist},
    notifier::{
        bitbucket::BitbucketNotifier, github::GithubNotifier, slack::SlackNotifier, Destination,
        Notifier,
    },
    provider::GitProvider,
    NotifierError,
};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

/// Which subscriber an invocation serves
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Trigger {
    GitHost,
    SlackFailure,
}

impl Trigger {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::GitHost => "git-host",
            Self::SlackFailure => "slack-failure",
        }
    }
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// How a record is matched to a notifier
#[derive(Clone)]
pub enum Route {
    /// Pick the notifier registered for the record's provider
    ByProvider(HashMap<GitProvider, Arc<dyn Notifier>>),
    /// Send every record to one notifier
    Fixed(Arc<dyn Notifier>),
}

impl Route {
    /// Notifier responsible for a record, if any
    pub fn select(&self, record: &NotificationRecord) -> Option<&Arc<dyn Notifier>> {
        match self {
            Self::ByProvider(notifiers) => notifiers.get(record.provider()),
            Self::Fixed(notifier) => Some(notifier),
        }
    }
}

impl fmt::Debug for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ByProvider(notifiers) => {
                let mut map = f.debug_map();
                for (provider, notifier) in notifiers {
                    map.entry(&provider.as_str(), &notifier.destination());
                }
                map.finish()
            }
            Self::Fixed(notifier) => f.debug_tuple("Fixed").field(&notifier.destination()).finish(),
        }
    }
}

/// Result of handling one message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandleOutcome {
    /// The event did not warrant a notification
    Skipped,
    /// One notification was delivered
    Delivered { destination: Destination },
}

/// Pipeline for one trigger
#[derive(Debug, Clone)]
pub struct BuildEventHandler {
    trigger: Trigger,
    whitelist: StatusWhitelist,
    repo_filter: RepoFilter,
    route: Route,
}

impl BuildEventHandler {
    pub fn new(
        trigger: Trigger,
        whitelist: StatusWhitelist,
        repo_filter: RepoFilter,
        route: Route,
    ) -> Self {
        Self {
            trigger,
            whitelist,
            repo_filter,
            route,
        }
    }

    /// Commit status updates for every known status
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if a destination status map is incomplete.
    pub fn git_host(config: &NotifierConfig, client: reqwest::Client) -> Result<Self, ConfigError> {
        let github: Arc<dyn Notifier> =
            Arc::new(GithubNotifier::from_config(config, client.clone())?);
        let bitbucket: Arc<dyn Notifier> =
            Arc::new(BitbucketNotifier::from_config(config, client)?);

        let notifiers = HashMap::from([
            (GitProvider::GitHub, github),
            (GitProvider::Bitbucket, bitbucket),
        ]);

        Ok(Self::new(
            Trigger::GitHost,
            StatusWhitelist::actionable(),
            config.repo_filter(),
            Route::ByProvider(notifiers),
        ))
    }

    /// Slack alerts for failure-class statuses
    pub fn slack_failure(
        config: &NotifierConfig,
        client: reqwest::Client,
    ) -> Result<Self, ConfigError> {
        let slack: Arc<dyn Notifier> = Arc::new(SlackNotifier::from_config(config, client));

        Ok(Self::new(
            Trigger::SlackFailure,
            StatusWhitelist::failures(),
            config.repo_filter(),
            Route::Fixed(slack),
        ))
    }

    pub fn trigger(&self) -> Trigger {
        self.trigger
    }

    /// Handle one Pub/Sub message
    ///
    /// # Errors
    ///
    /// Returns [`NotifierError`] if the payload cannot be decoded, the event is
    /// malformed, or delivery fails. Filtered events are `Ok(Skipped)`.
    #[instrument(
        skip(self, message),
        fields(trigger = %self.trigger, message_id = message.message_id.as_deref().unwrap_or(""))
    )]
    pub async fn handle(&self, message: &PubSubMessage) -> Result<HandleOutcome, NotifierError> {
        let event = message.decode().map_err(|e| {
            error!(error = %e, "Failed to decode build event");
            NotifierError::from(e)
        })?;

        self.handle_event(&event).await
    }

    /// Handle an already decoded build event
    pub async fn handle_event(&self, event: &BuildEvent) -> Result<HandleOutcome, NotifierError> {
        let Some(record) = extract_notification(event, &self.whitelist, &self.repo_filter)? else {
            debug!(build_id = event.id.as_deref().unwrap_or("<none>"), "No notification needed");
            return Ok(HandleOutcome::Skipped);
        };

        let Some(notifier) = self.route.select(&record) else {
            warn!(
                build_id = %record.id(),
                provider = %record.provider(),
                "No notifier registered for provider"
            );
            return Ok(HandleOutcome::Skipped);
        };

        let destination = notifier.destination();
        if let Err(e) = notifier.notify(&record).await {
            error!(
                build_id = %record.id(),
                destination = %destination,
                error = %e,
                category = ?e.error_category(),
                "Notification delivery failed"
            );
            return Err(e.into());
        }

        info!(
            build_id = %record.id(),
            destination = %destination,
            status = %record.status(),
            "Notification delivered"
        );
        Ok(HandleOutcome::Delivered { destination })
    }
}

#[cfg(test)]
#[path = "handler_tests.rs"]
mod tests;
