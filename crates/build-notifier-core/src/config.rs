//! Process configuration and credentials.
//!
//! All settings are gathered once into a [`NotifierConfig`] and handed to the
//! dispatchers, so nothing below the entry points reads the process
//! environment.
//!
//! Sources, later ones overriding earlier ones:
//!  1. Built-in defaults (every section carries serde defaults)
//!  2. An optional configuration file (format chosen by extension)
//!  3. The credential environment variables listed in
//!     [`NotifierConfig::ENV_KEYS`]
//!
//! Only those variables are read from the environment. Credentials may be
//! absent or malformed at load time; the dispatcher that needs one reports it
//! when asked to deliver.

use crate::{extract::RepoFilter, notifier::Destination};
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use std::path::Path;
use std::time::Duration;
use tracing::debug;
use url::Url;
use zeroize::{Zeroize, ZeroizeOnDrop};

// ============================================================================
// Secret Values
// ============================================================================

/// A credential that must not leak into logs or serialized output
///
/// The buffer is zeroed on drop. `Debug` and `Serialize` only reveal that a
/// value is present.
#[derive(Clone, Deserialize, Zeroize, ZeroizeOnDrop)]
#[serde(transparent)]
pub struct SecretValue {
    inner: String,
}

impl SecretValue {
    /// Wrap a secret
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            inner: value.into(),
        }
    }

    /// Get the secret (only for immediate use)
    pub fn expose_secret(&self) -> &str {
        &self.inner
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Get secret length without exposing content
    pub fn len(&self) -> usize {
        self.inner.len()
    }
}

impl fmt::Debug for SecretValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretValue")
            .field("length", &self.len())
            .field("value", &"[REDACTED]")
            .finish()
    }
}

impl Serialize for SecretValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str("[REDACTED]")
    }
}

// ============================================================================
// Configuration Types
// ============================================================================

/// Complete notifier configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NotifierConfig {
    /// Personal access token used for GitHub commit statuses
    pub github_access_token: Option<SecretValue>,

    /// App password used for Bitbucket build statuses
    pub bitbucket_access_token: Option<SecretValue>,

    /// Account the Bitbucket app password belongs to
    pub bitbucket_user: Option<String>,

    /// Slack incoming webhook URL
    pub slack_webhook: Option<SecretValue>,

    /// Only notify for this repository (`"all"` or unset for every repository)
    pub target_repo: Option<String>,

    /// Outbound HTTP settings
    pub http: HttpSettings,

    /// Destination API base URLs
    pub endpoints: EndpointSettings,

    /// Deployment announcement settings
    pub deployment: DeploymentSettings,
}

/// Outbound HTTP settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpSettings {
    /// Per-request timeout in seconds
    pub timeout_seconds: u64,

    /// User-Agent header sent with every request (GitHub rejects requests without one)
    pub user_agent: String,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            timeout_seconds: 10,
            user_agent: "Cloud Build Notifier".to_string(),
        }
    }
}

impl HttpSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

/// Destination API base URLs
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EndpointSettings {
    pub github_api_url: String,
    pub bitbucket_api_url: String,
}

impl Default for EndpointSettings {
    fn default() -> Self {
        Self {
            github_api_url: "https://api.github.com".to_string(),
            bitbucket_api_url: "https://api.bitbucket.org".to_string(),
        }
    }
}

/// Cluster details used by deployment announcements
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DeploymentSettings {
    /// Root domain the cluster serves
    pub domain: Option<String>,

    /// Namespace that serves the root domain directly
    pub production_namespace: Option<String>,
}

impl NotifierConfig {
    /// Environment variables read by [`NotifierConfig::load`]
    pub const ENV_KEYS: [&'static str; 5] = [
        "GITHUB_ACCESS_TOKEN",
        "BITBUCKET_ACCESS_TOKEN",
        "BITBUCKET_USER",
        "SLACK_WEBHOOK",
        "TARGET_REPO",
    ];

    /// Load configuration from an optional file and the process environment
    pub fn load(file: Option<&Path>) -> Result<Self, ConfigError> {
        let env = std::env::vars_os()
            .filter_map(|(key, value)| Some((key.into_string().ok()?, value.into_string().ok()?)));
        Self::load_with_env(file, env)
    }

    /// Load configuration from an optional file and the given variables
    ///
    /// Variables not listed in [`NotifierConfig::ENV_KEYS`] are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file is missing or malformed, a value has
    /// the wrong type, or the result fails [`NotifierConfig::validate`].
    pub fn load_with_env<I>(file: Option<&Path>, env: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut builder = ::config::Config::builder();

        if let Some(path) = file {
            debug!(path = %path.display(), "Loading configuration file");
            builder = builder.add_source(::config::File::from(path).required(true));
        }

        let variables: ::config::Map<String, String> = env
            .into_iter()
            .filter(|(key, _)| Self::ENV_KEYS.contains(&key.as_str()))
            .map(|(key, value)| (key.to_lowercase(), value))
            .collect();

        let config: Self = builder
            .add_source(::config::Environment::default().source(Some(variables)))
            .build()?
            .try_deserialize()?;

        config.validate()?;
        Ok(config)
    }

    /// Check settings that cannot be expressed in the type
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.http.timeout_seconds == 0 {
            return Err(ConfigError::InvalidValue {
                key: "http.timeout_seconds".to_string(),
                message: "must be greater than zero".to_string(),
            });
        }

        check_url("endpoints.github_api_url", &self.endpoints.github_api_url)?;
        check_url(
            "endpoints.bitbucket_api_url",
            &self.endpoints.bitbucket_api_url,
        )?;

        Ok(())
    }

    /// GitHub token, if configured and non-empty
    pub fn github_token(&self) -> Option<&SecretValue> {
        non_empty(self.github_access_token.as_ref())
    }

    /// Bitbucket app password, if configured and non-empty
    pub fn bitbucket_token(&self) -> Option<&SecretValue> {
        non_empty(self.bitbucket_access_token.as_ref())
    }

    /// Bitbucket account name, if configured and non-empty
    pub fn bitbucket_user(&self) -> Option<&str> {
        self.bitbucket_user.as_deref().filter(|u| !u.is_empty())
    }

    /// Slack webhook URL, if configured and non-empty
    pub fn slack_webhook(&self) -> Option<&SecretValue> {
        non_empty(self.slack_webhook.as_ref())
    }

    /// Repository filter derived from `target_repo`
    pub fn repo_filter(&self) -> RepoFilter {
        RepoFilter::from_target(self.target_repo.as_deref())
    }

    /// Build the HTTP client shared by every dispatcher
    pub fn build_http_client(&self) -> Result<reqwest::Client, ConfigError> {
        reqwest::Client::builder()
            .timeout(self.http.timeout())
            .user_agent(self.http.user_agent.clone())
            .build()
            .map_err(ConfigError::HttpClient)
    }
}

fn non_empty(secret: Option<&SecretValue>) -> Option<&SecretValue> {
    secret.filter(|s| !s.is_empty())
}

fn check_url(key: &str, value: &str) -> Result<(), ConfigError> {
    Url::parse(value)
        .map(|_| ())
        .map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            message: format!("not a valid URL: {}", e),
        })
}

// ============================================================================
// Error Types
// ============================================================================

/// Errors detected while building configuration, before any event is handled
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] ::config::ConfigError),

    #[error("Status map for {destination} has no entry for: {}", .missing.join(", "))]
    IncompleteStatusMap {
        destination: Destination,
        missing: Vec<String>,
    },

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    #[error("Failed to build HTTP client: {0}")]
    HttpClient(#[source] reqwest::Error),
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
