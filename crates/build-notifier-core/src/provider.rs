//! Repository identifier parsing.
//!
//! Cloud Build mirrors external repositories into Cloud Source Repositories
//! under a generated name of the form `{provider}_{owner}_{repo}`, for example
//! `github_devinsit_kubails` or `bitbucket_dsrobo620_cookie_test`.
//!
//! The convention is not self-describing. Repository names may themselves
//! contain underscores, so only the first two tokens are unambiguous and the
//! remainder is re-joined as the repository name. Older mirrors used hyphens
//! instead of underscores; because owners and repositories may contain hyphens
//! that form cannot be split reliably and is reported rather than guessed at.
//! Treat the result as best-effort, not authoritative.

use serde::{Deserialize, Serialize};
use std::fmt;

const DELIMITER: char = '_';
const LEGACY_DELIMITER: char = '-';

/// Source hosting provider of a mirrored repository
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GitProvider {
    GitHub,
    Bitbucket,
    /// A provider token this crate cannot deliver to
    Unsupported(String),
}

impl GitProvider {
    /// Map a provider token (case-insensitive)
    pub fn from_token(token: &str) -> Self {
        match token.to_ascii_lowercase().as_str() {
            "github" => Self::GitHub,
            "bitbucket" => Self::Bitbucket,
            other => Self::Unsupported(other.to_string()),
        }
    }

    /// Get the provider token
    pub fn as_str(&self) -> &str {
        match self {
            Self::GitHub => "github",
            Self::Bitbucket => "bitbucket",
            Self::Unsupported(token) => token,
        }
    }

    /// Check whether notifications can be delivered for this provider
    pub fn is_supported(&self) -> bool {
        !matches!(self, Self::Unsupported(_))
    }
}

impl fmt::Display for GitProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Provider, owner and repository parsed from a mirrored repository name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoIdentity {
    pub provider: GitProvider,
    pub owner: String,
    pub repo: String,
}

impl RepoIdentity {
    /// Parse a `{provider}_{owner}_{repo}` identifier
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError::LegacyHyphenConvention`] for identifiers that look
    /// like the old hyphen-delimited form, and
    /// [`ResolveError::UnrecognizedConvention`] when fewer than three non-empty
    /// tokens are present.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use build_notifier_core::{GitProvider, RepoIdentity};
    ///
    /// let identity = RepoIdentity::parse("bitbucket_dsrobo620_cookie_test").unwrap();
    /// assert_eq!(identity.provider, GitProvider::Bitbucket);
    /// assert_eq!(identity.owner, "dsrobo620");
    /// assert_eq!(identity.repo, "cookie_test");
    /// ```
    pub fn parse(identifier: &str) -> Result<Self, ResolveError> {
        if !identifier.contains(DELIMITER) && identifier.contains(LEGACY_DELIMITER) {
            return Err(ResolveError::LegacyHyphenConvention {
                identifier: identifier.to_string(),
            });
        }

        let mut tokens = identifier.splitn(3, DELIMITER);
        let provider = tokens.next().unwrap_or_default();
        let owner = tokens.next().unwrap_or_default();
        let repo = tokens.next().unwrap_or_default();

        if provider.is_empty() || owner.is_empty() || repo.is_empty() {
            return Err(ResolveError::UnrecognizedConvention {
                identifier: identifier.to_string(),
            });
        }

        Ok(Self {
            provider: GitProvider::from_token(provider),
            owner: owner.to_string(),
            repo: repo.to_string(),
        })
    }
}

/// Errors parsing a mirrored repository name
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolveError {
    #[error("Repository identifier '{identifier}' does not follow provider_owner_repo")]
    UnrecognizedConvention { identifier: String },

    #[error("Repository identifier '{identifier}' uses the legacy hyphen-delimited form")]
    LegacyHyphenConvention { identifier: String },
}

#[cfg(test)]
#[path = "provider_tests.rs"]
mod tests;
