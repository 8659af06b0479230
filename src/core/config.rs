//! Configuration types for release publishing
//!
//! The configuration is built once by [`ConfigLoader`](super::config_loader::ConfigLoader)
//! and then shared read-only by every component.

use crate::core::error::PublishError;
use crate::security::SecureTokenManager;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Default GitHub API endpoint
pub const DEFAULT_API_BASE: &str = "https://api.github.com";

/// Default per-request timeout
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(300);

/// Default number of uploads in flight
pub const DEFAULT_MAX_CONCURRENCY: usize = 4;

/// Repository identifier in `owner/repo` form
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoSlug {
    pub owner: String,
    pub repo: String,
}

impl RepoSlug {
    pub fn new(owner: impl Into<String>, repo: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            repo: repo.into(),
        }
    }
}

impl FromStr for RepoSlug {
    type Err = PublishError;

    /// Parse `owner/repo`
    ///
    /// # Examples
    ///
    /// ```
    /// use release_publisher::core::RepoSlug;
    ///
    /// let slug: RepoSlug = "octocat/Hello-World".parse().unwrap();
    /// assert_eq!(slug.owner, "octocat");
    /// assert!("octocat".parse::<RepoSlug>().is_err());
    /// ```
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split('/').collect();
        match parts.as_slice() {
            [owner, repo] if !owner.trim().is_empty() && !repo.trim().is_empty() => {
                Ok(Self::new(owner.trim(), repo.trim()))
            }
            _ => Err(PublishError::InvalidRepository {
                value: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for RepoSlug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.repo)
    }
}

/// Immutable configuration shared by the requester, resolver and uploader
#[derive(Debug)]
pub struct PublisherConfig {
    /// Target repository
    pub repository: RepoSlug,

    /// API base endpoint without trailing slash
    pub api_base: String,

    /// Access token
    pub token: SecureTokenManager,

    /// Trace every request and response
    pub debug: bool,

    /// Per-request timeout (`None` disables it)
    pub request_timeout: Option<Duration>,

    /// Maximum uploads in flight
    pub max_concurrency: usize,
}

impl PublisherConfig {
    /// Configuration with default endpoint, timeout and concurrency
    pub fn new(repository: RepoSlug, token: SecureTokenManager) -> Self {
        Self {
            repository,
            api_base: DEFAULT_API_BASE.to_string(),
            token,
            debug: false,
            request_timeout: Some(DEFAULT_REQUEST_TIMEOUT),
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
        }
    }

    /// `<api>/repos/{owner}/{repo}`
    pub fn repository_endpoint(&self) -> String {
        format!(
            "{}/repos/{}/{}",
            self.api_base, self.repository.owner, self.repository.repo
        )
    }

    /// Release creation endpoint
    pub fn releases_endpoint(&self) -> String {
        format!("{}/releases", self.repository_endpoint())
    }

    /// Release lookup endpoint for `tag`, with the tag percent-encoded
    pub fn release_by_tag_endpoint(&self, tag: &str) -> Result<String, PublishError> {
        let invalid = || PublishError::InvalidSetting {
            name: "GITHUB_API".to_string(),
            value: self.api_base.clone(),
        };

        let mut url = reqwest::Url::parse(&self.releases_endpoint()).map_err(|_| invalid())?;
        url.path_segments_mut()
            .map_err(|_| invalid())?
            .push("tags")
            .push(tag);

        Ok(url.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> PublisherConfig {
        PublisherConfig::new(
            RepoSlug::new("octocat", "Hello-World"),
            SecureTokenManager::new("token"),
        )
    }

    #[test]
    fn test_repo_slug_parse() {
        let slug: RepoSlug = "octocat/Hello-World".parse().unwrap();
        assert_eq!(slug, RepoSlug::new("octocat", "Hello-World"));
        assert_eq!(slug.to_string(), "octocat/Hello-World");
    }

    #[test]
    fn test_repo_slug_rejects_malformed_values() {
        for value in ["", "octocat", "octocat/", "/repo", "a/b/c"] {
            let err = value.parse::<RepoSlug>().unwrap_err();
            assert_eq!(err.code(), "INVALID_REPOSITORY", "{value:?} should be rejected");
        }
    }

    #[test]
    fn test_defaults() {
        let config = config();

        assert_eq!(config.api_base, DEFAULT_API_BASE);
        assert!(!config.debug);
        assert_eq!(config.request_timeout, Some(DEFAULT_REQUEST_TIMEOUT));
        assert_eq!(config.max_concurrency, DEFAULT_MAX_CONCURRENCY);
    }

    #[test]
    fn test_endpoints() {
        let config = config();

        assert_eq!(
            config.releases_endpoint(),
            "https://api.github.com/repos/octocat/Hello-World/releases"
        );
        assert_eq!(
            config.release_by_tag_endpoint("v1.0.0").unwrap(),
            "https://api.github.com/repos/octocat/Hello-World/releases/tags/v1.0.0"
        );
    }

    #[test]
    fn test_tag_endpoint_encodes_tag() {
        let config = config();

        assert_eq!(
            config.release_by_tag_endpoint("release/1.0").unwrap(),
            "https://api.github.com/repos/octocat/Hello-World/releases/tags/release%2F1.0"
        );
    }

    #[test]
    fn test_tag_endpoint_rejects_invalid_api_base() {
        let mut config = config();
        config.api_base = "not a url".to_string();

        let err = config.release_by_tag_endpoint("v1.0.0").unwrap_err();
        assert_eq!(err.code(), "INVALID_SETTING");
    }
}
