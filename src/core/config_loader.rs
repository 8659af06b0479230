//! Configuration loader for the release publisher
//!
//! Builds a [`PublisherConfig`] from command-line values and an explicit
//! environment map.

use super::config::*;
use crate::core::error::PublishError;
use crate::security::SecureTokenManager;
use std::collections::HashMap;
use std::time::Duration;

pub const USER_ENV_VAR: &str = "GITHUB_USER";
pub const REPO_ENV_VAR: &str = "GITHUB_REPO";
pub const API_ENV_VAR: &str = "GITHUB_API";
pub const DEBUG_ENV_VAR: &str = "DEBUG";
pub const TIMEOUT_ENV_VAR: &str = "GITHUB_RELEASE_TIMEOUT";

/// Configuration load options
#[derive(Debug, Clone, Default)]
pub struct ConfigLoadOptions {
    /// `owner/repo` as given on the command line
    pub repository: String,

    /// Per-request timeout in seconds from the command line (highest priority)
    pub timeout_secs: Option<u64>,

    /// Upload concurrency from the command line
    pub max_concurrency: Option<usize>,

    /// Environment variables
    pub env: HashMap<String, String>,
}

impl ConfigLoadOptions {
    /// Options backed by the process environment
    pub fn from_process_env(repository: impl Into<String>) -> Self {
        Self {
            repository: repository.into(),
            env: std::env::vars().collect(),
            ..Default::default()
        }
    }
}

/// Configuration loader
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration
    ///
    /// Priority (high to low):
    /// 1. CLI arguments
    /// 2. Environment variables
    /// 3. Default values
    ///
    /// `GITHUB_USER` / `GITHUB_REPO` override the respective half of the
    /// repository argument.
    pub fn load(options: ConfigLoadOptions) -> Result<PublisherConfig, PublishError> {
        let env = &options.env;

        let mut repository: RepoSlug = options.repository.parse()?;
        if let Some(owner) = Self::non_empty(env, USER_ENV_VAR) {
            repository.owner = owner.to_string();
        }
        if let Some(repo) = Self::non_empty(env, REPO_ENV_VAR) {
            repository.repo = repo.to_string();
        }

        let token = SecureTokenManager::from_env(env).ok_or(PublishError::TokenMissing)?;

        let mut config = PublisherConfig::new(repository, token);

        if let Some(api_base) = Self::non_empty(env, API_ENV_VAR) {
            config.api_base = api_base.trim_end_matches('/').to_string();
        }

        config.debug = env
            .get(DEBUG_ENV_VAR)
            .map(|value| Self::parse_bool(value).unwrap_or(false))
            .unwrap_or(false);

        let timeout_secs = match options.timeout_secs {
            Some(secs) => Some(secs),
            None => Self::non_empty(env, TIMEOUT_ENV_VAR)
                .map(|value| {
                    value.parse::<u64>().map_err(|_| PublishError::InvalidSetting {
                        name: TIMEOUT_ENV_VAR.to_string(),
                        value: value.to_string(),
                    })
                })
                .transpose()?,
        };
        if let Some(secs) = timeout_secs {
            config.request_timeout = (secs > 0).then(|| Duration::from_secs(secs));
        }

        if let Some(max_concurrency) = options.max_concurrency {
            if max_concurrency == 0 {
                return Err(PublishError::InvalidSetting {
                    name: "max-concurrency".to_string(),
                    value: "0".to_string(),
                });
            }
            config.max_concurrency = max_concurrency;
        }

        Ok(config)
    }

    /// Parse a boolean the way `DEBUG=1` / `DEBUG=true` are usually written
    ///
    /// Accepts `1, t, T, TRUE, true, True, 0, f, F, FALSE, false, False`.
    pub fn parse_bool(value: &str) -> Option<bool> {
        match value.trim() {
            "1" | "t" | "T" | "TRUE" | "true" | "True" => Some(true),
            "0" | "f" | "F" | "FALSE" | "false" | "False" => Some(false),
            _ => None,
        }
    }

    fn non_empty<'a>(env: &'a HashMap<String, String>, name: &str) -> Option<&'a str> {
        env.get(name)
            .map(|value| value.trim())
            .filter(|value| !value.is_empty())
    }
}
