//! Error handling for release publishing
//!
//! This module provides the error type shared by every component, with
//! recovery guidance, using the thiserror crate for ergonomic error handling.

use thiserror::Error;

/// Broad category of a [`PublishError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Configuration,
    Input,
    Filesystem,
    Network,
    Api,
    Internal,
}

/// Main error type for release publishing operations
#[derive(Error, Debug)]
pub enum PublishError {
    // Configuration errors
    #[error("GITHUB_TOKEN environment variable is not set")]
    TokenMissing,

    #[error("invalid format used for owner and repository: {value} (expected owner/repo)")]
    InvalidRepository { value: String },

    #[error("invalid value for {name}: {value}")]
    InvalidSetting { name: String, value: String },

    #[error("invalid release: {message}")]
    InvalidRelease { message: String },

    // Input errors
    #[error("invalid glob pattern {pattern}: {message}")]
    InvalidPattern { pattern: String, message: String },

    // Filesystem errors
    #[error("cannot read {path}: {message}")]
    FileAccess { path: String, message: String },

    // Network errors
    #[error("network error while requesting {url}: {message}")]
    NetworkError { url: String, message: String },

    #[error("request to {url} timed out")]
    TimeoutError { url: String },

    // API errors
    #[error("GitHub returned an error:\n Code: {status}.\n Body: {body}")]
    ApiError { status: String, code: u16, body: String },

    #[error("unexpected response from GitHub: {message}")]
    MalformedResponse { message: String },

    // Internal errors
    #[error("invalid publication state transition: {from} -> {to}")]
    InvalidTransition { from: String, to: String },

    #[error("upload task failed: {message}")]
    TaskFailed { message: String },
}

impl PublishError {
    /// Status code GitHub answers with when a release already exists for a tag
    pub const RELEASE_CONFLICT_STATUS: u16 = 422;

    /// Get the category of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::TokenMissing
            | Self::InvalidRepository { .. }
            | Self::InvalidSetting { .. }
            | Self::InvalidRelease { .. } => ErrorKind::Configuration,
            Self::InvalidPattern { .. } => ErrorKind::Input,
            Self::FileAccess { .. } => ErrorKind::Filesystem,
            Self::NetworkError { .. } | Self::TimeoutError { .. } => ErrorKind::Network,
            Self::ApiError { .. } | Self::MalformedResponse { .. } => ErrorKind::Api,
            Self::InvalidTransition { .. } | Self::TaskFailed { .. } => ErrorKind::Internal,
        }
    }

    /// Check if this error must stop the run before any network activity
    pub fn is_fatal(&self) -> bool {
        matches!(self.kind(), ErrorKind::Configuration | ErrorKind::Input)
    }

    /// Check if this error signals that the release already exists
    pub fn is_release_conflict(&self) -> bool {
        matches!(
            self,
            Self::ApiError { code, .. } if *code == Self::RELEASE_CONFLICT_STATUS
        )
    }

    /// HTTP status code for API errors
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::ApiError { code, .. } => Some(*code),
            _ => None,
        }
    }

    /// Get suggested actions for this error
    pub fn suggested_actions(&self) -> Vec<&'static str> {
        match self {
            Self::TokenMissing => vec![
                "Set GITHUB_TOKEN to a token allowed to create releases",
                "See https://help.github.com/articles/creating-an-access-token-for-command-line-use/",
            ],
            Self::InvalidRepository { .. } => {
                vec!["Pass the repository as owner/repo, e.g. octocat/Hello-World"]
            }
            Self::InvalidSetting { .. } => vec!["Check the environment variables and flags"],
            Self::InvalidRelease { .. } => vec!["Provide a non-empty release tag"],
            Self::InvalidPattern { .. } => vec![
                "Check the glob pattern syntax",
                "Quote the pattern so the shell does not expand it",
            ],
            Self::FileAccess { .. } => vec![
                "Check that the file exists and is readable",
                "Directories cannot be uploaded as assets",
            ],
            Self::NetworkError { .. } => vec![
                "Check your internet connection",
                "Check GITHUB_API if you use a GitHub Enterprise endpoint",
            ],
            Self::TimeoutError { .. } => vec![
                "Increase the timeout with --timeout or GITHUB_RELEASE_TIMEOUT",
                "Check your network environment",
            ],
            Self::ApiError { code: 401, .. } | Self::ApiError { code: 403, .. } => vec![
                "Check that GITHUB_TOKEN is valid",
                "Check that the token has the repo scope",
            ],
            Self::ApiError { code: 404, .. } => vec![
                "Check the owner/repo spelling",
                "Check that the token can access the repository",
            ],
            Self::ApiError { .. } => vec!["Check the response body returned by GitHub"],
            Self::MalformedResponse { .. } => vec!["Check GITHUB_API points at a GitHub API"],
            Self::InvalidTransition { .. } | Self::TaskFailed { .. } => {
                vec!["Run again with DEBUG=1 and report the output"]
            }
        }
    }

    /// Get error code for this error
    pub fn code(&self) -> &'static str {
        match self {
            Self::TokenMissing => "TOKEN_MISSING",
            Self::InvalidRepository { .. } => "INVALID_REPOSITORY",
            Self::InvalidSetting { .. } => "INVALID_SETTING",
            Self::InvalidRelease { .. } => "INVALID_RELEASE",
            Self::InvalidPattern { .. } => "INVALID_PATTERN",
            Self::FileAccess { .. } => "FILE_ACCESS",
            Self::NetworkError { .. } => "NETWORK_ERROR",
            Self::TimeoutError { .. } => "TIMEOUT_ERROR",
            Self::ApiError { .. } => "API_ERROR",
            Self::MalformedResponse { .. } => "MALFORMED_RESPONSE",
            Self::InvalidTransition { .. } => "INVALID_TRANSITION",
            Self::TaskFailed { .. } => "TASK_FAILED",
        }
    }

    /// Build a filesystem error for `path`
    pub(crate) fn file_access(path: impl AsRef<std::path::Path>, err: impl std::fmt::Display) -> Self {
        Self::FileAccess {
            path: path.as_ref().display().to_string(),
            message: err.to_string(),
        }
    }

    /// Classify a transport failure
    pub(crate) fn from_transport(url: &str, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::TimeoutError {
                url: url.to_string(),
            }
        } else {
            Self::NetworkError {
                url: url.to_string(),
                message: err.to_string(),
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, PublishError>;
