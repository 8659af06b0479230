//! Core traits and types for release publishing
//!
//! This module defines the release and asset data model and the
//! [`ReleaseHost`] abstraction the orchestrator publishes through.

use crate::core::error::{PublishError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

// ============================================================================
// Release
// ============================================================================

/// Description of the release to publish
///
/// Serializes to the release-creation payload expected by the hosting API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReleaseSpec {
    #[serde(rename = "tag_name")]
    tag: String,
    #[serde(rename = "target_commitish")]
    target: String,
    name: String,
    body: String,
    draft: bool,
    prerelease: bool,
}

impl ReleaseSpec {
    /// Create a release spec for `tag` cut from `target`
    ///
    /// The title defaults to the tag.
    ///
    /// # Examples
    ///
    /// ```
    /// use release_publisher::core::ReleaseSpec;
    ///
    /// let spec = ReleaseSpec::new("v1.0.0", "main").unwrap().with_body("first");
    /// assert_eq!(spec.title(), "v1.0.0");
    /// assert!(!spec.is_draft());
    /// ```
    pub fn new(tag: impl Into<String>, target: impl Into<String>) -> Result<Self> {
        let tag = tag.into();
        if tag.trim().is_empty() {
            return Err(PublishError::InvalidRelease {
                message: "tag must not be empty".to_string(),
            });
        }

        Ok(Self {
            name: tag.clone(),
            tag,
            target: target.into(),
            body: String::new(),
            draft: false,
            prerelease: false,
        })
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.name = title.into();
        self
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    pub fn draft(mut self, draft: bool) -> Self {
        self.draft = draft;
        self
    }

    pub fn prerelease(mut self, prerelease: bool) -> Self {
        self.prerelease = prerelease;
        self
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn title(&self) -> &str {
        &self.name
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    pub fn is_draft(&self) -> bool {
        self.draft
    }

    pub fn is_prerelease(&self) -> bool {
        self.prerelease
    }
}

/// Release as returned by the hosting API
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ReleaseRecord {
    #[serde(default)]
    pub id: Option<u64>,
    #[serde(default)]
    pub html_url: Option<String>,
    /// Upload endpoint template, e.g. `https://uploads.github.com/repos/o/r/releases/1/assets{?name,label}`
    #[serde(default)]
    pub upload_url: Option<String>,
    pub tag_name: String,
    #[serde(default)]
    pub target_commitish: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub draft: bool,
    #[serde(default)]
    pub prerelease: bool,
}

impl ReleaseRecord {
    /// Concrete upload base URL with the URI template suffix removed
    pub fn upload_base_url(&self) -> Result<String> {
        let template = self
            .upload_url
            .as_deref()
            .filter(|url| !url.is_empty())
            .ok_or_else(|| PublishError::MalformedResponse {
                message: format!("release {} has no upload_url", self.tag_name),
            })?;

        Ok(strip_uri_template(template).to_string())
    }
}

/// Remove a trailing URI template marker such as `{?name,label}`
///
/// # Examples
///
/// ```
/// use release_publisher::core::strip_uri_template;
///
/// assert_eq!(
///     strip_uri_template("https://x/releases/1/assets{?name}"),
///     "https://x/releases/1/assets"
/// );
/// ```
pub fn strip_uri_template(template: &str) -> &str {
    match template.find('{') {
        Some(index) => &template[..index],
        None => template,
    }
}

// ============================================================================
// Assets
// ============================================================================

/// A single file scheduled for upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetTask {
    pub path: PathBuf,
    pub file_name: String,
    pub size: u64,
}

impl AssetTask {
    /// Base name of `path`, used as the asset name
    pub fn file_name_of(path: &Path) -> Result<String> {
        path.file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .ok_or_else(|| PublishError::file_access(path, "path has no file name"))
    }
}

/// Asset accepted by the hosting API
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedAsset {
    pub file_name: String,
    pub size: u64,
    pub download_url: Option<String>,
}

/// Outcome of uploading one file
#[derive(Debug)]
pub struct AssetReport {
    pub path: PathBuf,
    pub outcome: Result<UploadedAsset>,
}

impl AssetReport {
    pub fn is_success(&self) -> bool {
        self.outcome.is_ok()
    }
}

// ============================================================================
// Release Host Trait
// ============================================================================

/// Remote service that stores releases and their assets
///
/// The orchestrator only talks to the host through this trait, so it can run
/// against the GitHub API or an in-memory double.
#[async_trait]
pub trait ReleaseHost: Send + Sync {
    /// Host name used in logs (e.g., "github")
    fn name(&self) -> &str;

    /// Create the release, or recover an existing one for the same tag
    ///
    /// Returns the concrete upload base URL.
    async fn publish(&self, spec: &ReleaseSpec) -> Result<String>;

    /// Upload one file to `upload_base_url`
    async fn upload(&self, upload_base_url: &str, path: &Path) -> Result<UploadedAsset>;
}
