//! Streams one local file to a release's upload endpoint

use crate::api::requester::{RequestBody, Requester};
use crate::core::error::{PublishError, Result};
use crate::core::traits::{AssetTask, UploadedAsset};
use reqwest::{Method, Url};
use serde::Deserialize;
use std::path::Path;
use std::sync::Arc;
use tokio::fs::File;

/// Content type used for every asset
pub const ASSET_CONTENT_TYPE: &str = "application/octet-stream";

/// Subset of the asset document returned after an upload
#[derive(Debug, Deserialize)]
struct AssetResponse {
    #[serde(default)]
    browser_download_url: Option<String>,
}

/// Uploads files as release assets
pub struct AssetUploader {
    requester: Arc<Requester>,
}

impl AssetUploader {
    pub fn new(requester: Arc<Requester>) -> Self {
        Self { requester }
    }

    /// Upload `path` to `upload_base_url`
    ///
    /// The file handle moves into the request body and is closed once the
    /// request finishes, whichever way it ends.
    pub async fn upload(&self, upload_base_url: &str, path: &Path) -> Result<UploadedAsset> {
        let file = File::open(path)
            .await
            .map_err(|e| PublishError::file_access(path, e))?;
        let metadata = file
            .metadata()
            .await
            .map_err(|e| PublishError::file_access(path, e))?;
        if !metadata.is_file() {
            return Err(PublishError::file_access(path, "not a regular file"));
        }

        let task = AssetTask {
            path: path.to_path_buf(),
            file_name: AssetTask::file_name_of(path)?,
            size: metadata.len(),
        };
        let url = Self::asset_url(upload_base_url, &task.file_name)?;

        log::info!("Uploading {}...", task.file_name);

        let body = self
            .requester
            .execute(
                Method::POST,
                &url,
                ASSET_CONTENT_TYPE,
                RequestBody::File {
                    file,
                    len: task.size,
                },
            )
            .await?;

        let download_url = serde_json::from_slice::<AssetResponse>(&body)
            .ok()
            .and_then(|asset| asset.browser_download_url);

        Ok(UploadedAsset {
            file_name: task.file_name,
            size: task.size,
            download_url,
        })
    }

    /// Upload URL for an asset named `file_name`
    ///
    /// # Examples
    ///
    /// ```
    /// use release_publisher::api::AssetUploader;
    ///
    /// let url = AssetUploader::asset_url("https://x/releases/1/assets", "report.txt").unwrap();
    /// assert_eq!(url, "https://x/releases/1/assets?name=report.txt");
    /// ```
    pub fn asset_url(upload_base_url: &str, file_name: &str) -> Result<String> {
        let mut url = Url::parse(upload_base_url).map_err(|e| PublishError::MalformedResponse {
            message: format!("invalid upload url {}: {}", upload_base_url, e),
        })?;
        url.query_pairs_mut().append_pair("name", file_name);

        Ok(url.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::{PublisherConfig, RepoSlug};
    use crate::security::SecureTokenManager;
    use mockito::{Matcher, Server, ServerGuard};
    use std::fs;
    use tempfile::TempDir;

    fn uploader(server: &ServerGuard) -> AssetUploader {
        let mut config = PublisherConfig::new(
            RepoSlug::new("octocat", "Hello-World"),
            SecureTokenManager::new("uploader-token"),
        );
        config.api_base = server.url();
        AssetUploader::new(Arc::new(Requester::new(Arc::new(config)).unwrap()))
    }

    #[test]
    fn test_asset_url() {
        assert_eq!(
            AssetUploader::asset_url("https://x/releases/1/assets", "report.txt").unwrap(),
            "https://x/releases/1/assets?name=report.txt"
        );
        assert_eq!(
            AssetUploader::asset_url("https://x/releases/1/assets", "my file&v2.zip").unwrap(),
            "https://x/releases/1/assets?name=my+file%26v2.zip"
        );
        assert!(AssetUploader::asset_url("assets", "a.txt").is_err());
    }

    #[tokio::test]
    async fn test_upload_streams_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("report.txt");
        fs::write(&path, "quarterly numbers").unwrap();

        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/releases/1/assets")
            .match_query(Matcher::UrlEncoded("name".into(), "report.txt".into()))
            .match_header("authorization", "token uploader-token")
            .match_header("content-type", ASSET_CONTENT_TYPE)
            .match_header("content-length", "17")
            .match_body("quarterly numbers")
            .with_status(201)
            .with_body(r#"{"id": 9, "name": "report.txt", "browser_download_url": "https://example.com/report.txt"}"#)
            .create_async()
            .await;

        let base = format!("{}/releases/1/assets", server.url());
        let asset = uploader(&server).upload(&base, &path).await.unwrap();

        assert_eq!(asset.file_name, "report.txt");
        assert_eq!(asset.size, 17);
        assert_eq!(
            asset.download_url.as_deref(),
            Some("https://example.com/report.txt")
        );
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_missing_file_is_filesystem_error() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", Matcher::Any)
            .expect(0)
            .create_async()
            .await;

        let base = format!("{}/releases/1/assets", server.url());
        let err = uploader(&server)
            .upload(&base, Path::new("/definitely/not/here.bin"))
            .await
            .unwrap_err();

        assert_eq!(err.code(), "FILE_ACCESS");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_directory_is_rejected() {
        let dir = TempDir::new().unwrap();
        let server = Server::new_async().await;

        let base = format!("{}/releases/1/assets", server.url());
        let err = uploader(&server).upload(&base, dir.path()).await.unwrap_err();

        assert_eq!(err.code(), "FILE_ACCESS");
        assert!(err.to_string().contains("not a regular file"));
    }

    #[tokio::test]
    async fn test_rejected_upload_is_api_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("b.bin");
        fs::write(&path, [0u8, 1, 2, 3]).unwrap();

        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/releases/1/assets")
            .match_query(Matcher::UrlEncoded("name".into(), "b.bin".into()))
            .with_status(422)
            .with_body(r#"{"errors":[{"code":"already_exists","field":"name"}]}"#)
            .create_async()
            .await;

        let base = format!("{}/releases/1/assets", server.url());
        let err = uploader(&server).upload(&base, &path).await.unwrap_err();

        assert_eq!(err.status_code(), Some(422));
        assert!(err.to_string().contains("already_exists"));
    }
}
