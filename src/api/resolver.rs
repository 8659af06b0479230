//! Release creation with recovery of already-existing releases

use crate::api::requester::{RequestBody, Requester};
use crate::core::error::{PublishError, Result};
use crate::core::traits::{ReleaseRecord, ReleaseSpec};
use reqwest::Method;
use std::sync::Arc;

/// Creates a release, or finds the existing one for the same tag
pub struct ReleaseResolver {
    requester: Arc<Requester>,
}

impl ReleaseResolver {
    pub fn new(requester: Arc<Requester>) -> Self {
        Self { requester }
    }

    /// Publish `spec` and return the concrete asset upload base URL
    pub async fn publish(&self, spec: &ReleaseSpec) -> Result<String> {
        let record = self.resolve(spec).await?;
        let upload_base_url = record.upload_base_url()?;

        log::debug!("upload endpoint for {}: {}", spec.tag(), upload_base_url);
        Ok(upload_base_url)
    }

    /// Create the release
    ///
    /// A `422 Unprocessable Entity` answer means the tag already has a
    /// release; in that case the existing release is fetched by tag. If that
    /// lookup fails too, the creation error is returned.
    pub async fn resolve(&self, spec: &ReleaseSpec) -> Result<ReleaseRecord> {
        let config = self.requester.config();
        let endpoint = config.releases_endpoint();
        let payload = serde_json::to_vec(spec).map_err(|e| PublishError::InvalidRelease {
            message: e.to_string(),
        })?;

        log::info!("Creating release {} on {}", spec.tag(), config.repository);

        let created = self
            .requester
            .execute(
                Method::POST,
                &endpoint,
                "application/json",
                RequestBody::Bytes(payload),
            )
            .await;

        match created {
            Ok(body) => Self::parse_record(&body),
            Err(err) if err.is_release_conflict() => {
                log::info!(
                    "Release {} already exists, attaching assets to it",
                    spec.tag()
                );
                match self.lookup(spec.tag()).await {
                    Ok(record) => Ok(record),
                    Err(lookup_err) => {
                        log::warn!("Lookup of release {} failed: {}", spec.tag(), lookup_err);
                        Err(err)
                    }
                }
            }
            Err(err) => Err(err),
        }
    }

    /// Fetch an existing release by tag
    pub async fn lookup(&self, tag: &str) -> Result<ReleaseRecord> {
        let endpoint = self.requester.config().release_by_tag_endpoint(tag)?;

        let body = self
            .requester
            .execute(
                Method::GET,
                &endpoint,
                "application/json",
                RequestBody::empty(),
            )
            .await?;

        Self::parse_record(&body)
    }

    fn parse_record(body: &[u8]) -> Result<ReleaseRecord> {
        serde_json::from_slice(body).map_err(|e| PublishError::MalformedResponse {
            message: format!("cannot decode release: {}", e),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::{PublisherConfig, RepoSlug};
    use crate::security::SecureTokenManager;
    use mockito::{Matcher, Server, ServerGuard};
    use serde_json::json;

    fn resolver(server: &ServerGuard) -> ReleaseResolver {
        let mut config = PublisherConfig::new(
            RepoSlug::new("octocat", "Hello-World"),
            SecureTokenManager::new("resolver-token"),
        );
        config.api_base = server.url();
        let requester = Requester::new(Arc::new(config)).unwrap();
        ReleaseResolver::new(Arc::new(requester))
    }

    fn spec() -> ReleaseSpec {
        ReleaseSpec::new("v1.0.0", "main").unwrap().with_body("first")
    }

    fn release_json(server: &ServerGuard) -> String {
        json!({
            "id": 1,
            "tag_name": "v1.0.0",
            "upload_url": format!("{}/uploads/releases/1/assets{{?name,label}}", server.url()),
        })
        .to_string()
    }

    #[tokio::test]
    async fn test_publish_creates_release() {
        let mut server = Server::new_async().await;
        let create = server
            .mock("POST", "/repos/octocat/Hello-World/releases")
            .match_header("authorization", "token resolver-token")
            .match_body(Matcher::Json(json!({
                "tag_name": "v1.0.0",
                "target_commitish": "main",
                "name": "v1.0.0",
                "body": "first",
                "draft": false,
                "prerelease": false,
            })))
            .with_status(201)
            .with_body(release_json(&server))
            .create_async()
            .await;
        let lookup = server
            .mock("GET", Matcher::Any)
            .expect(0)
            .create_async()
            .await;

        let base = resolver(&server).publish(&spec()).await.unwrap();

        assert_eq!(base, format!("{}/uploads/releases/1/assets", server.url()));
        create.assert_async().await;
        lookup.assert_async().await;
    }

    #[tokio::test]
    async fn test_existing_release_is_looked_up_by_tag() {
        let mut server = Server::new_async().await;
        let create = server
            .mock("POST", "/repos/octocat/Hello-World/releases")
            .with_status(422)
            .with_body(r#"{"message":"Validation Failed","errors":[{"resource":"Release","code":"already_exists","field":"tag_name"}]}"#)
            .create_async()
            .await;
        let lookup = server
            .mock("GET", "/repos/octocat/Hello-World/releases/tags/v1.0.0")
            .match_header("authorization", "token resolver-token")
            .with_status(200)
            .with_body(release_json(&server))
            .create_async()
            .await;

        let base = resolver(&server).publish(&spec()).await.unwrap();

        assert_eq!(base, format!("{}/uploads/releases/1/assets", server.url()));
        create.assert_async().await;
        lookup.assert_async().await;
    }

    #[tokio::test]
    async fn test_same_tag_published_twice() {
        let mut server = Server::new_async().await;
        let resolver = resolver(&server);

        let created = server
            .mock("POST", "/repos/octocat/Hello-World/releases")
            .with_status(201)
            .with_body(release_json(&server))
            .create_async()
            .await;
        let first = resolver.publish(&spec()).await.unwrap();
        created.assert_async().await;
        created.remove_async().await;

        let _conflict = server
            .mock("POST", "/repos/octocat/Hello-World/releases")
            .with_status(422)
            .with_body(r#"{"message":"Validation Failed"}"#)
            .create_async()
            .await;
        let _lookup = server
            .mock("GET", "/repos/octocat/Hello-World/releases/tags/v1.0.0")
            .with_status(200)
            .with_body(release_json(&server))
            .create_async()
            .await;
        let second = resolver.publish(&spec()).await.unwrap();

        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_failed_lookup_returns_creation_error() {
        let mut server = Server::new_async().await;
        let _create = server
            .mock("POST", "/repos/octocat/Hello-World/releases")
            .with_status(422)
            .with_body(r#"{"message":"Validation Failed","errors":[{"code":"invalid","field":"target_commitish"}]}"#)
            .create_async()
            .await;
        let _lookup = server
            .mock("GET", "/repos/octocat/Hello-World/releases/tags/v1.0.0")
            .with_status(404)
            .with_body(r#"{"message":"Not Found"}"#)
            .create_async()
            .await;

        let err = resolver(&server).publish(&spec()).await.unwrap_err();

        assert!(err.is_release_conflict());
        assert!(err.to_string().contains("target_commitish"));
    }

    #[tokio::test]
    async fn test_other_failures_are_fatal_without_lookup() {
        let mut server = Server::new_async().await;
        let _create = server
            .mock("POST", "/repos/octocat/Hello-World/releases")
            .with_status(401)
            .with_body(r#"{"message":"Bad credentials"}"#)
            .create_async()
            .await;
        let lookup = server
            .mock("GET", Matcher::Any)
            .expect(0)
            .create_async()
            .await;

        let err = resolver(&server).publish(&spec()).await.unwrap_err();

        assert_eq!(err.status_code(), Some(401));
        lookup.assert_async().await;
    }

    #[tokio::test]
    async fn test_missing_upload_url_is_malformed() {
        let mut server = Server::new_async().await;
        let _create = server
            .mock("POST", "/repos/octocat/Hello-World/releases")
            .with_status(201)
            .with_body(r#"{"id": 1, "tag_name": "v1.0.0"}"#)
            .create_async()
            .await;

        let err = resolver(&server).publish(&spec()).await.unwrap_err();
        assert_eq!(err.code(), "MALFORMED_RESPONSE");
    }

    #[tokio::test]
    async fn test_invalid_json_is_malformed() {
        let mut server = Server::new_async().await;
        let _create = server
            .mock("POST", "/repos/octocat/Hello-World/releases")
            .with_status(201)
            .with_body("<html>")
            .create_async()
            .await;

        let err = resolver(&server).publish(&spec()).await.unwrap_err();
        assert_eq!(err.code(), "MALFORMED_RESPONSE");
    }
}
