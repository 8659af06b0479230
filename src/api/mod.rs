//! GitHub REST implementation of [`ReleaseHost`]

pub mod requester;
pub mod resolver;
pub mod uploader;

pub use requester::{GITHUB_ACCEPT, RequestBody, Requester, WIRE_TARGET};
pub use resolver::ReleaseResolver;
pub use uploader::{ASSET_CONTENT_TYPE, AssetUploader};

use crate::core::config::PublisherConfig;
use crate::core::error::Result;
use crate::core::traits::{ReleaseHost, ReleaseSpec, UploadedAsset};
use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;

/// GitHub releases, reached through one shared [`Requester`]
pub struct GitHubHost {
    resolver: ReleaseResolver,
    uploader: AssetUploader,
}

impl GitHubHost {
    pub fn new(config: Arc<PublisherConfig>) -> Result<Self> {
        let requester = Arc::new(Requester::new(config)?);

        Ok(Self {
            resolver: ReleaseResolver::new(Arc::clone(&requester)),
            uploader: AssetUploader::new(requester),
        })
    }
}

#[async_trait]
impl ReleaseHost for GitHubHost {
    fn name(&self) -> &str {
        "github"
    }

    async fn publish(&self, spec: &ReleaseSpec) -> Result<String> {
        self.resolver.publish(spec).await
    }

    async fn upload(&self, upload_base_url: &str, path: &Path) -> Result<UploadedAsset> {
        self.uploader.upload(upload_base_url, path).await
    }
}
