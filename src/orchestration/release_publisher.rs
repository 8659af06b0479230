//! Publication orchestrator - creates the release, then uploads every asset
//!
//! Features:
//! - Exactly one release resolution per call
//! - One upload task per file, bounded by a semaphore
//! - Per-file failure isolation with structured results
//! - Wait-for-all barrier before returning

use crate::core::error::{PublishError, Result};
use crate::core::state_machine::{PublicationState, PublicationStateMachine, StateTransition};
use crate::core::traits::{AssetReport, ReleaseHost, ReleaseSpec, UploadedAsset};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Semaphore;

/// Result of one publish call
#[derive(Debug)]
pub struct PublicationReport {
    /// Release tag
    pub tag: String,

    /// Concrete upload base URL shared by every asset
    pub upload_base_url: String,

    /// One report per requested file, in input order
    pub assets: Vec<AssetReport>,

    /// State transitions of the call
    pub transitions: Vec<StateTransition>,
}

impl PublicationReport {
    /// Successfully uploaded assets
    pub fn succeeded(&self) -> Vec<&UploadedAsset> {
        self.assets
            .iter()
            .filter_map(|report| report.outcome.as_ref().ok())
            .collect()
    }

    /// Failed uploads with their errors
    pub fn failed(&self) -> Vec<(&PathBuf, &PublishError)> {
        self.assets
            .iter()
            .filter_map(|report| report.outcome.as_ref().err().map(|e| (&report.path, e)))
            .collect()
    }

    pub fn all_succeeded(&self) -> bool {
        self.assets.iter().all(AssetReport::is_success)
    }

    /// Milliseconds from the start of resolution until the last upload finished
    pub fn duration_ms(&self) -> i64 {
        match (self.transitions.first(), self.transitions.last()) {
            (Some(first), Some(last)) => (last.timestamp - first.timestamp).num_milliseconds(),
            _ => 0,
        }
    }
}

/// Sequences release resolution and the asset upload fan-out
pub struct PublicationOrchestrator<H: ReleaseHost + 'static> {
    host: Arc<H>,
    max_concurrency: usize,
}

impl<H: ReleaseHost + 'static> PublicationOrchestrator<H> {
    /// Create a new orchestrator
    ///
    /// # Arguments
    ///
    /// * `host` - Release host to publish to
    /// * `max_concurrency` - Maximum uploads in flight (at least 1)
    pub fn new(host: H, max_concurrency: usize) -> Self {
        Self {
            host: Arc::new(host),
            max_concurrency: max_concurrency.max(1),
        }
    }

    /// Publish `spec` and attach every file in `file_paths`
    ///
    /// Fails only when the release cannot be resolved; in that case no upload
    /// is attempted. Upload failures are reported per file in the returned
    /// report and never stop sibling uploads.
    pub async fn publish_release(
        &self,
        spec: &ReleaseSpec,
        file_paths: Vec<PathBuf>,
    ) -> Result<PublicationReport> {
        let mut machine = PublicationStateMachine::new();

        machine.transition(PublicationState::Resolving)?;
        let upload_base_url = match self.host.publish(spec).await {
            Ok(url) => {
                machine.transition(PublicationState::Resolved)?;
                url
            }
            Err(e) => {
                machine.transition(PublicationState::Failed)?;
                log::error!(
                    "Release {} could not be published to {}: {}",
                    spec.tag(),
                    self.host.name(),
                    e
                );
                return Err(e);
            }
        };

        machine.start_uploads(file_paths.len())?;
        let assets = self.upload_all(&upload_base_url, file_paths).await;
        machine.transition(PublicationState::Done)?;

        log::debug!("publication history:\n{}", machine.history());

        Ok(PublicationReport {
            tag: spec.tag().to_string(),
            upload_base_url,
            assets,
            transitions: machine.into_transitions(),
        })
    }

    /// Upload every file concurrently and wait for all of them
    async fn upload_all(&self, upload_base_url: &str, file_paths: Vec<PathBuf>) -> Vec<AssetReport> {
        let semaphore = Arc::new(Semaphore::new(self.max_concurrency));
        let upload_base_url: Arc<str> = Arc::from(upload_base_url);
        let mut tasks = Vec::with_capacity(file_paths.len());

        for path in file_paths {
            let semaphore = Arc::clone(&semaphore);
            let host = Arc::clone(&self.host);
            let upload_base_url = Arc::clone(&upload_base_url);
            let path_for_task = path.clone();

            let task = tokio::spawn(async move {
                let _permit = semaphore
                    .acquire()
                    .await
                    .map_err(|e| PublishError::TaskFailed {
                        message: e.to_string(),
                    })?;
                host.upload(&upload_base_url, &path_for_task).await
            });

            tasks.push((path, task));
        }

        // Wait for all tasks and collect results
        let mut reports = Vec::with_capacity(tasks.len());
        for (path, task) in tasks {
            let outcome = match task.await {
                Ok(outcome) => outcome,
                Err(e) => Err(PublishError::TaskFailed {
                    message: e.to_string(),
                }),
            };

            match &outcome {
                Ok(asset) => log::info!("Uploaded {} ({} bytes)", asset.file_name, asset.size),
                Err(e) => log::error!("Upload of {} failed: {}", path.display(), e),
            }

            reports.push(AssetReport { path, outcome });
        }

        reports
    }
}
