//! Publish a GitHub release and attach build artifacts to it
//!
//! The release is created (or recovered when the tag already has one),
//! then every asset is streamed to the release's upload endpoint in its
//! own task. A failed upload is reported for that file alone.

pub mod api;
pub mod core;
pub mod orchestration;
pub mod security;

pub use crate::api::GitHubHost;
pub use crate::core::*;
pub use crate::orchestration::{PublicationOrchestrator, PublicationReport};
pub use crate::security::SecureTokenManager;
