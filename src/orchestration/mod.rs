//! Orchestration layer for release publishing
//!
//! Sequences release resolution and the concurrent asset uploads that
//! depend on it.

pub mod release_publisher;

pub use release_publisher::{PublicationOrchestrator, PublicationReport};
