//! Ports layer: Trait definitions for external operations.
//!
//! Following Hexagonal Architecture, these traits define the boundaries
//! between the application and external systems (artifact storage and the
//! narrative report generator).

mod artifact_store;
mod narrative;

pub use artifact_store::{ArtifactError, ArtifactStore};
pub use narrative::{NarrativeError, NarrativeGenerator, NarrativeRequest};
