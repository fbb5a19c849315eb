//! Artifact store port: Trait for reading trained pipeline artifacts.

use crate::domain::{ArtifactSchemaError, Disease, PipelineArtifact};

/// Errors raised while locating, verifying or decoding an artifact.
#[derive(Debug, thiserror::Error)]
pub enum ArtifactError {
    #[error("Artifact not found: {0}")]
    Missing(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Artifact is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Manifest error: {0}")]
    Manifest(String),

    #[error("Signature verification failed: {0}")]
    Signature(String),

    #[error("Integrity check failed for {0}")]
    Integrity(String),

    #[error("Incompatible artifact: {0}")]
    Schema(#[from] ArtifactSchemaError),
}

/// Source of per-disease pipeline artifacts.
///
/// Called once per disease at start-up, before any traffic is served.
pub trait ArtifactStore: Send + Sync {
    /// Load and verify the artifact for `disease`.
    ///
    /// # Errors
    /// Returns [`ArtifactError`] if the artifact is missing, tampered with or
    /// undecodable.
    fn load(&self, disease: Disease) -> Result<PipelineArtifact, ArtifactError>;
}
