//! Adapters layer: Concrete implementations of ports.
//!
//! These modules contain the actual integration with external systems:
//! - `artifact_fs`: model directory with signed manifest verification
//! - `gemini`: Gemini `generateContent` client for narrative reports
//! - `redact`: secret filtering for logs

pub mod artifact_fs;
pub mod gemini;
pub mod redact;

pub use artifact_fs::FsArtifactStore;
pub use gemini::{DisabledNarrative, GeminiNarrative};
