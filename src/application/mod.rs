//! Application layer: Use cases and services.
//!
//! This module orchestrates domain logic with ports to implement
//! the core use cases of the application.

mod prediction;
mod registry;

pub use prediction::{PredictionResponse, PredictionService, NARRATIVE_PLACEHOLDER};
pub use registry::ModelRegistry;
