//! Domain layer: Core business types and logic.
//!
//! Pure Rust types for the inference pipeline: disease profiles, payload
//! validation, feature transformation, classification and risk bucketing.
//! Nothing here performs I/O.

pub mod artifact;
mod classifier;
mod diagnosis;
mod disease;
mod payload;
mod pipeline;
mod transform;
mod validation;

pub use artifact::{ArtifactSchemaError, PipelineArtifact};
pub use classifier::{Classification, Classifier};
pub use diagnosis::{round3, PredictionResult, RiskLevel};
pub use disease::{Disease, DiseaseProfile, FieldKind, FieldSpec};
pub use payload::{FeatureValue, NormalizedPayload};
pub use pipeline::TrainedPipeline;
pub use transform::{FeatureTransformer, FeatureVector, TransformError};
pub use validation::{validate, FieldError, FieldErrorKind, ValidationError};
