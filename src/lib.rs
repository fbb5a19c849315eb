//! # MediPredict
//!
//! Multi-disease risk prediction service.
//!
//! This crate provides:
//! - Schema validation of clinical payloads for diabetes, heart disease and
//!   Parkinson's disease
//! - Fitted feature transformation and classification from versioned artifacts
//! - Risk bucketing and an optional plain-language narrative
//! - An HTTP API exposing one prediction endpoint per disease
//!
//! ## Architecture
//!
//! The crate follows Hexagonal Architecture:
//! - `domain`: Core business types (profiles, payloads, pipelines, risk)
//! - `ports`: Trait definitions for external operations
//! - `adapters`: Concrete implementations (filesystem artifacts, Gemini, log redaction)
//! - `application`: Use cases orchestrating domain and ports
//! - `http`: axum router and error mapping

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod http;
pub mod ports;

pub use domain::{Disease, PredictionResult, RiskLevel};

/// Result type for MediPredict operations
pub type Result<T> = std::result::Result<T, MediPredictError>;

/// Main error type for MediPredict
#[derive(Debug, thiserror::Error)]
pub enum MediPredictError {
    #[error("Invalid payload: {0}")]
    Validation(#[from] domain::ValidationError),

    #[error("Feature transformation failed: {0}")]
    Transform(#[from] domain::TransformError),

    #[error("Model not available: {0}")]
    ModelUnavailable(Disease),

    #[error("Artifact error: {0}")]
    Artifact(#[from] ports::ArtifactError),
}
