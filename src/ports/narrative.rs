//! Narrative port: Trait for the external report generator.
//!
//! The generator turns a numeric prediction into a short plain-language
//! explanation. It is best-effort; callers fall back to a placeholder.

use crate::domain::{Disease, NormalizedPayload};

/// Errors from the narrative generator. Never fatal to a request.
#[derive(Debug, Clone, thiserror::Error)]
pub enum NarrativeError {
    #[error("Narrative generation is not configured")]
    Disabled,

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Generator returned HTTP {0}")]
    Status(u16),

    #[error("Invalid generator response: {0}")]
    InvalidResponse(String),

    #[error("Generator returned no text")]
    Empty,
}

/// Everything the generator is allowed to see about one prediction.
///
/// Carries the validated payload, never the transformed feature vector.
#[derive(Debug, Clone, Copy)]
pub struct NarrativeRequest<'a> {
    pub disease: Disease,
    pub prediction: u8,
    pub probability: f64,
    pub payload: &'a NormalizedPayload,
}

impl NarrativeRequest<'_> {
    /// Prompt text sent to a language model.
    #[must_use]
    pub fn prompt(&self) -> String {
        let status = if self.prediction == 1 {
            "HIGH RISK"
        } else {
            "Low Risk"
        };
        let data = serde_json::to_string(self.payload).unwrap_or_default();
        format!(
            "ML result for {disease}:\n\
             Prediction: {status}\n\
             Probability: {probability:.2}%\n\
             Data: {data}\n\n\
             Explain simply. Mention 1-2 risk factors.\n\
             Give 2 lifestyle tips.\n\
             Add medical disclaimer.\n\
             Under 100 words.",
            disease = self.disease.display_name(),
            probability = self.probability * 100.0,
        )
    }
}

/// Trait for narrative report generation.
///
/// Implementations must bound their own latency; the prediction service
/// waits for the call to return.
pub trait NarrativeGenerator: Send + Sync {
    /// Generate an explanation for one prediction.
    ///
    /// # Errors
    /// Returns [`NarrativeError`] on any failure; callers degrade gracefully.
    fn generate(&self, request: &NarrativeRequest<'_>) -> Result<String, NarrativeError>;
}

impl<T: NarrativeGenerator + ?Sized> NarrativeGenerator for std::sync::Arc<T> {
    fn generate(&self, request: &NarrativeRequest<'_>) -> Result<String, NarrativeError> {
        (**self).generate(request)
    }
}
