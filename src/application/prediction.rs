//! Prediction service: validate → transform → classify → bucket → narrate.

use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;

use crate::domain::{round3, validate, Disease, NormalizedPayload, PredictionResult, RiskLevel};
use crate::ports::{NarrativeGenerator, NarrativeRequest};

use super::ModelRegistry;

/// Returned as `ai_analysis` when the narrative generator fails.
pub const NARRATIVE_PLACEHOLDER: &str = "AI analysis is currently unavailable. \
This result is a statistical estimate, not a diagnosis; please discuss it with a \
qualified healthcare professional.";

/// Wire response for one prediction.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredictionResponse {
    pub prediction: u8,
    /// Rounded to three decimals.
    pub probability: f64,
    pub risk_level: RiskLevel,
    pub ai_analysis: String,
}

/// Service for running per-disease predictions.
///
/// Holds only shared read-only state, so one instance serves all requests.
pub struct PredictionService {
    registry: Arc<ModelRegistry>,
    narrative: Arc<dyn NarrativeGenerator>,
}

impl PredictionService {
    pub fn new(registry: Arc<ModelRegistry>, narrative: Arc<dyn NarrativeGenerator>) -> Self {
        Self {
            registry,
            narrative,
        }
    }

    #[must_use]
    pub fn registry(&self) -> &ModelRegistry {
        &self.registry
    }

    /// Run the numeric pipeline without narration.
    ///
    /// Validation runs before the registry lookup, so a malformed payload is
    /// reported even when the model is unavailable.
    ///
    /// # Errors
    /// [`crate::MediPredictError::Validation`] for bad input,
    /// [`crate::MediPredictError::ModelUnavailable`] when no pipeline is loaded and
    /// [`crate::MediPredictError::Transform`] on artifact skew.
    pub fn assess(
        &self,
        disease: Disease,
        raw: &Value,
    ) -> crate::Result<(NormalizedPayload, PredictionResult)> {
        let payload = validate(disease.profile(), raw)?;
        tracing::debug!("Validated {} payload ({} fields)", disease, payload.len());

        let pipeline = self.registry.get(disease)?;
        let vector = pipeline.transform(&payload)?;
        let classification = pipeline.classify(&vector)?;
        let result = PredictionResult::from(classification);

        tracing::debug!(
            "Classified {} (model_version={}, label={}, risk={})",
            disease,
            pipeline.model_version(),
            result.prediction,
            result.risk_level
        );
        Ok((payload, result))
    }

    /// Full prediction including the narrative report.
    ///
    /// # Errors
    /// Same as [`Self::assess`]. Narrative failures are never errors.
    pub fn predict(
        &self,
        disease: Disease,
        raw: &Value,
    ) -> crate::Result<PredictionResponse> {
        let (payload, result) = self.assess(disease, raw)?;

        let request = NarrativeRequest {
            disease,
            prediction: result.prediction,
            probability: result.probability,
            payload: &payload,
        };
        let ai_analysis = match self.narrative.generate(&request) {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!("Narrative unavailable for {}: {}", disease, e);
                NARRATIVE_PLACEHOLDER.to_string()
            }
        };

        Ok(PredictionResponse {
            prediction: result.prediction,
            probability: round3(result.probability),
            risk_level: result.risk_level,
            ai_analysis,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::{DisabledNarrative, FsArtifactStore};
    use crate::ports::NarrativeError;
    use crate::MediPredictError;
    use serde_json::json;
    use std::sync::Mutex;

    /// Records prompts and answers with a fixed text.
    #[derive(Default)]
    struct RecordingNarrative {
        prompts: Mutex<Vec<String>>,
    }

    impl NarrativeGenerator for RecordingNarrative {
        fn generate(&self, request: &NarrativeRequest<'_>) -> Result<String, NarrativeError> {
            self.prompts
                .lock()
                .expect("prompts lock")
                .push(request.prompt());
            Ok("Keep an eye on glucose.".to_string())
        }
    }

    fn registry() -> Arc<ModelRegistry> {
        Arc::new(ModelRegistry::load(&FsArtifactStore::new("models")).expect("registry"))
    }

    fn diabetes_example() -> Value {
        json!({
            "Pregnancies": 6, "Glucose": 148, "BloodPressure": 72, "SkinThickness": 35,
            "Insulin": 0, "BMI": 33.6, "DiabetesPedigreeFunction": 0.627, "Age": 50
        })
    }

    fn heart_example() -> Value {
        json!({
            "Age": 54, "Sex": "M", "ChestPainType": "ASY", "RestingBP": 140,
            "Cholesterol": 239, "FastingBS": 0, "RestingECG": "Normal", "MaxHR": 160,
            "ExerciseAngina": "N", "Oldpeak": 1.2, "ST_Slope": "Flat"
        })
    }

    #[test]
    fn test_diabetes_example_is_deterministic() {
        let service = PredictionService::new(registry(), Arc::new(DisabledNarrative));

        let first = service
            .predict(Disease::Diabetes, &diabetes_example())
            .expect("prediction");
        assert_eq!(first.prediction, 1);
        assert_eq!(first.probability, 0.683);
        assert_eq!(first.risk_level, RiskLevel::Medium);

        for _ in 0..5 {
            let again = service
                .predict(Disease::Diabetes, &diabetes_example())
                .expect("prediction");
            assert_eq!(again, first);
        }
    }

    #[test]
    fn test_diabetes_results_stay_in_range() {
        let service = PredictionService::new(registry(), Arc::new(DisabledNarrative));

        // Covers every leaf region of the shipped forest plus boundary values.
        let cases = [
            (0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 21),
            (1, 85.0, 66.0, 29.0, 0.0, 26.6, 0.351, 31),
            (8, 183.0, 64.0, 0.0, 0.0, 23.3, 0.672, 32),
            (1, 89.0, 66.0, 23.0, 94.0, 28.1, 0.167, 21),
            (0, 137.0, 40.0, 35.0, 168.0, 43.1, 2.288, 33),
            (3, 127.5, 70.0, 30.0, 100.0, 29.9, 0.5, 28),
            (10, 199.0, 122.0, 99.0, 846.0, 67.1, 2.42, 81),
            (2, 146.0, 0.0, 0.0, 0.0, 27.5, 0.24, 28),
        ];

        for (preg, glucose, bp, skin, insulin, bmi, dpf, age) in cases {
            let raw = json!({
                "Pregnancies": preg, "Glucose": glucose, "BloodPressure": bp,
                "SkinThickness": skin, "Insulin": insulin, "BMI": bmi,
                "DiabetesPedigreeFunction": dpf, "Age": age
            });
            let (_, result) = service.assess(Disease::Diabetes, &raw).expect("valid payload");
            assert!((0.0..=1.0).contains(&result.probability), "{raw}");
            assert_eq!(
                result.risk_level,
                RiskLevel::from_probability(result.probability),
                "{raw}"
            );
            assert!(result.prediction <= 1, "{raw}");
        }
    }

    #[test]
    fn test_heart_assessment_is_deterministic() {
        let service = PredictionService::new(registry(), Arc::new(DisabledNarrative));
        let (payload_a, a) = service
            .assess(Disease::Heart, &heart_example())
            .expect("assessment");
        let (payload_b, b) = service
            .assess(Disease::Heart, &heart_example())
            .expect("assessment");
        assert_eq!(payload_a, payload_b);
        assert_eq!(a, b);
        assert!((0.0..=1.0).contains(&a.probability));
        assert_eq!(a.risk_level, RiskLevel::from_probability(a.probability));
    }

    #[test]
    fn test_narrative_failure_uses_placeholder() {
        let service = PredictionService::new(registry(), Arc::new(DisabledNarrative));
        let response = service
            .predict(Disease::Diabetes, &diabetes_example())
            .expect("prediction");
        assert_eq!(response.ai_analysis, NARRATIVE_PLACEHOLDER);
    }

    #[test]
    fn test_narrative_receives_unrounded_result_and_payload() {
        let narrative = Arc::new(RecordingNarrative::default());
        let service = PredictionService::new(registry(), narrative.clone());

        let response = service
            .predict(Disease::Diabetes, &diabetes_example())
            .expect("prediction");
        assert_eq!(response.ai_analysis, "Keep an eye on glucose.");

        let prompts = narrative.prompts.lock().expect("prompts lock");
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].starts_with("ML result for Diabetes:"));
        assert!(prompts[0].contains("Prediction: HIGH RISK"));
        assert!(prompts[0].contains("\"Age\":50"));
    }

    #[test]
    fn test_validation_precedes_model_lookup() {
        let service = PredictionService::new(
            Arc::new(ModelRegistry::default()),
            Arc::new(DisabledNarrative),
        );
        let err = service
            .predict(Disease::Parkinsons, &json!({}))
            .expect_err("invalid");
        assert!(matches!(err, MediPredictError::Validation(_)));

        let err = service
            .predict(Disease::Diabetes, &diabetes_example())
            .expect_err("unavailable");
        assert!(matches!(
            err,
            MediPredictError::ModelUnavailable(Disease::Diabetes)
        ));
    }
}
