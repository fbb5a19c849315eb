//! A trained pipeline: fitted transformer + fitted classifier.

use super::artifact::{ArtifactSchemaError, PipelineArtifact, ARTIFACT_FORMAT_VERSION};
use super::classifier::{Classification, Classifier};
use super::payload::NormalizedPayload;
use super::transform::{FeatureTransformer, FeatureVector, TransformError};
use super::Disease;

/// Immutable once built; shared read-only by all requests.
#[derive(Debug, Clone)]
pub struct TrainedPipeline {
    disease: Disease,
    model_version: String,
    trained_at: Option<chrono::DateTime<chrono::Utc>>,
    transformer: FeatureTransformer,
    classifier: Classifier,
}

impl TrainedPipeline {
    /// Check an artifact against the disease profile and build the pipeline.
    ///
    /// # Errors
    /// Returns [`ArtifactSchemaError`] on any version, feature-order or shape
    /// inconsistency. Such an artifact must never serve traffic.
    pub fn from_artifact(
        expected: Disease,
        artifact: &PipelineArtifact,
    ) -> Result<Self, ArtifactSchemaError> {
        if artifact.format_version != ARTIFACT_FORMAT_VERSION {
            return Err(ArtifactSchemaError::UnsupportedVersion {
                found: artifact.format_version,
                expected: ARTIFACT_FORMAT_VERSION,
            });
        }
        if artifact.disease != expected {
            return Err(ArtifactSchemaError::WrongDisease {
                found: artifact.disease,
                expected,
            });
        }

        let profile = expected.profile();
        let names: Vec<&str> = profile.field_names().collect();
        for index in 0..names.len().max(artifact.input_features.len()) {
            let want = names.get(index).copied().unwrap_or("<none>");
            let got = artifact
                .input_features
                .get(index)
                .map(String::as_str)
                .unwrap_or("<none>");
            if want != got {
                return Err(ArtifactSchemaError::FeatureOrder {
                    disease: expected,
                    index,
                    expected: want.to_string(),
                    found: got.to_string(),
                });
            }
        }

        let transformer = FeatureTransformer::from_spec(
            &artifact.preprocessor,
            &artifact.input_features,
            &artifact.output_columns,
            profile,
        )?;
        let classifier = Classifier::from_spec(&artifact.classifier)?;

        if transformer.width() != classifier.n_features() {
            return Err(ArtifactSchemaError::OutputColumns(format!(
                "preprocessor yields {} columns, classifier expects {}",
                transformer.width(),
                classifier.n_features()
            )));
        }

        Ok(Self {
            disease: expected,
            model_version: artifact.model_version.clone(),
            trained_at: artifact.trained_at,
            transformer,
            classifier,
        })
    }

    #[must_use]
    pub fn disease(&self) -> Disease {
        self.disease
    }

    #[must_use]
    pub fn model_version(&self) -> &str {
        &self.model_version
    }

    #[must_use]
    pub fn trained_at(&self) -> Option<chrono::DateTime<chrono::Utc>> {
        self.trained_at
    }

    /// Width of the feature vector the classifier consumes.
    #[must_use]
    pub fn n_features(&self) -> usize {
        self.classifier.n_features()
    }

    /// Produce the feature vector for a validated payload.
    ///
    /// # Errors
    /// Returns [`TransformError`] on any shape disagreement with the classifier.
    pub fn transform(&self, payload: &NormalizedPayload) -> Result<FeatureVector, TransformError> {
        let vector = self.transformer.transform(payload)?;
        if vector.len() != self.classifier.n_features() {
            return Err(TransformError::WidthMismatch {
                expected: self.classifier.n_features(),
                actual: vector.len(),
            });
        }
        Ok(vector)
    }

    /// # Errors
    /// Returns [`TransformError::WidthMismatch`] for a vector of the wrong width.
    pub fn classify(&self, vector: &[f64]) -> Result<Classification, TransformError> {
        self.classifier.classify(vector)
    }
}
