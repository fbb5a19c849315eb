//! Model registry: one trained pipeline per disease, loaded once at start-up.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use crate::domain::{Disease, TrainedPipeline};
use crate::ports::{ArtifactError, ArtifactStore};
use crate::MediPredictError;

/// Read-only map from disease to its trained pipeline.
///
/// A disease whose artifact failed to load is absent; requests for it get
/// [`MediPredictError::ModelUnavailable`] while the other diseases keep serving.
#[derive(Debug, Default)]
pub struct ModelRegistry {
    pipelines: HashMap<Disease, Arc<TrainedPipeline>>,
}

impl ModelRegistry {
    /// Load every disease from `store`.
    ///
    /// # Errors
    /// Fails only when no artifact loads at all; the error is the last
    /// failure seen.
    pub fn load<S: ArtifactStore + ?Sized>(store: &S) -> Result<Self, MediPredictError> {
        let mut pipelines = HashMap::new();
        let mut last_error = None;

        for disease in Disease::ALL {
            match load_one(store, disease) {
                Ok(pipeline) => {
                    let trained_at = pipeline
                        .trained_at()
                        .map_or_else(|| "unknown".to_string(), |t| t.to_rfc3339());
                    tracing::info!(
                        "Loaded {} pipeline (model_version={}, trained_at={}, n_features={})",
                        disease,
                        pipeline.model_version(),
                        trained_at,
                        pipeline.n_features()
                    );
                    pipelines.insert(disease, Arc::new(pipeline));
                }
                Err(e) => {
                    tracing::error!("Failed to load {} pipeline: {}", disease, e);
                    last_error = Some(e);
                }
            }
        }

        if let (true, Some(e)) = (pipelines.is_empty(), last_error) {
            return Err(e.into());
        }

        Ok(Self { pipelines })
    }

    /// # Errors
    /// Returns [`MediPredictError::ModelUnavailable`] if the disease has no
    /// loaded pipeline.
    pub fn get(&self, disease: Disease) -> Result<Arc<TrainedPipeline>, MediPredictError> {
        self.pipelines
            .get(&disease)
            .cloned()
            .ok_or(MediPredictError::ModelUnavailable(disease))
    }

    #[must_use]
    pub fn is_loaded(&self, disease: Disease) -> bool {
        self.pipelines.contains_key(&disease)
    }

    /// Load state of every disease, in declaration order.
    #[must_use]
    pub fn status(&self) -> BTreeMap<Disease, bool> {
        Disease::ALL
            .into_iter()
            .map(|d| (d, self.is_loaded(d)))
            .collect()
    }

    #[must_use]
    pub fn loaded_count(&self) -> usize {
        self.pipelines.len()
    }
}

fn load_one<S: ArtifactStore + ?Sized>(
    store: &S,
    disease: Disease,
) -> Result<TrainedPipeline, ArtifactError> {
    let artifact = store.load(disease)?;
    Ok(TrainedPipeline::from_artifact(disease, &artifact)?)
}
