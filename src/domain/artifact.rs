//! Versioned on-disk description of a trained pipeline.
//!
//! Each artifact declares its feature order, preprocessing statistics and
//! classifier parameters explicitly, so the serving process never depends on
//! the in-memory layout used at training time.

use serde::{Deserialize, Serialize};

use super::Disease;

/// Artifact schema version understood by this build.
pub const ARTIFACT_FORMAT_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineArtifact {
    pub format_version: u32,
    pub disease: Disease,
    pub model_version: String,
    #[serde(default)]
    pub trained_at: Option<chrono::DateTime<chrono::Utc>>,
    /// Raw payload columns, in the order the pipeline was fitted on.
    pub input_features: Vec<String>,
    pub preprocessor: PreprocessorSpec,
    /// Final feature-vector columns, in the order the classifier consumes them.
    pub output_columns: Vec<String>,
    pub classifier: ClassifierSpec,
}

/// Fitted standard-scaler statistics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScalerSpec {
    pub columns: Vec<String>,
    pub mean: Vec<f64>,
    pub var: Vec<f64>,
}

/// Fitted one-hot vocabulary for one categorical column.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OneHotSpec {
    pub column: String,
    pub categories: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PreprocessorSpec {
    Passthrough,
    StandardScaler(ScalerSpec),
    ColumnTransformer {
        numeric: ScalerSpec,
        categorical: Vec<OneHotSpec>,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ClassifierSpec {
    LogisticRegression {
        coefficients: Vec<f64>,
        intercept: f64,
    },
    RandomForest {
        n_features: usize,
        trees: Vec<TreeSpec>,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TreeSpec {
    /// Node 0 is the root; children always have larger indices.
    pub nodes: Vec<TreeNode>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TreeNode {
    /// Go `left` when `x[feature] <= threshold`, else `right`.
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    /// Fraction of positive-class training samples in this leaf.
    Leaf { positive: f64 },
}

/// Artifact content is inconsistent with itself or with the disease profile.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ArtifactSchemaError {
    #[error("unsupported artifact format version {found} (expected {expected})")]
    UnsupportedVersion { found: u32, expected: u32 },

    #[error("artifact is for {found}, expected {expected}")]
    WrongDisease { found: Disease, expected: Disease },

    #[error("input feature order does not match the {disease} profile at column {index}: expected {expected:?}, found {found:?}")]
    FeatureOrder {
        disease: Disease,
        index: usize,
        expected: String,
        found: String,
    },

    #[error("invalid preprocessor: {0}")]
    Preprocessor(String),

    #[error("invalid output columns: {0}")]
    OutputColumns(String),

    #[error("invalid classifier: {0}")]
    Classifier(String),
}
