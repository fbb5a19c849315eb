//! Feature preparation: payload → fixed-order numeric vector.

use std::collections::HashMap;

use super::artifact::{ArtifactSchemaError, OneHotSpec, PreprocessorSpec, ScalerSpec};
use super::disease::DiseaseProfile;
use super::payload::NormalizedPayload;

/// Ordered numeric input of a classifier.
pub type FeatureVector = Vec<f64>;

/// Validated input and trained pipeline disagree on shape.
///
/// Always a training/serving skew bug, never a client error.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TransformError {
    #[error("feature vector has {actual} columns, classifier expects {expected}")]
    WidthMismatch { expected: usize, actual: usize },

    #[error("column {0:?} required by the pipeline is missing from the payload")]
    MissingColumn(String),

    #[error("column {0:?} has the wrong value type for its encoder")]
    WrongValueType(String),
}

/// Standardization with training-time statistics.
#[derive(Debug, Clone)]
pub struct StandardScaler {
    columns: Vec<String>,
    mean: Vec<f64>,
    /// `sqrt(var)`, with zero-variance columns scaled by 1.
    scale: Vec<f64>,
}

impl StandardScaler {
    fn from_spec(spec: &ScalerSpec) -> Result<Self, ArtifactSchemaError> {
        let n = spec.columns.len();
        if spec.mean.len() != n || spec.var.len() != n {
            return Err(ArtifactSchemaError::Preprocessor(format!(
                "scaler has {n} columns but {} means and {} variances",
                spec.mean.len(),
                spec.var.len()
            )));
        }
        if let Some(i) = spec.mean.iter().position(|m| !m.is_finite()) {
            return Err(ArtifactSchemaError::Preprocessor(format!(
                "non-finite mean for column {:?}",
                spec.columns[i]
            )));
        }
        if let Some(i) = spec.var.iter().position(|v| !v.is_finite() || *v < 0.0) {
            return Err(ArtifactSchemaError::Preprocessor(format!(
                "invalid variance for column {:?}",
                spec.columns[i]
            )));
        }

        let scale = spec
            .var
            .iter()
            .map(|&v| if v == 0.0 { 1.0 } else { v.sqrt() })
            .collect();

        Ok(Self {
            columns: spec.columns.clone(),
            mean: spec.mean.clone(),
            scale,
        })
    }

    fn scale_value(&self, i: usize, x: f64) -> f64 {
        (x - self.mean[i]) / self.scale[i]
    }

    fn numeric(payload: &NormalizedPayload, column: &str) -> Result<f64, TransformError> {
        payload
            .get(column)
            .ok_or_else(|| TransformError::MissingColumn(column.to_string()))?
            .as_f64()
            .ok_or_else(|| TransformError::WrongValueType(column.to_string()))
    }

    fn transform(&self, payload: &NormalizedPayload) -> Result<FeatureVector, TransformError> {
        self.columns
            .iter()
            .enumerate()
            .map(|(i, col)| Ok(self.scale_value(i, Self::numeric(payload, col)?)))
            .collect()
    }
}

/// Scaled columns must be numeric fields of the profile.
fn check_numeric_columns(
    columns: &[String],
    profile: &DiseaseProfile,
) -> Result<(), ArtifactSchemaError> {
    for col in columns {
        let numeric = profile
            .field(col)
            .is_some_and(|f| !f.kind.is_categorical());
        if !numeric {
            return Err(ArtifactSchemaError::Preprocessor(format!(
                "scaled column {col:?} is not a numeric field"
            )));
        }
    }
    Ok(())
}

/// Where one output column takes its value from.
#[derive(Debug, Clone)]
enum ColumnSource {
    /// Index into the numeric scaler.
    Scaled(usize),
    /// 1.0 when `column == category`, else 0.0.
    Indicator { column: String, category: String },
    /// Indicator column recorded at training time but absent from the vocabulary.
    ZeroFill,
}

/// Scaled numeric block followed by one-hot indicator columns, laid out in
/// the order recorded at training time.
#[derive(Debug, Clone)]
pub struct ScaleAndEncode {
    scaler: StandardScaler,
    layout: Vec<ColumnSource>,
}

impl ScaleAndEncode {
    fn from_spec(
        numeric: &ScalerSpec,
        categorical: &[OneHotSpec],
        input_features: &[String],
        output_columns: &[String],
        profile: &DiseaseProfile,
    ) -> Result<Self, ArtifactSchemaError> {
        let scaler = StandardScaler::from_spec(numeric)?;
        check_numeric_columns(&scaler.columns, profile)?;

        for enc in categorical {
            let is_categorical = profile
                .field(&enc.column)
                .is_some_and(|f| f.kind.is_categorical());
            if !is_categorical {
                return Err(ArtifactSchemaError::Preprocessor(format!(
                    "one-hot column {:?} is not a categorical field",
                    enc.column
                )));
            }
        }

        // An input nobody consumes would be silently ignored at serving time.
        for name in input_features {
            let used = scaler.columns.contains(name)
                || categorical.iter().any(|enc| enc.column == *name);
            if !used {
                return Err(ArtifactSchemaError::Preprocessor(format!(
                    "input feature {name:?} is neither scaled nor encoded"
                )));
            }
        }

        let numeric_index: HashMap<&str, usize> = scaler
            .columns
            .iter()
            .enumerate()
            .map(|(i, c)| (c.as_str(), i))
            .collect();

        let mut layout = Vec::with_capacity(output_columns.len());
        for name in output_columns {
            if let Some(&i) = numeric_index.get(name.as_str()) {
                layout.push(ColumnSource::Scaled(i));
                continue;
            }

            // Longest column prefix wins ("ST_Slope_Up" belongs to "ST_Slope", not "ST").
            let owner = categorical
                .iter()
                .filter_map(|enc| indicator_category(name, &enc.column).map(|cat| (enc, cat)))
                .max_by_key(|(enc, _)| enc.column.len());
            match owner {
                Some((enc, cat)) if enc.categories.iter().any(|c| c == cat) => {
                    layout.push(ColumnSource::Indicator {
                        column: enc.column.clone(),
                        category: cat.to_string(),
                    });
                }
                Some(_) => layout.push(ColumnSource::ZeroFill),
                None => {
                    return Err(ArtifactSchemaError::OutputColumns(format!(
                        "column {name:?} is neither a scaled feature nor an indicator"
                    )))
                }
            }
        }

        // Every fitted column must reach the classifier; dropping one would
        // silently change what the model sees.
        for (i, col) in scaler.columns.iter().enumerate() {
            let present = layout
                .iter()
                .any(|s| matches!(s, ColumnSource::Scaled(j) if *j == i));
            if !present {
                return Err(ArtifactSchemaError::OutputColumns(format!(
                    "scaled column {col:?} is not in the output"
                )));
            }
        }
        for enc in categorical {
            for cat in &enc.categories {
                let present = layout.iter().any(|s| {
                    matches!(s, ColumnSource::Indicator { column, category }
                        if *column == enc.column && category == cat)
                });
                if !present {
                    return Err(ArtifactSchemaError::OutputColumns(format!(
                        "indicator {}_{cat} is not in the output",
                        enc.column
                    )));
                }
            }
        }

        Ok(Self { scaler, layout })
    }

    fn transform(&self, payload: &NormalizedPayload) -> Result<FeatureVector, TransformError> {
        self.layout
            .iter()
            .map(|source| match source {
                ColumnSource::Scaled(i) => {
                    let x = StandardScaler::numeric(payload, &self.scaler.columns[*i])?;
                    Ok(self.scaler.scale_value(*i, x))
                }
                ColumnSource::Indicator { column, category } => {
                    let value = payload
                        .get(column)
                        .ok_or_else(|| TransformError::MissingColumn(column.clone()))?
                        .as_category()
                        .ok_or_else(|| TransformError::WrongValueType(column.clone()))?;
                    // Categories outside the vocabulary match no indicator.
                    Ok(if value == category { 1.0 } else { 0.0 })
                }
                ColumnSource::ZeroFill => Ok(0.0),
            })
            .collect()
    }
}

/// `"ChestPainType_ASY"` → `Some("ASY")` for column `"ChestPainType"`.
fn indicator_category<'a>(name: &'a str, column: &str) -> Option<&'a str> {
    name.strip_prefix(column)?.strip_prefix('_')
}

/// Per-disease preprocessing, fixed at load time.
#[derive(Debug, Clone)]
pub enum FeatureTransformer {
    /// Raw values in profile order.
    Passthrough { columns: Vec<String> },
    Standardize(StandardScaler),
    ScaleAndEncode(ScaleAndEncode),
}

impl FeatureTransformer {
    /// Build the transformer described by an artifact.
    ///
    /// # Errors
    /// Returns an error if the preprocessor and the recorded output columns
    /// disagree, or reference fields the profile does not declare.
    pub fn from_spec(
        spec: &PreprocessorSpec,
        input_features: &[String],
        output_columns: &[String],
        profile: &DiseaseProfile,
    ) -> Result<Self, ArtifactSchemaError> {
        let transformer = match spec {
            PreprocessorSpec::Passthrough => {
                if output_columns != input_features {
                    return Err(ArtifactSchemaError::OutputColumns(
                        "pass-through output must equal the input features".into(),
                    ));
                }
                if profile.fields.iter().any(|f| f.kind.is_categorical()) {
                    return Err(ArtifactSchemaError::Preprocessor(
                        "pass-through cannot carry categorical fields".into(),
                    ));
                }
                Self::Passthrough {
                    columns: input_features.to_vec(),
                }
            }
            PreprocessorSpec::StandardScaler(scaler) => {
                if scaler.columns != output_columns {
                    return Err(ArtifactSchemaError::OutputColumns(
                        "scaler columns must equal the output columns".into(),
                    ));
                }
                if scaler.columns != input_features {
                    return Err(ArtifactSchemaError::Preprocessor(
                        "scaler must cover every input feature in order".into(),
                    ));
                }
                check_numeric_columns(&scaler.columns, profile)?;
                Self::Standardize(StandardScaler::from_spec(scaler)?)
            }
            PreprocessorSpec::ColumnTransformer {
                numeric,
                categorical,
            } => Self::ScaleAndEncode(ScaleAndEncode::from_spec(
                numeric,
                categorical,
                input_features,
                output_columns,
                profile,
            )?),
        };
        Ok(transformer)
    }

    /// Number of columns produced.
    #[must_use]
    pub fn width(&self) -> usize {
        match self {
            Self::Passthrough { columns } => columns.len(),
            Self::Standardize(s) => s.columns.len(),
            Self::ScaleAndEncode(s) => s.layout.len(),
        }
    }

    /// Convert a validated payload into the classifier's feature vector.
    ///
    /// # Errors
    /// Returns [`TransformError`] if the payload lacks a column the pipeline
    /// was fitted on.
    pub fn transform(&self, payload: &NormalizedPayload) -> Result<FeatureVector, TransformError> {
        match self {
            Self::Passthrough { columns } => columns
                .iter()
                .map(|c| StandardScaler::numeric(payload, c))
                .collect(),
            Self::Standardize(s) => s.transform(payload),
            Self::ScaleAndEncode(s) => s.transform(payload),
        }
    }
}
