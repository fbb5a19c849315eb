//! Probabilistic binary classifiers.

use super::artifact::{ArtifactSchemaError, ClassifierSpec, TreeNode, TreeSpec};
use super::transform::TransformError;

/// Output of a classifier for one feature vector.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Classification {
    /// 1 = disease present.
    pub label: u8,
    /// Probability of the positive class, in [0, 1].
    pub probability: f64,
}

impl Classification {
    /// Argmax over {negative, positive}; a tie goes to the negative class.
    fn from_probability(probability: f64) -> Self {
        let probability = probability.clamp(0.0, 1.0);
        Self {
            label: u8::from(probability > 0.5),
            probability,
        }
    }
}

#[derive(Debug, Clone)]
pub struct LogisticRegression {
    coefficients: Vec<f64>,
    intercept: f64,
}

impl LogisticRegression {
    fn predict_proba(&self, x: &[f64]) -> f64 {
        let z: f64 = self
            .coefficients
            .iter()
            .zip(x)
            .map(|(w, v)| w * v)
            .sum::<f64>()
            + self.intercept;
        sigmoid(z)
    }
}

fn sigmoid(z: f64) -> f64 {
    1.0 / (1.0 + (-z).exp())
}

#[derive(Debug, Clone)]
struct DecisionTree {
    nodes: Vec<TreeNode>,
}

impl DecisionTree {
    fn from_spec(spec: &TreeSpec, n_features: usize) -> Result<Self, String> {
        if spec.nodes.is_empty() {
            return Err("tree has no nodes".into());
        }
        let n = spec.nodes.len();
        for (i, node) in spec.nodes.iter().enumerate() {
            match *node {
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    if feature >= n_features {
                        return Err(format!("node {i} splits on feature {feature} of {n_features}"));
                    }
                    if !threshold.is_finite() {
                        return Err(format!("node {i} has a non-finite threshold"));
                    }
                    // Children after parents rules out cycles.
                    if left <= i || right <= i || left >= n || right >= n {
                        return Err(format!("node {i} has invalid children ({left}, {right})"));
                    }
                }
                TreeNode::Leaf { positive } => {
                    if !(0.0..=1.0).contains(&positive) {
                        return Err(format!("leaf {i} probability {positive} outside [0, 1]"));
                    }
                }
            }
        }
        Ok(Self {
            nodes: spec.nodes.clone(),
        })
    }

    fn leaf_probability(&self, x: &[f64]) -> f64 {
        let mut i = 0;
        loop {
            match self.nodes[i] {
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => i = if x[feature] <= threshold { left } else { right },
                TreeNode::Leaf { positive } => return positive,
            }
        }
    }
}

/// Averages per-tree leaf probabilities.
#[derive(Debug, Clone)]
pub struct RandomForest {
    n_features: usize,
    trees: Vec<DecisionTree>,
}

impl RandomForest {
    fn predict_proba(&self, x: &[f64]) -> f64 {
        let sum: f64 = self.trees.iter().map(|t| t.leaf_probability(x)).sum();
        sum / self.trees.len() as f64
    }
}

/// Closed set of supported model families.
#[derive(Debug, Clone)]
pub enum Classifier {
    Logistic(LogisticRegression),
    Forest(RandomForest),
}

impl Classifier {
    /// Build a classifier from artifact parameters.
    ///
    /// # Errors
    /// Returns an error for empty models, non-finite weights or malformed trees.
    pub fn from_spec(spec: &ClassifierSpec) -> Result<Self, ArtifactSchemaError> {
        match spec {
            ClassifierSpec::LogisticRegression {
                coefficients,
                intercept,
            } => {
                if coefficients.is_empty() {
                    return Err(ArtifactSchemaError::Classifier("no coefficients".into()));
                }
                if !intercept.is_finite() || coefficients.iter().any(|w| !w.is_finite()) {
                    return Err(ArtifactSchemaError::Classifier(
                        "non-finite logistic parameters".into(),
                    ));
                }
                Ok(Self::Logistic(LogisticRegression {
                    coefficients: coefficients.clone(),
                    intercept: *intercept,
                }))
            }
            ClassifierSpec::RandomForest { n_features, trees } => {
                if *n_features == 0 || trees.is_empty() {
                    return Err(ArtifactSchemaError::Classifier("empty forest".into()));
                }
                let trees = trees
                    .iter()
                    .enumerate()
                    .map(|(i, t)| {
                        DecisionTree::from_spec(t, *n_features)
                            .map_err(|e| ArtifactSchemaError::Classifier(format!("tree {i}: {e}")))
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Self::Forest(RandomForest {
                    n_features: *n_features,
                    trees,
                }))
            }
        }
    }

    /// Input width the classifier was fitted on.
    #[must_use]
    pub fn n_features(&self) -> usize {
        match self {
            Self::Logistic(m) => m.coefficients.len(),
            Self::Forest(m) => m.n_features,
        }
    }

    /// Classify one feature vector. Deterministic.
    ///
    /// # Errors
    /// Returns [`TransformError::WidthMismatch`] if `x` is not exactly
    /// [`Self::n_features`] wide.
    pub fn classify(&self, x: &[f64]) -> Result<Classification, TransformError> {
        if x.len() != self.n_features() {
            return Err(TransformError::WidthMismatch {
                expected: self.n_features(),
                actual: x.len(),
            });
        }
        let p = match self {
            Self::Logistic(m) => m.predict_proba(x),
            Self::Forest(m) => m.predict_proba(x),
        };
        Ok(Classification::from_probability(p))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stump(feature: usize, threshold: f64, lo: f64, hi: f64) -> TreeSpec {
        TreeSpec {
            nodes: vec![
                TreeNode::Split {
                    feature,
                    threshold,
                    left: 1,
                    right: 2,
                },
                TreeNode::Leaf { positive: lo },
                TreeNode::Leaf { positive: hi },
            ],
        }
    }

    #[test]
    fn test_logistic_probability() {
        let clf = Classifier::from_spec(&ClassifierSpec::LogisticRegression {
            coefficients: vec![1.0, -1.0],
            intercept: 0.0,
        })
        .expect("valid");

        let c = clf.classify(&[0.0, 0.0]).expect("classify");
        assert!((c.probability - 0.5).abs() < 1e-12);
        assert_eq!(c.label, 0, "tie goes to negative class");

        let c = clf.classify(&[3.0, 0.0]).expect("classify");
        assert!(c.probability > 0.95);
        assert_eq!(c.label, 1);
    }

    #[test]
    fn test_forest_averages_trees() {
        let clf = Classifier::from_spec(&ClassifierSpec::RandomForest {
            n_features: 2,
            trees: vec![stump(0, 1.0, 0.2, 0.8), stump(1, 5.0, 0.0, 0.6)],
        })
        .expect("valid");

        // left at threshold: x <= t
        let c = clf.classify(&[1.0, 6.0]).expect("classify");
        assert!((c.probability - 0.4).abs() < 1e-12);
        assert_eq!(c.label, 0);

        let c = clf.classify(&[2.0, 6.0]).expect("classify");
        assert!((c.probability - 0.7).abs() < 1e-12);
        assert_eq!(c.label, 1);
    }

    #[test]
    fn test_width_mismatch() {
        let clf = Classifier::from_spec(&ClassifierSpec::LogisticRegression {
            coefficients: vec![1.0, 2.0, 3.0],
            intercept: 0.0,
        })
        .expect("valid");
        let err = clf.classify(&[1.0, 2.0]).expect_err("too short");
        assert_eq!(
            err,
            TransformError::WidthMismatch {
                expected: 3,
                actual: 2
            }
        );
    }

    #[test]
    fn test_rejects_cyclic_tree() {
        let spec = ClassifierSpec::RandomForest {
            n_features: 1,
            trees: vec![TreeSpec {
                nodes: vec![
                    TreeNode::Split {
                        feature: 0,
                        threshold: 0.0,
                        left: 0,
                        right: 1,
                    },
                    TreeNode::Leaf { positive: 0.5 },
                ],
            }],
        };
        assert!(Classifier::from_spec(&spec).is_err());
    }

    #[test]
    fn test_rejects_bad_leaf_and_feature_index() {
        let spec = ClassifierSpec::RandomForest {
            n_features: 1,
            trees: vec![stump(0, 0.0, 0.1, 1.5)],
        };
        assert!(Classifier::from_spec(&spec).is_err());

        let spec = ClassifierSpec::RandomForest {
            n_features: 1,
            trees: vec![stump(3, 0.0, 0.1, 0.9)],
        };
        assert!(Classifier::from_spec(&spec).is_err());
    }
}
