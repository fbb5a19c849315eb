//! Prediction result types and risk bucketing.

use serde::{Deserialize, Serialize};

use super::classifier::Classification;

/// Risk tier derived from the positive-class probability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RiskLevel {
    /// p < 0.3
    Low,
    /// 0.3 <= p < 0.7
    Medium,
    /// p >= 0.7
    High,
}

impl RiskLevel {
    pub const MEDIUM_THRESHOLD: f64 = 0.3;
    pub const HIGH_THRESHOLD: f64 = 0.7;

    /// Bucket a probability. Each band includes its lower bound.
    #[must_use]
    pub fn from_probability(p: f64) -> Self {
        if p < Self::MEDIUM_THRESHOLD {
            Self::Low
        } else if p < Self::HIGH_THRESHOLD {
            Self::Medium
        } else {
            Self::High
        }
    }
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Low => write!(f, "Low"),
            Self::Medium => write!(f, "Medium"),
            Self::High => write!(f, "High"),
        }
    }
}

/// Label, probability and tier for one request. Never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PredictionResult {
    /// Binary prediction (0 = no disease, 1 = disease present)
    pub prediction: u8,

    /// Positive-class probability (0.0 to 1.0), unrounded
    pub probability: f64,

    pub risk_level: RiskLevel,
}

impl From<Classification> for PredictionResult {
    fn from(c: Classification) -> Self {
        Self {
            prediction: c.label,
            probability: c.probability,
            risk_level: RiskLevel::from_probability(c.probability),
        }
    }
}

/// Round to three decimal places for the wire.
#[must_use]
pub fn round3(p: f64) -> f64 {
    (p * 1000.0).round() / 1000.0
}
