//! Feature schema validation.
//!
//! Checks a raw JSON payload against a [`DiseaseProfile`] and collects every
//! offending field instead of stopping at the first one.

use serde::Serialize;
use serde_json::Value;

use super::disease::{DiseaseProfile, FieldKind, FieldSpec};
use super::payload::{FeatureValue, NormalizedPayload};

/// Category of a single field failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldErrorKind {
    Missing,
    InvalidType,
    OutOfRange,
    UnknownCategory,
}

/// One offending field.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub kind: FieldErrorKind,
    pub message: String,
}

impl FieldError {
    fn new(field: impl Into<String>, kind: FieldErrorKind, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            kind,
            message: message.into(),
        }
    }
}

/// Client input was malformed, out of range or used an unknown category.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{} invalid field(s): {}", .errors.len(), field_list(.errors))]
pub struct ValidationError {
    pub errors: Vec<FieldError>,
}

impl ValidationError {
    /// Single error about the request body as a whole.
    #[must_use]
    pub fn body(message: impl Into<String>) -> Self {
        Self {
            errors: vec![FieldError::new("body", FieldErrorKind::InvalidType, message)],
        }
    }

    /// Names of the offending fields, in profile order.
    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.errors.iter().map(|e| e.field.as_str())
    }
}

fn field_list(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(|e| e.field.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Validate `raw` against `profile`.
///
/// Unknown extra keys are ignored. A field may be supplied under its
/// external name or its internal identifier; the external name wins.
///
/// # Errors
/// Returns a [`ValidationError`] listing every missing or invalid field.
pub fn validate(profile: &DiseaseProfile, raw: &Value) -> Result<NormalizedPayload, ValidationError> {
    let Some(object) = raw.as_object() else {
        return Err(ValidationError::body("request body must be a JSON object"));
    };

    let mut payload = NormalizedPayload::with_capacity(profile.len());
    let mut errors = Vec::new();

    for spec in profile.fields {
        let value = object
            .get(spec.name)
            .or_else(|| object.get(spec.ident))
            .filter(|v| !v.is_null());

        let Some(value) = value else {
            errors.push(FieldError::new(
                spec.name,
                FieldErrorKind::Missing,
                "field required",
            ));
            continue;
        };

        match coerce(spec, value) {
            Ok(v) => payload.push(spec.name, v),
            Err(e) => errors.push(e),
        }
    }

    if errors.is_empty() {
        Ok(payload)
    } else {
        Err(ValidationError { errors })
    }
}

fn coerce(spec: &FieldSpec, value: &Value) -> Result<FeatureValue, FieldError> {
    match spec.kind {
        FieldKind::Integer { min, max } => {
            let n = as_number(value).ok_or_else(|| type_error(spec, value))?;
            if n.fract() != 0.0 || n.abs() > i64::MAX as f64 {
                return Err(type_error(spec, value));
            }
            let n = n as i64;
            if min.is_some_and(|m| n < m) || max.is_some_and(|m| n > m) {
                return Err(range_error(spec, n as f64, min.map(|m| m as f64), max.map(|m| m as f64)));
            }
            Ok(FeatureValue::Integer(n))
        }
        FieldKind::Float { min, max } => {
            let n = as_number(value).ok_or_else(|| type_error(spec, value))?;
            if min.is_some_and(|m| n < m) || max.is_some_and(|m| n > m) {
                return Err(range_error(spec, n, min, max));
            }
            Ok(FeatureValue::Float(n))
        }
        FieldKind::Categorical(allowed) => {
            let s = value.as_str().ok_or_else(|| type_error(spec, value))?;
            if !allowed.contains(&s) {
                return Err(FieldError::new(
                    spec.name,
                    FieldErrorKind::UnknownCategory,
                    format!("'{s}' is not one of {}", allowed.join(", ")),
                ));
            }
            Ok(FeatureValue::Category(s.to_string()))
        }
    }
}

/// JSON numbers and numeric strings; never booleans or non-finite values.
fn as_number(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    n.is_finite().then_some(n)
}

fn type_error(spec: &FieldSpec, value: &Value) -> FieldError {
    let got = match value {
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
        Value::Null => "null",
    };
    FieldError::new(
        spec.name,
        FieldErrorKind::InvalidType,
        format!("expected {}, got {got}", spec.kind.type_name()),
    )
}

fn range_error(spec: &FieldSpec, n: f64, min: Option<f64>, max: Option<f64>) -> FieldError {
    let bound = match (min, max) {
        (Some(lo), Some(hi)) => format!("in [{lo}, {hi}]"),
        (Some(lo), None) => format!(">= {lo}"),
        (None, Some(hi)) => format!("<= {hi}"),
        (None, None) => String::new(),
    };
    FieldError::new(
        spec.name,
        FieldErrorKind::OutOfRange,
        format!("{n} must be {bound}"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Disease;
    use serde_json::json;

    fn heart_payload() -> Value {
        json!({
            "Age": 40,
            "Sex": "M",
            "ChestPainType": "ATA",
            "RestingBP": 140,
            "Cholesterol": 289,
            "FastingBS": 0,
            "RestingECG": "Normal",
            "MaxHR": 172,
            "ExerciseAngina": "N",
            "Oldpeak": 0.0,
            "ST_Slope": "Up"
        })
    }

    #[test]
    fn test_valid_heart_payload() {
        let payload = validate(Disease::Heart.profile(), &heart_payload()).expect("valid");
        assert_eq!(payload.len(), 11);
        assert_eq!(payload.get("Age"), Some(&FeatureValue::Integer(40)));
        assert_eq!(payload.get("Sex").and_then(|v| v.as_category()), Some("M"));
    }

    #[test]
    fn test_unknown_chest_pain_type_rejected() {
        let mut raw = heart_payload();
        raw["ChestPainType"] = json!("XYZ");

        let err = validate(Disease::Heart.profile(), &raw).expect_err("must fail");
        assert_eq!(err.errors.len(), 1);
        assert_eq!(err.errors[0].field, "ChestPainType");
        assert_eq!(err.errors[0].kind, FieldErrorKind::UnknownCategory);
    }

    #[test]
    fn test_missing_field_listed_exactly() {
        let mut raw = heart_payload();
        raw.as_object_mut().expect("object").remove("MaxHR");

        let err = validate(Disease::Heart.profile(), &raw).expect_err("must fail");
        assert_eq!(err.fields().collect::<Vec<_>>(), vec!["MaxHR"]);
        assert_eq!(err.errors[0].kind, FieldErrorKind::Missing);
    }

    #[test]
    fn test_all_offending_fields_reported() {
        let raw = json!({
            "Pregnancies": -1,
            "Glucose": "high",
            "BloodPressure": 72,
            "SkinThickness": 35,
            "Insulin": 0,
            "BMI": 33.6,
            "DiabetesPedigreeFunction": 0.627,
        });

        let err = validate(Disease::Diabetes.profile(), &raw).expect_err("must fail");
        let fields: Vec<_> = err.fields().collect();
        assert_eq!(fields, vec!["Pregnancies", "Glucose", "Age"]);
        assert_eq!(err.errors[0].kind, FieldErrorKind::OutOfRange);
        assert_eq!(err.errors[1].kind, FieldErrorKind::InvalidType);
        assert_eq!(err.errors[2].kind, FieldErrorKind::Missing);
    }

    #[test]
    fn test_fasting_bs_upper_bound() {
        let mut raw = heart_payload();
        raw["FastingBS"] = json!(2);
        let err = validate(Disease::Heart.profile(), &raw).expect_err("must fail");
        assert_eq!(err.errors[0].field, "FastingBS");
        assert_eq!(err.errors[0].kind, FieldErrorKind::OutOfRange);
    }

    #[test]
    fn test_integer_coercion_rules() {
        let mut raw = heart_payload();
        raw["Age"] = json!(40.0);
        raw["RestingBP"] = json!("140");
        let payload = validate(Disease::Heart.profile(), &raw).expect("coerced");
        assert_eq!(payload.get("Age"), Some(&FeatureValue::Integer(40)));
        assert_eq!(payload.get("RestingBP"), Some(&FeatureValue::Integer(140)));

        raw["Age"] = json!(40.5);
        let err = validate(Disease::Heart.profile(), &raw).expect_err("fractional age");
        assert_eq!(err.errors[0].kind, FieldErrorKind::InvalidType);

        raw["Age"] = json!(true);
        assert!(validate(Disease::Heart.profile(), &raw).is_err());
    }

    #[test]
    fn test_extra_fields_ignored_and_idents_accepted() {
        let mut raw = heart_payload();
        raw["PatientNote"] = json!("ignored");
        let obj = raw.as_object_mut().expect("object");
        let age = obj.remove("Age").expect("age");
        obj.insert("age".into(), age);

        let payload = validate(Disease::Heart.profile(), &raw).expect("valid");
        assert_eq!(payload.len(), 11);
        assert!(payload.get("PatientNote").is_none());
        assert_eq!(payload.get("Age"), Some(&FeatureValue::Integer(40)));
    }

    #[test]
    fn test_non_object_body() {
        let err = validate(Disease::Diabetes.profile(), &json!([1, 2, 3])).expect_err("array");
        assert_eq!(err.errors[0].field, "body");
    }

    #[test]
    fn test_oldpeak_may_be_negative() {
        let mut raw = heart_payload();
        raw["Oldpeak"] = json!(-0.5);
        assert!(validate(Disease::Heart.profile(), &raw).is_ok());
    }
}
