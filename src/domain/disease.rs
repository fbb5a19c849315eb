//! Disease descriptors and their static feature profiles.
//!
//! Field names and constraints follow the datasets the classifiers were
//! trained on (Pima diabetes, UCI heart failure, Oxford Parkinson's voice).

use serde::{Deserialize, Serialize};

/// The three supported disease pipelines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Disease {
    Diabetes,
    Heart,
    Parkinsons,
}

impl Disease {
    /// All diseases, in registry load order.
    pub const ALL: [Disease; 3] = [Disease::Diabetes, Disease::Heart, Disease::Parkinsons];

    /// URL / artifact slug.
    #[must_use]
    pub fn slug(&self) -> &'static str {
        match self {
            Self::Diabetes => "diabetes",
            Self::Heart => "heart",
            Self::Parkinsons => "parkinsons",
        }
    }

    /// Human-readable name, passed to the narrative generator.
    #[must_use]
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Diabetes => "Diabetes",
            Self::Heart => "Heart Disease",
            Self::Parkinsons => "Parkinson's",
        }
    }

    /// File name of the serialized pipeline inside the model directory.
    #[must_use]
    pub fn artifact_file(&self) -> String {
        format!("{}.json", self.slug())
    }

    #[must_use]
    pub fn profile(&self) -> &'static DiseaseProfile {
        match self {
            Self::Diabetes => &DIABETES,
            Self::Heart => &HEART,
            Self::Parkinsons => &PARKINSONS,
        }
    }
}

impl std::fmt::Display for Disease {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.slug())
    }
}

impl std::str::FromStr for Disease {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "diabetes" => Ok(Self::Diabetes),
            "heart" => Ok(Self::Heart),
            "parkinsons" => Ok(Self::Parkinsons),
            other => Err(format!("unknown disease: {other}")),
        }
    }
}

/// Semantic type of a single input field.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldKind {
    /// Whole number with optional inclusive bounds.
    Integer { min: Option<i64>, max: Option<i64> },
    /// Real number with optional inclusive bounds.
    Float { min: Option<f64>, max: Option<f64> },
    /// One of a fixed set of string values.
    Categorical(&'static [&'static str]),
}

impl FieldKind {
    const NON_NEG_INT: Self = Self::Integer { min: Some(0), max: None };
    const NON_NEG_FLOAT: Self = Self::Float { min: Some(0.0), max: None };
    const ANY_FLOAT: Self = Self::Float { min: None, max: None };

    #[must_use]
    pub fn is_categorical(&self) -> bool {
        matches!(self, Self::Categorical(_))
    }

    /// Short type label used in validation messages.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Integer { .. } => "integer",
            Self::Float { .. } => "number",
            Self::Categorical(_) => "string",
        }
    }
}

/// One field of a disease payload.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldSpec {
    /// Name used on the wire and in the training data.
    pub name: &'static str,
    /// Internal identifier, accepted as an alternative key.
    pub ident: &'static str,
    pub kind: FieldKind,
}

impl FieldSpec {
    const fn new(name: &'static str, ident: &'static str, kind: FieldKind) -> Self {
        Self { name, ident, kind }
    }
}

/// Immutable field set of one disease. Changing it requires retraining.
#[derive(Debug)]
pub struct DiseaseProfile {
    pub disease: Disease,
    pub fields: &'static [FieldSpec],
}

impl DiseaseProfile {
    /// External field names, in training order.
    pub fn field_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.fields.iter().map(|f| f.name)
    }

    #[must_use]
    pub fn field(&self, name: &str) -> Option<&'static FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

const SEX: &[&str] = &["M", "F"];
const CHEST_PAIN: &[&str] = &["ATA", "NAP", "ASY", "TA"];
const RESTING_ECG: &[&str] = &["Normal", "ST", "LVH"];
const EXERCISE_ANGINA: &[&str] = &["N", "Y"];
const ST_SLOPE: &[&str] = &["Up", "Flat", "Down"];

static DIABETES: DiseaseProfile = DiseaseProfile {
    disease: Disease::Diabetes,
    fields: &[
        FieldSpec::new("Pregnancies", "pregnancies", FieldKind::NON_NEG_INT),
        FieldSpec::new("Glucose", "glucose", FieldKind::NON_NEG_FLOAT),
        FieldSpec::new("BloodPressure", "blood_pressure", FieldKind::NON_NEG_FLOAT),
        FieldSpec::new("SkinThickness", "skin_thickness", FieldKind::NON_NEG_FLOAT),
        FieldSpec::new("Insulin", "insulin", FieldKind::NON_NEG_FLOAT),
        FieldSpec::new("BMI", "bmi", FieldKind::NON_NEG_FLOAT),
        FieldSpec::new(
            "DiabetesPedigreeFunction",
            "diabetes_pedigree_function",
            FieldKind::NON_NEG_FLOAT,
        ),
        FieldSpec::new("Age", "age", FieldKind::NON_NEG_INT),
    ],
};

static HEART: DiseaseProfile = DiseaseProfile {
    disease: Disease::Heart,
    fields: &[
        FieldSpec::new("Age", "age", FieldKind::NON_NEG_INT),
        FieldSpec::new("Sex", "sex", FieldKind::Categorical(SEX)),
        FieldSpec::new("ChestPainType", "chest_pain_type", FieldKind::Categorical(CHEST_PAIN)),
        FieldSpec::new("RestingBP", "resting_bp", FieldKind::NON_NEG_INT),
        FieldSpec::new("Cholesterol", "cholesterol", FieldKind::NON_NEG_INT),
        // 1 if fasting blood sugar > 120 mg/dl
        FieldSpec::new(
            "FastingBS",
            "fasting_bs",
            FieldKind::Integer { min: Some(0), max: Some(1) },
        ),
        FieldSpec::new("RestingECG", "resting_ecg", FieldKind::Categorical(RESTING_ECG)),
        FieldSpec::new("MaxHR", "max_hr", FieldKind::NON_NEG_INT),
        FieldSpec::new(
            "ExerciseAngina",
            "exercise_angina",
            FieldKind::Categorical(EXERCISE_ANGINA),
        ),
        FieldSpec::new("Oldpeak", "oldpeak", FieldKind::ANY_FLOAT),
        FieldSpec::new("ST_Slope", "st_slope", FieldKind::Categorical(ST_SLOPE)),
    ],
};

static PARKINSONS: DiseaseProfile = DiseaseProfile {
    disease: Disease::Parkinsons,
    fields: &[
        FieldSpec::new("MDVP:Fo(Hz)", "mdvp_fo_hz", FieldKind::ANY_FLOAT),
        FieldSpec::new("MDVP:Fhi(Hz)", "mdvp_fhi_hz", FieldKind::ANY_FLOAT),
        FieldSpec::new("MDVP:Flo(Hz)", "mdvp_flo_hz", FieldKind::ANY_FLOAT),
        FieldSpec::new("MDVP:Jitter(%)", "mdvp_jitter_percent", FieldKind::ANY_FLOAT),
        FieldSpec::new("MDVP:Jitter(Abs)", "mdvp_jitter_abs", FieldKind::ANY_FLOAT),
        FieldSpec::new("MDVP:RAP", "mdvp_rap", FieldKind::ANY_FLOAT),
        FieldSpec::new("MDVP:PPQ", "mdvp_ppq", FieldKind::ANY_FLOAT),
        FieldSpec::new("Jitter:DDP", "jitter_ddp", FieldKind::ANY_FLOAT),
        FieldSpec::new("MDVP:Shimmer", "mdvp_shimmer", FieldKind::ANY_FLOAT),
        FieldSpec::new("MDVP:Shimmer(dB)", "mdvp_shimmer_db", FieldKind::ANY_FLOAT),
        FieldSpec::new("Shimmer:APQ3", "shimmer_apq3", FieldKind::ANY_FLOAT),
        FieldSpec::new("Shimmer:APQ5", "shimmer_apq5", FieldKind::ANY_FLOAT),
        FieldSpec::new("MDVP:APQ", "mdvp_apq", FieldKind::ANY_FLOAT),
        FieldSpec::new("Shimmer:DDA", "shimmer_dda", FieldKind::ANY_FLOAT),
        FieldSpec::new("NHR", "nhr", FieldKind::ANY_FLOAT),
        FieldSpec::new("HNR", "hnr", FieldKind::ANY_FLOAT),
        FieldSpec::new("RPDE", "rpde", FieldKind::ANY_FLOAT),
        FieldSpec::new("DFA", "dfa", FieldKind::ANY_FLOAT),
        FieldSpec::new("spread1", "spread1", FieldKind::ANY_FLOAT),
        FieldSpec::new("spread2", "spread2", FieldKind::ANY_FLOAT),
        FieldSpec::new("D2", "d2", FieldKind::ANY_FLOAT),
        FieldSpec::new("PPE", "ppe", FieldKind::ANY_FLOAT),
    ],
};
