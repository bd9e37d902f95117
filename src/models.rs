use serde::{Deserialize, Serialize};

use crate::errors::PredictionError;
use crate::pipeline::{CellValue, InputRow};

// ============ Field Definitions ============

/// A single-choice input restricted to a closed set of values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CategoricalField {
    /// Column name used at training time.
    pub name: &'static str,
    /// Label shown next to the selector.
    pub label: &'static str,
    /// Permitted values, in display order.
    pub choices: &'static [&'static str],
}

impl CategoricalField {
    /// The value selected when the user makes no explicit choice.
    pub fn default_choice(&self) -> &'static str {
        self.choices[0]
    }

    pub fn contains(&self, value: &str) -> bool {
        self.choices.contains(&value)
    }

    fn resolve(&self, submitted: Option<String>) -> String {
        match submitted {
            Some(value) if !value.trim().is_empty() => value,
            _ => self.default_choice().to_string(),
        }
    }
}

/// A bounded integer input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NumericField {
    pub name: &'static str,
    pub label: &'static str,
    pub min: i64,
    pub max: i64,
    pub default: i64,
}

impl NumericField {
    pub fn clamp(&self, value: i64) -> i64 {
        value.clamp(self.min, self.max)
    }

    /// Turns a submitted value into a bounded integer.
    ///
    /// Missing or blank input takes the default; out-of-range input is
    /// clamped; anything that is not a whole number is rejected.
    pub fn resolve(&self, submitted: Option<NumericInput>) -> Result<i64, PredictionError> {
        let value = match submitted {
            None => return Ok(self.default),
            Some(NumericInput::Int(v)) => v,
            Some(NumericInput::Float(f)) => {
                if !f.is_finite() || f.fract() != 0.0 {
                    return Err(PredictionError::InvalidValue {
                        column: self.name.to_string(),
                        reason: format!("{} is not a whole number", f),
                    });
                }
                // Saturating cast; clamped below anyway.
                f as i64
            }
            Some(NumericInput::Text(raw)) => {
                let trimmed = raw.trim();
                if trimmed.is_empty() {
                    return Ok(self.default);
                }
                trimmed
                    .parse::<i64>()
                    .map_err(|_| PredictionError::InvalidValue {
                        column: self.name.to_string(),
                        reason: format!("'{}' is not a whole number", trimmed),
                    })?
            }
        };
        Ok(self.clamp(value))
    }
}

pub const COUNTRY: CategoricalField = CategoricalField {
    name: "country",
    label: "Country",
    choices: &["Kenya", "Rwanda", "Tanzania", "Uganda"],
};

pub const LOCATION_TYPE: CategoricalField = CategoricalField {
    name: "location_type",
    label: "Location Type",
    choices: &["Rural", "Urban"],
};

pub const CELLPHONE_ACCESS: CategoricalField = CategoricalField {
    name: "cellphone_access",
    label: "Cellphone Access",
    choices: &["No", "Yes"],
};

pub const GENDER_OF_RESPONDENT: CategoricalField = CategoricalField {
    name: "gender_of_respondent",
    label: "Gender",
    choices: &["Male", "Female"],
};

pub const RELATIONSHIP_WITH_HEAD: CategoricalField = CategoricalField {
    name: "relationship_with_head",
    label: "Relationship with Head",
    choices: &[
        "Child",
        "Head of Household",
        "Other non-relatives",
        "Other relative",
        "Parent",
        "Spouse",
    ],
};

pub const MARITAL_STATUS: CategoricalField = CategoricalField {
    name: "marital_status",
    label: "Marital Status",
    // "Seperated" matches the survey's own spelling.
    choices: &[
        "Divorced/Seperated",
        "Married/Living together",
        "Single/Never Married",
        "Widowed",
    ],
};

pub const EDUCATION_LEVEL: CategoricalField = CategoricalField {
    name: "education_level",
    label: "Education Level",
    choices: &[
        "No formal education",
        "Primary education",
        "Secondary education",
        "Tertiary education",
        "Vocational/Specialised training",
    ],
};

pub const JOB_TYPE: CategoricalField = CategoricalField {
    name: "job_type",
    label: "Job Type",
    choices: &[
        "Farming and Fishing",
        "Formally employed Government",
        "Formally employed Private",
        "Government Dependent",
        "Informally employed",
        "Other Income",
        "Remittance Dependent",
        "Self employed",
    ],
};

pub const HOUSEHOLD_SIZE: NumericField = NumericField {
    name: "household_size",
    label: "Household Size",
    min: 1,
    max: 20,
    default: 3,
};

pub const AGE_OF_RESPONDENT: NumericField = NumericField {
    name: "age_of_respondent",
    label: "Age of Respondent",
    min: 15,
    max: 100,
    default: 30,
};

/// The category enumeration table.
pub const CATEGORICAL_FIELDS: [CategoricalField; 8] = [
    COUNTRY,
    LOCATION_TYPE,
    CELLPHONE_ACCESS,
    GENDER_OF_RESPONDENT,
    RELATIONSHIP_WITH_HEAD,
    MARITAL_STATUS,
    EDUCATION_LEVEL,
    JOB_TYPE,
];

pub const NUMERIC_FIELDS: [NumericField; 2] = [HOUSEHOLD_SIZE, AGE_OF_RESPONDENT];

/// One control on the form.
#[derive(Debug, Clone, Copy)]
pub enum FormControl {
    Select(CategoricalField),
    Number(NumericField),
}

impl FormControl {
    pub fn name(&self) -> &'static str {
        match self {
            FormControl::Select(field) => field.name,
            FormControl::Number(field) => field.name,
        }
    }
}

/// Controls in the order they appear on the page.
pub const FORM_LAYOUT: [FormControl; 10] = [
    FormControl::Select(COUNTRY),
    FormControl::Select(LOCATION_TYPE),
    FormControl::Select(CELLPHONE_ACCESS),
    FormControl::Number(HOUSEHOLD_SIZE),
    FormControl::Number(AGE_OF_RESPONDENT),
    FormControl::Select(GENDER_OF_RESPONDENT),
    FormControl::Select(RELATIONSHIP_WITH_HEAD),
    FormControl::Select(MARITAL_STATUS),
    FormControl::Select(EDUCATION_LEVEL),
    FormControl::Select(JOB_TYPE),
];

// ============ Respondent Record ============

/// One survey respondent, as collected from a single form submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RespondentRecord {
    pub country: String,
    pub location_type: String,
    pub cellphone_access: String,
    pub household_size: i64,
    pub age_of_respondent: i64,
    pub gender_of_respondent: String,
    pub relationship_with_head: String,
    pub marital_status: String,
    pub education_level: String,
    pub job_type: String,
}

impl Default for RespondentRecord {
    /// The state of an untouched form.
    fn default() -> Self {
        Self {
            country: COUNTRY.default_choice().to_string(),
            location_type: LOCATION_TYPE.default_choice().to_string(),
            cellphone_access: CELLPHONE_ACCESS.default_choice().to_string(),
            household_size: HOUSEHOLD_SIZE.default,
            age_of_respondent: AGE_OF_RESPONDENT.default,
            gender_of_respondent: GENDER_OF_RESPONDENT.default_choice().to_string(),
            relationship_with_head: RELATIONSHIP_WITH_HEAD.default_choice().to_string(),
            marital_status: MARITAL_STATUS.default_choice().to_string(),
            education_level: EDUCATION_LEVEL.default_choice().to_string(),
            job_type: JOB_TYPE.default_choice().to_string(),
        }
    }
}

impl RespondentRecord {
    /// Current value of a categorical column, if the record has one by that name.
    pub fn categorical_value(&self, name: &str) -> Option<&str> {
        let value = match name {
            "country" => &self.country,
            "location_type" => &self.location_type,
            "cellphone_access" => &self.cellphone_access,
            "gender_of_respondent" => &self.gender_of_respondent,
            "relationship_with_head" => &self.relationship_with_head,
            "marital_status" => &self.marital_status,
            "education_level" => &self.education_level,
            "job_type" => &self.job_type,
            _ => return None,
        };
        Some(value.as_str())
    }

    pub fn numeric_value(&self, name: &str) -> Option<i64> {
        match name {
            "household_size" => Some(self.household_size),
            "age_of_respondent" => Some(self.age_of_respondent),
            _ => None,
        }
    }

    /// Converts the record into the single-row table the pipeline consumes.
    pub fn to_row(&self) -> InputRow {
        let mut row = InputRow::new();
        for field in CATEGORICAL_FIELDS {
            if let Some(value) = self.categorical_value(field.name) {
                row.insert(field.name, CellValue::Text(value.to_string()));
            }
        }
        for field in NUMERIC_FIELDS {
            if let Some(value) = self.numeric_value(field.name) {
                row.insert(field.name, CellValue::Number(value as f64));
            }
        }
        row
    }
}

// ============ Submissions ============

/// A numeric value as it arrives from a form (text) or JSON (number).
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum NumericInput {
    Int(i64),
    Float(f64),
    Text(String),
}

/// Raw submission from the HTML form or the JSON endpoint.
///
/// Every field is optional; missing values fall back to the control's default.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PredictForm {
    pub country: Option<String>,
    pub location_type: Option<String>,
    pub cellphone_access: Option<String>,
    pub household_size: Option<NumericInput>,
    pub age_of_respondent: Option<NumericInput>,
    pub gender_of_respondent: Option<String>,
    pub relationship_with_head: Option<String>,
    pub marital_status: Option<String>,
    pub education_level: Option<String>,
    pub job_type: Option<String>,
}

impl PredictForm {
    /// Assembles the submission into a record.
    ///
    /// Categorical values are passed through untouched; membership in the
    /// enumeration is the pipeline's concern.
    pub fn into_record(self) -> Result<RespondentRecord, PredictionError> {
        Ok(RespondentRecord {
            country: COUNTRY.resolve(self.country),
            location_type: LOCATION_TYPE.resolve(self.location_type),
            cellphone_access: CELLPHONE_ACCESS.resolve(self.cellphone_access),
            household_size: HOUSEHOLD_SIZE.resolve(self.household_size)?,
            age_of_respondent: AGE_OF_RESPONDENT.resolve(self.age_of_respondent)?,
            gender_of_respondent: GENDER_OF_RESPONDENT.resolve(self.gender_of_respondent),
            relationship_with_head: RELATIONSHIP_WITH_HEAD.resolve(self.relationship_with_head),
            marital_status: MARITAL_STATUS.resolve(self.marital_status),
            education_level: EDUCATION_LEVEL.resolve(self.education_level),
            job_type: JOB_TYPE.resolve(self.job_type),
        })
    }
}

impl From<&RespondentRecord> for PredictForm {
    fn from(record: &RespondentRecord) -> Self {
        Self {
            country: Some(record.country.clone()),
            location_type: Some(record.location_type.clone()),
            cellphone_access: Some(record.cellphone_access.clone()),
            household_size: Some(NumericInput::Int(record.household_size)),
            age_of_respondent: Some(NumericInput::Int(record.age_of_respondent)),
            gender_of_respondent: Some(record.gender_of_respondent.clone()),
            relationship_with_head: Some(record.relationship_with_head.clone()),
            marital_status: Some(record.marital_status.clone()),
            education_level: Some(record.education_level.clone()),
            job_type: Some(record.job_type.clone()),
        }
    }
}

// ============ Prediction Results ============

/// Binary class predicted by the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BankAccountLabel {
    /// Label 0.
    Unlikely,
    /// Label 1.
    Likely,
}

impl BankAccountLabel {
    pub fn from_class(label: i64) -> Result<Self, PredictionError> {
        match label {
            0 => Ok(BankAccountLabel::Unlikely),
            1 => Ok(BankAccountLabel::Likely),
            other => Err(PredictionError::UnexpectedLabel(other)),
        }
    }

    pub fn class(&self) -> u8 {
        match self {
            BankAccountLabel::Unlikely => 0,
            BankAccountLabel::Likely => 1,
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            BankAccountLabel::Unlikely => "Unlikely to have a bank account",
            BankAccountLabel::Likely => "Likely to have a bank account",
        }
    }
}

/// A successful prediction: the label plus the positive-class probability.
#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    pub label: BankAccountLabel,
    pub probability: f64,
}

impl Prediction {
    /// e.g. `Likely to have a bank account (Probability: 70.1%)`
    pub fn summary(&self) -> String {
        format!(
            "{} (Probability: {})",
            self.label.message(),
            format_percentage(self.probability)
        )
    }
}

/// Terminal state of one submission.
#[derive(Debug, Clone, PartialEq)]
pub enum PredictionOutcome {
    Succeeded(Prediction),
    Failed { reason: String },
}

impl PredictionOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, PredictionOutcome::Succeeded(_))
    }
}

/// Formats a probability as a percentage with one decimal place.
pub fn format_percentage(probability: f64) -> String {
    format!("{:.1}%", probability * 100.0)
}
