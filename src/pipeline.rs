//! Prediction pipeline contract and the exported logistic-regression pipeline.
//!
//! The training side exports a fitted pipeline as JSON: a one-hot encoder for
//! the categorical columns, standardization parameters for the numeric
//! columns, and a binary logistic-regression classifier over the encoded
//! features. Encoded feature order is every categorical column's categories
//! in encoder order, followed by the numeric columns.

use serde::Deserialize;
use std::collections::BTreeMap;

use crate::errors::PredictionError;

/// Artifact format version this build can evaluate.
pub const SUPPORTED_FORMAT_VERSION: u32 = 1;

/// A single cell of the input row.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Text(String),
    Number(f64),
}

/// Single-row tabular input, addressed by column name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InputRow {
    columns: BTreeMap<String, CellValue>,
}

impl InputRow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, column: impl Into<String>, value: CellValue) {
        self.columns.insert(column.into(), value);
    }

    pub fn get(&self, column: &str) -> Option<&CellValue> {
        self.columns.get(column)
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.keys().map(String::as_str)
    }
}

/// Anything that can classify and score a single input row.
///
/// Implementations are shared read-only across all requests.
pub trait PredictionPipeline: Send + Sync {
    /// Predicted class label for the row.
    fn classify(&self, row: &InputRow) -> Result<i64, PredictionError>;

    /// Per-class probabilities for the row, indexed by class label.
    fn score(&self, row: &InputRow) -> Result<Vec<f64>, PredictionError>;
}

/// What to do with a category the encoder was not fitted on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum HandleUnknown {
    #[default]
    Error,
    /// Encode as all zeros.
    Ignore,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CategoricalEncoding {
    pub column: String,
    pub categories: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NumericScaling {
    pub column: String,
    pub mean: f64,
    pub scale: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EncoderModel {
    pub categorical: Vec<CategoricalEncoding>,
    #[serde(default)]
    pub numeric: Vec<NumericScaling>,
    #[serde(default)]
    pub handle_unknown: HandleUnknown,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LogisticRegressionModel {
    pub coefficients: Vec<f64>,
    pub intercept: f64,
}

/// The exported pipeline artifact.
#[derive(Debug, Clone, Deserialize)]
pub struct LogisticPipeline {
    pub format_version: u32,
    pub encoder: EncoderModel,
    pub classifier: LogisticRegressionModel,
}

impl LogisticPipeline {
    /// Width of the encoded feature vector.
    pub fn feature_width(&self) -> usize {
        let one_hot: usize = self
            .encoder
            .categorical
            .iter()
            .map(|encoding| encoding.categories.len())
            .sum();
        one_hot + self.encoder.numeric.len()
    }

    /// Columns the encoder one-hot encodes, in encoder order.
    pub fn categorical_columns(&self) -> Vec<&str> {
        self.encoder
            .categorical
            .iter()
            .map(|encoding| encoding.column.as_str())
            .collect()
    }

    pub fn numeric_columns(&self) -> Vec<&str> {
        self.encoder
            .numeric
            .iter()
            .map(|scaling| scaling.column.as_str())
            .collect()
    }

    /// Checks the fitted parameters are internally coherent.
    pub fn validate(&self) -> Result<(), String> {
        if self.encoder.categorical.is_empty() && self.encoder.numeric.is_empty() {
            return Err("encoder has no columns".to_string());
        }
        let width = self.feature_width();
        if self.classifier.coefficients.len() != width {
            return Err(format!(
                "classifier has {} coefficients but the encoder produces {} features",
                self.classifier.coefficients.len(),
                width
            ));
        }
        for encoding in &self.encoder.categorical {
            if encoding.categories.is_empty() {
                return Err(format!("column '{}' has no categories", encoding.column));
            }
        }
        for scaling in &self.encoder.numeric {
            if !scaling.scale.is_finite() || scaling.scale == 0.0 {
                return Err(format!(
                    "column '{}' has an unusable scale {}",
                    scaling.column, scaling.scale
                ));
            }
        }
        if self
            .classifier
            .coefficients
            .iter()
            .chain(std::iter::once(&self.classifier.intercept))
            .any(|c| !c.is_finite())
        {
            return Err("classifier parameters must be finite".to_string());
        }
        Ok(())
    }

    /// Encodes the row into the feature vector the classifier was fitted on.
    pub fn transform(&self, row: &InputRow) -> Result<Vec<f64>, PredictionError> {
        let mut features = Vec::with_capacity(self.feature_width());

        for encoding in &self.encoder.categorical {
            let value = match row.get(&encoding.column) {
                Some(CellValue::Text(value)) => value.clone(),
                Some(CellValue::Number(n)) => n.to_string(),
                None => return Err(PredictionError::MissingColumn(encoding.column.clone())),
            };
            let position = encoding.categories.iter().position(|c| *c == value);
            if position.is_none() && self.encoder.handle_unknown == HandleUnknown::Error {
                return Err(PredictionError::UnknownCategory {
                    column: encoding.column.clone(),
                    value,
                });
            }
            features.extend(
                (0..encoding.categories.len()).map(|i| if Some(i) == position { 1.0 } else { 0.0 }),
            );
        }

        for scaling in &self.encoder.numeric {
            let value = match row.get(&scaling.column) {
                Some(CellValue::Number(n)) => *n,
                Some(CellValue::Text(text)) => {
                    text.trim()
                        .parse::<f64>()
                        .map_err(|_| PredictionError::InvalidValue {
                            column: scaling.column.clone(),
                            reason: format!("could not convert string to float: '{}'", text),
                        })?
                }
                None => return Err(PredictionError::MissingColumn(scaling.column.clone())),
            };
            features.push((value - scaling.mean) / scaling.scale);
        }

        Ok(features)
    }

    fn decision_function(&self, row: &InputRow) -> Result<f64, PredictionError> {
        let features = self.transform(row)?;
        if features.len() != self.classifier.coefficients.len() {
            return Err(PredictionError::ShapeMismatch {
                expected: self.classifier.coefficients.len(),
                found: features.len(),
            });
        }
        let dot: f64 = features
            .iter()
            .zip(&self.classifier.coefficients)
            .map(|(x, w)| x * w)
            .sum();
        Ok(dot + self.classifier.intercept)
    }
}

impl PredictionPipeline for LogisticPipeline {
    fn classify(&self, row: &InputRow) -> Result<i64, PredictionError> {
        let decision = self.decision_function(row)?;
        Ok(if decision > 0.0 { 1 } else { 0 })
    }

    fn score(&self, row: &InputRow) -> Result<Vec<f64>, PredictionError> {
        let positive = sigmoid(self.decision_function(row)?);
        Ok(vec![1.0 - positive, positive])
    }
}

fn sigmoid(z: f64) -> f64 {
    1.0 / (1.0 + (-z).exp())
}
