use std::sync::Arc;
use uuid::Uuid;

use crate::artifacts::LoadedArtifacts;
use crate::errors::PredictionError;
use crate::models::{BankAccountLabel, PredictForm, Prediction, PredictionOutcome, RespondentRecord};
use crate::pipeline::PredictionPipeline;

/// Result of dispatching one submission.
#[derive(Debug, Clone)]
pub struct Dispatch {
    /// Correlates log lines and API responses for this submission.
    pub prediction_id: Uuid,
    /// The assembled record; absent when assembly itself failed.
    pub record: Option<RespondentRecord>,
    pub outcome: PredictionOutcome,
}

/// Turns submissions into predictions using the loaded pipeline.
///
/// Built once at startup and shared by every request. Holds nothing mutable.
#[derive(Clone)]
pub struct PredictionService {
    artifacts: Arc<LoadedArtifacts>,
}

impl PredictionService {
    pub fn new(artifacts: Arc<LoadedArtifacts>) -> Self {
        Self { artifacts }
    }

    /// Builds a service around an in-memory pipeline.
    pub fn with_pipeline(pipeline: Arc<dyn PredictionPipeline>, categorical_columns: Vec<String>) -> Self {
        Self::new(Arc::new(LoadedArtifacts::from_parts(
            pipeline,
            categorical_columns,
        )))
    }

    pub fn artifacts(&self) -> &Arc<LoadedArtifacts> {
        &self.artifacts
    }

    /// Runs the pipeline on one record.
    pub fn predict(&self, record: &RespondentRecord) -> Result<Prediction, PredictionError> {
        let row = record.to_row();
        let pipeline = &self.artifacts.pipeline;

        let label = BankAccountLabel::from_class(pipeline.classify(&row)?)?;

        let probabilities = pipeline.score(&row)?;
        let probability = *probabilities.get(1).ok_or(PredictionError::ShapeMismatch {
            expected: 2,
            found: probabilities.len(),
        })?;

        Ok(Prediction { label, probability })
    }

    /// Assembles a submission and predicts on it.
    ///
    /// Never fails: any error becomes `PredictionOutcome::Failed` carrying the
    /// error's description.
    pub fn dispatch(&self, form: PredictForm) -> Dispatch {
        let prediction_id = Uuid::new_v4();

        let record = match form.into_record() {
            Ok(record) => record,
            Err(e) => {
                tracing::warn!("[{}] Could not assemble respondent record: {}", prediction_id, e);
                return Dispatch {
                    prediction_id,
                    record: None,
                    outcome: PredictionOutcome::Failed {
                        reason: e.to_string(),
                    },
                };
            }
        };
        tracing::debug!("[{}] Dispatching record: {:?}", prediction_id, record);

        let outcome = match self.predict(&record) {
            Ok(prediction) => {
                tracing::info!(
                    "[{}] Prediction: label={} probability={:.4}",
                    prediction_id,
                    prediction.label.class(),
                    prediction.probability
                );
                PredictionOutcome::Succeeded(prediction)
            }
            Err(e) => {
                tracing::warn!("[{}] Prediction failed: {}", prediction_id, e);
                PredictionOutcome::Failed {
                    reason: e.to_string(),
                }
            }
        };

        Dispatch {
            prediction_id,
            record: Some(record),
            outcome,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::InputRow;

    struct FixedPipeline {
        label: i64,
        scores: Vec<f64>,
    }

    impl PredictionPipeline for FixedPipeline {
        fn classify(&self, _row: &InputRow) -> Result<i64, PredictionError> {
            Ok(self.label)
        }

        fn score(&self, _row: &InputRow) -> Result<Vec<f64>, PredictionError> {
            Ok(self.scores.clone())
        }
    }

    fn service(label: i64, scores: Vec<f64>) -> PredictionService {
        PredictionService::with_pipeline(Arc::new(FixedPipeline { label, scores }), vec![])
    }

    #[test]
    fn test_positive_class_probability_is_second_entry() {
        let prediction = service(1, vec![0.17, 0.83])
            .predict(&RespondentRecord::default())
            .unwrap();
        assert_eq!(prediction.label, BankAccountLabel::Likely);
        assert_eq!(prediction.probability, 0.83);
    }

    #[test]
    fn test_short_score_vector_is_shape_mismatch() {
        let err = service(0, vec![1.0])
            .predict(&RespondentRecord::default())
            .unwrap_err();
        assert_eq!(err, PredictionError::ShapeMismatch { expected: 2, found: 1 });
    }

    #[test]
    fn test_dispatch_converts_assembly_failure() {
        let form = PredictForm {
            household_size: Some(crate::models::NumericInput::Text("lots".into())),
            ..Default::default()
        };
        let dispatch = service(1, vec![0.2, 0.8]).dispatch(form);
        assert!(dispatch.record.is_none());
        match dispatch.outcome {
            PredictionOutcome::Failed { reason } => assert!(reason.contains("household_size")),
            other => panic!("expected failure, got {:?}", other),
        }
    }

    #[test]
    fn test_dispatch_converts_unexpected_label() {
        let dispatch = service(7, vec![0.2, 0.8]).dispatch(PredictForm::default());
        assert!(dispatch.record.is_some());
        assert_eq!(
            dispatch.outcome,
            PredictionOutcome::Failed {
                reason: "pipeline returned unexpected class label 7".to_string()
            }
        );
    }
}
