use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::fmt;
use std::path::PathBuf;

/// Failure to load the prediction artifacts.
///
/// Raised once, at startup. The service cannot render a prediction without a
/// model, so callers treat this as fatal.
#[derive(Debug)]
pub enum ArtifactLoadError {
    /// The artifact file could not be read.
    Missing {
        /// Location that was read.
        path: PathBuf,
        /// Underlying I/O failure.
        source: std::io::Error,
    },
    /// The artifact exists but does not deserialize to the expected shape.
    Corrupt {
        /// Location that was read.
        path: PathBuf,
        /// What was wrong with the content.
        reason: String,
    },
    /// The artifact was written by an exporter this build cannot read.
    Incompatible {
        /// Location that was read.
        path: PathBuf,
        /// Version recorded in the artifact.
        found: u32,
        /// Version this build understands.
        supported: u32,
    },
    /// The two artifacts disagree with each other.
    Inconsistent(String),
}

impl fmt::Display for ArtifactLoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArtifactLoadError::Missing { path, source } => {
                write!(f, "Artifact {} could not be read: {}", path.display(), source)
            }
            ArtifactLoadError::Corrupt { path, reason } => {
                write!(f, "Artifact {} is corrupt: {}", path.display(), reason)
            }
            ArtifactLoadError::Incompatible {
                path,
                found,
                supported,
            } => write!(
                f,
                "Artifact {} has format version {} (supported: {})",
                path.display(),
                found,
                supported
            ),
            ArtifactLoadError::Inconsistent(msg) => write!(f, "Artifacts are inconsistent: {}", msg),
        }
    }
}

impl std::error::Error for ArtifactLoadError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ArtifactLoadError::Missing { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Failure while assembling a record or running the pipeline on it.
///
/// Always recoverable: the dispatch boundary turns it into a failed outcome
/// and the form stays usable.
#[derive(Debug, Clone, PartialEq)]
pub enum PredictionError {
    /// The input row lacks a column the pipeline was fitted on.
    MissingColumn(String),
    /// A categorical value was not seen when the encoder was fitted.
    UnknownCategory { column: String, value: String },
    /// A submitted value could not be interpreted for its column.
    InvalidValue { column: String, reason: String },
    /// The pipeline produced or received data of the wrong width.
    ShapeMismatch { expected: usize, found: usize },
    /// The classifier returned a label outside {0, 1}.
    UnexpectedLabel(i64),
}

impl fmt::Display for PredictionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PredictionError::MissingColumn(column) => {
                write!(f, "columns are missing: {{'{}'}}", column)
            }
            PredictionError::UnknownCategory { column, value } => write!(
                f,
                "Found unknown categories ['{}'] in column '{}' during transform",
                value, column
            ),
            PredictionError::InvalidValue { column, reason } => {
                write!(f, "invalid value for '{}': {}", column, reason)
            }
            PredictionError::ShapeMismatch { expected, found } => write!(
                f,
                "X has {} features, but the pipeline is expecting {} features as input",
                found, expected
            ),
            PredictionError::UnexpectedLabel(label) => {
                write!(f, "pipeline returned unexpected class label {}", label)
            }
        }
    }
}

impl std::error::Error for PredictionError {}

/// HTTP-layer error types.
#[derive(Debug, Clone)]
pub enum AppError {
    /// Bad request error (malformed body).
    BadRequest(String),
    /// The submission was well-formed but the prediction failed.
    PredictionFailed(String),
    /// Internal server error.
    InternalError(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::BadRequest(msg) => write!(f, "Bad request: {}", msg),
            AppError::PredictionFailed(msg) => write!(f, "Prediction failed: {}", msg),
            AppError::InternalError(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for AppError {}

impl IntoResponse for AppError {
    /// Maps each variant to a status code and a JSON `{ "error": ... }` body.
    fn into_response(self) -> Response {
        let (status, error_message) = match &self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::PredictionFailed(msg) => {
                tracing::warn!("Prediction failed: {}", msg);
                (StatusCode::UNPROCESSABLE_ENTITY, msg.clone())
            }
            AppError::InternalError(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

impl From<PredictionError> for AppError {
    fn from(err: PredictionError) -> Self {
        AppError::PredictionFailed(err.to_string())
    }
}
