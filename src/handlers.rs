use axum::{
    extract::{
        rejection::{FormRejection, JsonRejection},
        State,
    },
    http::StatusCode,
    response::Html,
    routing::{get, post},
    Form, Json, Router,
};
use serde_json::json;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_governor::{
    governor::GovernorConfigBuilder, key_extractor::SmartIpKeyExtractor, GovernorLayer,
};
use tower_http::{cors::CorsLayer, limit::RequestBodyLimitLayer, trace::TraceLayer};

use crate::config::Config;
use crate::errors::AppError;
use crate::models::{PredictForm, PredictionOutcome, RespondentRecord};
use crate::services::PredictionService;
use crate::view;

/// Shared application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration.
    pub config: Config,
    /// Prediction service wrapping the loaded pipeline. Read-only.
    pub predictor: PredictionService,
}

/// Routes that run a prediction or render the form.
pub fn prediction_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(show_form))
        .route("/predict", post(submit_form))
        .route("/api/v1/predict", post(predict_json))
}

/// Builds the application router with all middleware.
///
/// The prediction routes sit behind the body limit and a per-IP rate limiter
/// (10 requests/second, burst of 20); `/health` bypasses both. Clients are
/// keyed by `X-Forwarded-For`/`X-Real-IP`/`Forwarded`, falling back to the
/// peer address, so the server must be run with connect info.
pub fn app(state: Arc<AppState>) -> anyhow::Result<Router> {
    let governor_conf = Arc::new(
        GovernorConfigBuilder::default()
            .per_second(10)
            .burst_size(20)
            .key_extractor(SmartIpKeyExtractor)
            .finish()
            .ok_or_else(|| anyhow::anyhow!("invalid rate limiter configuration"))?,
    );

    let protected_routes = prediction_routes().layer(
        ServiceBuilder::new()
            .layer(RequestBodyLimitLayer::new(state.config.max_body_bytes))
            .layer(GovernorLayer {
                config: governor_conf,
            }),
    );

    Ok(Router::new()
        .route("/health", get(health))
        .merge(protected_routes)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()))
}

/// Health check endpoint.
///
/// Reports the fingerprint of the loaded pipeline so deployments can confirm
/// which model is being served.
pub async fn health(State(state): State<Arc<AppState>>) -> (StatusCode, Json<serde_json::Value>) {
    let artifacts = state.predictor.artifacts();
    (
        StatusCode::OK,
        Json(json!({
            "status": "healthy",
            "service": env!("CARGO_PKG_NAME"),
            "version": env!("CARGO_PKG_VERSION"),
            "model_fingerprint": artifacts.fingerprint,
            "model_loaded_at": artifacts.loaded_at.to_rfc3339(),
            "categorical_columns": artifacts.categorical_columns.as_slice(),
        })),
    )
}

/// GET /
///
/// Renders the form with every control at its default and no result.
pub async fn show_form() -> Html<String> {
    Html(view::render_page(&RespondentRecord::default(), None))
}

/// POST /predict
///
/// Form submission. Always answers 200 with the page: the outcome panel
/// carries either the prediction or the failure reason, and the form is
/// rendered again with the submitted values so it can be resubmitted. A
/// body that cannot be read as a form is reported the same way.
pub async fn submit_form(
    State(state): State<Arc<AppState>>,
    payload: Result<Form<PredictForm>, FormRejection>,
) -> Html<String> {
    tracing::info!("POST /predict");

    let form = match payload {
        Ok(Form(form)) => form,
        Err(e) => {
            tracing::warn!("Unreadable form submission: {}", e.body_text());
            let outcome = PredictionOutcome::Failed {
                reason: e.body_text(),
            };
            return Html(view::render_page(&RespondentRecord::default(), Some(&outcome)));
        }
    };

    let dispatch = state.predictor.dispatch(form);
    let values = dispatch.record.unwrap_or_default();

    Html(view::render_page(&values, Some(&dispatch.outcome)))
}

/// POST /api/v1/predict
///
/// JSON counterpart of the form, one respondent per request.
pub async fn predict_json(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<PredictForm>, JsonRejection>,
) -> Result<Json<serde_json::Value>, AppError> {
    let Json(form) = payload.map_err(|e| AppError::BadRequest(e.body_text()))?;
    tracing::info!("POST /api/v1/predict");

    let dispatch = state.predictor.dispatch(form);
    match dispatch.outcome {
        PredictionOutcome::Succeeded(prediction) => Ok(Json(json!({
            "prediction_id": dispatch.prediction_id,
            "label": prediction.label.class(),
            "outcome": prediction.label,
            "probability": prediction.probability,
            "message": prediction.summary(),
            "respondent": dispatch.record,
            "predicted_at": chrono::Utc::now().to_rfc3339(),
        }))),
        PredictionOutcome::Failed { reason } => Err(AppError::PredictionFailed(reason)),
    }
}
