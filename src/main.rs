use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use financial_inclusion_predictor::artifacts::ArtifactLoader;
use financial_inclusion_predictor::config::Config;
use financial_inclusion_predictor::handlers::{self, AppState};
use financial_inclusion_predictor::services::PredictionService;

/// Main entry point for the application.
///
/// Initializes logging, loads configuration and the prediction artifacts,
/// then serves the form. A missing or unreadable artifact aborts startup:
/// nothing can be predicted without a model.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "financial_inclusion_predictor=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env()?;
    tracing::info!("Configuration loaded successfully");

    // Load the pipeline once; every request shares it read-only
    let loader = ArtifactLoader::new();
    let artifacts = loader
        .load_model(&config.artifact_paths())
        .await
        .map_err(|e| {
            tracing::error!("Failed to load prediction artifacts: {}", e);
            anyhow::anyhow!("{}", e)
        })?;
    tracing::info!(
        "Serving model {} with categorical columns {:?}",
        artifacts.fingerprint,
        artifacts.categorical_columns
    );

    let app_state = Arc::new(AppState {
        config: config.clone(),
        predictor: PredictionService::new(artifacts),
    });

    let app = handlers::app(app_state)?;

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
