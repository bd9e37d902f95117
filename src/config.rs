use serde::Deserialize;
use std::path::PathBuf;

use crate::artifacts::ArtifactPaths;

const DEFAULT_PORT: &str = "8501";
const DEFAULT_MODEL_PATH: &str = "financial_inclusion_model.json";
const DEFAULT_CATEGORICAL_COLUMNS_PATH: &str = "categorical_columns.json";
const DEFAULT_MAX_BODY_BYTES: usize = 64 * 1024;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub port: u16,
    pub model_path: PathBuf,
    pub categorical_columns_path: PathBuf,
    pub max_body_bytes: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 8501,
            model_path: PathBuf::from(DEFAULT_MODEL_PATH),
            categorical_columns_path: PathBuf::from(DEFAULT_CATEGORICAL_COLUMNS_PATH),
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let config = Self {
            port: std::env::var("PORT")
                .unwrap_or_else(|_| DEFAULT_PORT.to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("PORT must be a valid number between 1-65535"))?,
            model_path: artifact_path_var("MODEL_PATH", DEFAULT_MODEL_PATH)?,
            categorical_columns_path: artifact_path_var(
                "CATEGORICAL_COLUMNS_PATH",
                DEFAULT_CATEGORICAL_COLUMNS_PATH,
            )?,
            max_body_bytes: match std::env::var("MAX_BODY_BYTES") {
                Ok(raw) => raw
                    .trim()
                    .parse()
                    .map_err(|_| anyhow::anyhow!("MAX_BODY_BYTES must be a positive integer"))?,
                Err(_) => DEFAULT_MAX_BODY_BYTES,
            },
        };

        tracing::debug!("Model path: {}", config.model_path.display());
        tracing::debug!(
            "Categorical columns path: {}",
            config.categorical_columns_path.display()
        );
        tracing::debug!("Server Port: {}", config.port);

        Ok(config)
    }

    pub fn artifact_paths(&self) -> ArtifactPaths {
        ArtifactPaths {
            model: self.model_path.clone(),
            categorical_columns: self.categorical_columns_path.clone(),
        }
    }
}

fn artifact_path_var(name: &str, default: &str) -> anyhow::Result<PathBuf> {
    match std::env::var(name) {
        Ok(value) => {
            if value.trim().is_empty() {
                anyhow::bail!("{} cannot be empty", name);
            }
            Ok(PathBuf::from(value.trim()))
        }
        Err(_) => Ok(PathBuf::from(default)),
    }
}
