use chrono::{DateTime, Utc};
use moka::future::Cache;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::errors::ArtifactLoadError;
use crate::pipeline::{LogisticPipeline, PredictionPipeline, SUPPORTED_FORMAT_VERSION};

/// Locations of the two artifacts produced by the training job.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ArtifactPaths {
    pub model: PathBuf,
    pub categorical_columns: PathBuf,
}

/// The pipeline and its categorical column list, as loaded from disk.
pub struct LoadedArtifacts {
    pub pipeline: Arc<dyn PredictionPipeline>,
    pub categorical_columns: Arc<Vec<String>>,
    /// Hex SHA-256 of the pipeline artifact bytes.
    pub fingerprint: String,
    pub loaded_at: DateTime<Utc>,
    /// Present when the pipeline came from disk rather than being injected.
    pub exported: Option<Arc<LogisticPipeline>>,
}

impl std::fmt::Debug for LoadedArtifacts {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadedArtifacts")
            .field("categorical_columns", &self.categorical_columns)
            .field("fingerprint", &self.fingerprint)
            .field("loaded_at", &self.loaded_at)
            .finish_non_exhaustive()
    }
}

impl LoadedArtifacts {
    /// Wraps an in-memory pipeline, bypassing disk.
    pub fn from_parts(pipeline: Arc<dyn PredictionPipeline>, categorical_columns: Vec<String>) -> Self {
        Self {
            pipeline,
            categorical_columns: Arc::new(categorical_columns),
            fingerprint: "in-memory".to_string(),
            loaded_at: Utc::now(),
            exported: None,
        }
    }
}

/// Process-wide artifact cache.
///
/// Unbounded and without expiry: a pipeline is loaded once and served
/// read-only for the rest of the process lifetime.
#[derive(Clone)]
pub struct ArtifactLoader {
    cache: Cache<ArtifactPaths, Arc<LoadedArtifacts>>,
}

impl Default for ArtifactLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ArtifactLoader {
    pub fn new() -> Self {
        Self {
            cache: Cache::builder().build(),
        }
    }

    /// Returns the artifacts at `paths`, reading them from disk on first use.
    ///
    /// Later calls with the same paths return the same `Arc` without touching
    /// storage. Concurrent first calls share a single load. Failed loads are
    /// not cached.
    pub async fn load_model(
        &self,
        paths: &ArtifactPaths,
    ) -> Result<Arc<LoadedArtifacts>, Arc<ArtifactLoadError>> {
        self.cache
            .try_get_with(paths.clone(), async {
                load_from_disk(paths).await.map(Arc::new)
            })
            .await
    }

    /// Whether the artifacts at `paths` are already cached.
    pub fn is_cached(&self, paths: &ArtifactPaths) -> bool {
        self.cache.contains_key(paths)
    }
}

#[derive(Deserialize)]
struct FormatProbe {
    format_version: u32,
}

async fn load_from_disk(paths: &ArtifactPaths) -> Result<LoadedArtifacts, ArtifactLoadError> {
    tracing::info!(
        "Loading prediction pipeline from {} and categorical columns from {}",
        paths.model.display(),
        paths.categorical_columns.display()
    );

    let model_bytes = read_artifact(&paths.model).await?;
    let pipeline = parse_pipeline(&paths.model, &model_bytes)?;

    let column_bytes = read_artifact(&paths.categorical_columns).await?;
    let categorical_columns: Vec<String> =
        serde_json::from_slice(&column_bytes).map_err(|e| ArtifactLoadError::Corrupt {
            path: paths.categorical_columns.clone(),
            reason: format!("expected a list of column names: {}", e),
        })?;

    check_column_contract(&pipeline, &categorical_columns)?;

    let fingerprint = fingerprint(&model_bytes);
    tracing::info!(
        "✓ Pipeline loaded: {} encoded features, {} categorical columns, sha256 {}",
        pipeline.feature_width(),
        categorical_columns.len(),
        fingerprint
    );

    let pipeline = Arc::new(pipeline);
    Ok(LoadedArtifacts {
        pipeline: pipeline.clone(),
        categorical_columns: Arc::new(categorical_columns),
        fingerprint,
        loaded_at: Utc::now(),
        exported: Some(pipeline),
    })
}

async fn read_artifact(path: &Path) -> Result<Vec<u8>, ArtifactLoadError> {
    tokio::fs::read(path)
        .await
        .map_err(|source| ArtifactLoadError::Missing {
            path: path.to_path_buf(),
            source,
        })
}

fn parse_pipeline(path: &Path, bytes: &[u8]) -> Result<LogisticPipeline, ArtifactLoadError> {
    let corrupt = |reason: String| ArtifactLoadError::Corrupt {
        path: path.to_path_buf(),
        reason,
    };

    // Check the version before the full shape so a newer exporter is
    // reported as incompatible rather than corrupt.
    let probe: FormatProbe = serde_json::from_slice(bytes).map_err(|e| corrupt(e.to_string()))?;
    if probe.format_version != SUPPORTED_FORMAT_VERSION {
        return Err(ArtifactLoadError::Incompatible {
            path: path.to_path_buf(),
            found: probe.format_version,
            supported: SUPPORTED_FORMAT_VERSION,
        });
    }

    let pipeline: LogisticPipeline =
        serde_json::from_slice(bytes).map_err(|e| corrupt(e.to_string()))?;
    pipeline.validate().map_err(corrupt)?;
    Ok(pipeline)
}

/// The column list must name exactly the columns the encoder one-hot encodes.
fn check_column_contract(
    pipeline: &LogisticPipeline,
    categorical_columns: &[String],
) -> Result<(), ArtifactLoadError> {
    let listed: BTreeSet<&str> = categorical_columns.iter().map(String::as_str).collect();
    let encoded: BTreeSet<&str> = pipeline.categorical_columns().into_iter().collect();

    if listed.len() != categorical_columns.len() {
        return Err(ArtifactLoadError::Inconsistent(
            "categorical column list contains duplicates".to_string(),
        ));
    }
    if listed != encoded {
        let missing: Vec<&str> = encoded.difference(&listed).copied().collect();
        let extra: Vec<&str> = listed.difference(&encoded).copied().collect();
        return Err(ArtifactLoadError::Inconsistent(format!(
            "encoder columns not listed: {:?}; listed columns not encoded: {:?}",
            missing, extra
        )));
    }
    Ok(())
}

fn fingerprint(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    const MODEL: &str = r#"{
        "format_version": 1,
        "encoder": {
            "categorical": [{"column": "location_type", "categories": ["Rural", "Urban"]}],
            "numeric": [{"column": "household_size", "mean": 4.0, "scale": 2.0}]
        },
        "classifier": {"coefficients": [-0.5, 0.5, 0.1], "intercept": -1.0}
    }"#;

    #[test]
    fn test_parse_pipeline_accepts_supported_version() {
        let pipeline = parse_pipeline(Path::new("model.json"), MODEL.as_bytes()).unwrap();
        assert_eq!(pipeline.feature_width(), 3);
        assert_eq!(pipeline.categorical_columns(), vec!["location_type"]);
    }

    #[test]
    fn test_parse_pipeline_reports_newer_version_as_incompatible() {
        let newer = MODEL.replace("\"format_version\": 1", "\"format_version\": 2");
        let err = parse_pipeline(Path::new("model.json"), newer.as_bytes()).unwrap_err();
        assert!(matches!(
            err,
            ArtifactLoadError::Incompatible {
                found: 2,
                supported: 1,
                ..
            }
        ));
    }

    #[test]
    fn test_parse_pipeline_rejects_garbage() {
        let err = parse_pipeline(Path::new("model.json"), b"\x80\x04\x95pickle").unwrap_err();
        assert!(matches!(err, ArtifactLoadError::Corrupt { .. }));
    }

    #[test]
    fn test_column_contract_mismatch_is_inconsistent() {
        let pipeline = parse_pipeline(Path::new("model.json"), MODEL.as_bytes()).unwrap();
        assert!(check_column_contract(&pipeline, &["location_type".to_string()]).is_ok());

        let err = check_column_contract(&pipeline, &["country".to_string()]).unwrap_err();
        assert!(err.to_string().contains("location_type"));
        assert!(err.to_string().contains("country"));

        let dup = vec!["location_type".to_string(), "location_type".to_string()];
        assert!(check_column_contract(&pipeline, &dup).is_err());
    }

    #[test]
    fn test_fingerprint_is_stable_hex() {
        let a = fingerprint(MODEL.as_bytes());
        assert_eq!(a, fingerprint(MODEL.as_bytes()));
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
