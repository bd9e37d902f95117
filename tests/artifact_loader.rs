/// Tests for loading and caching the exported pipeline artifacts.
use financial_inclusion_predictor::artifacts::{ArtifactLoader, ArtifactPaths};
use financial_inclusion_predictor::errors::ArtifactLoadError;
use financial_inclusion_predictor::models::{PredictForm, PredictionOutcome, RespondentRecord};
use financial_inclusion_predictor::services::PredictionService;
use std::path::PathBuf;
use std::sync::Arc;
use uuid::Uuid;

const MODEL: &str = r#"{
    "format_version": 1,
    "encoder": {
        "categorical": [{"column": "cellphone_access", "categories": ["No", "Yes"]}],
        "numeric": [{"column": "age_of_respondent", "mean": 30.0, "scale": 10.0}]
    },
    "classifier": {"coefficients": [-1.0, 1.0, 0.0], "intercept": 0.0}
}"#;

const COLUMNS: &str = r#"["cellphone_access"]"#;

/// Writes the two artifacts into a fresh directory.
fn write_artifacts(model: &str, columns: &str) -> ArtifactPaths {
    let dir = std::env::temp_dir().join(format!("fip-artifacts-{}", Uuid::new_v4()));
    std::fs::create_dir_all(&dir).unwrap();
    let paths = ArtifactPaths {
        model: dir.join("financial_inclusion_model.json"),
        categorical_columns: dir.join("categorical_columns.json"),
    };
    std::fs::write(&paths.model, model).unwrap();
    std::fs::write(&paths.categorical_columns, columns).unwrap();
    paths
}

fn shipped_artifacts() -> ArtifactPaths {
    let root = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    ArtifactPaths {
        model: root.join("financial_inclusion_model.json"),
        categorical_columns: root.join("categorical_columns.json"),
    }
}

#[tokio::test]
async fn test_second_load_returns_cached_objects() {
    let paths = write_artifacts(MODEL, COLUMNS);
    let loader = ArtifactLoader::new();
    assert!(!loader.is_cached(&paths));

    let first = loader.load_model(&paths).await.unwrap();
    assert!(loader.is_cached(&paths));

    // Deleting the files proves the second call never touches disk
    std::fs::remove_file(&paths.model).unwrap();
    std::fs::remove_file(&paths.categorical_columns).unwrap();

    let second = loader.load_model(&paths).await.unwrap();
    assert!(Arc::ptr_eq(&first, &second));
    assert!(Arc::ptr_eq(&first.pipeline, &second.pipeline));
    assert!(Arc::ptr_eq(
        &first.categorical_columns,
        &second.categorical_columns
    ));
}

#[tokio::test]
async fn test_cache_keeps_every_loaded_model() {
    let loader = ArtifactLoader::new();
    let all_paths: Vec<ArtifactPaths> = (0..40).map(|_| write_artifacts(MODEL, COLUMNS)).collect();

    let mut first_loads = Vec::new();
    for paths in &all_paths {
        first_loads.push(loader.load_model(paths).await.unwrap());
    }
    for paths in &all_paths {
        std::fs::remove_file(&paths.model).unwrap();
    }

    // No entry was evicted, so nothing needs to be read again
    for (paths, first) in all_paths.iter().zip(&first_loads) {
        let again = loader.load_model(paths).await.unwrap();
        assert!(Arc::ptr_eq(first, &again));
    }
}

#[tokio::test]
async fn test_loaded_artifacts_expose_columns_and_fingerprint() {
    let paths = write_artifacts(MODEL, COLUMNS);
    let artifacts = ArtifactLoader::new().load_model(&paths).await.unwrap();

    assert_eq!(
        artifacts.categorical_columns.as_slice(),
        &["cellphone_access".to_string()]
    );
    assert_eq!(artifacts.fingerprint.len(), 64);
    assert!(artifacts.exported.is_some());
}

#[tokio::test]
async fn test_missing_model_is_reported() {
    let paths = write_artifacts(MODEL, COLUMNS);
    std::fs::remove_file(&paths.model).unwrap();

    let err = ArtifactLoader::new().load_model(&paths).await.unwrap_err();
    assert!(matches!(err.as_ref(), ArtifactLoadError::Missing { path, .. } if *path == paths.model));
}

#[tokio::test]
async fn test_missing_column_list_is_reported() {
    let paths = write_artifacts(MODEL, COLUMNS);
    std::fs::remove_file(&paths.categorical_columns).unwrap();

    let err = ArtifactLoader::new().load_model(&paths).await.unwrap_err();
    assert!(matches!(
        err.as_ref(),
        ArtifactLoadError::Missing { path, .. } if *path == paths.categorical_columns
    ));
}

#[tokio::test]
async fn test_corrupt_column_list_is_reported() {
    let paths = write_artifacts(MODEL, r#"{"columns": 3}"#);
    let err = ArtifactLoader::new().load_model(&paths).await.unwrap_err();
    assert!(matches!(err.as_ref(), ArtifactLoadError::Corrupt { .. }));
}

#[tokio::test]
async fn test_version_mismatch_is_incompatible() {
    let paths = write_artifacts(&MODEL.replace("\"format_version\": 1", "\"format_version\": 3"), COLUMNS);
    let err = ArtifactLoader::new().load_model(&paths).await.unwrap_err();
    assert!(matches!(
        err.as_ref(),
        ArtifactLoadError::Incompatible { found: 3, .. }
    ));
}

#[tokio::test]
async fn test_column_list_must_match_encoder() {
    let paths = write_artifacts(MODEL, r#"["cellphone_access", "country"]"#);
    let err = ArtifactLoader::new().load_model(&paths).await.unwrap_err();
    assert!(matches!(err.as_ref(), ArtifactLoadError::Inconsistent(_)));
}

#[tokio::test]
async fn test_failed_load_is_not_cached() {
    let paths = write_artifacts(MODEL, COLUMNS);
    let model = std::fs::read_to_string(&paths.model).unwrap();
    std::fs::remove_file(&paths.model).unwrap();

    let loader = ArtifactLoader::new();
    assert!(loader.load_model(&paths).await.is_err());

    std::fs::write(&paths.model, model).unwrap();
    assert!(loader.load_model(&paths).await.is_ok());
}

#[tokio::test]
async fn test_shipped_artifacts_predict_example_respondent() {
    let artifacts = ArtifactLoader::new()
        .load_model(&shipped_artifacts())
        .await
        .unwrap();
    assert_eq!(artifacts.categorical_columns.len(), 8);

    let service = PredictionService::new(artifacts);
    let record = RespondentRecord {
        country: "Kenya".to_string(),
        location_type: "Rural".to_string(),
        cellphone_access: "Yes".to_string(),
        household_size: 3,
        age_of_respondent: 30,
        gender_of_respondent: "Female".to_string(),
        relationship_with_head: "Head of Household".to_string(),
        marital_status: "Married/Living together".to_string(),
        education_level: "Secondary education".to_string(),
        job_type: "Self employed".to_string(),
    };

    let dispatch = service.dispatch(PredictForm::from(&record));
    match dispatch.outcome {
        PredictionOutcome::Succeeded(prediction) => assert_eq!(
            prediction.summary(),
            "Likely to have a bank account (Probability: 70.1%)"
        ),
        other => panic!("expected a prediction, got {:?}", other),
    }
}

#[tokio::test]
async fn test_shipped_artifacts_reject_unknown_category() {
    let service = PredictionService::new(
        ArtifactLoader::new()
            .load_model(&shipped_artifacts())
            .await
            .unwrap(),
    );
    let form = PredictForm {
        country: Some("Narnia".to_string()),
        ..Default::default()
    };

    let dispatch = service.dispatch(form);
    assert!(!dispatch.outcome.is_success());
}
