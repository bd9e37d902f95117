//! Utility to inspect the configured prediction artifacts.

use financial_inclusion_predictor::artifacts::ArtifactLoader;
use financial_inclusion_predictor::config::Config;

/// Loads the artifacts through the same loader the server uses and prints
/// what the pipeline expects as input.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;
    let paths = config.artifact_paths();

    let artifacts = ArtifactLoader::new()
        .load_model(&paths)
        .await
        .map_err(|e| anyhow::anyhow!("{}", e))?;

    println!("Model:       {}", paths.model.display());
    println!("Columns:     {}", paths.categorical_columns.display());
    println!("SHA-256:     {}", artifacts.fingerprint);
    println!();

    let Some(pipeline) = artifacts.exported.as_ref() else {
        return Ok(());
    };

    println!("Categorical columns:");
    for encoding in &pipeline.encoder.categorical {
        println!(
            "- {} ({} categories): {}",
            encoding.column,
            encoding.categories.len(),
            encoding.categories.join(", ")
        );
    }
    println!();

    println!("Numeric columns:");
    for scaling in &pipeline.encoder.numeric {
        println!(
            "- {}: mean {:.4}, scale {:.4}",
            scaling.column, scaling.mean, scaling.scale
        );
    }
    println!();

    println!("Encoded features: {}", pipeline.feature_width());
    println!("Unknown categories: {:?}", pipeline.encoder.handle_unknown);

    Ok(())
}
