//! CLI command implementations.

pub mod build;
pub mod release;

use anyhow::{Context, Result};
use carto_ci_config::{CiConfig, load_config};
use carto_ci_core::JobId;
use carto_ci_executor::{DockerBuildExecutor, DockerBuildSettings};
use std::path::Path;
use tracing::debug;

pub(crate) fn load(path: &Path) -> Result<CiConfig> {
    debug!(path = %path.display(), "Loading configuration");
    load_config(path).with_context(|| format!("Failed to load config: {}", path.display()))
}

pub fn validate(path: &Path) -> Result<()> {
    let config = load(path)?;
    println!("Configuration is valid");
    println!("  repository:     {}", config.repository);
    println!("  release prefix: {}", config.release.tag_prefix);
    println!(
        "  toolchain:      {}:{}",
        config.toolchain.image, config.toolchain.version
    );
    println!("  legs:           {}", config.matrix.len());
    println!("  max concurrent: {}", config.worker.max_concurrent);
    Ok(())
}

pub fn matrix(path: &Path, json: bool) -> Result<()> {
    let config = load(path)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&config.matrix)?);
        return Ok(());
    }

    println!("{:<24} {:<28} IMAGE", "CONTEXT", "ARTIFACT");
    for spec in config.matrix.specs() {
        println!(
            "{:<24} {:<28} {}",
            spec.context_label(),
            spec.artifact_name(),
            config.toolchain.image_for(spec)
        );
    }
    Ok(())
}

/// Force-stop a job's build container.
pub async fn stop(path: &Path, job_id: &str) -> Result<()> {
    let config = load(path)?;
    let job_id: JobId = job_id
        .parse()
        .with_context(|| format!("Invalid job ID: {}", job_id))?;

    let settings = DockerBuildSettings::from_config(&config, ".");
    let executor = DockerBuildExecutor::new(settings).context("Failed to connect to Docker")?;
    executor.stop(&job_id).await?;

    println!("Stopped job {}", job_id);
    Ok(())
}
