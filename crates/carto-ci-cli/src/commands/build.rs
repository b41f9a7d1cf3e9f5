//! Local matrix builds.

use anyhow::{Context, Result};
use carto_ci_core::executor::SourceRef;
use carto_ci_core::job::{Job, JobState};
use carto_ci_executor::{DockerBuildExecutor, DockerBuildSettings};
use carto_ci_scheduler::JobRunner;
use std::path::PathBuf;
use std::sync::Arc;

pub fn source_ref(
    git_ref: Option<String>,
    tag: Option<String>,
) -> carto_ci_core::Result<SourceRef> {
    match (git_ref, tag) {
        (Some(sha), _) => SourceRef::commit(sha),
        (None, Some(tag)) => SourceRef::tag(tag),
        (None, None) => Ok(SourceRef::DefaultBranch),
    }
}

/// Build every leg in parallel. No statuses are written and nothing is uploaded.
pub async fn build_all(
    config_path: &std::path::Path,
    source: SourceRef,
    output_dir: PathBuf,
    github_token: Option<String>,
) -> Result<()> {
    let config = super::load(config_path)?;

    let settings = DockerBuildSettings::from_config(&config, &output_dir)
        .with_access_token(github_token.filter(|t| !t.is_empty()));
    let executor = DockerBuildExecutor::new(settings).context("Failed to connect to Docker")?;
    let runner = JobRunner::new(&config.repository, Arc::new(executor));

    println!(
        "Building {} legs of {} at {}",
        config.matrix.len(),
        config.repository,
        source
    );

    let jobs: Vec<Job> = config
        .matrix
        .expand()
        .into_iter()
        .map(|spec| Job::standalone(spec, source.clone()))
        .collect();
    let outcomes = runner.run_all(jobs).await;

    let mut failed = 0;
    for outcome in &outcomes {
        match &outcome.state {
            JobState::Succeeded => println!("✓ {}", outcome.context),
            JobState::BuildFailed { message } | JobState::PublishFailed { message } => {
                failed += 1;
                println!("✗ {}: {}", outcome.context, message);
            }
        }
    }

    if failed > 0 {
        anyhow::bail!("{} of {} legs failed", failed, outcomes.len());
    }
    println!("Outputs written to {}", output_dir.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_ref_selection() {
        assert_eq!(
            source_ref(Some("abc123".to_string()), None).unwrap(),
            SourceRef::Commit("abc123".to_string())
        );
        assert_eq!(
            source_ref(None, Some("v1.0.0".to_string())).unwrap(),
            SourceRef::Tag("v1.0.0".to_string())
        );
        assert_eq!(source_ref(None, None).unwrap(), SourceRef::DefaultBranch);
    }

    #[test]
    fn test_source_ref_rejects_unsafe_refs() {
        assert!(source_ref(Some("ééééé".to_string()), None).is_err());
        assert!(source_ref(Some("abc;id".to_string()), None).is_err());
        assert!(source_ref(None, Some("v1$(id)".to_string())).is_err());
    }
}
