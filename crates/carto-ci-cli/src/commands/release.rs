//! Manual release creation.

use anyhow::{Result, bail};
use carto_ci_core::release::{ReleasePublisher, ReleaseRequest};
use carto_ci_github::{GitHubClient, GitHubConfig};
use std::path::Path;

pub async fn create(
    config_path: &Path,
    tag: &str,
    name: Option<String>,
    publish: bool,
    github_token: Option<String>,
    github_api_url: Option<String>,
) -> Result<()> {
    let config = super::load(config_path)?;

    let Some(token) = github_token.filter(|t| !t.is_empty()) else {
        bail!("no GitHub access: set GITHUB_TOKEN");
    };
    let github_config = GitHubConfig::new(token);
    let github_config = match github_api_url {
        Some(url) => github_config.with_api_url(url),
        None => github_config,
    };
    let client = GitHubClient::new(github_config);

    let request = ReleaseRequest {
        tag: tag.to_string(),
        name: name.unwrap_or_else(|| tag.to_string()),
        draft: !publish,
    };
    let release = client.create_release(&config.repository, &request).await?;

    println!(
        "Created {}release {} ({}) on {}",
        if release.draft { "draft " } else { "" },
        release.name,
        release.tag,
        release.repository
    );
    println!("  id: {}", release.id);
    Ok(())
}
