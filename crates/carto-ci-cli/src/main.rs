//! carto-ci operator CLI.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "carto-ci")]
#[command(about = "carto-ci operator tool", long_about = None)]
struct Cli {
    /// Path to the configuration file
    #[arg(long, global = true, env = "CARTO_CI_CONFIG", default_value = "carto-ci.kdl")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate the configuration
    Validate,
    /// Show the build matrix
    Matrix {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
    /// Build every matrix leg locally, without statuses or releases
    BuildAll {
        /// Commit to build; defaults to the default branch
        #[arg(long = "ref", conflicts_with = "tag")]
        git_ref: Option<String>,
        /// Tag to build
        #[arg(long)]
        tag: Option<String>,
        /// Directory for build outputs
        #[arg(long, env = "CARTO_CI_OUTPUT_DIR", default_value = "carto-ci-out")]
        output_dir: PathBuf,
        /// GitHub token, for private clones
        #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
        github_token: Option<String>,
    },
    /// Create a release on GitHub
    Release {
        /// Tag to release
        #[arg(long)]
        tag: String,
        /// Release name; defaults to the tag
        #[arg(long)]
        name: Option<String>,
        /// Publish immediately instead of creating a draft
        #[arg(long)]
        publish: bool,
        #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
        github_token: Option<String>,
        #[arg(long, env = "GITHUB_API_URL")]
        github_api_url: Option<String>,
    },
    /// Force-stop a running build container
    Stop {
        /// Job ID
        job_id: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Validate => {
            commands::validate(&cli.config)?;
        }
        Commands::Matrix { json } => {
            commands::matrix(&cli.config, json)?;
        }
        Commands::BuildAll {
            git_ref,
            tag,
            output_dir,
            github_token,
        } => {
            let source = commands::build::source_ref(git_ref, tag)?;
            commands::build::build_all(&cli.config, source, output_dir, github_token).await?;
        }
        Commands::Release {
            tag,
            name,
            publish,
            github_token,
            github_api_url,
        } => {
            commands::release::create(
                &cli.config,
                &tag,
                name,
                publish,
                github_token,
                github_api_url,
            )
            .await?;
        }
        Commands::Stop { job_id } => {
            commands::stop(&cli.config, &job_id).await?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_all_args() {
        let cli = Cli::try_parse_from(["carto-ci", "build-all", "--ref", "abc123"]).unwrap();
        match cli.command {
            Commands::BuildAll { git_ref, tag, .. } => {
                assert_eq!(git_ref.as_deref(), Some("abc123"));
                assert!(tag.is_none());
            }
            _ => panic!("expected build-all"),
        }
    }

    #[test]
    fn test_ref_and_tag_conflict() {
        let result =
            Cli::try_parse_from(["carto-ci", "build-all", "--ref", "abc", "--tag", "v1.0.0"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_release_args() {
        let cli = Cli::try_parse_from([
            "carto-ci",
            "--config",
            "ci/carto.kdl",
            "release",
            "--tag",
            "v1.0.0",
            "--publish",
        ])
        .unwrap();
        assert_eq!(cli.config, PathBuf::from("ci/carto.kdl"));
        match cli.command {
            Commands::Release {
                tag, name, publish, ..
            } => {
                assert_eq!(tag, "v1.0.0");
                assert!(name.is_none());
                assert!(publish);
            }
            _ => panic!("expected release"),
        }
    }
}
