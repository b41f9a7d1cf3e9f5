//! carto-ci webhook server

use anyhow::Context;
use carto_ci_api::{AppState, routes};
use carto_ci_config::load_config;
use carto_ci_core::job::JobOutcome;
use carto_ci_executor::{DockerBuildExecutor, DockerBuildSettings};
use carto_ci_github::{GitHubClient, GitHubConfig};
use carto_ci_scheduler::{JobQueue, JobRunner, Orchestrator, Worker};
use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "carto-ci-server")]
#[command(about = "Webhook-driven build orchestrator", long_about = None)]
struct Args {
    /// Path to the configuration file
    #[arg(long, env = "CARTO_CI_CONFIG", default_value = "carto-ci.kdl")]
    config: PathBuf,

    /// Address to listen on
    #[arg(long, env = "CARTO_CI_LISTEN", default_value = "0.0.0.0:3000")]
    listen: SocketAddr,

    /// Directory that receives build outputs, one subdirectory per job
    #[arg(long, env = "CARTO_CI_OUTPUT_DIR", default_value = "carto-ci-out")]
    output_dir: PathBuf,

    /// Secret for verifying webhook signatures
    #[arg(long, env = "CARTO_CI_WEBHOOK_SECRET", hide_env_values = true)]
    webhook_secret: Option<String>,

    /// GitHub token for statuses, releases and private clones
    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
    github_token: Option<String>,

    /// GitHub API base URL
    #[arg(long, env = "GITHUB_API_URL")]
    github_api_url: Option<String>,

    /// Abort builds that run longer than this many seconds
    #[arg(long, env = "CARTO_CI_BUILD_TIMEOUT")]
    build_timeout: Option<u64>,

    /// Emit logs as JSON
    #[arg(long, env = "CARTO_CI_LOG_JSON")]
    log_json: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if args.log_json {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    let config = load_config(&args.config)
        .with_context(|| format!("loading {}", args.config.display()))?;
    info!(
        repository = %config.repository,
        legs = config.matrix.len(),
        max_concurrent = config.worker.max_concurrent,
        "Configuration loaded"
    );

    let github = args.github_token.clone().filter(|t| !t.is_empty()).map(|token| {
        let github_config = GitHubConfig::new(token);
        let github_config = match &args.github_api_url {
            Some(url) => github_config.with_api_url(url.as_str()),
            None => github_config,
        };
        Arc::new(GitHubClient::new(github_config))
    });
    if github.is_none() {
        warn!("GITHUB_TOKEN not set; commit statuses and releases are disabled");
    }

    let settings = DockerBuildSettings::from_config(&config, &args.output_dir)
        .with_access_token(args.github_token.clone())
        .with_timeout(args.build_timeout.map(Duration::from_secs));
    let executor = DockerBuildExecutor::new(settings)?;

    // Artifacts are uploaded or dropped; nothing needs them afterwards.
    let mut runner = JobRunner::new(&config.repository, Arc::new(executor)).with_discarded_outputs();
    let (queue, jobs) = JobQueue::new();
    let mut orchestrator = Orchestrator::new(
        &config.repository,
        &config.release.tag_prefix,
        config.matrix.clone(),
        queue,
    );
    if let Some(github) = &github {
        runner = runner
            .with_status_reporter(github.clone())
            .with_release_publisher(github.clone());
        orchestrator = orchestrator.with_release_publisher(github.clone());
    }

    // Registered once; in-flight jobs are abandoned when the process exits.
    let (outcomes_tx, outcomes_rx) = mpsc::unbounded_channel();
    let worker = Worker::new("server", Arc::new(runner), config.worker.max_concurrent)
        .with_outcomes(outcomes_tx);
    tokio::spawn(worker.run(jobs));
    tokio::spawn(log_outcomes(outcomes_rx));

    let state = AppState::new(orchestrator)
        .with_webhook_secret(args.webhook_secret)
        .with_github(github.is_some());
    let app = routes::router(state).layer(TraceLayer::new_for_http());

    info!("Starting server on {}", args.listen);
    let listener = TcpListener::bind(args.listen).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Surface job completions, including status updates that never landed.
async fn log_outcomes(mut rx: mpsc::UnboundedReceiver<JobOutcome>) {
    while let Some(outcome) = rx.recv().await {
        if let Some(status_error) = &outcome.status_error {
            warn!(
                job_id = %outcome.job_id,
                context = %outcome.context,
                error = %status_error,
                "Commit status was not updated"
            );
        }
        if outcome.is_success() {
            info!(
                job_id = %outcome.job_id,
                context = %outcome.context,
                uploaded = outcome.uploaded,
                "Job succeeded"
            );
        } else {
            error!(
                job_id = %outcome.job_id,
                context = %outcome.context,
                state = ?outcome.state,
                "Job failed"
            );
        }
    }
}
