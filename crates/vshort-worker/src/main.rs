//! Viral short CLI.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use vshort_models::{JobId, ShortStatus};
use vshort_sieve::{SegmentJobClient, SieveClient};
use vshort_store::FileResultStore;
use vshort_worker::{
    OpenRouterScorer, ShortRequest, SieveTranscriptProvider, ViralSegmentOrchestrator,
    WorkerConfig,
};

#[derive(Debug, Parser)]
#[command(name = "vshort", version, about = "Create viral shorts from long videos")]
struct Cli {
    /// Directory of published results
    #[arg(long, global = true, env = "RESULTS_DIR")]
    results_dir: Option<PathBuf>,

    /// Result channel name
    #[arg(long, global = true, env = "RESULT_CHANNEL", default_value = "latest")]
    channel: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Find the most viral segment of a video and extract it
    Create {
        /// Video id or URL
        video: String,

        /// Short length in seconds
        #[arg(long, default_value_t = 15.0)]
        duration: f64,

        /// Scoring style
        #[arg(long, default_value = "trending")]
        style: String,
    },
    /// Re-check a previously submitted extraction job
    Refresh {
        job_id: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Install rustls crypto provider (required for TLS/HTTPS)
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_| anyhow::anyhow!("Failed to install rustls crypto provider"))?;

    dotenvy::dotenv().ok();
    init_tracing()?;

    let cli = Cli::parse();
    let mut config = WorkerConfig::from_env();
    if let Some(dir) = cli.results_dir {
        config.results_dir = dir;
    }

    info!(
        results_dir = %config.results_dir.display(),
        channel = %cli.channel,
        max_poll_attempts = config.poller.max_attempts,
        "Starting vshort"
    );

    let credentials = config.sieve.credentials();
    let sieve = Arc::new(SieveClient::new(config.sieve.clone()).context("Sieve client")?);
    let segments = SegmentJobClient::new(sieve.clone(), config.poller.clone());
    let scorer = OpenRouterScorer::new(config.openrouter.clone()).context("OpenRouter scorer")?;
    let store = FileResultStore::new(&config.results_dir)
        .with_channel(&cli.channel)
        .context("Result store")?;

    let orchestrator = ViralSegmentOrchestrator::new(
        Arc::new(SieveTranscriptProvider::new(sieve, credentials.clone())),
        Arc::new(scorer),
        segments,
        Arc::new(store),
        credentials,
    )
    .with_config(config.orchestrator.clone());

    let result = match cli.command {
        Command::Create {
            video,
            duration,
            style,
        } => {
            let request = ShortRequest::new(video)
                .with_target_duration(duration)
                .with_style(style);
            orchestrator.run(&request).await
        }
        Command::Refresh { job_id } => {
            orchestrator
                .force_refresh(&JobId::from_string(job_id))
                .await
        }
    };

    println!("{}", serde_json::to_string_pretty(&result)?);

    if result.status != ShortStatus::Completed {
        std::process::exit(1);
    }
    Ok(())
}

/// Colored output for dev, JSON for production.
fn init_tracing() -> anyhow::Result<()> {
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let env_filter = EnvFilter::from_default_env()
        .add_directive("vshort=info".parse()?)
        .add_directive("vshort_worker=info".parse()?)
        .add_directive("vshort_sieve=info".parse()?);

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_ansi(true)
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_file(false)
                    .with_line_number(false)
                    .with_writer(std::io::stderr),
            )
            .with(env_filter)
            .init();
    }
    Ok(())
}
