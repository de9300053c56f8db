use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use vidova_tracker::{JobEntry, TrackerDeps, TrackerRegistry};

#[derive(Parser, Debug)]
#[command(name = "vidova-track")]
#[command(about = "Follow Vidova video processing jobs from the terminal", long_about = None)]
#[command(version)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Backend base URL, overriding the configuration file
    #[arg(long, env = "VIDOVA_API_URL", value_name = "URL")]
    api_url: Option<String>,

    /// File used to persist the session token between runs
    #[arg(long, value_name = "FILE")]
    token_cache: Option<PathBuf>,

    /// Status the jobs are known to have when tracking starts
    #[arg(long, default_value = "processing")]
    status: String,

    /// Video ids to track
    #[arg(required = true, value_name = "VIDEO_ID")]
    job_ids: Vec<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_thread_ids(false)
        .with_level(true)
        .init();

    info!("Vidova progress tracker v{}", env!("CARGO_PKG_VERSION"));

    let args = Args::parse();

    info!("Loading configuration...");
    let mut config = match vidova_tracker::config::load_config(args.config.as_deref()) {
        Ok(cfg) => cfg,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            return Err(e);
        }
    };

    if let Some(url) = args.api_url {
        config.api_base_url = url;
    }
    if let Some(path) = args.token_cache {
        config.token_cache_path = Some(path);
    }
    vidova_tracker::config::validate_config(&config)?;

    info!("API base URL: {}", config.api_base_url);
    info!("Poll interval: {} seconds", config.poll_interval_secs);
    info!("Token cache: {:?}", config.token_cache_path);

    let deps = TrackerDeps::from_config(&config)?;

    let (done_tx, mut done_rx) = mpsc::unbounded_channel::<(String, String)>();
    let mut registry = TrackerRegistry::new(
        deps,
        Some(Arc::new(move |job_id: &str, status: &str| {
            let _ = done_tx.send((job_id.to_string(), status.to_string()));
        })),
    );

    let mut jobs: Vec<JobEntry> = args
        .job_ids
        .iter()
        .map(|id| JobEntry::new(id.clone(), args.status.clone()))
        .collect();
    registry.sync(&jobs)?;

    if registry.is_empty() {
        warn!("No job is in processing status, nothing to track");
        return Ok(());
    }

    let mut render = tokio::time::interval(config.tick_interval());

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted, stopping trackers");
                break;
            }
            Some((job_id, status)) = done_rx.recv() => {
                info!("Job {} reported {}", job_id, status);
                for job in jobs.iter_mut().filter(|job| job.id == job_id) {
                    job.status = status.clone();
                }
                registry.sync(&jobs)?;
                if registry.is_empty() {
                    info!("All jobs finished");
                    break;
                }
            }
            _ = render.tick() => {
                for (job_id, view) in registry.views() {
                    println!("== {}\n{}\n", job_id, view);
                }
            }
        }
    }

    Ok(())
}
