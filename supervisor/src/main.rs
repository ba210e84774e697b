use anyhow::{anyhow, Result};
use chrono::Utc;
use clap::Parser;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

use supervisor::config::store;
use supervisor::constants::collaborators;
use supervisor::errors::ConfigError;
use supervisor::restart::RestartCoordinator;
use supervisor::retrain::RetrainRunner;
use supervisor::scheduler::MaintenanceScheduler;

#[derive(Parser)]
#[command(about = "Run the media servers and retrain the ABR model at a fixed UTC hour")]
struct Args {
    /// YAML settings consumed by the media server and the retraining job
    settings: PathBuf,

    /// Persist the media server's diagnostic output to a timestamped log
    /// file instead of discarding it
    #[arg(long)]
    save_log: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let env_filter = EnvFilter::from_default_env().add_directive("supervisor=info".parse()?);
    fmt().with_env_filter(env_filter).init();

    let args = Args::parse();

    let settings_path =
        std::fs::canonicalize(&args.settings).map_err(|e| ConfigError::LoadFailed {
            path: args.settings.display().to_string(),
            reason: e.to_string(),
        })?;

    // Fail fast on a missing or malformed settings document
    let settings = store::load(&settings_path).await?;
    info!(
        "Settings loaded: {} experiments in {}",
        settings.experiments.len(),
        settings_path.display()
    );

    // Collaborator binaries live relative to the deployment root, one level
    // above this executable's directory
    let exe = std::env::current_exe()?;
    let src_dir = exe
        .parent()
        .and_then(Path::parent)
        .ok_or_else(|| anyhow!("Cannot determine the deployment root directory"))?;
    let media_server_path = src_dir.join(collaborators::MEDIA_SERVER);
    let job_path = src_dir.join(collaborators::RETRAIN_JOB);
    let cleaner_path = src_dir.join(collaborators::CLEANER);

    let log_file = if args.save_log {
        let name = format!("run_servers_{}.log", Utc::now().format("%Y-%m-%dT%H:%M:%SZ"));
        let file = std::fs::File::create(&name)
            .map_err(|e| anyhow!("Failed to create log file {}: {}", name, e))?;
        info!("Logging media-server output to {}", name);
        Some(file)
    } else {
        None
    };

    let mut scheduler = MaintenanceScheduler::new(
        RetrainRunner::new(settings_path.clone(), job_path),
        RestartCoordinator::new(settings_path, media_server_path, cleaner_path, log_file),
    );

    let result = tokio::select! {
        res = scheduler.run() => res,
        _ = shutdown_signal() => {
            info!("Termination signal received");
            Ok(())
        }
    };

    if let Err(e) = &result {
        warn!("Shutting down after error: {:#}", e);
    }

    // The supervised process group must not outlive this program, whichever
    // path got us here
    scheduler.stop().await;
    result
}

async fn shutdown_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm = signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {}
        _ = sigterm.recv() => {}
    }
}
