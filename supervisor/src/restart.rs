//! Restart coordination after a successful maintenance cycle.
//!
//! The coordinator is the single owner of the supervised process handle:
//! nothing else starts or stops the media server. The restart sequence is
//! strictly synchronous; the old process group is fully terminated before
//! anything else happens, and a new instance only starts once the frontend
//! restart and media cleanup have succeeded.

use anyhow::Result;
use std::fs::File;
use std::path::PathBuf;
use tokio::process::Command;
use tracing::{info, warn};

use crate::constants::{cleanup, collaborators};
use crate::errors::RestartError;
use crate::services::systemctl;
use crate::supervised::SupervisedProcess;

pub struct RestartCoordinator {
    settings_path: PathBuf,
    media_server_path: PathBuf,
    cleaner_path: PathBuf,
    log_file: Option<File>,
    active: Option<SupervisedProcess>,
}

impl RestartCoordinator {
    pub fn new(
        settings_path: PathBuf,
        media_server_path: PathBuf,
        cleaner_path: PathBuf,
        log_file: Option<File>,
    ) -> Self {
        Self {
            settings_path,
            media_server_path,
            cleaner_path,
            log_file,
            active: None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    /// Start a supervised instance bound to the current settings path.
    pub fn launch(&mut self) -> Result<(), RestartError> {
        if self.active.is_some() {
            return Err(RestartError::Launch {
                reason: "a supervised process is already active".to_string(),
            });
        }

        let process = SupervisedProcess::spawn(
            &self.media_server_path,
            &self.settings_path,
            self.log_file.as_ref(),
        )
        .map_err(|e| RestartError::Launch {
            reason: format!("{:#}", e),
        })?;

        info!(
            "Started {} (process group {})",
            self.media_server_path.display(),
            process.pgid()
        );
        self.active = Some(process);
        Ok(())
    }

    /// Tear down, refresh dependent services, and relaunch against the
    /// updated settings. Every step here is fatal to the program on failure;
    /// once the old service is gone there is no safe degraded mode.
    pub async fn restart_after_update(&mut self) -> Result<()> {
        self.stop().await;

        systemctl::restart_service(collaborators::FRONTEND_SERVICE)
            .await
            .map_err(|e| RestartError::ServiceRestart {
                service: collaborators::FRONTEND_SERVICE.to_string(),
                reason: format!("{:#}", e),
            })?;

        self.clean_stale_media()
            .await
            .map_err(|e| RestartError::Cleanup {
                reason: format!("{:#}", e),
            })?;

        self.launch()?;
        info!("Killed and restarted the media server with updated settings");
        Ok(())
    }

    /// Remove transient media artifacts past the retention threshold.
    async fn clean_stale_media(&self) -> Result<()> {
        let output = Command::new(&self.cleaner_path)
            .arg("-r")
            .arg("-p")
            .arg(cleanup::STALE_PATTERN)
            .arg("-t")
            .arg(cleanup::RETENTION_SECONDS.to_string())
            .arg(cleanup::MEDIA_DIR)
            .output()
            .await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            anyhow::bail!(
                "{} exited with {}: {}",
                self.cleaner_path.display(),
                output.status,
                stderr.trim()
            );
        }

        info!("Cleaned stale media under {}", cleanup::MEDIA_DIR);
        Ok(())
    }

    /// Terminate the active process group, if any. Called on the restart
    /// path and on every program exit path; idempotent.
    pub async fn stop(&mut self) {
        if let Some(mut process) = self.active.take() {
            if let Err(e) = process.terminate().await {
                warn!("Failed to stop supervised process group: {:#}", e);
            }
        }
    }
}
