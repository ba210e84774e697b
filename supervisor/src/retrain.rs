//! The continual-learning maintenance cycle.
//!
//! Once per cycle: find the canonical experiment for the retrained scheme,
//! allocate a fresh model directory next to the previous one, run the
//! retraining job to completion, back up the result, then point every
//! experiment in the model family at the new directory and persist the
//! settings. Any failure before the persist leaves the document on disk
//! untouched.

use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tokio::process::Command;
use tracing::{info, warn};

use crate::config::store;
use crate::constants::retrain;
use crate::errors::{AllocationError, ConfigError, JobFailure};
use crate::services::archive;

/// Candidate directory `{scheme}-{YYYYMMDD}-{i}` under `parent`, probing
/// `i` upward from 1 until an unused name is found. Names are never reused
/// and existing entries, directory or not, are never overwritten.
pub fn allocate_model_dir(
    parent: &Path,
    scheme: &str,
    now: DateTime<Utc>,
) -> Result<PathBuf, AllocationError> {
    let prefix = format!("{}-{}", scheme, now.format("%Y%m%d"));

    for i in 1..=retrain::MAX_DIR_PROBES {
        let candidate = parent.join(format!("{}-{}", prefix, i));
        if !candidate.exists() {
            return Ok(candidate);
        }
    }

    Err(AllocationError {
        parent_dir: parent.display().to_string(),
        prefix,
    })
}

pub struct RetrainRunner {
    settings_path: PathBuf,
    job_path: PathBuf,
}

impl RetrainRunner {
    pub fn new(settings_path: PathBuf, job_path: PathBuf) -> Self {
        Self {
            settings_path,
            job_path,
        }
    }

    /// Run one maintenance cycle. Returns the new model directory when a
    /// retrain happened and the settings were rewritten, `None` when no
    /// experiment was eligible (a normal outcome that must not trigger a
    /// service restart).
    pub async fn run_cycle(&self) -> Result<Option<PathBuf>> {
        let mut settings = store::load(&self.settings_path).await?;

        let scheme = retrain::CONTROL_SCHEME;
        let eligible: Vec<(String, PathBuf)> = settings
            .eligible_for_retrain(scheme, retrain::RETRAIN_ABR)
            .into_iter()
            .map(|experiment| {
                let abr_name = experiment
                    .fingerprint
                    .abr_name
                    .clone()
                    .unwrap_or_default();
                let model_dir = experiment
                    .fingerprint
                    .abr_config
                    .as_ref()
                    .and_then(|c| c.model_dir.as_deref())
                    .ok_or(ConfigError::MissingModelDir {
                        abr_name: abr_name.clone(),
                    })?;
                Ok((abr_name, PathBuf::from(model_dir)))
            })
            .collect::<Result<_>>()?;

        if eligible.len() > 1 {
            warn!(
                "{} experiments match '{}' on {}; the last one trained will be shared",
                eligible.len(),
                retrain::RETRAIN_ABR,
                scheme
            );
        }

        let mut new_model_dir: Option<PathBuf> = None;

        for (abr_name, old_model_dir) in &eligible {
            let parent = old_model_dir
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .ok_or_else(|| {
                    anyhow!(
                        "model_dir '{}' of '{}' has no parent directory",
                        old_model_dir.display(),
                        abr_name
                    )
                })?;

            let candidate = allocate_model_dir(parent, scheme, Utc::now())?;
            self.run_retrain_job(scheme, old_model_dir, &candidate).await?;

            if let Err(e) = archive::archive_model_dir(&candidate).await {
                warn!("Model backup failed, keeping the new model anyway: {:#}", e);
            }

            new_model_dir = Some(candidate);
        }

        let Some(new_model_dir) = new_model_dir else {
            warn!("Not performing continual learning: no eligible experiment");
            return Ok(None);
        };

        let updated = settings.update_shared_model(
            scheme,
            retrain::SHARED_MODEL_TAG,
            &new_model_dir.to_string_lossy(),
        );
        store::save(&self.settings_path, &settings).await?;
        info!(
            "Updated model_dir for {} experiments in {}",
            updated,
            self.settings_path.display()
        );

        Ok(Some(new_model_dir))
    }

    /// Block on the retraining job; nonzero exit fails the cycle.
    async fn run_retrain_job(
        &self,
        scheme: &str,
        load_model: &Path,
        save_model: &Path,
    ) -> Result<()> {
        info!(
            "Continual learning: loading {} and training {}",
            basename(load_model),
            basename(save_model)
        );

        let started = Instant::now();
        let status = Command::new(&self.job_path)
            .arg(&self.settings_path)
            .arg("--cl")
            .arg("--cc")
            .arg(scheme)
            .arg("--load-model")
            .arg(load_model)
            .arg("--save-model")
            .arg(save_model)
            .status()
            .await
            .map_err(|e| anyhow!("Failed to run {}: {}", self.job_path.display(), e))?;
        let elapsed = started.elapsed();

        if !status.success() {
            return Err(JobFailure {
                cc: scheme.to_string(),
                exit_code: status.code().unwrap_or(-1),
                elapsed_secs: elapsed.as_secs(),
            }
            .into());
        }

        info!(
            "Continual learning: new model {} is available after {:.2} hours",
            basename(save_model),
            elapsed.as_secs_f64() / 3600.0
        );
        Ok(())
    }
}

fn basename(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
