//! Best-effort backup of a freshly trained model directory.
//!
//! The directory is compressed next to itself and the tarball uploaded to
//! the remote bucket. Callers treat failures here as log-only: the model
//! swap already happened and is valid without its backup.

use anyhow::{anyhow, Result};
use std::path::Path;
use tracing::info;

use crate::constants::archive;
use crate::services::commands::execute_shell_command;

pub async fn archive_model_dir(model_dir: &Path) -> Result<()> {
    let parent = model_dir
        .parent()
        .ok_or_else(|| anyhow!("Model directory {} has no parent", model_dir.display()))?;
    let base = model_dir
        .file_name()
        .ok_or_else(|| anyhow!("Model directory {} has no name", model_dir.display()))?
        .to_string_lossy();

    let tar_file = format!("{}.tar.gz", base);
    execute_shell_command(&format!(
        "cd '{}' && tar czvf '{}' '{}'",
        parent.display(),
        tar_file,
        base
    ))
    .await?;

    let remote = format!("{}/{}", archive::REMOTE_URL, tar_file);
    execute_shell_command(&format!(
        "cd '{}' && gsutil cp '{}' '{}'",
        parent.display(),
        tar_file,
        remote
    ))
    .await?;

    info!("Backed up model {} to {}", base, remote);
    Ok(())
}
