//! Loading and persisting the experiment settings document.
//!
//! The document is the single source of truth for experiment-to-model
//! bindings. A save must never leave a truncated file behind, so the new
//! content is written to a sibling temporary file and renamed into place.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::config::Settings;
use crate::errors::ConfigError;

/// Read and strictly parse the settings document. A missing file or
/// malformed content is an error; there is no lenient mode.
pub async fn load(path: &Path) -> Result<Settings, ConfigError> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| ConfigError::LoadFailed {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;

    let settings: Settings = serde_yaml::from_str(&raw).map_err(|e| ConfigError::ParseError {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;

    debug!(
        "Loaded {} experiments from {}",
        settings.experiments.len(),
        path.display()
    );
    Ok(settings)
}

/// Serialize the full document and atomically replace the file contents.
pub async fn save(path: &Path, settings: &Settings) -> Result<(), ConfigError> {
    let raw = serde_yaml::to_string(settings).map_err(|e| ConfigError::SaveFailed {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;

    let tmp = tmp_sibling(path);
    let write_err = |e: std::io::Error| ConfigError::SaveFailed {
        path: path.display().to_string(),
        reason: e.to_string(),
    };

    tokio::fs::write(&tmp, raw).await.map_err(write_err)?;
    tokio::fs::rename(&tmp, path).await.map_err(write_err)?;

    debug!("Saved settings to {}", path.display());
    Ok(())
}

// Same directory as the target so the rename stays on one filesystem.
fn tmp_sibling(path: &Path) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(".tmp");
    PathBuf::from(name)
}
