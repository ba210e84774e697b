//! Central repository for the fixed operational parameters of the supervisor
//!
//! This module organizes constants by category to provide a single source of
//! truth for the maintenance schedule, model selection, collaborator paths,
//! and cleanup policy.

/// Maintenance window constants
pub mod maintenance {
    /// Hour of day (UTC) at which the continual-learning cycle runs
    pub const HOUR_UTC: u32 = 4;
}

/// Continual-learning model selection constants
pub mod retrain {
    /// Congestion-control scheme whose model is retrained each cycle
    pub const CONTROL_SCHEME: &str = "bbr";

    /// Canonical experiment retrained each cycle (exact abr_name match)
    pub const RETRAIN_ABR: &str = "puffer_ttp_cl";

    /// Experiments whose abr_name contains this tag share the retrained model
    pub const SHARED_MODEL_TAG: &str = "puffer_ttp_cl";

    /// Probe ceiling when searching for an unused model directory name
    pub const MAX_DIR_PROBES: u32 = 10_000;
}

/// External collaborator programs, laid out relative to the deployment root
pub mod collaborators {
    /// Media-server service binary; takes the settings path and runs until signaled
    pub const MEDIA_SERVER: &str = "media-server/run_servers";

    /// Retraining job; exit 0 means the new model is valid
    pub const RETRAIN_JOB: &str = "scripts/ttp.py";

    /// Stale-file cleaner for the media working directory
    pub const CLEANER: &str = "cleaner/cleaner";

    /// Public-facing frontend restarted through the host service manager
    pub const FRONTEND_SERVICE: &str = "gunicorn";
}

/// Transient media cleanup policy
pub mod cleanup {
    /// Working directory holding transient media artifacts
    pub const MEDIA_DIR: &str = "/dev/shm/media";

    /// Filename pattern of removable transient artifacts
    pub const STALE_PATTERN: &str = r"\d+\.(m4s|chk|ssim)";

    /// Age threshold in seconds before a matching file is removed
    pub const RETENTION_SECONDS: u64 = 600;
}

/// Remote model archival constants
pub mod archive {
    /// Object-store location receiving compressed model backups
    pub const REMOTE_URL: &str = "gs://puffer-models/puffer-ttp";
}
