//! Daily maintenance scheduling.
//!
//! The scheduler is a strictly sequential two-state machine: it sleeps until
//! a fixed UTC hour, runs one maintenance cycle, and goes back to sleep.
//! The wakeup instant is recomputed from the current clock on every pass,
//! never carried over, so clock adjustments or a delayed wakeup self-correct
//! instead of compounding.

use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use tracing::{error, info};

use crate::constants::maintenance;
use crate::restart::RestartCoordinator;
use crate::retrain::RetrainRunner;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    /// Suspended until the contained instant
    Waiting(DateTime<Utc>),
    /// Maintenance cycle in progress
    Running,
}

/// Next instant at which maintenance must run: today at `hour`:00 UTC if
/// that is still in the future, otherwise tomorrow. Independent of any
/// previously computed wakeup.
pub fn next_wakeup(now: DateTime<Utc>, hour: u32) -> DateTime<Utc> {
    let today = now
        .date_naive()
        .and_hms_opt(hour, 0, 0)
        .expect("maintenance hour is 0-23")
        .and_utc();

    if today > now {
        today
    } else {
        today + Duration::days(1)
    }
}

// Rounded up to whole seconds so the scheduler never wakes early.
async fn sleep_until(wakeup: DateTime<Utc>) {
    let remaining = (wakeup - Utc::now()).num_milliseconds().max(0);
    let secs = (remaining as u64).div_ceil(1000);
    tokio::time::sleep(std::time::Duration::from_secs(secs)).await;
}

pub struct MaintenanceScheduler {
    state: SchedulerState,
    runner: RetrainRunner,
    coordinator: RestartCoordinator,
}

impl MaintenanceScheduler {
    pub fn new(runner: RetrainRunner, coordinator: RestartCoordinator) -> Self {
        Self {
            state: SchedulerState::Waiting(next_wakeup(Utc::now(), maintenance::HOUR_UTC)),
            runner,
            coordinator,
        }
    }

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    /// Launch the supervised service and repeat the daily maintenance loop.
    /// Returns only on a restart-coordination failure, which is fatal to the
    /// whole program.
    pub async fn run(&mut self) -> Result<()> {
        self.coordinator.launch()?;

        loop {
            let wakeup = next_wakeup(Utc::now(), maintenance::HOUR_UTC);
            self.state = SchedulerState::Waiting(wakeup);
            info!(
                "Sleeping until {} (UTC) to perform continual learning",
                wakeup.format("%Y-%m-%d %H:%M:%S")
            );
            sleep_until(wakeup).await;

            self.state = SchedulerState::Running;
            match self.runner.run_cycle().await {
                Ok(Some(new_model_dir)) => {
                    info!(
                        "Maintenance cycle produced {}; restarting supervised service",
                        new_model_dir.display()
                    );
                    self.coordinator.restart_after_update().await?;
                }
                // Nothing eligible this cycle; the runner already warned.
                Ok(None) => {}
                Err(e) => {
                    error!(
                        "Maintenance cycle failed, keeping current settings and service: {:#}",
                        e
                    );
                }
            }
        }
    }

    /// Tear down the supervised process group. Safe to call on any exit path.
    pub async fn stop(&mut self) {
        self.coordinator.stop().await;
    }
}
