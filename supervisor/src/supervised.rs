//! Handle to the supervised media-server process.
//!
//! The service is spawned as the leader of its own process group so the
//! whole group, including any children it forks, can be signaled as one
//! unit without touching the supervisor's own group.

use anyhow::{anyhow, Result};
use nix::errno::Errno;
use nix::sys::signal::{killpg, Signal};
use nix::unistd::Pid;
use std::fs::File;
use std::path::Path;
use std::process::Stdio;
use tokio::process::{Child, Command};
use tracing::{info, warn};

pub struct SupervisedProcess {
    child: Child,
    pgid: Pid,
    reaped: bool,
}

impl SupervisedProcess {
    /// Start `program` with the settings path as its sole positional
    /// argument. Stderr goes to `log` when given, otherwise it is discarded.
    pub fn spawn(program: &Path, settings_path: &Path, log: Option<&File>) -> Result<Self> {
        let stderr = match log {
            Some(file) => {
                let clone = file
                    .try_clone()
                    .map_err(|e| anyhow!("Failed to clone log file handle: {}", e))?;
                Stdio::from(clone)
            }
            None => Stdio::null(),
        };

        let child = Command::new(program)
            .arg(settings_path)
            .stderr(stderr)
            .process_group(0)
            .spawn()
            .map_err(|e| anyhow!("Failed to spawn {}: {}", program.display(), e))?;

        let pid = child
            .id()
            .ok_or_else(|| anyhow!("Spawned process has no pid"))? as i32;

        // With process_group(0) the child leads a fresh group whose id is
        // its own pid.
        Ok(Self {
            child,
            pgid: Pid::from_raw(pid),
            reaped: false,
        })
    }

    pub fn pgid(&self) -> Pid {
        self.pgid
    }

    /// Gracefully terminate the whole group and reap the leader. Idempotent;
    /// the old instance is fully gone once this returns.
    pub async fn terminate(&mut self) -> Result<()> {
        if self.reaped {
            return Ok(());
        }

        info!("Sending SIGTERM to supervised process group {}", self.pgid);
        match killpg(self.pgid, Signal::SIGTERM) {
            Ok(()) => {}
            // The group already exited on its own; still reap below.
            Err(Errno::ESRCH) => {}
            Err(e) => return Err(anyhow!("Failed to signal process group {}: {}", self.pgid, e)),
        }

        self.child
            .wait()
            .await
            .map_err(|e| anyhow!("Failed to reap supervised process: {}", e))?;
        self.reaped = true;
        Ok(())
    }
}

impl Drop for SupervisedProcess {
    // Last-resort group signal when the handle dies without an orderly stop,
    // so no supervised process outlives the supervisor.
    fn drop(&mut self) {
        if !self.reaped {
            if let Err(e) = killpg(self.pgid, Signal::SIGTERM) {
                if e != Errno::ESRCH {
                    warn!("Failed to signal process group {} on drop: {}", self.pgid, e);
                }
            }
        }
    }
}
