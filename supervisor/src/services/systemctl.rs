use anyhow::{anyhow, Result};
use tokio::process::Command as AsyncCommand;
use tracing::info;

pub async fn restart_service(service_name: &str) -> Result<()> {
    info!("Restarting service: {}", service_name);

    let output = AsyncCommand::new("sudo")
        .arg("systemctl")
        .arg("restart")
        .arg(service_name)
        .output()
        .await?;

    if !output.status.success() {
        let error = String::from_utf8_lossy(&output.stderr);
        return Err(anyhow!(
            "Failed to restart service {}: {}",
            service_name,
            error
        ));
    }

    info!("Service {} restarted successfully", service_name);
    Ok(())
}
