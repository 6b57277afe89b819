//! Version reporting.

use crate::settings::Settings;
use crate::wiring;

pub async fn print(settings: &Settings) -> anyhow::Result<()> {
    let orch = wiring::orchestrator(settings).await?;
    let version = orch.version().await?;
    println!("warden version: {}", version.warden);
    println!("client version: {}", version.client);
    println!("server version: {}", version.server);
    Ok(())
}
