//! Scenarios and ports commands - list what the backend can open

use anyhow::{Context, Result};
use fcr_client::FcrClient;

use crate::output::{OutputContext, PortRow, ScenarioRow};

/// List recorded scenarios available for replay
pub async fn scenarios(client: &FcrClient, ctx: &OutputContext) -> Result<()> {
    let scenarios = client
        .list_scenarios()
        .await
        .context("Failed to list scenarios")?;

    let rows: Vec<ScenarioRow> = scenarios
        .into_iter()
        .map(|s| ScenarioRow { name: s.name })
        .collect();

    ctx.print(&rows);
    Ok(())
}

/// List serial ports on the backend host
pub async fn ports(client: &FcrClient, ctx: &OutputContext) -> Result<()> {
    let ports = client.list_ports().await.context("Failed to list ports")?;

    let rows: Vec<PortRow> = ports
        .ports
        .into_iter()
        .map(|port| PortRow { port })
        .collect();

    ctx.print(&rows);
    Ok(())
}
