//! Adjust and actuate commands - one-shot commands on a short-lived session

use anyhow::{Context, Result};
use fcr_core::Adjustment;
use fcr_session::SessionController;

use crate::output::{CommandRow, OutputContext};

/// Step an adjustable setting and print the value the ECU confirmed
pub async fn adjust(
    session: &SessionController,
    port: &str,
    adjustment: Adjustment,
    steps: i32,
    ctx: &OutputContext,
) -> Result<()> {
    session
        .connect(port)
        .await
        .with_context(|| format!("Failed to connect on {}", port))?;

    let result = session.send_adjustment(adjustment, steps).await;
    disconnect(session, ctx).await;

    let value = result.with_context(|| format!("Failed to adjust {}", adjustment))?;
    ctx.print(&[CommandRow {
        target: adjustment.to_string(),
        confirmed: value.to_string(),
    }]);
    Ok(())
}

/// Switch an actuator test and print the confirmed activation
pub async fn actuate(
    session: &SessionController,
    port: &str,
    actuator: &str,
    activate: bool,
    ctx: &OutputContext,
) -> Result<()> {
    session
        .connect(port)
        .await
        .with_context(|| format!("Failed to connect on {}", port))?;

    let result = session.send_actuator(actuator, activate).await;
    disconnect(session, ctx).await;

    let active = result.with_context(|| format!("Failed to switch {}", actuator))?;
    ctx.print(&[CommandRow {
        target: actuator.to_string(),
        confirmed: if active { "on" } else { "off" }.to_string(),
    }]);
    Ok(())
}

async fn disconnect(session: &SessionController, ctx: &OutputContext) {
    if let Err(e) = session.disconnect().await {
        ctx.warn(&format!("Disconnect failed: {}", e));
    }
}
