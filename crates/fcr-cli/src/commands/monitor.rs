//! Monitor and replay commands - stream dataframes with an interactive console

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use fcr_session::{SessionController, SessionEvent, SessionMode, SessionResult};
use indicatif::{ProgressBar, ProgressStyle};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinSet;

use super::console::{ConsoleCommand, HELP};
use crate::output::{OutputContext, OutputFormat};

/// Connect to the ECU on `port` and stream dataframes
pub async fn monitor(session: Arc<SessionController>, port: &str, ctx: &OutputContext) -> Result<()> {
    ctx.info(&format!("Connecting to ECU on {}...", port));
    session
        .connect(port)
        .await
        .with_context(|| format!("Failed to connect on {}", port))?;
    print_connected(&session, ctx);

    run_console(session, ctx, None).await
}

/// Replay a recorded scenario
pub async fn replay(
    session: Arc<SessionController>,
    scenario: &str,
    ctx: &OutputContext,
) -> Result<()> {
    ctx.info(&format!("Loading scenario {}...", scenario));
    session
        .replay(scenario)
        .await
        .with_context(|| format!("Failed to replay {}", scenario))?;
    print_connected(&session, ctx);

    let progress = session.replay_progress().unwrap_or_default();
    let pb = if ctx.format == OutputFormat::Table && !ctx.quiet {
        let pb = ProgressBar::new(u64::from(progress.count));
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                .context("Invalid progress template")?
                .progress_chars("=>-"),
        );
        pb.set_position(u64::from(progress.position));
        Some(pb)
    } else {
        None
    };

    run_console(session, ctx, pb).await
}

fn print_connected(session: &SessionController, ctx: &OutputContext) {
    let state = session.state();
    ctx.success(&format!(
        "Connected to {} (ECU {}), {}",
        state.port,
        state.last_ecu_id.as_deref().unwrap_or("unknown"),
        state.mode
    ));
    ctx.info("Type `help` for console commands, Ctrl+C to disconnect");
}

/// Print session events and execute console commands until quit or Ctrl+C
async fn run_console(
    session: Arc<SessionController>,
    ctx: &OutputContext,
    progress: Option<ProgressBar>,
) -> Result<()> {
    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    ctrlc::set_handler(move || {
        r.store(false, Ordering::SeqCst);
    })?;

    let mut events = session.subscribe();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;
    // Backend commands in flight; the display keeps running meanwhile
    let mut commands: JoinSet<SessionResult<()>> = JoinSet::new();

    while running.load(Ordering::SeqCst) {
        tokio::select! {
            event = events.recv() => {
                match event {
                    Ok(event) => show_event(&event, ctx, progress.as_ref()),
                    Err(RecvError::Lagged(missed)) => {
                        ctx.warn(&format!("Display fell behind, skipped {} event(s)", missed));
                    }
                    Err(RecvError::Closed) => break,
                }
            }
            line = lines.next_line(), if stdin_open => {
                match line {
                    Ok(Some(line)) if line.trim().is_empty() => {}
                    Ok(Some(line)) => match line.parse::<ConsoleCommand>() {
                        Ok(ConsoleCommand::Quit) => break,
                        Ok(command) => execute(&session, command, ctx, &mut commands),
                        Err(e) => ctx.error(&e),
                    },
                    // stdin closed (e.g. piped input); keep streaming until Ctrl+C
                    Ok(None) | Err(_) => stdin_open = false,
                }
            }
            Some(done) = commands.join_next(), if !commands.is_empty() => {
                match done {
                    Ok(Ok(())) => {}
                    Ok(Err(e)) => ctx.error(&e.to_string()),
                    Err(e) => ctx.error(&format!("Command task failed: {}", e)),
                }
            }
            _ = tokio::time::sleep(tokio::time::Duration::from_millis(100)) => {
                // Check running flag periodically
                if !running.load(Ordering::SeqCst) {
                    break;
                }
            }
        }
    }

    commands.shutdown().await;
    if let Some(pb) = &progress {
        pb.finish_and_clear();
    }

    if session.mode() != SessionMode::Disconnected {
        ctx.info("\nDisconnecting...");
        session.disconnect().await.context("Disconnect failed")?;
    }
    ctx.success("Disconnected");
    Ok(())
}

fn show_event(event: &SessionEvent, ctx: &OutputContext, progress: Option<&ProgressBar>) {
    match (event, progress) {
        (SessionEvent::Dataframe(update), Some(pb)) => {
            if let Some(replay) = update.replay {
                pb.set_position(u64::from(replay.position));
                pb.set_message(format!("{}% remaining", replay.remaining_percent()));
            }
            pb.suspend(|| ctx.print_event(event));
        }
        _ => ctx.print_event(event),
    }
}

/// Run a console command; backend commands are spawned into `commands`
fn execute(
    session: &Arc<SessionController>,
    command: ConsoleCommand,
    ctx: &OutputContext,
    commands: &mut JoinSet<SessionResult<()>>,
) {
    // confirmations are printed from the event stream
    let session = session.clone();
    let result = match command {
        ConsoleCommand::Increase(adjustment) => {
            commands.spawn(async move { session.increase(adjustment).await.map(|_| ()) });
            Ok(())
        }
        ConsoleCommand::Decrease(adjustment) => {
            commands.spawn(async move { session.decrease(adjustment).await.map(|_| ()) });
            Ok(())
        }
        ConsoleCommand::Actuate { actuator, activate } => {
            commands.spawn(async move {
                session.send_actuator(&actuator, activate).await.map(|_| ())
            });
            Ok(())
        }
        ConsoleCommand::Pause => session.pause().map(|_| ctx.info("Paused (heartbeat only)")),
        ConsoleCommand::Resume => session.resume().map(|_| ctx.info("Resumed")),
        ConsoleCommand::Interval(ms) => session
            .set_poll_interval(ms)
            .map(|_| ctx.info(&format!("Polling every {} ms", ms))),
        ConsoleCommand::Status => {
            let state = session.state();
            ctx.info(&format!(
                "{} on {} (poll {} ms){}",
                state.mode,
                state.port,
                session.poll_interval().as_millis(),
                if state.heartbeat_active {
                    ", heartbeat active"
                } else {
                    ""
                }
            ));
            Ok(())
        }
        ConsoleCommand::Help => {
            ctx.info(HELP);
            Ok(())
        }
        ConsoleCommand::Quit => Ok(()),
    };

    if let Err(e) = result {
        ctx.error(&e.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fcr_client::FcrClient;
    use fcr_core::Adjustment;
    use fcr_session::{SessionConfig, SessionError};

    #[tokio::test]
    async fn test_backend_commands_are_spawned() {
        let client = FcrClient::new("http://127.0.0.1:9").unwrap();
        let session = Arc::new(SessionController::new(
            Arc::new(client),
            SessionConfig::default(),
        ));
        let ctx = OutputContext::new(OutputFormat::Json, true, true);
        let mut commands = JoinSet::new();

        execute(
            &session,
            ConsoleCommand::Increase(Adjustment::IdleSpeed),
            &ctx,
            &mut commands,
        );
        execute(
            &session,
            ConsoleCommand::Actuate {
                actuator: "fan1".into(),
                activate: true,
            },
            &ctx,
            &mut commands,
        );
        execute(&session, ConsoleCommand::Help, &ctx, &mut commands);
        assert_eq!(commands.len(), 2);

        while let Some(done) = commands.join_next().await {
            assert!(matches!(
                done.unwrap(),
                Err(SessionError::CommandRejectedNotConnected)
            ));
        }
    }
}
