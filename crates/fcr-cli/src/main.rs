//! fcr - Terminal client for the FCR telemetry backend
//!
//! Connects to an engine ECU through the backend, streams decoded dataframes
//! with derived fault indicators, and sends adjustment and actuator commands.

mod commands;
mod config;
mod output;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use fcr_client::FcrClient;
use fcr_core::Adjustment;
use fcr_session::SessionController;
use tracing::debug;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::{Config, MergedConfig};
use crate::output::{OutputContext, OutputFormat};

#[derive(Parser)]
#[command(name = "fcr")]
#[command(author, version, about = "Live ECU telemetry and fault monitor")]
#[command(propagate_version = true)]
struct Cli {
    /// Backend URL [default: http://localhost:8081]
    #[arg(short, long, env = "FCR_SERVER")]
    server: Option<String>,

    /// Configuration file path
    #[arg(short, long, env = "FCR_CONFIG")]
    config: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    output: OutputFormat,

    /// Disable colored output
    #[arg(long)]
    no_color: bool,

    /// Minimal output (for scripting)
    #[arg(short, long)]
    quiet: bool,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Connect to the ECU and stream dataframes
    Monitor {
        /// Serial port on the backend host
        #[arg(short, long, env = "FCR_PORT")]
        port: Option<String>,
    },

    /// Replay a recorded scenario
    Replay {
        /// Scenario name (see `fcr scenarios`)
        scenario: String,
    },

    /// List recorded scenarios
    Scenarios,

    /// List serial ports on the backend host
    Ports,

    /// Step an adjustable setting
    Adjust {
        /// Setting: idlespeed, idledecay, ignitionadvance, stft, ltft, iac
        adjustment: Adjustment,

        /// Steps to apply (negative to decrease)
        #[arg(allow_hyphen_values = true)]
        steps: i32,

        /// Serial port on the backend host
        #[arg(short, long, env = "FCR_PORT")]
        port: Option<String>,
    },

    /// Switch an actuator test
    Actuate {
        /// Actuator ID (e.g., fuelpump, ptc, aircon, purgevalve, fan1, fan2)
        actuator: String,

        /// Deactivate instead of activate
        #[arg(long)]
        off: bool,

        /// Serial port on the backend host
        #[arg(short, long, env = "FCR_PORT")]
        port: Option<String>,
    },
}

impl Commands {
    fn port(&self) -> Option<&str> {
        match self {
            Commands::Monitor { port }
            | Commands::Adjust { port, .. }
            | Commands::Actuate { port, .. } => port.as_deref(),
            _ => None,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("warn")
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false))
        .with(filter)
        .init();

    // Load config file
    let config = if let Some(config_path) = &cli.config {
        Config::load_from(config_path)?
    } else {
        Config::load().unwrap_or_default()
    };

    // Merge CLI args with config
    let merged = config.merge_with_args(cli.server.as_deref(), cli.command.port(), cli.no_color);

    // Create output context
    let ctx = OutputContext::new(cli.output, merged.no_color, cli.quiet);

    let client = create_client(&merged.server)?;
    debug!(server = %merged.server, port = ?merged.port, "Using backend");

    // Execute command
    match &cli.command {
        Commands::Monitor { .. } => {
            let port = merged.require_port()?;
            commands::monitor(create_session(&client, &merged), port, &ctx).await?;
        }

        Commands::Replay { scenario } => {
            commands::replay(create_session(&client, &merged), scenario, &ctx).await?;
        }

        Commands::Scenarios => {
            commands::scenarios(&client, &ctx).await?;
        }

        Commands::Ports => {
            commands::ports(&client, &ctx).await?;
        }

        Commands::Adjust {
            adjustment, steps, ..
        } => {
            let port = merged.require_port()?;
            let session = create_session(&client, &merged);
            commands::adjust(&session, port, *adjustment, *steps, &ctx).await?;
        }

        Commands::Actuate { actuator, off, .. } => {
            let port = merged.require_port()?;
            let session = create_session(&client, &merged);
            commands::actuate(&session, port, actuator, !off, &ctx).await?;
        }
    }

    Ok(())
}

/// Create a backend client for the given server URL
fn create_client(server: &str) -> Result<FcrClient> {
    FcrClient::new(server).context("Failed to create FCR client")
}

fn create_session(client: &FcrClient, config: &MergedConfig) -> Arc<SessionController> {
    Arc::new(SessionController::new(
        Arc::new(client.clone()),
        config.session.clone(),
    ))
}
