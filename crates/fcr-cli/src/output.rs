//! Output formatting for fcr (table, json)

use clap::ValueEnum;
use colored::{ColoredString, Colorize};
use fcr_core::{Indicator, ServerStatus, Severity};
use fcr_session::{DataframeUpdate, SessionEvent};
use serde::Serialize;
use tabled::{Table, Tabled};

/// Output format options
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// ASCII table format (default)
    #[default]
    Table,
    /// JSON, one document per line when streaming
    Json,
}

/// Context for output rendering
pub struct OutputContext {
    pub format: OutputFormat,
    pub quiet: bool,
}

impl OutputContext {
    pub fn new(format: OutputFormat, no_color: bool, quiet: bool) -> Self {
        if no_color {
            colored::control::set_override(false);
        }
        Self { format, quiet }
    }

    /// Print a success message (unless in quiet mode)
    pub fn success(&self, msg: &str) {
        if !self.quiet {
            println!("{}", msg.green());
        }
    }

    /// Print an info message (unless in quiet mode)
    pub fn info(&self, msg: &str) {
        if !self.quiet {
            println!("{}", msg);
        }
    }

    /// Print a warning message
    pub fn warn(&self, msg: &str) {
        eprintln!("{}", msg.yellow());
    }

    /// Print an error message
    pub fn error(&self, msg: &str) {
        eprintln!("{}", msg.red());
    }

    /// Print data in the configured format
    pub fn print<T: Tabled + Serialize>(&self, data: &[T]) {
        match self.format {
            OutputFormat::Table => {
                if data.is_empty() {
                    if !self.quiet {
                        println!("No data");
                    }
                } else {
                    println!("{}", Table::new(data));
                }
            }
            OutputFormat::Json => {
                println!(
                    "{}",
                    serde_json::to_string_pretty(data).unwrap_or_else(|_| "[]".to_string())
                );
            }
        }
    }

    /// Print one session event; JSON output is one event per line
    pub fn print_event(&self, event: &SessionEvent) {
        if self.format == OutputFormat::Json {
            if let Ok(json) = serde_json::to_string(event) {
                println!("{}", json);
            }
            return;
        }

        match event {
            SessionEvent::Dataframe(update) => self.print_dataframe(update),
            SessionEvent::TransientError { message } => {
                self.warn(&format!("Backend request failed: {}", message))
            }
            SessionEvent::AdjustmentConfirmed { adjustment, value } => {
                self.success(&format!("{} = {}", adjustment, value))
            }
            SessionEvent::ActuatorConfirmed { actuator, active } => self.success(&format!(
                "{} {}",
                actuator,
                if *active { "on" } else { "off" }
            )),
            SessionEvent::ActuatorDeactivated { actuator } => {
                self.info(&format!("{} test ended", actuator))
            }
            SessionEvent::ServerStatus(status) => match status.connected {
                Some(false) => self.warn(&server_status_line(status)),
                _ => self.info(&server_status_line(status)),
            },
        }
    }

    fn print_dataframe(&self, update: &DataframeUpdate) {
        if self.quiet {
            return;
        }
        println!("{}", summary_line(update));

        let active: Vec<IndicatorRow> = update
            .indicators
            .active()
            .map(IndicatorRow::from)
            .collect();
        if !active.is_empty() {
            println!("{}", Table::new(&active));
        }
    }
}

/// One-line engine summary for a dataframe
pub fn summary_line(update: &DataframeUpdate) -> String {
    let sample = &update.sample;
    let field = |v: Option<f64>| v.map_or_else(|| "-".to_string(), |v| format!("{:.0}", v));

    let mut line = format!(
        "[{}] RPM {}  Coolant {}°C  MAP {} kPa  IAC {}  Lambda {} mV",
        sample.time.as_deref().unwrap_or("--:--:--"),
        field(sample.engine_rpm),
        field(sample.coolant_temp),
        field(sample.manifold_absolute_pressure),
        field(sample.iac_position),
        field(sample.lambda_voltage),
    );

    let faults = update.indicators.fault_count;
    if faults > 0 {
        line.push_str(&format!("  {}", format!("{} fault(s)", faults).red().bold()));
    }
    if let Some(replay) = &update.replay {
        line.push_str(&format!("  replay {}/{}", replay.position, replay.count));
    }
    line
}

/// Human-readable server status change
pub fn server_status_line(status: &ServerStatus) -> String {
    let mut line = match status.connected {
        Some(true) => "Server: ECU connected".to_string(),
        Some(false) => "Server: ECU disconnected".to_string(),
        None => "Server: status changed".to_string(),
    };
    if let Some(ecu_id) = &status.ecu_id {
        line.push_str(&format!(" (ECU {})", ecu_id));
    }
    if let Some(message) = &status.message {
        line.push_str(&format!(": {}", message));
    }
    line
}

fn severity_label(severity: Severity) -> ColoredString {
    match severity {
        Severity::Status => severity.to_string().green(),
        Severity::Warning => severity.to_string().yellow(),
        Severity::Fault => severity.to_string().red(),
    }
}

// =============================================================================
// Display types for various commands
// =============================================================================

/// Lit indicator for monitor output
#[derive(Debug, Tabled, Serialize)]
pub struct IndicatorRow {
    #[tabled(rename = "Indicator")]
    pub id: String,
    #[tabled(rename = "Severity")]
    pub severity: String,
    #[tabled(rename = "Description")]
    pub label: String,
}

impl From<&Indicator> for IndicatorRow {
    fn from(indicator: &Indicator) -> Self {
        Self {
            id: indicator.id.to_string(),
            severity: severity_label(indicator.severity).to_string(),
            label: indicator.id.label().to_string(),
        }
    }
}

/// Scenario display for scenarios command
#[derive(Debug, Tabled, Serialize)]
pub struct ScenarioRow {
    #[tabled(rename = "Scenario")]
    pub name: String,
}

/// Port display for ports command
#[derive(Debug, Tabled, Serialize)]
pub struct PortRow {
    #[tabled(rename = "Port")]
    pub port: String,
}

/// Confirmed command result
#[derive(Debug, Tabled, Serialize)]
pub struct CommandRow {
    #[tabled(rename = "Target")]
    pub target: String,
    #[tabled(rename = "Confirmed")]
    pub confirmed: String,
}
