use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Subcommand};
use rrcmon_transport::serial::{DEFAULT_BAUD_RATE, DEFAULT_PORT};

use crate::exit::{CliError, CliResult, USAGE};
use crate::output::OutputFormat;
use crate::view::View;

pub mod dump;
pub mod generate;
pub mod monitor;
pub mod ports;
pub mod replay;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Monitor a controller over its serial link.
    Monitor(MonitorArgs),
    /// Feed a capture file through the monitor and print the final state.
    Replay(ReplayArgs),
    /// Print every valid frame in a capture file.
    Dump(DumpArgs),
    /// Write a synthetic capture file.
    Generate(GenerateArgs),
    /// List serial ports.
    Ports(PortsArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Monitor(args) => monitor::run(args),
        Command::Replay(args) => replay::run(args, format),
        Command::Dump(args) => dump::run(args, format),
        Command::Generate(args) => generate::run(args),
        Command::Ports(args) => ports::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug)]
pub struct MonitorArgs {
    /// Serial port to open.
    #[arg(long, env = "RRCMON_PORT", default_value = DEFAULT_PORT)]
    pub port: String,
    /// Baud rate.
    #[arg(long, env = "RRCMON_BAUD", default_value_t = DEFAULT_BAUD_RATE)]
    pub baud: u32,
    /// How to present live data.
    #[arg(long, value_enum, default_value = "dashboard")]
    pub view: View,
    /// Refresh interval (e.g. 1s, 100ms). Default depends on the view.
    #[arg(long)]
    pub interval: Option<String>,
}

#[derive(Args, Debug)]
pub struct ReplayArgs {
    /// Capture file of raw link bytes.
    pub file: PathBuf,
    /// Maximum time to wait for the capture to drain (e.g. 10s, 500ms).
    #[arg(long, default_value = "10s")]
    pub timeout: String,
}

#[derive(Args, Debug)]
pub struct DumpArgs {
    /// Capture file of raw link bytes.
    pub file: PathBuf,
    /// Stop after N frames.
    #[arg(long)]
    pub count: Option<usize>,
}

#[derive(Args, Debug)]
pub struct GenerateArgs {
    /// Output file.
    pub file: PathBuf,
    /// Insert non-header bytes between frames.
    #[arg(long)]
    pub noise: bool,
    /// Append one frame with a bad checksum.
    #[arg(long)]
    pub corrupt: bool,
    /// Write the sample set N times.
    #[arg(long, default_value_t = 1)]
    pub repeat: u32,
}

#[derive(Args, Debug, Default)]
pub struct PortsArgs {}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

/// Parse `5s`, `150ms` or a bare number of seconds. Zero is rejected.
pub fn parse_duration(what: &str, input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, format!("{what} must not be empty")));
    }

    let (number, millis) = if let Some(num) = input.strip_suffix("ms") {
        (num, true)
    } else if let Some(num) = input.strip_suffix('s') {
        (num, false)
    } else {
        (input, false)
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid {what} value: {input}")))?;

    if value == 0 {
        return Err(CliError::new(USAGE, format!("{what} must be greater than zero")));
    }

    Ok(if millis {
        Duration::from_millis(value)
    } else {
        Duration::from_secs(value)
    })
}
