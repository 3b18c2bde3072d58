use clap::{Args, Subcommand};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use mctp_serial_frame::{FrameConfig, MAX_PAYLOAD};
use mctp_serial_transport::{SerialChannel, DEFAULT_BAUD_RATE};

use crate::exit::{io_error, transport_error, CliError, CliResult, USAGE};
use crate::output::OutputFormat;

pub mod decode;
pub mod encode;
pub mod listen;
pub mod send;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Frame a payload and print the wire bytes.
    Encode(EncodeArgs),
    /// Decode wire bytes into packets.
    Decode(DecodeArgs),
    /// Send a single packet over a serial device.
    Send(SendArgs),
    /// Listen on a serial device and print received packets.
    Listen(ListenArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Encode(args) => encode::run(args, format),
        Command::Decode(args) => decode::run(args, format),
        Command::Send(args) => send::run(args, format),
        Command::Listen(args) => listen::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug)]
pub struct PayloadArgs {
    /// Raw string payload.
    #[arg(long, conflicts_with_all = ["hex", "file"])]
    pub data: Option<String>,
    /// Hex payload (e.g. "41 42 7e").
    #[arg(long, conflicts_with_all = ["data", "file"])]
    pub hex: Option<String>,
    /// Read payload from file.
    #[arg(long, conflicts_with_all = ["data", "hex"])]
    pub file: Option<PathBuf>,
}

impl PayloadArgs {
    pub fn resolve(&self) -> CliResult<Vec<u8>> {
        if let Some(data) = &self.data {
            return Ok(data.as_bytes().to_vec());
        }
        if let Some(hex) = &self.hex {
            return parse_hex(hex);
        }
        if let Some(path) = &self.file {
            return fs::read(path)
                .map_err(|err| io_error(&format!("failed reading {}", path.display()), err));
        }
        Ok(Vec::new())
    }
}

#[derive(Args, Debug)]
pub struct EncodeArgs {
    #[command(flatten)]
    pub payload: PayloadArgs,
}

#[derive(Args, Debug)]
pub struct DecodeArgs {
    /// Wire bytes as hex. Whitespace, ':' and ',' separators are ignored.
    #[arg(conflicts_with = "file", required_unless_present = "file")]
    pub wire: Option<String>,
    /// Read raw wire bytes from file.
    #[arg(long)]
    pub file: Option<PathBuf>,
    /// Receive buffer capacity in payload bytes.
    #[arg(long, default_value_t = MAX_PAYLOAD)]
    pub capacity: usize,
    /// Print link counters after the packets.
    #[arg(long)]
    pub stats: bool,
}

#[derive(Args, Debug)]
pub struct SendArgs {
    /// Serial device path (e.g. /dev/ttyUSB0).
    pub device: PathBuf,
    /// Line speed.
    #[arg(long, default_value_t = DEFAULT_BAUD_RATE)]
    pub baud: u32,
    #[command(flatten)]
    pub payload: PayloadArgs,
    /// Wait for one response packet and print it.
    #[arg(long)]
    pub wait: bool,
    /// Maximum time to wait for response when --wait is set (e.g. 5s, 500ms).
    #[arg(long, default_value = "5s")]
    pub wait_timeout: String,
}

#[derive(Args, Debug)]
pub struct ListenArgs {
    /// Serial device path (e.g. /dev/ttyUSB0).
    pub device: PathBuf,
    /// Line speed.
    #[arg(long, default_value_t = DEFAULT_BAUD_RATE)]
    pub baud: u32,
    /// Exit after receiving N packets.
    #[arg(long)]
    pub count: Option<usize>,
    /// Abandon a partial frame after this long without a byte (e.g. 1s, 250ms).
    #[arg(long, default_value = "1s")]
    pub idle_timeout: String,
    /// Receive buffer capacity in payload bytes.
    #[arg(long, default_value_t = MAX_PAYLOAD)]
    pub capacity: usize,
    /// Print link counters on exit.
    #[arg(long)]
    pub stats: bool,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

pub(crate) fn open_device(path: &Path, baud: u32) -> CliResult<SerialChannel> {
    SerialChannel::open_with_baud(path, baud).map_err(|err| transport_error("open failed", err))
}

pub(crate) fn frame_config(
    capacity: usize,
    idle_timeout: Option<Duration>,
) -> CliResult<FrameConfig> {
    if capacity == 0 || capacity > MAX_PAYLOAD {
        return Err(CliError::new(
            USAGE,
            format!("--capacity must be between 1 and {MAX_PAYLOAD}"),
        ));
    }
    Ok(FrameConfig {
        buffer_capacity: capacity,
        idle_timeout,
    })
}

pub(crate) fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, unit) = if let Some(num) = input.strip_suffix("ms") {
        (num, "ms")
    } else if let Some(num) = input.strip_suffix('s') {
        (num, "s")
    } else {
        (input, "s")
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration value: {input}")))?;

    if value == 0 {
        return Err(CliError::new(USAGE, "duration must be greater than zero"));
    }

    match unit {
        "ms" => Ok(Duration::from_millis(value)),
        _ => Ok(Duration::from_secs(value)),
    }
}

/// Parse hex digits, ignoring whitespace and `:`/`,` separators.
pub(crate) fn parse_hex(input: &str) -> CliResult<Vec<u8>> {
    let digits: String = input
        .chars()
        .filter(|c| !c.is_ascii_whitespace() && *c != ':' && *c != ',')
        .collect();
    hex::decode(&digits)
        .map_err(|err| CliError::new(USAGE, format!("invalid hex input: {err}")))
}
