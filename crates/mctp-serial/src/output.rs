use std::io::{IsTerminal, Write};
use std::time::{SystemTime, UNIX_EPOCH};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use mctp_serial_frame::{LinkStats, RxStats};
use serde::Serialize;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
    Raw,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

#[derive(Serialize)]
struct PacketOutput<'a> {
    index: usize,
    payload_size: usize,
    payload_hex: String,
    payload: String,
    source: &'a str,
    timestamp: String,
}

pub fn print_packet(packet: &[u8], index: usize, source: &str, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let out = PacketOutput {
                index,
                payload_size: packet.len(),
                payload_hex: to_hex(packet),
                payload: payload_preview(packet),
                source,
                timestamp: now_unix_seconds(),
            };
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["#", "SIZE", "SOURCE", "HEX", "PAYLOAD"])
                .add_row(vec![
                    index.to_string(),
                    packet.len().to_string(),
                    source.to_string(),
                    to_hex(packet),
                    payload_preview(packet),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!(
                "packet={} size={} source={} hex={} payload={}",
                index,
                packet.len(),
                source,
                to_hex(packet),
                payload_preview(packet)
            );
        }
        OutputFormat::Raw => {
            print_raw(packet);
        }
    }
}

#[derive(Serialize)]
struct EncodedOutput {
    payload_size: usize,
    wire_size: usize,
    fcs: String,
    wire_hex: String,
}

pub fn print_encoded(payload_len: usize, wire: &[u8], fcs: u16, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let out = EncodedOutput {
                payload_size: payload_len,
                wire_size: wire.len(),
                fcs: format!("{fcs:04x}"),
                wire_hex: to_hex(wire),
            };
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["PAYLOAD", "WIRE", "FCS", "HEX"])
                .add_row(vec![
                    payload_len.to_string(),
                    wire.len().to_string(),
                    format!("{fcs:04x}"),
                    to_hex(wire),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!(
                "payload={} wire={} fcs={:04x} hex={}",
                payload_len,
                wire.len(),
                fcs,
                to_hex(wire)
            );
        }
        OutputFormat::Raw => {
            print_raw(wire);
        }
    }
}

#[derive(Serialize)]
struct StatsOutput {
    rx_bytes: u64,
    rx_frames: u64,
    sync_losses: u64,
    unexpected_syncs: u64,
    bad_escapes: u64,
    checksum_mismatches: u64,
    overflows: u64,
    idle_timeouts: u64,
    tx_frames: u64,
    tx_bytes: u64,
}

impl StatsOutput {
    fn from_stats(stats: &LinkStats) -> Self {
        let RxStats {
            bytes,
            frames,
            sync_losses,
            unexpected_syncs,
            bad_escapes,
            checksum_mismatches,
            overflows,
            idle_timeouts,
        } = stats.rx;
        Self {
            rx_bytes: bytes,
            rx_frames: frames,
            sync_losses,
            unexpected_syncs,
            bad_escapes,
            checksum_mismatches,
            overflows,
            idle_timeouts,
            tx_frames: stats.tx.frames,
            tx_bytes: stats.tx.bytes,
        }
    }

    fn rows(&self) -> Vec<(&'static str, u64)> {
        vec![
            ("rx_bytes", self.rx_bytes),
            ("rx_frames", self.rx_frames),
            ("sync_losses", self.sync_losses),
            ("unexpected_syncs", self.unexpected_syncs),
            ("bad_escapes", self.bad_escapes),
            ("checksum_mismatches", self.checksum_mismatches),
            ("overflows", self.overflows),
            ("idle_timeouts", self.idle_timeouts),
            ("tx_frames", self.tx_frames),
            ("tx_bytes", self.tx_bytes),
        ]
    }
}

/// Link counters go to stderr for raw output so stdout stays payload-only.
pub fn print_stats(stats: &LinkStats, format: OutputFormat) {
    let out = StatsOutput::from_stats(stats);
    match format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["COUNTER", "VALUE"]);
            for (name, value) in out.rows() {
                table.add_row(vec![name.to_string(), value.to_string()]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty => {
            let line = out
                .rows()
                .iter()
                .map(|(name, value)| format!("{name}={value}"))
                .collect::<Vec<_>>()
                .join(" ");
            println!("{line}");
        }
        OutputFormat::Raw => {
            let line = out
                .rows()
                .iter()
                .map(|(name, value)| format!("{name}={value}"))
                .collect::<Vec<_>>()
                .join(" ");
            eprintln!("{line}");
        }
    }
}

pub fn print_raw(data: &[u8]) {
    let mut out = std::io::stdout();
    let _ = out.write_all(data);
    let _ = out.flush();
}

/// Lowercase hex, bytes separated by spaces.
pub fn to_hex(data: &[u8]) -> String {
    data.chunks(1).map(hex::encode).collect::<Vec<_>>().join(" ")
}

fn payload_preview(payload: &[u8]) -> String {
    match std::str::from_utf8(payload) {
        Ok(text) => text.to_string(),
        Err(_) => format!("<binary {} bytes>", payload.len()),
    }
}

fn now_unix_seconds() -> String {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs().to_string())
        .unwrap_or_else(|_| "0".to_string())
}
