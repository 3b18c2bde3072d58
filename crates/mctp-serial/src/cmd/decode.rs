use std::fs;

use mctp_serial_frame::{decode_frames, LinkStats};
use tracing::debug;

use crate::cmd::{frame_config, parse_hex, DecodeArgs};
use crate::exit::{io_error, CliError, CliResult, DATA_INVALID, SUCCESS};
use crate::output::{print_packet, print_stats, OutputFormat};

pub fn run(args: DecodeArgs, format: OutputFormat) -> CliResult<i32> {
    let wire = match (&args.wire, &args.file) {
        (_, Some(path)) => fs::read(path)
            .map_err(|err| io_error(&format!("failed reading {}", path.display()), err))?,
        (Some(hex), None) => parse_hex(hex)?,
        (None, None) => Vec::new(),
    };
    let config = frame_config(args.capacity, None)?;

    let report = decode_frames(&wire, &config);
    debug!(
        wire_len = wire.len(),
        packets = report.packets.len(),
        dropped = report.stats.dropped(),
        "decoded"
    );

    for (index, packet) in report.packets.iter().enumerate() {
        print_packet(packet, index, "decode", format);
    }
    if args.stats {
        let stats = LinkStats {
            rx: report.stats,
            ..LinkStats::default()
        };
        print_stats(&stats, format);
    }

    if report.packets.is_empty() {
        return Err(CliError::new(
            DATA_INVALID,
            format!(
                "no valid frame in {} bytes ({} dropped)",
                wire.len(),
                report.stats.dropped()
            ),
        ));
    }
    Ok(SUCCESS)
}
