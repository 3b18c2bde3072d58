use std::time::Duration;

use mctp_serial_frame::{validate_payload_len, FrameConfig, Session};

use crate::cmd::{open_device, parse_duration, SendArgs};
use crate::exit::{frame_error, CliResult, SUCCESS};
use crate::output::{print_packet, OutputFormat};

const POLL_INTERVAL: Duration = Duration::from_millis(2);

pub fn run(args: SendArgs, format: OutputFormat) -> CliResult<i32> {
    let wait_timeout = parse_duration(&args.wait_timeout)?;
    let payload = args.payload.resolve()?;
    validate_payload_len(payload.len()).map_err(|err| frame_error("invalid payload", err))?;

    let channel = open_device(&args.device, args.baud)?;
    let source = channel.path().display().to_string();
    let mut session = Session::with_config(channel, FrameConfig::default());

    session
        .send(&payload)
        .map_err(|err| frame_error("send failed", err))?;

    if args.wait {
        let packet = session
            .recv_timeout(wait_timeout, POLL_INTERVAL)
            .map_err(|err| frame_error("receive failed", err))?;
        print_packet(&packet, 0, &source, format);
    }

    Ok(SUCCESS)
}
