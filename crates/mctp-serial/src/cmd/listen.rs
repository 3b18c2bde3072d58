use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use mctp_serial_frame::{FrameError, RxStatus, Session};
use mctp_serial_transport::ByteChannel;
use tracing::{debug, info, warn};

use crate::cmd::{frame_config, open_device, parse_duration, ListenArgs};
use crate::exit::{frame_error, CliError, CliResult, SUCCESS};
use crate::output::{print_packet, print_stats, OutputFormat};

const IDLE_BACKOFF: Duration = Duration::from_millis(1);

pub fn run(args: ListenArgs, format: OutputFormat) -> CliResult<i32> {
    let idle_timeout = parse_duration(&args.idle_timeout)?;
    let config = frame_config(args.capacity, Some(idle_timeout))?;
    let channel = open_device(&args.device, args.baud)?;
    let source = channel.path().display().to_string();
    let mut session = Session::with_config(channel, config);

    let running = Arc::new(AtomicBool::new(true));
    install_ctrlc_handler(running.clone())?;

    info!(device = %source, baud = args.baud, "listening");
    let result = listen_loop(&mut session, &running, args.count, |packet, index| {
        print_packet(packet, index, &source, format);
    });

    if args.stats {
        print_stats(&session.stats(), format);
    }
    let received = result.map_err(|err| frame_error("receive failed", err))?;
    debug!(received, "listen finished");

    Ok(SUCCESS)
}

/// Drive `session` until `count` packets arrive, `running` clears, or the
/// channel fails. Returns the number of packets handed to `on_packet`.
fn listen_loop<C, F>(
    session: &mut Session<C>,
    running: &AtomicBool,
    count: Option<usize>,
    mut on_packet: F,
) -> Result<usize, FrameError>
where
    C: ByteChannel,
    F: FnMut(&[u8], usize),
{
    let mut received = 0usize;

    while running.load(Ordering::SeqCst) {
        if count.is_some_and(|count| received >= count) {
            break;
        }

        match session.poll_receive() {
            Ok(RxStatus::PacketReady | RxStatus::Pending) => {
                if let Some(packet) = session.take_packet() {
                    on_packet(&packet, received);
                    received = received.saturating_add(1);
                }
            }
            Ok(RxStatus::Idle) => std::thread::sleep(IDLE_BACKOFF),
            Ok(RxStatus::Consumed) => {}
            Ok(RxStatus::Dropped(reason)) => debug!(?reason, "frame dropped"),
            Err(err @ FrameError::BufferOverflow { .. }) => {
                warn!(%err, "skipping oversized frame");
            }
            Err(err) => return Err(err),
        }
    }

    Ok(received)
}

fn install_ctrlc_handler(running: Arc<AtomicBool>) -> CliResult<()> {
    ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
    })
    .map_err(|err| {
        CliError::new(
            crate::exit::INTERNAL,
            format!("signal handler setup failed: {err}"),
        )
    })
}
