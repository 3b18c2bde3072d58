//! Serial echo: answers every MCTP packet on a UART with the same payload.
//!
//! Run with:
//!   cargo run --example serial-echo --features serial -- /dev/ttyUSB0 115200
//!
//! From another machine on the same link:
//!   cargo run --features cli -- send /dev/ttyUSB1 --data hello --wait

use std::thread;
use std::time::Duration;

use mctp_serial::frame::{RxStatus, Session};
use mctp_serial::transport::{SerialChannel, DEFAULT_BAUD_RATE};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut args = std::env::args().skip(1);
    let device = args.next().ok_or("usage: serial-echo <device> [baud]")?;
    let baud = match args.next() {
        Some(baud) => baud.parse()?,
        None => DEFAULT_BAUD_RATE,
    };

    let channel = SerialChannel::open_with_baud(&device, baud)?;
    let mut session = Session::init(channel);
    eprintln!("Echoing on {device} at {baud} baud");

    loop {
        match session.poll_receive() {
            Ok(RxStatus::PacketReady) => {
                if let Some(packet) = session.take_packet() {
                    eprintln!("Received {} bytes", packet.len());
                    session.send(&packet)?;
                }
            }
            Ok(RxStatus::Idle) => thread::sleep(Duration::from_millis(1)),
            Ok(_) => {}
            Err(e) if e.is_fatal() => {
                eprintln!("Link down: {e}");
                break;
            }
            Err(e) => eprintln!("Frame skipped: {e}"),
        }
    }

    eprintln!("{:?}", session.stats());
    Ok(())
}
