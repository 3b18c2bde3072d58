//! Loopback example: two sessions exchange frames over an in-memory link.
//!
//! Run with:
//!   cargo run --example loopback

use std::thread;
use std::time::Duration;

use mctp_serial::frame::{RxStatus, Session};
use mctp_serial::transport::LoopbackChannel;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let (host_end, device_end) = LoopbackChannel::pair();

    let device = thread::spawn(
        move || -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
            let mut session = Session::init(device_end);
            let mut echoed = 0;
            while echoed < 3 {
                match session.poll_receive()? {
                    RxStatus::PacketReady => {
                        if let Some(packet) = session.take_packet() {
                            eprintln!("[device] received {} bytes", packet.len());
                            session.send(&packet)?;
                            echoed += 1;
                        }
                    }
                    RxStatus::Idle => thread::sleep(Duration::from_millis(1)),
                    RxStatus::Dropped(reason) => eprintln!("[device] dropped frame: {reason:?}"),
                    _ => {}
                }
            }
            Ok(())
        },
    );

    let mut host = Session::init(host_end);
    for payload in [&b"hello"[..], &b"AB~CD"[..], &b"AB}CD"[..]] {
        host.send(payload)?;
        let reply = host.recv_timeout(Duration::from_secs(1), Duration::from_millis(1))?;
        eprintln!("[host] echo: {:?}", String::from_utf8_lossy(&reply));
    }

    device
        .join()
        .map_err(|_| "device thread panicked")?
        .map_err(|e| e.to_string())?;

    eprintln!("[host] stats: {:?}", host.stats());
    Ok(())
}
