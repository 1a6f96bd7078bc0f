//! Minimal device agent: listens for the desktop, sends headers, then echoes
//! control messages back from a dedicated thread.
//!
//! Run with:
//!   cargo run -p mirrorwire --example mirror-agent
//!
//! In another terminal:
//!   cargo run -p mirrorwire --features cli -- attach --data hello --wait

use std::thread;

use mirrorwire::conn::Connection;
use mirrorwire::frame::FrameError;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut conn = Connection::open(true, true, false, "")?;
    eprintln!("Desktop connected: {conn:?}");

    conn.send_socket_type_headers("mirror-agent")?;
    conn.send_device_meta("mirror-agent", 1280, 720)?;

    let (video, control) = conn.into_parts();
    let Some(control) = control else {
        video.close()?;
        return Ok(());
    };

    let (mut reader, mut writer) = control.split();
    let handle = thread::spawn(move || -> Result<usize, FrameError> {
        let mut echoed = 0;
        loop {
            match reader.read_message() {
                Ok(msg) => {
                    eprintln!("Received {} bytes", msg.len());
                    writer.write_message(&msg)?;
                    echoed += 1;
                }
                Err(FrameError::ConnectionClosed) => return Ok(echoed),
                Err(e) => return Err(e),
            }
        }
    });

    let echoed = handle.join().map_err(|_| "control thread panicked")??;
    eprintln!("Desktop disconnected after {echoed} messages");

    video.close()?;
    Ok(())
}
