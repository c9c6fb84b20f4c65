//! Pull ten frames from a running server and report a result back.
//!
//! Run with:
//!   cargo run --example pull-frames
//!
//! The server address comes from FRAMEWIRE_SERVER_ADDRESS / FRAMEWIRE_SERVER_PORT.

use framewire::protocol::{Client, ClientConfig};
use framewire::source::{FrameError, FrameSource, ResultsSink};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = ClientConfig::from_env()?;
    let mut client = Client::connect(&config)?;

    let metadata = client.metadata()?;
    eprintln!("Connected to {}: {metadata}", client.endpoint());

    let mut pulled = 0;
    while pulled < 10 {
        match client.next_frame() {
            Ok(()) => {}
            Err(err) if err.is_recoverable() => {
                eprintln!("Retrying after {err}");
                continue;
            }
            Err(FrameError::EndOfStream) => break,
            Err(err) => return Err(err.into()),
        }
        let frame = client.frame()?;
        let mean = frame.data().iter().map(|&b| u64::from(b)).sum::<u64>() / frame.len().max(1) as u64;
        eprintln!("Frame {pulled}: {} bytes, mean value {mean}", frame.len());
        pulled += 1;
    }

    let mut result = framewire::source::ResultBody::new();
    result.insert("status".into(), "success".into());
    result.insert("frames".into(), pulled.into());
    client.send(&result)?;
    Ok(())
}
