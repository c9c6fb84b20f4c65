//! Serve synthetic 800x600 RGB frames until Enter is pressed.
//!
//! Run with:
//!   cargo run --example pattern-server
//!
//! In another terminal:
//!   cargo run --example pull-frames

use std::io::BufRead;

use framewire::image::{ColorSpace, DataLayout, ElementType, ImageMetadata};
use framewire::protocol::{Router, Server, ServerConfig};
use framewire::source::{shared_sink, shared_source, MemorySink, Pattern, PatternSource};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = ServerConfig::from_env()?;
    let metadata = ImageMetadata::new(800, 600, ColorSpace::Rgb, DataLayout::Planar, ElementType::Uint8);
    let results = MemorySink::new();

    let router = Router::for_source(shared_source(PatternSource::new(metadata, Pattern::Ramp)))
        .with_sink(shared_sink(results.clone()));
    let handle = Server::bind_with_config(config, router)?.spawn()?;
    eprintln!("Serving on {} (press Enter to stop)", handle.local_endpoint());

    let mut line = String::new();
    std::io::stdin().lock().read_line(&mut line)?;

    handle.shutdown();
    eprintln!("Received {} results", results.len());
    for result in results.received() {
        eprintln!("  {}", serde_json::Value::Object(result));
    }
    Ok(())
}
