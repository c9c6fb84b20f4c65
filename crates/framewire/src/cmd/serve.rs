use std::sync::mpsc;
use std::time::Duration;

use framewire::image::ImageMetadata;
use framewire::protocol::{Router, Server, ServerConfig};
use framewire::source::{
    shared_sink, shared_source, FrameError, HandoffSource, PatternProducer, PatternSource,
    PipelineConfig, ResultBody, ResultsSink, SharedSource,
};
use tracing::info;

use crate::cmd::{parse_timeout, ServeArgs};
use crate::exit::{frame_error, protocol_error, CliError, CliResult, INTERNAL, SUCCESS, USAGE};
use crate::output::{print_result, OutputFormat};

/// Prints every result it receives.
struct PrintingSink {
    format: OutputFormat,
    received: u64,
}

impl ResultsSink for PrintingSink {
    fn send(&mut self, result: &ResultBody) -> Result<(), FrameError> {
        self.received += 1;
        info!(received = self.received, fields = result.len(), "result received");
        print_result(result, self.format);
        Ok(())
    }
}

pub fn run(args: ServeArgs, format: OutputFormat) -> CliResult<i32> {
    let metadata = ImageMetadata::new(
        args.width,
        args.height,
        args.color_space,
        args.layout,
        args.data_type,
    );
    if metadata.size_bytes() == 0 {
        return Err(CliError::new(
            USAGE,
            format!("frames described as {metadata} would be empty"),
        ));
    }

    let (source, producer) = build_source(&args, metadata)?;
    let sink = shared_sink(PrintingSink {
        format,
        received: 0,
    });
    let router = Router::for_source(source).with_sink(sink);

    let config = ServerConfig {
        address: args.address.clone(),
        port: args.port,
        idle_timeout: args.idle_timeout.as_deref().map(parse_timeout).transpose()?,
        ..ServerConfig::default()
    };
    let server =
        Server::bind_with_config(config, router).map_err(|err| protocol_error("bind failed", err))?;
    let handle = server
        .spawn()
        .map_err(|err| protocol_error("server start failed", err))?;
    eprintln!("serving on {}", handle.local_endpoint());

    let (stop_tx, stop_rx) = mpsc::channel();
    ctrlc::set_handler(move || {
        let _ = stop_tx.send(());
    })
    .map_err(|err| CliError::new(INTERNAL, format!("signal handler setup failed: {err}")))?;
    let _ = stop_rx.recv();

    info!("stopping");
    handle.shutdown();
    // The server released the hand-off source, which releases its producer.
    if let Some(producer) = producer {
        let _ = producer.join();
    }
    Ok(SUCCESS)
}

type ProducerThread = std::thread::JoinHandle<()>;

fn build_source(
    args: &ServeArgs,
    metadata: ImageMetadata,
) -> CliResult<(SharedSource, Option<ProducerThread>)> {
    if !args.handoff {
        let mut source = PatternSource::new(metadata, args.pattern);
        if let Some(frames) = args.frames {
            source = source.with_limit(frames);
        }
        info!(pattern = %args.pattern, "serving synthetic frames");
        return Ok((shared_source(source), None));
    }

    let pipeline = args
        .pipeline
        .clone()
        .ok_or_else(|| CliError::new(USAGE, "--handoff needs --pipeline or FRAMEWIRE_PIPELINE"))?;
    let config = PipelineConfig {
        width: metadata.width(),
        height: metadata.height(),
        frame_timeout: Duration::from_millis(args.frame_timeout_ms),
        ..PipelineConfig::new(pipeline)
    };
    let producer = PatternProducer::from_description(&config.pipeline, metadata.clone())
        .map_err(|err| frame_error("bad pipeline", err))?;
    let (source, handle) = HandoffSource::new(metadata, config.frame_timeout);
    info!(pipeline = %config.pipeline, "serving frames through hand-off");
    let thread = producer.spawn(handle);
    Ok((shared_source(source), Some(thread)))
}
