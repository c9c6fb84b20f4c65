use std::time::Duration;

use clap::{Args, Subcommand};
use framewire::image::{ColorSpace, DataLayout, ElementType};
use framewire::protocol::{ClientConfig, DEFAULT_ADDRESS, DEFAULT_PORT};
use framewire::source::Pattern;

use crate::exit::{CliError, CliResult, USAGE};
use crate::output::OutputFormat;

pub mod discover;
pub mod execute;
pub mod grab;
pub mod metadata;
pub mod result;
pub mod serve;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Serve frames from a synthetic or hand-off source.
    Serve(ServeArgs),
    /// Print the metadata a server reports.
    Metadata(MetadataArgs),
    /// Pull frames and print a summary of each.
    Grab(GrabArgs),
    /// Ask the server's source to run an action.
    Execute(ExecuteArgs),
    /// Send a result body to the server's sink.
    Result(ResultArgs),
    /// List the cameras reachable with the current settings.
    Discover(DiscoverArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Serve(args) => serve::run(args, format),
        Command::Metadata(args) => metadata::run(args, format),
        Command::Grab(args) => grab::run(args, format),
        Command::Execute(args) => execute::run(args, format),
        Command::Result(args) => result::run(args, format),
        Command::Discover(args) => discover::run(args, format),
        Command::Version(args) => version::run(args, format),
    }
}

/// Where to reach a server.
#[derive(Args, Debug, Clone)]
pub struct ConnectArgs {
    /// Server host or IP, or unix:<path> for a Unix domain socket.
    #[arg(long, env = "FRAMEWIRE_SERVER_ADDRESS", default_value = DEFAULT_ADDRESS)]
    pub address: String,
    /// Server port.
    #[arg(long, env = "FRAMEWIRE_SERVER_PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,
    /// Reply timeout (e.g. 5s, 500ms).
    #[arg(long, default_value = "5s")]
    pub timeout: String,
}

impl ConnectArgs {
    pub fn client_config(&self) -> CliResult<ClientConfig> {
        let timeout = parse_timeout(&self.timeout)?;
        Ok(ClientConfig {
            address: self.address.clone(),
            port: self.port,
            read_timeout: Some(timeout),
            write_timeout: Some(timeout),
            ..ClientConfig::default()
        })
    }
}

#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Address to bind, or unix:<path> for a Unix domain socket.
    #[arg(long, env = "FRAMEWIRE_SERVER_ADDRESS", default_value = DEFAULT_ADDRESS)]
    pub address: String,
    /// Port to bind (0 picks a free port).
    #[arg(long, env = "FRAMEWIRE_SERVER_PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,
    /// Frame width in pixels.
    #[arg(long, env = "FRAMEWIRE_WIDTH", default_value_t = 640)]
    pub width: u32,
    /// Frame height in pixels.
    #[arg(long, env = "FRAMEWIRE_HEIGHT", default_value_t = 480)]
    pub height: u32,
    /// Color space (e.g. RGB, grayscale, NV12).
    #[arg(long, default_value = "RGB")]
    pub color_space: ColorSpace,
    /// Data layout (planar, interleaved, semiplanar).
    #[arg(long, default_value = "planar")]
    pub layout: DataLayout,
    /// Element type (uint8, uint16, float32, ...).
    #[arg(long, default_value = "uint8")]
    pub data_type: ElementType,
    /// Synthetic pattern: ramp, checker, solid or solid:<value>.
    #[arg(long, default_value = "ramp", conflicts_with = "handoff")]
    pub pattern: Pattern,
    /// End the stream after this many frames.
    #[arg(long, conflicts_with = "handoff")]
    pub frames: Option<u64>,
    /// Feed frames from a producer thread through the hand-off synchronizer.
    #[arg(long, requires = "pipeline")]
    pub handoff: bool,
    /// Producer pipeline for --handoff: `<pattern> [fps=N] [frames=N]`.
    #[arg(long, env = "FRAMEWIRE_PIPELINE")]
    pub pipeline: Option<String>,
    /// How long the hand-off source waits for its producer, in milliseconds.
    #[arg(long, env = "FRAMEWIRE_FRAME_TIMEOUT_MS", default_value_t = 1000)]
    pub frame_timeout_ms: u64,
    /// Close sessions idle for this long (e.g. 30s). Default: never.
    #[arg(long)]
    pub idle_timeout: Option<String>,
}

#[derive(Args, Debug)]
pub struct MetadataArgs {
    #[command(flatten)]
    pub connect: ConnectArgs,
}

#[derive(Args, Debug)]
pub struct GrabArgs {
    #[command(flatten)]
    pub connect: ConnectArgs,
    /// Number of frames to pull.
    #[arg(long, short = 'n', default_value_t = 1)]
    pub count: u64,
    /// Consecutive timeouts/overflows tolerated before giving up.
    #[arg(long, default_value_t = 3)]
    pub retries: u32,
}

#[derive(Args, Debug)]
pub struct ExecuteArgs {
    #[command(flatten)]
    pub connect: ConnectArgs,
    /// Action name, interpreted by the server's source.
    pub action: String,
}

#[derive(Args, Debug)]
pub struct ResultArgs {
    #[command(flatten)]
    pub connect: ConnectArgs,
    /// Result body, a JSON object.
    #[arg(long)]
    pub json: String,
}

#[derive(Args, Debug)]
pub struct DiscoverArgs {
    #[command(flatten)]
    pub connect: ConnectArgs,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

pub fn parse_timeout(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "timeout must not be empty"));
    }

    let (number, millis) = match input.strip_suffix("ms") {
        Some(number) => (number, true),
        None => (input.strip_suffix('s').unwrap_or(input), false),
    };

    let value: u64 = number
        .trim()
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid timeout value: {input}")))?;
    if value == 0 {
        return Err(CliError::new(USAGE, "timeout must be greater than zero"));
    }

    Ok(if millis {
        Duration::from_millis(value)
    } else {
        Duration::from_secs(value)
    })
}
