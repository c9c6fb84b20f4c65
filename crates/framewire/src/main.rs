mod cmd;
mod exit;
mod logging;
mod output;

use clap::Parser;

use crate::cmd::Command;
use crate::exit::CliError;
use crate::logging::{init_logging, LogFormat, LogLevel};
use crate::output::OutputFormat;

#[derive(Parser, Debug)]
#[command(name = "framewire", version, about = "Serve and pull image frames")]
struct Cli {
    /// Output format. Defaults to table on a terminal, JSON otherwise.
    #[arg(long, value_name = "FORMAT", global = true)]
    format: Option<OutputFormat>,

    /// Log output format (stderr).
    #[arg(long, value_name = "FORMAT", default_value = "text", global = true)]
    log_format: LogFormat,

    /// Minimum log level (stderr).
    #[arg(
        long,
        value_name = "LEVEL",
        default_value = "info",
        env = "FRAMEWIRE_LOG_LEVEL",
        global = true
    )]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Command,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.log_format, cli.log_level);

    let format = cli.format.unwrap_or_else(OutputFormat::default_for_stdout);
    let code = match cmd::run(cli.command, format) {
        Ok(code) => code,
        Err(err) => {
            report(&err, format);
            err.code
        }
    };
    std::process::exit(code);
}

/// Failures go to stderr, as JSON when the caller asked for JSON output.
fn report(err: &CliError, format: OutputFormat) {
    match format {
        OutputFormat::Json => eprintln!(
            "{}",
            serde_json::json!({ "error": err.message, "code": err.code })
        ),
        OutputFormat::Table | OutputFormat::Pretty => eprintln!("error: {err}"),
    }
}
