use framewire::protocol::{DEFAULT_ADDRESS, DEFAULT_PORT};
use serde::Serialize;

use crate::cmd::VersionArgs;
use crate::exit::{CliResult, SUCCESS};
use crate::output::OutputFormat;

#[derive(Serialize)]
struct BuildInfo {
    name: &'static str,
    version: &'static str,
    target: &'static str,
    profile: &'static str,
    transports: Vec<&'static str>,
    default_endpoint: String,
}

impl BuildInfo {
    fn current() -> Self {
        let mut transports = vec!["tcp"];
        if cfg!(unix) {
            transports.push("unix");
        }
        Self {
            name: env!("CARGO_PKG_NAME"),
            version: env!("CARGO_PKG_VERSION"),
            target: option_env!("FRAMEWIRE_BUILD_TARGET").unwrap_or("unknown"),
            profile: option_env!("FRAMEWIRE_BUILD_PROFILE").unwrap_or("unknown"),
            transports,
            default_endpoint: format!("{DEFAULT_ADDRESS}:{DEFAULT_PORT}"),
        }
    }
}

pub fn run(args: VersionArgs, format: OutputFormat) -> CliResult<i32> {
    let info = BuildInfo::current();
    if !args.extended {
        println!("{} {}", info.name, info.version);
        return Ok(SUCCESS);
    }

    match format {
        OutputFormat::Json => println!(
            "{}",
            serde_json::to_string(&info).unwrap_or_else(|_| "{}".to_string())
        ),
        OutputFormat::Table | OutputFormat::Pretty => {
            println!("name: {}", info.name);
            println!("version: {}", info.version);
            println!("target: {}", info.target);
            println!("profile: {}", info.profile);
            println!("transports: {}", info.transports.join(", "));
            println!("default endpoint: {}", info.default_endpoint);
        }
    }
    Ok(SUCCESS)
}
