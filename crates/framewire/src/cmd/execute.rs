use framewire::protocol::Client;
use framewire::source::FrameSource;

use crate::cmd::ExecuteArgs;
use crate::exit::{frame_error, CliResult, SUCCESS};
use crate::output::{print_status, OutputFormat};

pub fn run(args: ExecuteArgs, format: OutputFormat) -> CliResult<i32> {
    let config = args.connect.client_config()?;
    let mut client = Client::connect(&config).map_err(|err| frame_error("connect failed", err))?;
    client
        .execute(&args.action)
        .map_err(|err| frame_error(&format!("execute {:?} failed", args.action), err))?;
    print_status("execute", Some(&args.action), format);
    Ok(SUCCESS)
}
