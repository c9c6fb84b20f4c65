use framewire::protocol::Client;
use framewire::source::FrameSource;

use crate::cmd::MetadataArgs;
use crate::exit::{frame_error, CliResult, SUCCESS};
use crate::output::{print_metadata, OutputFormat};

pub fn run(args: MetadataArgs, format: OutputFormat) -> CliResult<i32> {
    let config = args.connect.client_config()?;
    let mut client = Client::connect(&config).map_err(|err| frame_error("connect failed", err))?;
    let metadata = client
        .metadata()
        .map_err(|err| frame_error("metadata request failed", err))?;
    print_metadata(&metadata, format);
    Ok(SUCCESS)
}
