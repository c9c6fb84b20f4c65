use framewire::protocol::RemoteDiscoverer;
use framewire::source::Discoverer;

use crate::cmd::DiscoverArgs;
use crate::exit::{CliResult, SUCCESS};
use crate::output::{print_cameras, OutputFormat};

pub fn run(args: DiscoverArgs, format: OutputFormat) -> CliResult<i32> {
    let discoverer = RemoteDiscoverer::new(args.connect.client_config()?);
    print_cameras(&discoverer.discover(), format);
    Ok(SUCCESS)
}
