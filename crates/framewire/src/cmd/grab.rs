use framewire::image::ImageView;
use framewire::protocol::Client;
use framewire::source::{FrameError, FrameSource};
use tracing::{debug, warn};

use crate::cmd::GrabArgs;
use crate::exit::{frame_error, CliResult, SUCCESS};
use crate::output::{checksum, print_frames, FrameSummary, OutputFormat};

pub fn run(args: GrabArgs, format: OutputFormat) -> CliResult<i32> {
    let config = args.connect.client_config()?;
    let mut client = Client::connect(&config).map_err(|err| frame_error("connect failed", err))?;
    let metadata = client
        .metadata()
        .map_err(|err| frame_error("metadata request failed", err))?;

    let mut buf = vec![0u8; metadata.size_bytes()];
    let mut frames = Vec::new();
    let mut failures = 0u32;

    while (frames.len() as u64) < args.count {
        match client.next_frame() {
            Ok(()) => failures = 0,
            Err(FrameError::EndOfStream) => {
                debug!(pulled = frames.len(), "server reported end of stream");
                break;
            }
            Err(err) if err.is_recoverable() && failures < args.retries => {
                failures += 1;
                warn!(error = %err, attempt = failures, "retrying");
                continue;
            }
            Err(err) => return Err(frame_error("frame request failed", err)),
        }

        let index = frames.len() as u64;
        let copied = client
            .frame_into(&mut buf)
            .map(|view| summarize(index, &view));
        let summary = match copied {
            Ok(summary) => summary,
            Err(FrameError::InsufficientCapacity { metadata, .. }) => {
                debug!(%metadata, "frame grew, resizing buffer");
                buf.resize(metadata.size_bytes(), 0);
                let view = client
                    .frame_into(&mut buf)
                    .map_err(|err| frame_error("frame copy failed", err))?;
                summarize(index, &view)
            }
            Err(err) => return Err(frame_error("frame copy failed", err)),
        };
        frames.push(summary);
    }

    print_frames(&frames, format);
    Ok(SUCCESS)
}

fn summarize(index: u64, view: &ImageView<'_>) -> FrameSummary {
    FrameSummary {
        index,
        width: view.metadata().width(),
        height: view.metadata().height(),
        size_bytes: view.len(),
        checksum: checksum(view.data()),
        complete: view.is_complete(),
    }
}
