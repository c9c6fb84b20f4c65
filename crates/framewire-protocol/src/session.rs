use framewire_codec::{CodecError, MessageReader, MessageWriter};
use framewire_transport::Stream;
use tracing::{debug, warn};

use crate::config::ServerConfig;
use crate::error::{ProtocolError, Result};
use crate::message::{ErrorReply, Reply, Request};
use crate::router::Router;

/// Serve one connection until the peer leaves or breaks the protocol.
pub(crate) fn run(router: &Router, stream: Stream, config: &ServerConfig, peer: &str) -> Result<()> {
    let codec = config.codec_config();
    let mut reader = MessageReader::with_config_stream(stream.try_clone()?, codec.clone())?;
    let mut writer = MessageWriter::with_config_stream(stream, codec)?;

    let mut served = 0u64;
    loop {
        let message = match reader.read_message() {
            Ok(message) => message,
            Err(CodecError::ConnectionClosed) => {
                debug!(peer, served, "peer disconnected");
                return Ok(());
            }
            Err(err) if err.is_timeout() => {
                debug!(peer, served, "session idle, closing");
                return Ok(());
            }
            Err(err) => {
                warn!(peer, error = %err, "unreadable message, closing session");
                reject(&mut writer, &err.to_string());
                return Err(err.into());
            }
        };

        let reply = Request::from_message(&message).and_then(|request| {
            debug!(peer, request = %request.request, "request");
            router.dispatch(&request)
        });
        let reply = match reply {
            Ok(reply) => reply,
            Err(ProtocolError::Source(err)) => {
                debug!(peer, error = %err, "handler failed");
                Reply::error(&ErrorReply::from(&err))?
            }
            Err(err) => {
                warn!(peer, error = %err, "protocol violation, closing session");
                reject(&mut writer, &err.to_string());
                return Err(err);
            }
        };

        writer.write_message(&reply.into_message()?)?;
        served += 1;
    }
}

/// Best-effort error reply before the session is dropped.
fn reject(writer: &mut MessageWriter<Stream>, message: &str) {
    let sent = Reply::error(&ErrorReply::protocol(message))
        .and_then(Reply::into_message)
        .and_then(|reply| writer.write_message(&reply).map_err(ProtocolError::from));
    if let Err(err) = sent {
        debug!(error = %err, "could not send protocol error reply");
    }
}
