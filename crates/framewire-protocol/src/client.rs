use std::fmt;

use bytes::Bytes;
use framewire_codec::{CodecError, Message, MessageReader, MessageWriter};
use framewire_image::{ImageMetadata, ImageView};
use framewire_source::{FrameError, FrameSource, ResultBody, ResultsSink};
use framewire_transport::{connect, Endpoint, Stream};
use tracing::{debug, warn};

use crate::config::ClientConfig;
use crate::message::{Reply, Request, RequestType};

type FrameResult<T> = std::result::Result<T, FrameError>;

/// A frame source and results sink backed by one server connection.
///
/// Requests are strictly sequential. When a reply misses its read deadline
/// the call fails with [`FrameError::Timeout`] and the reply is still owed;
/// the next call collects it first. A late `frame` reply answers the next
/// `next_frame` directly, any other late reply is dropped.
///
/// Transport failures other than timeouts leave the client faulted: every
/// later call fails with [`FrameError::Faulted`]. Reconnecting is up to the
/// caller.
pub struct Client {
    endpoint: Endpoint,
    reader: MessageReader<Stream>,
    writer: MessageWriter<Stream>,
    metadata: Option<ImageMetadata>,
    frame: Option<Bytes>,
    owed: Option<RequestType>,
    failure: Option<String>,
}

impl Client {
    /// Connect to the server named by `config`.
    pub fn connect(config: &ClientConfig) -> FrameResult<Self> {
        let endpoint = config.endpoint();
        let stream = connect(&endpoint)
            .map_err(|err| FrameError::Faulted(format!("cannot connect to {endpoint}: {err}")))?;
        let codec = config.codec_config();
        let setup = |err: CodecError| FrameError::Faulted(format!("cannot configure connection: {err}"));
        let reader_stream = stream
            .try_clone()
            .map_err(|err| FrameError::Faulted(format!("cannot configure connection: {err}")))?;
        let reader = MessageReader::with_config_stream(reader_stream, codec.clone()).map_err(setup)?;
        let writer = MessageWriter::with_config_stream(stream, codec).map_err(setup)?;
        debug!(%endpoint, "client connected");

        Ok(Self {
            endpoint,
            reader,
            writer,
            metadata: None,
            frame: None,
            owed: None,
            failure: None,
        })
    }

    /// Connect to `endpoint` with default timeouts.
    pub fn connect_endpoint(endpoint: &Endpoint) -> FrameResult<Self> {
        Self::connect(&ClientConfig::for_endpoint(endpoint))
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// Fetch metadata from the server, replacing the cached value.
    ///
    /// Metadata describing a frame too large to address is refused and the
    /// previous value stays cached.
    pub fn refresh_metadata(&mut self) -> FrameResult<ImageMetadata> {
        let reply = self.round_trip(&Request::metadata())?;
        let metadata: ImageMetadata = match reply {
            Reply::Json(value) => serde_json::from_value(value)
                .map_err(|err| FrameError::Faulted(format!("unreadable metadata: {err}")))?,
            Reply::Binary(_) => return Err(unexpected(RequestType::Metadata, "binary")),
        };
        if metadata.checked_size_bytes().is_none() {
            return Err(FrameError::FormatUnsupported(format!(
                "{metadata} does not fit in memory"
            )));
        }
        self.metadata = Some(metadata.clone());
        Ok(metadata)
    }

    /// Send one request and wait for its reply.
    pub fn request(&mut self, request: &Request) -> FrameResult<Reply> {
        self.round_trip(request)
    }

    fn round_trip(&mut self, request: &Request) -> FrameResult<Reply> {
        if let Some(reason) = &self.failure {
            return Err(FrameError::Faulted(reason.clone()));
        }
        let kind = request
            .kind()
            .map_err(|err| FrameError::InvalidParameter(err.to_string()))?;

        if let Some(owed) = self.owed {
            let late = self.read_reply()?;
            self.owed = None;
            if owed == RequestType::Frame && kind == RequestType::Frame {
                debug!("late frame reply answers this request");
                return Reply::from_message(late);
            }
            debug!(request = %owed, "dropped late reply");
        }

        let message = request
            .to_message()
            .map_err(|err| FrameError::InvalidParameter(err.to_string()))?;
        if let Err(err) = self.writer.write_message(&message) {
            // A partially written request leaves the stream unusable.
            return Err(self.fail(&err));
        }
        self.owed = Some(kind);
        let reply = self.read_reply()?;
        self.owed = None;
        Reply::from_message(reply)
    }

    fn read_reply(&mut self) -> FrameResult<Message> {
        match self.reader.read_message() {
            Ok(message) => Ok(message),
            Err(err) if err.is_timeout() => Err(FrameError::Timeout),
            Err(err) => Err(self.fail(&err)),
        }
    }

    fn fail(&mut self, err: &CodecError) -> FrameError {
        let reason = match err {
            CodecError::ConnectionClosed => format!("connection to {} closed", self.endpoint),
            other => format!("connection to {} failed: {other}", self.endpoint),
        };
        warn!(%reason, "client faulted");
        self.failure = Some(reason.clone());
        FrameError::Faulted(reason)
    }

    fn cached_metadata(&mut self) -> FrameResult<ImageMetadata> {
        match &self.metadata {
            Some(metadata) => Ok(metadata.clone()),
            None => self.refresh_metadata(),
        }
    }
}

impl FrameSource for Client {
    fn metadata(&mut self) -> FrameResult<ImageMetadata> {
        self.cached_metadata()
    }

    fn next_frame(&mut self) -> FrameResult<()> {
        self.frame = None;
        let expected = self.cached_metadata()?;

        let data = match self.round_trip(&Request::frame())? {
            Reply::Binary(data) => data,
            Reply::Json(_) => return Err(unexpected(RequestType::Frame, "json")),
        };

        if data.len() != expected.size_bytes() {
            // The server may have changed format; check once.
            let current = self.refresh_metadata()?;
            if data.len() != current.size_bytes() {
                return Err(FrameError::Faulted(format!(
                    "frame has {} bytes, metadata {current} needs {}",
                    data.len(),
                    current.size_bytes()
                )));
            }
            debug!(old = %expected, new = %current, "server metadata changed");
        }
        self.frame = Some(data);
        Ok(())
    }

    fn frame(&self) -> FrameResult<ImageView<'_>> {
        match (&self.frame, &self.metadata) {
            (Some(data), Some(metadata)) => Ok(ImageView::new(metadata.clone(), data)),
            _ => Err(FrameError::NoFrame),
        }
    }

    fn frame_bytes(&self) -> FrameResult<Bytes> {
        match (&self.frame, &self.metadata) {
            (Some(data), Some(_)) => Ok(data.clone()),
            _ => Err(FrameError::NoFrame),
        }
    }

    fn execute(&mut self, action: &str) -> FrameResult<()> {
        match self.round_trip(&Request::execute(action))? {
            Reply::Json(_) => Ok(()),
            Reply::Binary(_) => Err(unexpected(RequestType::Execute, "binary")),
        }
    }
}

impl ResultsSink for Client {
    /// The reply is read only to keep the connection in step; a server-side
    /// failure to handle the result is logged, not returned.
    fn send(&mut self, result: &ResultBody) -> FrameResult<()> {
        match self.round_trip(&Request::result(result.clone())) {
            Ok(_) => Ok(()),
            Err(err) if is_server_reply(&err) => {
                warn!(error = %err, "server rejected result");
                Ok(())
            }
            Err(err) => Err(err),
        }
    }
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("endpoint", &self.endpoint)
            .field("metadata", &self.metadata)
            .field("has_frame", &self.frame.is_some())
            .field("owed", &self.owed)
            .field("failure", &self.failure)
            .finish()
    }
}

/// Errors that came back as a server reply rather than from the transport.
fn is_server_reply(err: &FrameError) -> bool {
    !matches!(err, FrameError::Timeout | FrameError::Faulted(_))
}

fn unexpected(kind: RequestType, got: &str) -> FrameError {
    FrameError::Faulted(format!("unexpected {got} reply to {kind} request"))
}
