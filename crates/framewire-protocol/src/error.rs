use framewire_codec::CodecError;
use framewire_source::FrameError;
use framewire_transport::TransportError;

/// Errors raised while serving or speaking the protocol.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Transport-level error.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// Message framing error.
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),

    /// JSON serialization/deserialization error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// The request names a type the server has no handler for.
    #[error("unknown request type {0:?}")]
    UnknownRequest(String),

    /// The request or its body does not have the expected shape.
    #[error("malformed request: {0}")]
    MalformedRequest(String),

    /// The frame source or results sink failed.
    #[error(transparent)]
    Source(#[from] FrameError),
}

impl ProtocolError {
    /// True when the server must close the session after this error.
    ///
    /// Source failures are answered with an error reply and the session
    /// goes on; everything else is a protocol violation or a broken stream.
    pub fn ends_session(&self) -> bool {
        !matches!(self, ProtocolError::Source(_))
    }
}

pub type Result<T> = std::result::Result<T, ProtocolError>;
