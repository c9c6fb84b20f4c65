/// Errors that can occur during message encoding/decoding.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// The message header contains an invalid magic number.
    #[error("invalid message magic (expected 0x4657 \"FW\")")]
    InvalidMagic,

    /// The header names a message kind this codec does not know.
    #[error("unknown message kind {0:#04x}")]
    UnknownKind(u8),

    /// The payload exceeds the configured maximum size.
    #[error("payload too large ({size} bytes, max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    /// An I/O error occurred while reading or writing messages.
    #[error("message I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The connection was closed before a complete message was received.
    #[error("connection closed")]
    ConnectionClosed,
}

impl CodecError {
    /// True when the error came from a read/write deadline expiring.
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            CodecError::Io(err) if matches!(
                err.kind(),
                std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut
            )
        )
    }
}

pub type Result<T> = std::result::Result<T, CodecError>;
