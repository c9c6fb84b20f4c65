use framewire_image::ImageMetadata;

/// Everything that can go wrong while producing or fetching a frame.
///
/// Transport failures are folded into the same taxonomy at the client
/// boundary, so callers never need to tell "network broke" from "producer
/// broke". Each variant has a stable wire tag (see [`FrameError::tag`]).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FrameError {
    /// No frame arrived within the deadline. Retry `next_frame`.
    #[error("timed out waiting for a frame")]
    Timeout,

    /// The producer could not keep up; frames may have been dropped.
    #[error("producer overflow, frames may have been dropped")]
    Overflow,

    /// The producer has no more frames.
    #[error("end of stream")]
    EndOfStream,

    /// The producer's pixel format cannot be represented.
    #[error("format unsupported: {0}")]
    FormatUnsupported(String),

    /// Configuration supplied to the source is wrong or missing.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// `execute` was given an action the source does not understand.
    #[error("unsupported action: {0:?}")]
    UnsupportedAction(String),

    /// The operation exists in the contract but this source does not provide it.
    #[error("not implemented: {0}")]
    NotImplemented(String),

    /// `frame` was called without a preceding successful `next_frame`.
    #[error("no frame available (call next_frame first)")]
    NoFrame,

    /// A caller-provided buffer is smaller than the frame. Nothing was copied.
    #[error("insufficient capacity: frame needs {} bytes, buffer holds {capacity}", .metadata.size_bytes())]
    InsufficientCapacity {
        metadata: ImageMetadata,
        capacity: usize,
    },

    /// The producer or the connection to it failed.
    #[error("faulted: {0}")]
    Faulted(String),

    /// Unclassified failure.
    #[error("unknown error: {0}")]
    Unknown(String),
}

impl FrameError {
    /// True for errors after which calling `next_frame` again makes sense.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, FrameError::Timeout | FrameError::Overflow)
    }

    /// True for errors that end the stream for good.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            FrameError::EndOfStream | FrameError::Faulted(_) | FrameError::Unknown(_)
        )
    }

    /// Stable camelCase tag used on the wire.
    pub fn tag(&self) -> &'static str {
        match self {
            FrameError::Timeout => "timeout",
            FrameError::Overflow => "overflow",
            FrameError::EndOfStream => "endOfStream",
            FrameError::FormatUnsupported(_) => "formatUnsupported",
            FrameError::InvalidParameter(_) => "invalidParameter",
            FrameError::UnsupportedAction(_) => "unsupportedAction",
            FrameError::NotImplemented(_) => "notImplemented",
            FrameError::NoFrame => "noFrame",
            FrameError::InsufficientCapacity { .. } => "insufficientCapacity",
            FrameError::Faulted(_) => "faulted",
            FrameError::Unknown(_) => "unknown",
        }
    }

    /// The free-form detail carried by the variant, if any.
    pub fn detail(&self) -> Option<&str> {
        match self {
            FrameError::FormatUnsupported(detail)
            | FrameError::InvalidParameter(detail)
            | FrameError::UnsupportedAction(detail)
            | FrameError::NotImplemented(detail)
            | FrameError::Faulted(detail)
            | FrameError::Unknown(detail) => Some(detail),
            _ => None,
        }
    }

    /// Rebuild an error from its wire tag and detail.
    ///
    /// Unknown tags become [`FrameError::Unknown`] so a newer peer never
    /// makes an older one panic.
    ///
    /// `insufficientCapacity` describes a caller's local buffer and is never
    /// produced by a server, which copies frames into its own replies. A peer
    /// that sends it anyway is treated as faulted.
    pub fn from_wire(tag: &str, detail: Option<&str>) -> Self {
        let text = || detail.unwrap_or_default().to_string();
        match tag {
            "timeout" => FrameError::Timeout,
            "overflow" => FrameError::Overflow,
            "endOfStream" => FrameError::EndOfStream,
            "formatUnsupported" => FrameError::FormatUnsupported(text()),
            "invalidParameter" => FrameError::InvalidParameter(text()),
            "unsupportedAction" => FrameError::UnsupportedAction(text()),
            "notImplemented" => FrameError::NotImplemented(text()),
            "noFrame" => FrameError::NoFrame,
            "faulted" => FrameError::Faulted(text()),
            "insufficientCapacity" => FrameError::Faulted(match detail {
                Some(detail) => format!("peer reported insufficient capacity: {detail}"),
                None => "peer reported insufficient capacity".to_string(),
            }),
            other => FrameError::Unknown(match detail {
                Some(detail) => format!("{other}: {detail}"),
                None => other.to_string(),
            }),
        }
    }
}

impl<T> From<std::sync::PoisonError<T>> for FrameError {
    fn from(_: std::sync::PoisonError<T>) -> Self {
        FrameError::Faulted("frame source lock poisoned".to_string())
    }
}

pub type Result<T> = std::result::Result<T, FrameError>;
