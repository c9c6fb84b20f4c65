//! The frame-source contract and the push-to-pull hand-off.
//!
//! A consumer drives any [`FrameSource`] the same way:
//!
//! 1. [`FrameSource::metadata`]
//! 2. [`FrameSource::next_frame`]; on a recoverable error (timeout,
//!    overflow) retry, on anything else stop
//! 3. [`FrameSource::frame`] or [`FrameSource::frame_into`], as often as needed
//! 4. back to 2
//!
//! Producers that push frames from their own thread or callback satisfy the
//! contract through [`FrameHandoff`], a single-slot synchronizer that keeps
//! at most one frame in flight.

pub mod config;
pub mod discover;
pub mod error;
pub mod handoff;
pub mod handoff_source;
pub mod pattern;
pub mod sink;
pub mod source;

pub use config::{PipelineConfig, ENV_FRAME_TIMEOUT_MS, ENV_HEIGHT, ENV_PIPELINE, ENV_WIDTH};
pub use discover::{Discoverer, StaticDiscoverer};
pub use error::{FrameError, Result};
pub use handoff::{
    FrameHandoff, HandoffProducer, HandoffStats, Publish, PublishedFrame, RequestWait, SlotState,
    Ticket,
};
pub use handoff_source::{ActionHandler, HandoffSource};
pub use pattern::{Pattern, PatternProducer, PatternSource};
pub use sink::{shared_sink, MemorySink, ResultBody, ResultsSink, SharedSink};
pub use source::{shared_source, FrameSource, SharedSource};

pub use framewire_image as image;
