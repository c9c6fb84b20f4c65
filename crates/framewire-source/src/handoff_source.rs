use std::fmt;
use std::time::Duration;

use bytes::Bytes;
use framewire_image::{ImageMetadata, ImageView};
use tracing::debug;

use crate::error::{FrameError, Result};
use crate::handoff::{FrameHandoff, HandoffProducer, PublishedFrame};
use crate::source::FrameSource;

/// Callback that runs `execute` actions for a hand-off source.
pub type ActionHandler = Box<dyn FnMut(&str) -> Result<()> + Send>;

/// A [`FrameSource`] fed by a producer pushing frames from elsewhere.
///
/// The current frame lives in the source itself; views borrow it, and the
/// next `next_frame` releases it. Metadata starts out as the value given at
/// construction and follows whatever the producer publishes afterwards.
pub struct HandoffSource {
    handoff: FrameHandoff,
    metadata: ImageMetadata,
    current: Option<PublishedFrame>,
    frame_timeout: Duration,
    actions: Option<ActionHandler>,
}

impl HandoffSource {
    /// Create a source and the producer handle that feeds it.
    pub fn new(metadata: ImageMetadata, frame_timeout: Duration) -> (Self, HandoffProducer) {
        let (handoff, producer) = FrameHandoff::new();
        let source = Self {
            handoff,
            metadata,
            current: None,
            frame_timeout,
            actions: None,
        };
        (source, producer)
    }

    /// Route `execute` calls to `handler` instead of rejecting them.
    pub fn with_action_handler(
        mut self,
        handler: impl FnMut(&str) -> Result<()> + Send + 'static,
    ) -> Self {
        self.actions = Some(Box::new(handler));
        self
    }

    pub fn frame_timeout(&self) -> Duration {
        self.frame_timeout
    }

    /// The synchronizer, for inspecting state and counters.
    pub fn handoff(&self) -> &FrameHandoff {
        &self.handoff
    }
}

impl FrameSource for HandoffSource {
    fn metadata(&mut self) -> Result<ImageMetadata> {
        Ok(self.metadata.clone())
    }

    fn next_frame(&mut self) -> Result<()> {
        // Release the previous frame before asking for the next.
        self.current = None;
        let frame = self.handoff.next_frame(self.frame_timeout)?;
        if frame.metadata != self.metadata {
            debug!(old = %self.metadata, new = %frame.metadata, "producer changed metadata");
            self.metadata = frame.metadata.clone();
        }
        self.current = Some(frame);
        Ok(())
    }

    fn frame(&self) -> Result<ImageView<'_>> {
        let frame = self.current.as_ref().ok_or(FrameError::NoFrame)?;
        Ok(ImageView::new(frame.metadata.clone(), &frame.data))
    }

    fn frame_bytes(&self) -> Result<Bytes> {
        let frame = self.current.as_ref().ok_or(FrameError::NoFrame)?;
        Ok(frame.data.clone())
    }

    fn execute(&mut self, action: &str) -> Result<()> {
        match self.actions.as_mut() {
            Some(handler) => handler(action),
            None => Err(FrameError::UnsupportedAction(action.to_string())),
        }
    }
}

impl fmt::Debug for HandoffSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandoffSource")
            .field("metadata", &self.metadata)
            .field("state", &self.handoff.state())
            .field("frame_timeout", &self.frame_timeout)
            .field("has_frame", &self.current.is_some())
            .finish()
    }
}
