use std::sync::{Arc, Mutex};

use bytes::Bytes;
use framewire_image::{ImageMetadata, ImageView};

use crate::error::{FrameError, Result};

/// A pull-model supplier of image frames.
///
/// Implementations must make [`next_frame`](FrameSource::next_frame)
/// idempotent with respect to success: each successful call exposes exactly
/// one frame that was not exposed before. The view returned by
/// [`frame`](FrameSource::frame) borrows the source, so the next
/// `next_frame` cannot run while a view is still in use.
pub trait FrameSource {
    /// Describe the frames this source produces.
    ///
    /// Repeated calls return the same value unless the producer declared a
    /// change.
    fn metadata(&mut self) -> Result<ImageMetadata>;

    /// Block until a new frame is available, then make it current.
    fn next_frame(&mut self) -> Result<()>;

    /// Borrow the current frame.
    ///
    /// Returns [`FrameError::NoFrame`] before the first successful
    /// `next_frame`.
    fn frame(&self) -> Result<ImageView<'_>>;

    /// Copy the current frame into `buf` and return a view of the copy.
    ///
    /// When `buf` is too small the call fails with
    /// [`FrameError::InsufficientCapacity`] and `buf` is left untouched.
    fn frame_into<'b>(&self, buf: &'b mut [u8]) -> Result<ImageView<'b>> {
        let view = self.frame()?;
        let needed = view.len().max(view.metadata().size_bytes());
        if buf.len() < needed {
            return Err(FrameError::InsufficientCapacity {
                metadata: view.metadata().clone(),
                capacity: buf.len(),
            });
        }
        let len = view.len();
        buf[..len].copy_from_slice(view.data());
        Ok(ImageView::new(view.metadata().clone(), &buf[..len]))
    }

    /// The current frame as shareable bytes.
    ///
    /// The default copies out of [`frame`](FrameSource::frame). Sources that
    /// already hold their frame in a [`Bytes`] hand out a reference instead.
    fn frame_bytes(&self) -> Result<Bytes> {
        Ok(Bytes::copy_from_slice(self.frame()?.data()))
    }

    /// Run a named, source-specific action.
    fn execute(&mut self, action: &str) -> Result<()>;
}

impl<S: FrameSource + ?Sized> FrameSource for Box<S> {
    fn metadata(&mut self) -> Result<ImageMetadata> {
        (**self).metadata()
    }

    fn next_frame(&mut self) -> Result<()> {
        (**self).next_frame()
    }

    fn frame(&self) -> Result<ImageView<'_>> {
        (**self).frame()
    }

    fn frame_into<'b>(&self, buf: &'b mut [u8]) -> Result<ImageView<'b>> {
        (**self).frame_into(buf)
    }

    fn frame_bytes(&self) -> Result<Bytes> {
        (**self).frame_bytes()
    }

    fn execute(&mut self, action: &str) -> Result<()> {
        (**self).execute(action)
    }
}

/// A source shared between the threads of a server.
pub type SharedSource = Arc<Mutex<dyn FrameSource + Send>>;

/// Wrap a source for sharing.
pub fn shared_source<S: FrameSource + Send + 'static>(source: S) -> SharedSource {
    Arc::new(Mutex::new(source))
}
