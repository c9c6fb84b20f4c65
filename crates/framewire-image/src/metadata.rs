use std::fmt;

use serde::{Deserialize, Serialize};

use crate::color_space::ColorSpace;
use crate::element::ElementType;
use crate::layout::DataLayout;

/// Orientation tag used when a producer does not report one.
pub const DEFAULT_ORIENTATION: &str = "topLeft";

/// Immutable description of an image.
///
/// Serialized as the `metadata` response body:
///
/// ```text
/// { "dataType": "uint8", "width": 800, "height": 600,
///   "colorSpace": "RGB", "layout": "planar", "orientation": "topLeft" }
/// ```
///
/// A changed image is described by a new value; there are no setters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageMetadata {
    #[serde(rename = "dataType")]
    element_type: ElementType,
    width: u32,
    height: u32,
    color_space: ColorSpace,
    layout: DataLayout,
    #[serde(default = "default_orientation")]
    orientation: String,
}

fn default_orientation() -> String {
    DEFAULT_ORIENTATION.to_string()
}

impl ImageMetadata {
    /// Describe an image with the default `topLeft` orientation.
    pub fn new(
        width: u32,
        height: u32,
        color_space: ColorSpace,
        layout: DataLayout,
        element_type: ElementType,
    ) -> Self {
        Self {
            element_type,
            width,
            height,
            color_space,
            layout,
            orientation: default_orientation(),
        }
    }

    /// Same image with a different orientation tag.
    pub fn with_orientation(mut self, orientation: impl Into<String>) -> Self {
        self.orientation = orientation.into();
        self
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn color_space(&self) -> ColorSpace {
        self.color_space
    }

    pub fn layout(&self) -> DataLayout {
        self.layout
    }

    pub fn element_type(&self) -> ElementType {
        self.element_type
    }

    pub fn orientation(&self) -> &str {
        &self.orientation
    }

    /// Channels per pixel, derived from the color space.
    pub fn channel_count(&self) -> usize {
        self.color_space.channel_count()
    }

    /// `width * height`.
    pub fn pixel_count(&self) -> usize {
        (self.width as usize).saturating_mul(self.height as usize)
    }

    /// `pixel_count * channel_count * element size`, recomputed on every call.
    ///
    /// Saturates at `usize::MAX` for dimensions no buffer can hold. Use
    /// [`ImageMetadata::checked_size_bytes`] on metadata from an untrusted peer.
    pub fn size_bytes(&self) -> usize {
        self.checked_size_bytes().unwrap_or(usize::MAX)
    }

    /// Frame size in bytes, or `None` when it does not fit in `usize`.
    pub fn checked_size_bytes(&self) -> Option<usize> {
        (self.width as usize)
            .checked_mul(self.height as usize)?
            .checked_mul(self.channel_count())?
            .checked_mul(self.element_type.size())
    }
}

impl fmt::Display for ImageMetadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}x{} {} {} {} ({})",
            self.width,
            self.height,
            self.color_space,
            self.layout,
            self.element_type,
            self.orientation
        )
    }
}
