use crate::metadata::ImageMetadata;

/// Borrowed view of one frame: its metadata plus the bytes behind it.
///
/// The view owns neither. The borrow ties it to whoever holds the bytes, so
/// a frame source cannot be asked for the next frame while a view of the
/// current one is still alive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageView<'a> {
    metadata: ImageMetadata,
    data: &'a [u8],
}

impl<'a> ImageView<'a> {
    pub fn new(metadata: ImageMetadata, data: &'a [u8]) -> Self {
        Self { metadata, data }
    }

    pub fn metadata(&self) -> &ImageMetadata {
        &self.metadata
    }

    pub fn data(&self) -> &'a [u8] {
        self.data
    }

    /// Number of bytes behind the view.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// True when the byte count matches what the metadata describes.
    pub fn is_complete(&self) -> bool {
        self.data.len() == self.metadata.size_bytes()
    }
}
