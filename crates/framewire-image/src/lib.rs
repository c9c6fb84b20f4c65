//! Image metadata, frame views and camera descriptors.
//!
//! This is the leaf layer of framewire. Everything that moves frames around
//! describes them with an [`ImageMetadata`] and hands them out as an
//! [`ImageView`] over bytes it does not own.
//!
//! The byte size of a frame is never stored: [`ImageMetadata::size_bytes`]
//! always derives it from width, height, color space and element type.

pub mod camera;
pub mod color_space;
pub mod element;
pub mod error;
pub mod layout;
pub mod metadata;
pub mod view;

pub use camera::CameraInfo;
pub use color_space::ColorSpace;
pub use element::ElementType;
pub use error::ParseNameError;
pub use layout::DataLayout;
pub use metadata::{ImageMetadata, DEFAULT_ORIENTATION};
pub use view::ImageView;
