//! Deliver image frames from push-style producers to pull-style consumers,
//! in process or across a socket.
//!
//! # Crate Structure
//!
//! - [`image`]: Image metadata, frame views and camera descriptors
//! - [`transport`]: TCP and Unix domain socket streams
//! - [`codec`]: Length-prefixed JSON/binary message framing
//! - [`source`]: The frame-source contract, hand-off synchronizer and test sources
//! - [`protocol`]: Request/response server and client (behind `protocol` feature)

/// Re-export image types.
pub mod image {
    pub use framewire_image::*;
}

/// Re-export transport types.
pub mod transport {
    pub use framewire_transport::*;
}

/// Re-export codec types.
pub mod codec {
    pub use framewire_codec::*;
}

/// Re-export frame-source types.
pub mod source {
    pub use framewire_source::*;
}

/// Re-export protocol types (requires `protocol` feature).
#[cfg(feature = "protocol")]
pub mod protocol {
    pub use framewire_protocol::*;
}
