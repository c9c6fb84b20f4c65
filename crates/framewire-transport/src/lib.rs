//! Transport abstraction for framewire.
//!
//! Provides one connected [`Stream`] type and one [`Listener`] type over:
//! - TCP (`host:port`)
//! - Unix domain sockets (`unix:<path>`, Linux/macOS)
//!
//! This is the lowest layer of framewire. Everything else builds on top of
//! the [`Stream`] type provided here.

pub mod endpoint;
pub mod error;
pub mod listener;
pub mod stream;

#[cfg(unix)]
pub mod uds;

pub use endpoint::Endpoint;
pub use error::{Result, TransportError};
pub use listener::Listener;
pub use stream::{connect, Stream};

#[cfg(unix)]
pub use uds::UnixDomainSocket;
