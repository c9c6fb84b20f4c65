//! The framewire request/response protocol.
//!
//! One connection carries a strict request-then-response exchange: the
//! client sends a JSON request (`metadata`, `frame`, `result` or
//! `execute`), the server answers with one message. Frames travel as
//! binary messages, everything else as JSON.
//!
//! - [`Server`] exposes a [`FrameSource`](framewire_source::FrameSource)
//!   and a [`ResultsSink`](framewire_source::ResultsSink) through a
//!   [`Router`], one session thread per connection.
//! - [`Client`] implements both contracts on top of one connection.

pub mod client;
pub mod config;
pub mod discover;
pub mod error;
pub mod message;
pub mod router;
pub mod server;
mod session;

pub use client::Client;
pub use config::{
    ClientConfig, ServerConfig, DEFAULT_ADDRESS, DEFAULT_PORT, ENV_READ_TIMEOUT_MS,
    ENV_SERVER_ADDRESS, ENV_SERVER_PORT, ENV_WRITE_TIMEOUT_MS,
};
pub use discover::{RemoteDiscoverer, SOURCE_TYPE};
pub use error::{ProtocolError, Result};
pub use message::{
    Ack, ErrorReply, ExecuteBody, Reply, Request, RequestType, PROTOCOL_ERROR_TAG, STATUS_SUCCESS,
};
pub use router::{Handler, Router};
pub use server::{Server, ServerHandle};
