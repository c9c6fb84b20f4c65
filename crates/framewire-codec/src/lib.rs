//! Length-prefixed message framing for framewire.
//!
//! Every request and response travels as one message:
//! - A 2-byte magic number ("FW") for stream synchronization
//! - A 4-byte little-endian payload length
//! - A 1-byte kind (JSON text or raw binary)
//! - A reserved byte, always zero
//!
//! Readers always hand back complete messages; partial reads stay internal.

pub mod codec;
pub mod error;
pub mod reader;
pub mod writer;

pub use codec::{
    decode_message, encode_header, encode_message, CodecConfig, Message, MessageKind, DEFAULT_MAX_PAYLOAD,
    HEADER_SIZE, MAGIC,
};
pub use error::{CodecError, Result};
pub use reader::MessageReader;
pub use writer::MessageWriter;
