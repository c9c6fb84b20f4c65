use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::{CodecError, Result};

/// Message header: magic (2) + length (4) + kind (1) + reserved (1) = 8 bytes.
pub const HEADER_SIZE: usize = 8;

/// Magic bytes: "FW" (0x46 0x57).
pub const MAGIC: [u8; 2] = [0x46, 0x57];

/// Default maximum payload size: 64 MiB, enough for a 4K RGBA float frame
/// in half precision and any uint8 frame up to 8K.
pub const DEFAULT_MAX_PAYLOAD: usize = 64 * 1024 * 1024;

/// What the payload of a message holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum MessageKind {
    /// UTF-8 JSON document.
    Json = 1,
    /// Raw bytes (frame payloads).
    Binary = 2,
}

impl MessageKind {
    fn from_byte(byte: u8) -> Result<Self> {
        match byte {
            1 => Ok(MessageKind::Json),
            2 => Ok(MessageKind::Binary),
            other => Err(CodecError::UnknownKind(other)),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            MessageKind::Json => "json",
            MessageKind::Binary => "binary",
        }
    }
}

/// One complete message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub kind: MessageKind,
    pub payload: Bytes,
}

impl Message {
    pub fn new(kind: MessageKind, payload: impl Into<Bytes>) -> Self {
        Self {
            kind,
            payload: payload.into(),
        }
    }

    pub fn json(payload: impl Into<Bytes>) -> Self {
        Self::new(MessageKind::Json, payload)
    }

    pub fn binary(payload: impl Into<Bytes>) -> Self {
        Self::new(MessageKind::Binary, payload)
    }

    /// The total wire size of this message (header + payload).
    pub fn wire_size(&self) -> usize {
        HEADER_SIZE + self.payload.len()
    }
}

/// Encode a message into the wire format.
///
/// ```text
/// ┌────────────┬────────────┬──────────┬──────────┬──────────────────┐
/// │ Magic (2B) │ Length     │ Kind     │ Reserved │ Payload          │
/// │ 0x46 0x57  │ (4B LE)    │ (1B)     │ (1B, 0)  │ (Length bytes)   │
/// └────────────┴────────────┴──────────┴──────────┴──────────────────┘
/// ```
pub fn encode_message(kind: MessageKind, payload: &[u8], dst: &mut BytesMut) -> Result<()> {
    let header = encode_header(kind, payload.len())?;
    dst.reserve(HEADER_SIZE + payload.len());
    dst.put_slice(&header);
    dst.put_slice(payload);
    Ok(())
}

/// The header alone, for writers that send the payload from its own buffer.
pub fn encode_header(kind: MessageKind, payload_len: usize) -> Result<[u8; HEADER_SIZE]> {
    let len = u32::try_from(payload_len).map_err(|_| CodecError::PayloadTooLarge {
        size: payload_len,
        max: u32::MAX as usize,
    })?;
    let mut header = [0u8; HEADER_SIZE];
    header[..2].copy_from_slice(&MAGIC);
    header[2..6].copy_from_slice(&len.to_le_bytes());
    header[6] = kind as u8;
    Ok(header)
}

/// Decode a message from a buffer.
///
/// Returns `Ok(None)` if the buffer doesn't contain a complete message yet.
/// On success, consumes the message bytes from the buffer.
pub fn decode_message(src: &mut BytesMut, max_payload: usize) -> Result<Option<Message>> {
    if src.len() < HEADER_SIZE {
        return Ok(None);
    }

    if src[0..2] != MAGIC {
        return Err(CodecError::InvalidMagic);
    }

    let payload_len = u32::from_le_bytes([src[2], src[3], src[4], src[5]]) as usize;
    let kind = MessageKind::from_byte(src[6])?;

    if payload_len > max_payload {
        return Err(CodecError::PayloadTooLarge {
            size: payload_len,
            max: max_payload,
        });
    }

    let total = HEADER_SIZE + payload_len;
    if src.len() < total {
        // Grow once for the whole message instead of chunk by chunk.
        src.reserve(total - src.len());
        return Ok(None);
    }

    src.advance(HEADER_SIZE);
    let payload = src.split_to(payload_len).freeze();

    Ok(Some(Message { kind, payload }))
}

/// Configuration for message readers and writers.
#[derive(Debug, Clone)]
pub struct CodecConfig {
    /// Maximum payload size in bytes. Default: 64 MiB.
    pub max_payload_size: usize,
    /// Read timeout for blocking operations.
    pub read_timeout: Option<std::time::Duration>,
    /// Write timeout for blocking operations.
    pub write_timeout: Option<std::time::Duration>,
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            max_payload_size: DEFAULT_MAX_PAYLOAD,
            read_timeout: None,
            write_timeout: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_layout() {
        let mut buf = BytesMut::new();
        encode_message(MessageKind::Binary, &[9, 8, 7], &mut buf).unwrap();

        assert_eq!(&buf[..], &[0x46, 0x57, 3, 0, 0, 0, 2, 0, 9, 8, 7]);
    }

    #[test]
    fn decode_incomplete_header() {
        let mut buf = BytesMut::from(&[0x46, 0x57, 0x00][..]);
        assert!(decode_message(&mut buf, DEFAULT_MAX_PAYLOAD).unwrap().is_none());
    }

    #[test]
    fn decode_incomplete_payload() {
        let mut buf = BytesMut::new();
        encode_message(MessageKind::Json, b"{\"a\":1}", &mut buf).unwrap();
        buf.truncate(HEADER_SIZE + 2);

        assert!(decode_message(&mut buf, DEFAULT_MAX_PAYLOAD).unwrap().is_none());
        assert_eq!(buf.len(), HEADER_SIZE + 2);
    }

    #[test]
    fn decode_invalid_magic() {
        let mut buf = BytesMut::from(&[0x49, 0x50, 0, 0, 0, 0, 1, 0][..]);
        let result = decode_message(&mut buf, DEFAULT_MAX_PAYLOAD);
        assert!(matches!(result, Err(CodecError::InvalidMagic)));
    }

    #[test]
    fn decode_unknown_kind() {
        let mut buf = BytesMut::from(&[0x46, 0x57, 0, 0, 0, 0, 7, 0][..]);
        let result = decode_message(&mut buf, DEFAULT_MAX_PAYLOAD);
        assert!(matches!(result, Err(CodecError::UnknownKind(7))));
    }

    #[test]
    fn decode_payload_too_large() {
        let mut buf = BytesMut::new();
        buf.put_slice(&MAGIC);
        buf.put_u32_le(1024);
        buf.put_u8(MessageKind::Binary as u8);
        buf.put_u8(0);

        let result = decode_message(&mut buf, 512);
        assert!(matches!(
            result,
            Err(CodecError::PayloadTooLarge { size: 1024, max: 512 })
        ));
    }

    #[test]
    fn back_to_back_messages() {
        let mut buf = BytesMut::new();
        encode_message(MessageKind::Json, b"{\"request\":\"frame\"}", &mut buf).unwrap();
        encode_message(MessageKind::Binary, &[1, 2, 3, 4], &mut buf).unwrap();

        let first = decode_message(&mut buf, DEFAULT_MAX_PAYLOAD).unwrap().unwrap();
        assert_eq!(first.kind, MessageKind::Json);
        assert_eq!(first.payload.as_ref(), b"{\"request\":\"frame\"}");

        let second = decode_message(&mut buf, DEFAULT_MAX_PAYLOAD).unwrap().unwrap();
        assert_eq!(second.kind, MessageKind::Binary);
        assert_eq!(second.payload.as_ref(), &[1, 2, 3, 4]);
        assert!(buf.is_empty());
    }

    #[test]
    fn empty_payload() {
        let mut buf = BytesMut::new();
        encode_message(MessageKind::Binary, b"", &mut buf).unwrap();

        let message = decode_message(&mut buf, DEFAULT_MAX_PAYLOAD).unwrap().unwrap();
        assert!(message.payload.is_empty());
        assert_eq!(Message::binary(Bytes::new()).wire_size(), HEADER_SIZE);
    }
}
