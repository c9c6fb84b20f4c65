use std::io::{ErrorKind, Read};

use bytes::BytesMut;
use framewire_transport::Stream;

use crate::codec::{decode_message, CodecConfig, Message};
use crate::error::{CodecError, Result};

const INITIAL_BUFFER_CAPACITY: usize = 64 * 1024;
const READ_CHUNK_SIZE: usize = 64 * 1024;

/// Reads complete messages from any `Read` stream.
///
/// Bytes of a message interrupted by a read timeout stay buffered, so the
/// next call resumes where the last one stopped.
pub struct MessageReader<T> {
    inner: T,
    buf: BytesMut,
    config: CodecConfig,
}

impl<T: Read> MessageReader<T> {
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, CodecConfig::default())
    }

    pub fn with_config(inner: T, config: CodecConfig) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            config,
        }
    }

    /// Read the next complete message (blocking).
    ///
    /// Returns `Err(CodecError::ConnectionClosed)` when EOF is reached.
    pub fn read_message(&mut self) -> Result<Message> {
        loop {
            if let Some(message) = decode_message(&mut self.buf, self.config.max_payload_size)? {
                return Ok(message);
            }

            // decode_message reserved room for the pending message; read
            // straight into it.
            let start = self.buf.len();
            let want = (self.buf.capacity() - start).max(READ_CHUNK_SIZE);
            self.buf.resize(start + want, 0);

            let read = match self.inner.read(&mut self.buf[start..]) {
                Ok(n) => n,
                Err(err) if err.kind() == ErrorKind::Interrupted => {
                    self.buf.truncate(start);
                    continue;
                }
                Err(err) => {
                    self.buf.truncate(start);
                    return Err(CodecError::Io(err));
                }
            };
            self.buf.truncate(start + read);

            if read == 0 {
                return Err(CodecError::ConnectionClosed);
            }
        }
    }

    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    pub fn into_inner(self) -> T {
        self.inner
    }

    pub fn config(&self) -> &CodecConfig {
        &self.config
    }
}

impl MessageReader<Stream> {
    /// Reader over a transport stream, with the config's read timeout applied.
    pub fn with_config_stream(inner: Stream, config: CodecConfig) -> Result<Self> {
        inner
            .set_read_timeout(config.read_timeout)
            .map_err(transport_to_codec_error)?;
        Ok(Self::with_config(inner, config))
    }
}

pub(crate) fn transport_to_codec_error(err: framewire_transport::TransportError) -> CodecError {
    match err {
        framewire_transport::TransportError::Io(io)
        | framewire_transport::TransportError::Accept(io) => CodecError::Io(io),
        framewire_transport::TransportError::Bind { source, .. }
        | framewire_transport::TransportError::Connect { source, .. } => CodecError::Io(source),
        other => CodecError::Io(std::io::Error::other(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use bytes::{BufMut, BytesMut};

    use super::*;
    use crate::codec::{encode_message, MessageKind, MAGIC};

    fn wire(messages: &[(MessageKind, &[u8])]) -> Vec<u8> {
        let mut buf = BytesMut::new();
        for (kind, payload) in messages {
            encode_message(*kind, payload, &mut buf).unwrap();
        }
        buf.to_vec()
    }

    #[test]
    fn reads_messages_in_order() {
        let bytes = wire(&[
            (MessageKind::Json, b"{\"request\":\"metadata\"}"),
            (MessageKind::Binary, &[0xAA; 3]),
        ]);
        let mut reader = MessageReader::new(Cursor::new(bytes));

        let first = reader.read_message().unwrap();
        assert_eq!(first.kind, MessageKind::Json);
        let second = reader.read_message().unwrap();
        assert_eq!(second.kind, MessageKind::Binary);
        assert_eq!(second.payload.as_ref(), &[0xAA; 3]);
    }

    #[test]
    fn reads_frame_sized_payload() {
        let payload: Vec<u8> = (0..800 * 600 * 3).map(|i| (i % 251) as u8).collect();
        let bytes = wire(&[(MessageKind::Binary, &payload)]);
        let mut reader = MessageReader::new(Cursor::new(bytes));

        let message = reader.read_message().unwrap();
        assert_eq!(message.payload.len(), payload.len());
        assert_eq!(message.payload.as_ref(), payload.as_slice());
    }

    #[test]
    fn byte_by_byte_source() {
        let bytes = wire(&[(MessageKind::Json, b"{}")]);
        let mut reader = MessageReader::new(ByteByByte { bytes, pos: 0 });
        assert_eq!(reader.read_message().unwrap().payload.as_ref(), b"{}");
    }

    #[test]
    fn clean_eof_is_connection_closed() {
        let mut reader = MessageReader::new(Cursor::new(Vec::<u8>::new()));
        assert!(matches!(
            reader.read_message().unwrap_err(),
            CodecError::ConnectionClosed
        ));
    }

    #[test]
    fn eof_mid_message_is_connection_closed() {
        let mut partial = BytesMut::new();
        partial.put_slice(&MAGIC);
        partial.put_u32_le(16);
        partial.put_u8(MessageKind::Binary as u8);
        partial.put_u8(0);
        partial.put_slice(b"short");

        let mut reader = MessageReader::new(Cursor::new(partial.to_vec()));
        assert!(matches!(
            reader.read_message().unwrap_err(),
            CodecError::ConnectionClosed
        ));
    }

    #[test]
    fn timeout_keeps_partial_message() {
        let bytes = wire(&[(MessageKind::Json, b"{\"status\":\"success\"}")]);
        let split = 5;
        let mut reader = MessageReader::new(StallingReader {
            first: bytes[..split].to_vec(),
            rest: bytes[split..].to_vec(),
            stage: 0,
        });

        let err = reader.read_message().unwrap_err();
        assert!(err.is_timeout());

        let message = reader.read_message().unwrap();
        assert_eq!(message.payload.as_ref(), b"{\"status\":\"success\"}");
    }

    #[test]
    fn oversized_message_rejected() {
        let bytes = wire(&[(MessageKind::Binary, &[0u8; 64])]);
        let cfg = CodecConfig {
            max_payload_size: 16,
            ..CodecConfig::default()
        };
        let mut reader = MessageReader::with_config(Cursor::new(bytes), cfg);
        assert!(matches!(
            reader.read_message().unwrap_err(),
            CodecError::PayloadTooLarge { size: 64, max: 16 }
        ));
    }

    struct ByteByByte {
        bytes: Vec<u8>,
        pos: usize,
    }

    impl Read for ByteByByte {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if self.pos >= self.bytes.len() || buf.is_empty() {
                return Ok(0);
            }
            buf[0] = self.bytes[self.pos];
            self.pos += 1;
            Ok(1)
        }
    }

    /// Yields `first`, then one WouldBlock, then `rest`.
    struct StallingReader {
        first: Vec<u8>,
        rest: Vec<u8>,
        stage: u8,
    }

    impl Read for StallingReader {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            self.stage += 1;
            let chunk = match self.stage {
                1 => std::mem::take(&mut self.first),
                2 => return Err(std::io::Error::from(ErrorKind::WouldBlock)),
                _ => std::mem::take(&mut self.rest),
            };
            buf[..chunk.len()].copy_from_slice(&chunk);
            Ok(chunk.len())
        }
    }
}
