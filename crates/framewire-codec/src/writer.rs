use std::io::{ErrorKind, Write};

use framewire_transport::Stream;

use crate::codec::{encode_header, CodecConfig, Message, MessageKind};
use crate::error::{CodecError, Result};
use crate::reader::transport_to_codec_error;

/// Writes complete messages to any `Write` stream.
///
/// The header and the payload are written from separate buffers, so a
/// multi-megabyte frame is never copied into a staging buffer first.
pub struct MessageWriter<T> {
    inner: T,
    config: CodecConfig,
}

impl<T: Write> MessageWriter<T> {
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, CodecConfig::default())
    }

    pub fn with_config(inner: T, config: CodecConfig) -> Self {
        Self { inner, config }
    }

    /// Write a complete message and flush (blocking).
    pub fn write_message(&mut self, message: &Message) -> Result<()> {
        self.send(message.kind, message.payload.as_ref())
    }

    pub fn send_json(&mut self, payload: &[u8]) -> Result<()> {
        self.send(MessageKind::Json, payload)
    }

    pub fn send_binary(&mut self, payload: &[u8]) -> Result<()> {
        self.send(MessageKind::Binary, payload)
    }

    /// Frame `payload` as a `kind` message and send it.
    ///
    /// Oversized payloads are refused before anything reaches the stream, so
    /// the peer never sees a partial message from this check.
    pub fn send(&mut self, kind: MessageKind, payload: &[u8]) -> Result<()> {
        if payload.len() > self.config.max_payload_size {
            return Err(CodecError::PayloadTooLarge {
                size: payload.len(),
                max: self.config.max_payload_size,
            });
        }

        let header = encode_header(kind, payload.len())?;
        self.write_fully(&header)?;
        self.write_fully(payload)?;
        self.flush()
    }

    fn write_fully(&mut self, mut bytes: &[u8]) -> Result<()> {
        while !bytes.is_empty() {
            match self.inner.write(bytes) {
                Ok(0) => return Err(CodecError::ConnectionClosed),
                Ok(n) => bytes = &bytes[n..],
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(CodecError::Io(err)),
            }
        }
        Ok(())
    }

    pub fn flush(&mut self) -> Result<()> {
        loop {
            match self.inner.flush() {
                Ok(()) => return Ok(()),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(CodecError::Io(err)),
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

impl MessageWriter<Stream> {
    /// Writer over a transport stream, with the config's write timeout applied.
    pub fn with_config_stream(inner: Stream, config: CodecConfig) -> Result<Self> {
        inner
            .set_write_timeout(config.write_timeout)
            .map_err(transport_to_codec_error)?;
        Ok(Self::with_config(inner, config))
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use bytes::BytesMut;

    use super::*;
    use crate::codec::decode_message;
    use crate::reader::MessageReader;

    #[test]
    fn written_messages_decode() {
        let mut writer = MessageWriter::new(Cursor::new(Vec::<u8>::new()));
        writer.send_json(b"{\"request\":\"frame\"}").unwrap();
        writer.send_binary(&[1, 2, 3]).unwrap();

        let mut wire = BytesMut::from(writer.into_inner().into_inner().as_slice());
        let first = decode_message(&mut wire, usize::MAX).unwrap().unwrap();
        let second = decode_message(&mut wire, usize::MAX).unwrap().unwrap();
        assert_eq!(first.kind, MessageKind::Json);
        assert_eq!(second, Message::binary(vec![1u8, 2, 3]));
    }

    #[test]
    fn oversized_payload_writes_nothing() {
        let cfg = CodecConfig {
            max_payload_size: 4,
            ..CodecConfig::default()
        };
        let mut writer = MessageWriter::with_config(Cursor::new(Vec::<u8>::new()), cfg);
        let err = writer.send_binary(b"oversized").unwrap_err();
        assert!(matches!(err, CodecError::PayloadTooLarge { size: 9, max: 4 }));
        assert!(writer.get_ref().get_ref().is_empty());
    }

    #[test]
    fn short_writes_are_resumed() {
        let mut writer = MessageWriter::new(Trickle::default());
        writer.send_binary(&[7u8; 100]).unwrap();

        let trickle = writer.into_inner();
        assert!(trickle.flushed);
        let mut wire = BytesMut::from(trickle.data.as_slice());
        let message = decode_message(&mut wire, usize::MAX).unwrap().unwrap();
        assert_eq!(message.payload.len(), 100);
    }

    #[test]
    fn write_returning_zero_is_connection_closed() {
        let mut writer = MessageWriter::new(ZeroWriter);
        assert!(matches!(
            writer.send_binary(b"x").unwrap_err(),
            CodecError::ConnectionClosed
        ));
    }

    #[test]
    #[cfg(unix)]
    fn roundtrip_over_socket_pair() {
        let (left, right) = std::os::unix::net::UnixStream::pair().unwrap();
        let mut writer = MessageWriter::new(left);
        let mut reader = MessageReader::new(right);

        let handle = std::thread::spawn(move || {
            for i in 0..16u8 {
                writer.send_binary(&vec![i; 1024 * usize::from(i + 1)]).unwrap();
            }
        });

        for i in 0..16u8 {
            let message = reader.read_message().unwrap();
            assert_eq!(message.payload.len(), 1024 * usize::from(i + 1));
            assert!(message.payload.iter().all(|b| *b == i));
        }
        handle.join().unwrap();
    }

    /// Accepts at most three bytes per write and is interrupted every other call.
    #[derive(Default)]
    struct Trickle {
        data: Vec<u8>,
        calls: usize,
        flushed: bool,
    }

    impl Write for Trickle {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.calls += 1;
            if self.calls % 2 == 0 {
                return Err(ErrorKind::Interrupted.into());
            }
            let n = buf.len().min(3);
            self.data.extend_from_slice(&buf[..n]);
            Ok(n)
        }

        fn flush(&mut self) -> std::io::Result<()> {
            self.flushed = true;
            Ok(())
        }
    }

    struct ZeroWriter;

    impl Write for ZeroWriter {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            Ok(0)
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }
}
