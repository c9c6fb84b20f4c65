use std::io::{Read, Write};
use std::net::{Shutdown, TcpStream};
use std::time::Duration;

use tracing::debug;

use crate::endpoint::Endpoint;
use crate::error::{Result, TransportError};

/// A connected byte stream, readable and writable.
///
/// This is the fundamental I/O type returned by [`connect`] and
/// [`Listener::accept`](crate::Listener::accept).
pub struct Stream {
    inner: StreamInner,
}

enum StreamInner {
    Tcp(TcpStream),
    #[cfg(unix)]
    Unix(std::os::unix::net::UnixStream),
}

/// Connect to a listening endpoint (blocking).
pub fn connect(endpoint: &Endpoint) -> Result<Stream> {
    let connect_err = |source| TransportError::Connect {
        endpoint: endpoint.to_string(),
        source,
    };

    let stream = match endpoint {
        Endpoint::Tcp { host, port } => {
            let stream = TcpStream::connect((host.as_str(), *port)).map_err(connect_err)?;
            Stream::from_tcp(stream)?
        }
        #[cfg(unix)]
        Endpoint::Unix(path) => {
            let stream = std::os::unix::net::UnixStream::connect(path).map_err(connect_err)?;
            Stream::from_unix(stream)
        }
        #[cfg(not(unix))]
        Endpoint::Unix(_) => return Err(TransportError::Unsupported(endpoint.to_string())),
    };

    debug!(%endpoint, "connected");
    Ok(stream)
}

impl Read for Stream {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        match &mut self.inner {
            StreamInner::Tcp(stream) => stream.read(buf),
            #[cfg(unix)]
            StreamInner::Unix(stream) => stream.read(buf),
        }
    }
}

impl Write for Stream {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        match &mut self.inner {
            StreamInner::Tcp(stream) => stream.write(buf),
            #[cfg(unix)]
            StreamInner::Unix(stream) => stream.write(buf),
        }
    }

    fn flush(&mut self) -> std::io::Result<()> {
        match &mut self.inner {
            StreamInner::Tcp(stream) => stream.flush(),
            #[cfg(unix)]
            StreamInner::Unix(stream) => stream.flush(),
        }
    }
}

impl Stream {
    /// Wrap a TCP stream. Nagle is disabled: every message is a full request
    /// or response and waiting to coalesce only adds latency.
    pub(crate) fn from_tcp(stream: TcpStream) -> Result<Self> {
        stream.set_nodelay(true)?;
        Ok(Self {
            inner: StreamInner::Tcp(stream),
        })
    }

    #[cfg(unix)]
    pub(crate) fn from_unix(stream: std::os::unix::net::UnixStream) -> Self {
        Self {
            inner: StreamInner::Unix(stream),
        }
    }

    /// Set read timeout on the underlying stream.
    pub fn set_read_timeout(&self, timeout: Option<Duration>) -> Result<()> {
        match &self.inner {
            StreamInner::Tcp(stream) => stream.set_read_timeout(timeout).map_err(Into::into),
            #[cfg(unix)]
            StreamInner::Unix(stream) => stream.set_read_timeout(timeout).map_err(Into::into),
        }
    }

    /// Set write timeout on the underlying stream.
    pub fn set_write_timeout(&self, timeout: Option<Duration>) -> Result<()> {
        match &self.inner {
            StreamInner::Tcp(stream) => stream.set_write_timeout(timeout).map_err(Into::into),
            #[cfg(unix)]
            StreamInner::Unix(stream) => stream.set_write_timeout(timeout).map_err(Into::into),
        }
    }

    /// Try to clone this stream (creates a new file descriptor).
    pub fn try_clone(&self) -> Result<Self> {
        match &self.inner {
            StreamInner::Tcp(stream) => Ok(Self {
                inner: StreamInner::Tcp(stream.try_clone()?),
            }),
            #[cfg(unix)]
            StreamInner::Unix(stream) => Ok(Self::from_unix(stream.try_clone()?)),
        }
    }

    /// Shut down both directions. Blocked reads on any clone return EOF.
    pub fn shutdown(&self) -> Result<()> {
        let result = match &self.inner {
            StreamInner::Tcp(stream) => stream.shutdown(Shutdown::Both),
            #[cfg(unix)]
            StreamInner::Unix(stream) => stream.shutdown(Shutdown::Both),
        };
        match result {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotConnected => Ok(()),
            Err(err) => Err(err.into()),
        }
    }

    /// Human-readable description of the remote end.
    pub fn peer_label(&self) -> String {
        match &self.inner {
            StreamInner::Tcp(stream) => stream
                .peer_addr()
                .map(|addr| addr.to_string())
                .unwrap_or_else(|_| "tcp:unknown".to_string()),
            #[cfg(unix)]
            StreamInner::Unix(_) => "unix-peer".to_string(),
        }
    }
}

impl std::fmt::Debug for Stream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.inner {
            StreamInner::Tcp(stream) => f
                .debug_struct("Stream")
                .field("type", &"tcp")
                .field("peer", &stream.peer_addr().ok())
                .finish(),
            #[cfg(unix)]
            StreamInner::Unix(_) => f.debug_struct("Stream").field("type", &"unix").finish(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::{Read, Write};

    use super::*;
    use crate::Listener;

    #[test]
    fn tcp_connect_roundtrip() {
        let listener = Listener::bind(&Endpoint::tcp("127.0.0.1", 0)).unwrap();
        let endpoint = listener.local_endpoint().unwrap();

        let handle = std::thread::spawn(move || {
            let mut client = connect(&endpoint).unwrap();
            client.write_all(b"frame").unwrap();
        });

        let mut server = listener.accept().unwrap();
        let mut buf = [0u8; 5];
        server.read_exact(&mut buf).unwrap();
        assert_eq!(&buf, b"frame");
        handle.join().unwrap();
    }

    #[test]
    fn shutdown_unblocks_reader_clone() {
        let listener = Listener::bind(&Endpoint::tcp("127.0.0.1", 0)).unwrap();
        let endpoint = listener.local_endpoint().unwrap();
        let _client = connect(&endpoint).unwrap();
        let server = listener.accept().unwrap();
        let mut reader = server.try_clone().unwrap();

        let handle = std::thread::spawn(move || {
            let mut buf = [0u8; 1];
            reader.read(&mut buf).unwrap_or(0)
        });

        server.shutdown().unwrap();
        assert_eq!(handle.join().unwrap(), 0);
    }

    #[test]
    fn connect_refused_reports_endpoint() {
        let listener = Listener::bind(&Endpoint::tcp("127.0.0.1", 0)).unwrap();
        let endpoint = listener.local_endpoint().unwrap();
        drop(listener);

        let err = connect(&endpoint).unwrap_err();
        assert!(matches!(err, TransportError::Connect { .. }));
        assert!(err.to_string().contains(&endpoint.to_string()));
    }
}
