use std::net::TcpListener;

use tracing::{debug, info};

use crate::endpoint::Endpoint;
use crate::error::{Result, TransportError};
use crate::stream::Stream;

/// Accepts connections on a TCP or Unix domain socket endpoint.
pub struct Listener {
    inner: ListenerInner,
}

enum ListenerInner {
    Tcp(TcpListener),
    #[cfg(unix)]
    Unix(crate::uds::UnixDomainSocket),
}

impl Listener {
    /// Bind and listen on an endpoint.
    ///
    /// Binding TCP port 0 picks an ephemeral port; see [`Listener::local_endpoint`].
    pub fn bind(endpoint: &Endpoint) -> Result<Self> {
        let inner = match endpoint {
            Endpoint::Tcp { host, port } => {
                let listener =
                    TcpListener::bind((host.as_str(), *port)).map_err(|source| {
                        TransportError::Bind {
                            endpoint: endpoint.to_string(),
                            source,
                        }
                    })?;
                info!(%endpoint, "listening on tcp");
                ListenerInner::Tcp(listener)
            }
            #[cfg(unix)]
            Endpoint::Unix(path) => ListenerInner::Unix(crate::uds::UnixDomainSocket::bind(path)?),
            #[cfg(not(unix))]
            Endpoint::Unix(_) => return Err(TransportError::Unsupported(endpoint.to_string())),
        };
        Ok(Self { inner })
    }

    /// Accept an incoming connection (blocking).
    pub fn accept(&self) -> Result<Stream> {
        match &self.inner {
            ListenerInner::Tcp(listener) => {
                let (stream, addr) = listener.accept().map_err(TransportError::Accept)?;
                debug!(%addr, "accepted tcp connection");
                Stream::from_tcp(stream)
            }
            #[cfg(unix)]
            ListenerInner::Unix(socket) => socket.accept(),
        }
    }

    /// The endpoint actually bound, with any ephemeral TCP port resolved.
    pub fn local_endpoint(&self) -> Result<Endpoint> {
        match &self.inner {
            ListenerInner::Tcp(listener) => {
                let addr = listener.local_addr()?;
                Ok(Endpoint::tcp(addr.ip().to_string(), addr.port()))
            }
            #[cfg(unix)]
            ListenerInner::Unix(socket) => Ok(Endpoint::Unix(socket.path().to_path_buf())),
        }
    }
}

impl std::fmt::Debug for Listener {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Listener")
            .field("endpoint", &self.local_endpoint().ok())
            .finish()
    }
}
