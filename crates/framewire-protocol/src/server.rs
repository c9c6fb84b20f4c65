use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use framewire_transport::{connect, Endpoint, Listener, Stream};
use tracing::{debug, info, warn};

use crate::config::ServerConfig;
use crate::error::Result;
use crate::router::Router;
use crate::session;

/// Accepts connections and runs one session thread per connection.
pub struct Server {
    listener: Listener,
    router: Arc<Router>,
    config: ServerConfig,
}

impl Server {
    /// Bind `endpoint` and serve requests through `router`.
    pub fn bind(endpoint: &Endpoint, router: Router) -> Result<Self> {
        Ok(Self {
            listener: Listener::bind(endpoint)?,
            router: Arc::new(router),
            config: ServerConfig::default(),
        })
    }

    /// Bind the endpoint named by `config`.
    pub fn bind_with_config(config: ServerConfig, router: Router) -> Result<Self> {
        let server = Self::bind(&config.endpoint(), router)?;
        Ok(server.with_config(config))
    }

    /// Override session behavior. The listening endpoint is not changed.
    pub fn with_config(mut self, config: ServerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn local_endpoint(&self) -> Result<Endpoint> {
        Ok(self.listener.local_endpoint()?)
    }

    /// Start accepting in the background.
    pub fn spawn(self) -> Result<ServerHandle> {
        let local = self.local_endpoint()?;
        let shared = Arc::new(Shared {
            stopping: AtomicBool::new(false),
            sessions: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        });

        let (tx, rx) = mpsc::channel::<Stream>();
        let accept = {
            let shared = Arc::clone(&shared);
            let listener = self.listener;
            thread::Builder::new()
                .name("framewire-accept".to_string())
                .spawn(move || accept_loop(&listener, &shared, &tx))
                .map_err(framewire_transport::TransportError::from)?
        };
        let spawner = {
            let shared = Arc::clone(&shared);
            let router = self.router;
            let config = self.config;
            thread::Builder::new()
                .name("framewire-sessions".to_string())
                .spawn(move || session_spawner(rx, &shared, &router, &config))
                .map_err(framewire_transport::TransportError::from)?
        };

        info!(endpoint = %local, "server started");
        Ok(ServerHandle {
            local,
            shared,
            accept: Some(accept),
            spawner: Some(spawner),
        })
    }
}

struct Shared {
    stopping: AtomicBool,
    /// Clones of live session streams, so shutdown can unblock their reads.
    sessions: Mutex<HashMap<u64, Stream>>,
    next_id: AtomicU64,
}

impl Shared {
    fn is_stopping(&self) -> bool {
        self.stopping.load(Ordering::SeqCst)
    }
}

const ACCEPT_BACKOFF_MIN: Duration = Duration::from_millis(5);
const ACCEPT_BACKOFF_MAX: Duration = Duration::from_millis(500);

/// Delay between failed accepts. Doubles per consecutive failure, so an
/// exhausted descriptor table does not turn the loop into a busy spin.
#[derive(Debug, Default)]
struct AcceptBackoff {
    failures: u32,
}

impl AcceptBackoff {
    fn failed(&mut self) -> Duration {
        let delay = ACCEPT_BACKOFF_MIN
            .saturating_mul(1u32 << self.failures.min(16))
            .min(ACCEPT_BACKOFF_MAX);
        self.failures = self.failures.saturating_add(1);
        delay
    }

    fn reset(&mut self) {
        self.failures = 0;
    }
}

fn accept_loop(listener: &Listener, shared: &Shared, tx: &mpsc::Sender<Stream>) {
    let mut backoff = AcceptBackoff::default();
    loop {
        match listener.accept() {
            Ok(stream) => {
                backoff.reset();
                if shared.is_stopping() {
                    break;
                }
                if tx.send(stream).is_err() {
                    break;
                }
            }
            Err(err) => {
                if shared.is_stopping() {
                    break;
                }
                let delay = backoff.failed();
                warn!(error = %err, retry_in_ms = delay.as_millis() as u64, "accept failed");
                thread::sleep(delay);
                if shared.is_stopping() {
                    break;
                }
            }
        }
    }
    debug!("accept loop stopped");
}

fn session_spawner(
    rx: mpsc::Receiver<Stream>,
    shared: &Arc<Shared>,
    router: &Arc<Router>,
    config: &ServerConfig,
) {
    let mut workers: Vec<JoinHandle<()>> = Vec::new();
    for stream in rx {
        workers.retain(|worker| !worker.is_finished());

        let id = shared.next_id.fetch_add(1, Ordering::Relaxed);
        let peer = stream.peer_label();
        let registered = match stream.try_clone() {
            Ok(clone) => register(shared, id, clone),
            Err(err) => {
                warn!(%peer, error = %err, "cannot track session, dropping connection");
                false
            }
        };
        if !registered {
            let _ = stream.shutdown();
            continue;
        }

        let tracked = Arc::clone(shared);
        let router = Arc::clone(router);
        let config = config.clone();
        let worker = thread::Builder::new()
            .name(format!("framewire-session-{id}"))
            .spawn(move || {
                info!(%peer, session = id, "session started");
                if let Err(err) = session::run(&router, stream, &config, &peer) {
                    debug!(%peer, session = id, error = %err, "session ended with error");
                }
                if let Ok(mut sessions) = tracked.sessions.lock() {
                    sessions.remove(&id);
                }
                info!(%peer, session = id, "session closed");
            });
        match worker {
            Ok(worker) => workers.push(worker),
            Err(err) => {
                warn!(session = id, error = %err, "cannot spawn session thread");
                if let Ok(mut sessions) = shared.sessions.lock() {
                    if let Some(stream) = sessions.remove(&id) {
                        let _ = stream.shutdown();
                    }
                }
            }
        }
    }

    for worker in workers {
        let _ = worker.join();
    }
}

/// Track a session unless the server is already stopping.
fn register(shared: &Shared, id: u64, stream: Stream) -> bool {
    let Ok(mut sessions) = shared.sessions.lock() else {
        return false;
    };
    // Checked under the lock shutdown sweeps with, so no session slips past it.
    if shared.is_stopping() {
        return false;
    }
    sessions.insert(id, stream);
    true
}

/// A running server. Dropping it shuts the server down.
pub struct ServerHandle {
    local: Endpoint,
    shared: Arc<Shared>,
    accept: Option<JoinHandle<()>>,
    spawner: Option<JoinHandle<()>>,
}

impl ServerHandle {
    /// The endpoint clients should connect to, with any ephemeral port resolved.
    pub fn local_endpoint(&self) -> &Endpoint {
        &self.local
    }

    /// Number of sessions currently open.
    pub fn session_count(&self) -> usize {
        self.shared.sessions.lock().map(|s| s.len()).unwrap_or(0)
    }

    /// Stop accepting, close every session and wait for all threads.
    pub fn shutdown(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        let Some(accept) = self.accept.take() else {
            return;
        };

        match self.shared.sessions.lock() {
            Ok(sessions) => {
                self.shared.stopping.store(true, Ordering::SeqCst);
                for stream in sessions.values() {
                    let _ = stream.shutdown();
                }
            }
            Err(_) => self.shared.stopping.store(true, Ordering::SeqCst),
        }

        // Wake the blocking accept.
        match connect(&wake_endpoint(&self.local)) {
            Ok(stream) => drop(stream),
            Err(err) => warn!(error = %err, "could not wake accept loop"),
        }
        let _ = accept.join();
        if let Some(spawner) = self.spawner.take() {
            let _ = spawner.join();
        }
        info!(endpoint = %self.local, "server stopped");
    }
}

impl Drop for ServerHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

/// A wildcard bind address is not connectable; use loopback instead.
fn wake_endpoint(local: &Endpoint) -> Endpoint {
    match local {
        Endpoint::Tcp { host, port } if host == "0.0.0.0" => Endpoint::tcp("127.0.0.1", *port),
        Endpoint::Tcp { host, port } if host == "::" => Endpoint::tcp("::1", *port),
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::{Reply, Request};
    use framewire_codec::{MessageReader, MessageWriter};
    use framewire_image::{ColorSpace, DataLayout, ElementType, ImageMetadata};
    use framewire_source::{shared_source, Pattern, PatternSource};
    use std::time::{Duration, Instant};

    fn start() -> ServerHandle {
        let metadata = ImageMetadata::new(8, 8, ColorSpace::Grayscale, DataLayout::Planar, ElementType::Uint8);
        let router = Router::for_source(shared_source(PatternSource::new(metadata, Pattern::Ramp)));
        Server::bind(&Endpoint::tcp("127.0.0.1", 0), router)
            .unwrap()
            .spawn()
            .unwrap()
    }

    fn raw_client(endpoint: &Endpoint) -> (MessageReader<Stream>, MessageWriter<Stream>) {
        let stream = connect(endpoint).unwrap();
        stream.set_read_timeout(Some(Duration::from_secs(5))).unwrap();
        (MessageReader::new(stream.try_clone().unwrap()), MessageWriter::new(stream))
    }

    fn wait_for_sessions(handle: &ServerHandle, count: usize) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while handle.session_count() != count {
            assert!(Instant::now() < deadline, "session count never reached {count}");
            thread::sleep(Duration::from_millis(5));
        }
    }

    #[test]
    fn accept_failures_back_off_up_to_a_cap() {
        let mut backoff = AcceptBackoff::default();
        let delays: Vec<Duration> = (0..12).map(|_| backoff.failed()).collect();
        assert_eq!(delays[0], ACCEPT_BACKOFF_MIN);
        assert!(delays.windows(2).all(|pair| pair[0] <= pair[1]));
        assert_eq!(*delays.last().unwrap(), ACCEPT_BACKOFF_MAX);

        for _ in 0..100 {
            backoff.failed();
        }
        assert_eq!(backoff.failed(), ACCEPT_BACKOFF_MAX);
        backoff.reset();
        assert_eq!(backoff.failed(), ACCEPT_BACKOFF_MIN);
    }

    #[test]
    fn unknown_request_gets_protocol_error_then_close() {
        let handle = start();
        let (mut reader, mut writer) = raw_client(handle.local_endpoint());

        writer.send_json(br#"{"request":"teleport"}"#).unwrap();
        let reply = reader.read_message().unwrap();
        let err = Reply::from_message(reply).unwrap_err();
        assert!(matches!(err, framewire_source::FrameError::Faulted(msg) if msg.contains("teleport")));

        assert!(matches!(
            reader.read_message(),
            Err(framewire_codec::CodecError::ConnectionClosed)
        ));
        handle.shutdown();
    }

    #[test]
    fn handler_error_keeps_session_open() {
        let handle = start();
        let (mut reader, mut writer) = raw_client(handle.local_endpoint());

        writer.write_message(&Request::execute("zoom").to_message().unwrap()).unwrap();
        let err = Reply::from_message(reader.read_message().unwrap()).unwrap_err();
        assert_eq!(err, framewire_source::FrameError::UnsupportedAction("zoom".into()));

        writer.write_message(&Request::frame().to_message().unwrap()).unwrap();
        match Reply::from_message(reader.read_message().unwrap()).unwrap() {
            Reply::Binary(frame) => assert_eq!(frame.len(), 64),
            other => panic!("unexpected reply {other:?}"),
        }
        handle.shutdown();
    }

    #[test]
    fn sessions_are_independent() {
        let handle = start();
        let (mut bad_reader, mut bad_writer) = raw_client(handle.local_endpoint());
        let (mut reader, mut writer) = raw_client(handle.local_endpoint());
        wait_for_sessions(&handle, 2);

        bad_writer.send_binary(&[0xde, 0xad]).unwrap();
        let _ = bad_reader.read_message();

        writer.write_message(&Request::metadata().to_message().unwrap()).unwrap();
        assert!(Reply::from_message(reader.read_message().unwrap()).is_ok());
        wait_for_sessions(&handle, 1);
        handle.shutdown();
    }

    #[test]
    fn shutdown_closes_live_sessions() {
        let handle = start();
        let (mut reader, _writer) = raw_client(handle.local_endpoint());
        wait_for_sessions(&handle, 1);

        let started = Instant::now();
        handle.shutdown();
        assert!(started.elapsed() < Duration::from_secs(5));
        assert!(reader.read_message().is_err());
    }
}
