use std::time::Duration;

use framewire_codec::{CodecConfig, DEFAULT_MAX_PAYLOAD};
use framewire_source::config::parse_var;
use framewire_source::Result;
use framewire_transport::Endpoint;

pub const ENV_SERVER_ADDRESS: &str = "FRAMEWIRE_SERVER_ADDRESS";
pub const ENV_SERVER_PORT: &str = "FRAMEWIRE_SERVER_PORT";
pub const ENV_READ_TIMEOUT_MS: &str = "FRAMEWIRE_READ_TIMEOUT_MS";
pub const ENV_WRITE_TIMEOUT_MS: &str = "FRAMEWIRE_WRITE_TIMEOUT_MS";

pub const DEFAULT_ADDRESS: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 51234;

const DEFAULT_CLIENT_TIMEOUT: Duration = Duration::from_secs(5);

/// Where a client connects and how long it waits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Host name or IP address; `unix:<path>` selects a Unix domain socket.
    pub address: String,
    pub port: u16,
    /// Deadline for each reply. Expiry surfaces as `FrameError::Timeout`.
    pub read_timeout: Option<Duration>,
    pub write_timeout: Option<Duration>,
    pub max_payload_size: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            address: DEFAULT_ADDRESS.to_string(),
            port: DEFAULT_PORT,
            read_timeout: Some(DEFAULT_CLIENT_TIMEOUT),
            write_timeout: Some(DEFAULT_CLIENT_TIMEOUT),
            max_payload_size: DEFAULT_MAX_PAYLOAD,
        }
    }
}

impl ClientConfig {
    /// Connect to `endpoint` with default timeouts.
    pub fn for_endpoint(endpoint: &Endpoint) -> Self {
        let (address, port) = split_endpoint(endpoint);
        Self {
            address,
            port,
            ..Self::default()
        }
    }

    /// Defaults overridden by `FRAMEWIRE_*` environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();
        if let Some(address) = lookup(ENV_SERVER_ADDRESS).filter(|a| !a.trim().is_empty()) {
            config.address = address.trim().to_string();
        }
        if let Some(port) = parse_var(&lookup, ENV_SERVER_PORT)? {
            config.port = port;
        }
        if let Some(ms) = parse_var::<u64>(&lookup, ENV_READ_TIMEOUT_MS)? {
            config.read_timeout = timeout_from_ms(ms);
        }
        if let Some(ms) = parse_var::<u64>(&lookup, ENV_WRITE_TIMEOUT_MS)? {
            config.write_timeout = timeout_from_ms(ms);
        }
        Ok(config)
    }

    pub fn endpoint(&self) -> Endpoint {
        join_endpoint(&self.address, self.port)
    }

    /// The `connection` string reported for this camera.
    pub fn connection_string(&self) -> String {
        self.endpoint().to_string()
    }

    pub fn codec_config(&self) -> CodecConfig {
        CodecConfig {
            max_payload_size: self.max_payload_size,
            read_timeout: self.read_timeout,
            write_timeout: self.write_timeout,
        }
    }
}

/// Where a server listens and how its sessions behave.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub address: String,
    pub port: u16,
    /// Close a session after this long without a request. `None` waits forever.
    pub idle_timeout: Option<Duration>,
    pub write_timeout: Option<Duration>,
    pub max_payload_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: DEFAULT_ADDRESS.to_string(),
            port: DEFAULT_PORT,
            idle_timeout: None,
            write_timeout: Some(DEFAULT_CLIENT_TIMEOUT),
            max_payload_size: DEFAULT_MAX_PAYLOAD,
        }
    }
}

impl ServerConfig {
    /// Defaults overridden by `FRAMEWIRE_*` environment variables.
    ///
    /// `FRAMEWIRE_READ_TIMEOUT_MS` becomes the session idle timeout.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let client = ClientConfig::from_lookup(&lookup)?;
        let mut config = Self {
            address: client.address,
            port: client.port,
            ..Self::default()
        };
        if lookup(ENV_READ_TIMEOUT_MS).is_some() {
            config.idle_timeout = client.read_timeout;
        }
        if lookup(ENV_WRITE_TIMEOUT_MS).is_some() {
            config.write_timeout = client.write_timeout;
        }
        Ok(config)
    }

    pub fn endpoint(&self) -> Endpoint {
        join_endpoint(&self.address, self.port)
    }

    pub fn codec_config(&self) -> CodecConfig {
        CodecConfig {
            max_payload_size: self.max_payload_size,
            read_timeout: self.idle_timeout,
            write_timeout: self.write_timeout,
        }
    }
}

/// Zero disables the timeout.
fn timeout_from_ms(ms: u64) -> Option<Duration> {
    (ms > 0).then(|| Duration::from_millis(ms))
}

fn join_endpoint(address: &str, port: u16) -> Endpoint {
    match address.strip_prefix("unix:") {
        Some(path) => Endpoint::unix(path),
        None => Endpoint::tcp(address, port),
    }
}

fn split_endpoint(endpoint: &Endpoint) -> (String, u16) {
    match endpoint {
        Endpoint::Tcp { host, port } => (host.clone(), *port),
        Endpoint::Unix(path) => (format!("unix:{}", path.display()), 0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use framewire_source::FrameError;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn absent_variables_use_defaults() {
        let config = ClientConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, ClientConfig::default());
        assert_eq!(config.endpoint(), Endpoint::tcp("127.0.0.1", 51234));
    }

    #[test]
    fn variables_override_defaults() {
        let config = ClientConfig::from_lookup(lookup(&[
            (ENV_SERVER_ADDRESS, "10.0.0.7"),
            (ENV_SERVER_PORT, "6000"),
            (ENV_READ_TIMEOUT_MS, "250"),
            (ENV_WRITE_TIMEOUT_MS, "0"),
        ]))
        .unwrap();
        assert_eq!(config.connection_string(), "10.0.0.7:6000");
        assert_eq!(config.read_timeout, Some(Duration::from_millis(250)));
        assert_eq!(config.write_timeout, None);
    }

    #[test]
    fn unparsable_port_is_invalid_parameter() {
        let err = ClientConfig::from_lookup(lookup(&[(ENV_SERVER_PORT, "http")])).unwrap_err();
        assert!(matches!(err, FrameError::InvalidParameter(msg) if msg.contains(ENV_SERVER_PORT)));
    }

    #[test]
    fn unix_address_selects_socket() {
        let config = ClientConfig::from_lookup(lookup(&[(ENV_SERVER_ADDRESS, "unix:/tmp/fw.sock")])).unwrap();
        assert_eq!(config.endpoint(), Endpoint::unix("/tmp/fw.sock"));
        let round = ClientConfig::for_endpoint(&config.endpoint());
        assert_eq!(round.endpoint(), config.endpoint());
    }

    #[test]
    fn server_idle_timeout_comes_from_read_timeout() {
        let config = ServerConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.idle_timeout, None);
        let config = ServerConfig::from_lookup(lookup(&[(ENV_READ_TIMEOUT_MS, "1500")])).unwrap();
        assert_eq!(config.idle_timeout, Some(Duration::from_millis(1500)));
    }
}
