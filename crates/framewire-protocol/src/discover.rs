use framewire_image::CameraInfo;
use framewire_source::Discoverer;

use crate::config::ClientConfig;

/// Source type reported for transport-backed cameras.
pub const SOURCE_TYPE: &str = "framewire";

/// Reports the single camera reachable through a [`ClientConfig`].
///
/// Nothing is contacted; the connection string is handed to whoever opens
/// the camera later.
#[derive(Debug, Clone, Default)]
pub struct RemoteDiscoverer {
    config: ClientConfig,
}

impl RemoteDiscoverer {
    pub fn new(config: ClientConfig) -> Self {
        Self { config }
    }
}

impl Discoverer for RemoteDiscoverer {
    fn discover(&self) -> Vec<CameraInfo> {
        vec![CameraInfo::new(
            "0",
            "Input",
            SOURCE_TYPE,
            self.config.connection_string(),
        )]
    }
}
