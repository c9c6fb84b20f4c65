use framewire_image::CameraInfo;

/// Enumerates the cameras a plugin can offer.
pub trait Discoverer {
    fn discover(&self) -> Vec<CameraInfo>;
}

/// A discoverer that reports a fixed list.
#[derive(Debug, Clone, Default)]
pub struct StaticDiscoverer {
    cameras: Vec<CameraInfo>,
}

impl StaticDiscoverer {
    pub fn new(cameras: Vec<CameraInfo>) -> Self {
        Self { cameras }
    }
}

impl Discoverer for StaticDiscoverer {
    fn discover(&self) -> Vec<CameraInfo> {
        self.cameras.clone()
    }
}
