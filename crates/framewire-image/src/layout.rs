use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ParseNameError;

/// How channels are arranged in memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataLayout {
    #[default]
    Unknown,
    /// One plane per channel.
    Planar,
    /// Channels of a pixel are adjacent.
    Interleaved,
    /// Luma plane followed by interleaved chroma.
    #[serde(alias = "semiPlanar")]
    Semiplanar,
}

impl DataLayout {
    pub const ALL: [DataLayout; 4] = [
        DataLayout::Unknown,
        DataLayout::Planar,
        DataLayout::Interleaved,
        DataLayout::Semiplanar,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            DataLayout::Unknown => "unknown",
            DataLayout::Planar => "planar",
            DataLayout::Interleaved => "interleaved",
            DataLayout::Semiplanar => "semiplanar",
        }
    }
}

impl fmt::Display for DataLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DataLayout {
    type Err = ParseNameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DataLayout::ALL
            .into_iter()
            .find(|layout| layout.as_str() == s)
            .ok_or_else(|| ParseNameError::new("layout", s))
    }
}
