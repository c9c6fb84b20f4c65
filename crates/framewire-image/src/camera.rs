use std::fmt;

use serde::{Deserialize, Serialize};

/// Identity of a camera and how to reach it.
///
/// `connection` is opaque here; a transport-backed source reads it as
/// `host:port` (or `unix:<path>`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CameraInfo {
    pub id: String,
    pub display_name: String,
    pub source_type: String,
    pub connection: String,
}

impl CameraInfo {
    pub fn new(
        id: impl Into<String>,
        display_name: impl Into<String>,
        source_type: impl Into<String>,
        connection: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            source_type: source_type.into(),
            connection: connection.into(),
        }
    }
}

impl fmt::Display for CameraInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({}, {}) @ {}",
            self.display_name, self.id, self.source_type, self.connection
        )
    }
}
