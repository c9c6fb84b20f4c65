use std::time::Duration;

use crate::error::{FrameError, Result};

pub const ENV_PIPELINE: &str = "FRAMEWIRE_PIPELINE";
pub const ENV_WIDTH: &str = "FRAMEWIRE_WIDTH";
pub const ENV_HEIGHT: &str = "FRAMEWIRE_HEIGHT";
pub const ENV_FRAME_TIMEOUT_MS: &str = "FRAMEWIRE_FRAME_TIMEOUT_MS";

/// Settings for a hand-off-backed source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    /// Producer-specific pipeline description.
    pub pipeline: String,
    pub width: u32,
    pub height: u32,
    /// How long `next_frame` waits for the producer.
    pub frame_timeout: Duration,
}

impl PipelineConfig {
    pub fn new(pipeline: impl Into<String>) -> Self {
        Self {
            pipeline: pipeline.into(),
            width: 640,
            height: 480,
            frame_timeout: Duration::from_millis(1000),
        }
    }

    /// Read the `FRAMEWIRE_PIPELINE` family of environment variables.
    ///
    /// The pipeline description is required; size and timeout fall back to
    /// 640x480 and one second.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with a custom variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let pipeline = lookup(ENV_PIPELINE)
            .filter(|value| !value.trim().is_empty())
            .ok_or_else(|| FrameError::InvalidParameter(format!("{ENV_PIPELINE} is not set")))?;

        let mut config = Self::new(pipeline);
        if let Some(width) = parse_var(&lookup, ENV_WIDTH)? {
            config.width = width;
        }
        if let Some(height) = parse_var(&lookup, ENV_HEIGHT)? {
            config.height = height;
        }
        if let Some(ms) = parse_var::<u64>(&lookup, ENV_FRAME_TIMEOUT_MS)? {
            config.frame_timeout = Duration::from_millis(ms);
        }
        if config.width == 0 || config.height == 0 {
            return Err(FrameError::InvalidParameter(format!(
                "frame size must be non-zero, got {}x{}",
                config.width, config.height
            )));
        }
        Ok(config)
    }
}

/// Parse an optional variable; a present but malformed value is an error.
pub fn parse_var<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
) -> Result<Option<T>> {
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| FrameError::InvalidParameter(format!("{key}={raw:?} is not valid"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn missing_pipeline_is_invalid_parameter() {
        let err = PipelineConfig::from_lookup(lookup(&[(ENV_WIDTH, "800")])).unwrap_err();
        assert!(matches!(err, FrameError::InvalidParameter(msg) if msg.contains(ENV_PIPELINE)));
    }

    #[test]
    fn defaults_apply() {
        let config = PipelineConfig::from_lookup(lookup(&[(ENV_PIPELINE, "ramp")])).unwrap();
        assert_eq!(config, PipelineConfig::new("ramp"));
        assert_eq!((config.width, config.height), (640, 480));
    }

    #[test]
    fn overrides_and_bad_values() {
        let config = PipelineConfig::from_lookup(lookup(&[
            (ENV_PIPELINE, "checker fps=15"),
            (ENV_WIDTH, "800"),
            (ENV_HEIGHT, "600"),
            (ENV_FRAME_TIMEOUT_MS, "250"),
        ]))
        .unwrap();
        assert_eq!((config.width, config.height), (800, 600));
        assert_eq!(config.frame_timeout, Duration::from_millis(250));

        let err = PipelineConfig::from_lookup(lookup(&[(ENV_PIPELINE, "ramp"), (ENV_WIDTH, "wide")]))
            .unwrap_err();
        assert!(matches!(err, FrameError::InvalidParameter(_)));
    }
}
