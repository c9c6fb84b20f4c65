use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ParseNameError;

/// Color space of an image.
///
/// Wire names follow the camel/upper-case spelling used by producers
/// (`"RGB"`, `"bayerRG"`, `"NV12"`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ColorSpace {
    #[default]
    #[serde(rename = "unknown")]
    Unknown,
    /// Single channel (gray).
    #[serde(rename = "grayscale")]
    Grayscale,
    /// Bayer RGGB.
    #[serde(rename = "bayerRG")]
    BayerRg,
    /// Bayer GRBG.
    #[serde(rename = "bayerGR")]
    BayerGr,
    /// Bayer BGGR.
    #[serde(rename = "bayerBG")]
    BayerBg,
    /// Bayer GBRG.
    #[serde(rename = "bayerGB")]
    BayerGb,
    #[serde(rename = "RGB")]
    Rgb,
    #[serde(rename = "RGBA")]
    Rgba,
    #[serde(rename = "BGR")]
    Bgr,
    #[serde(rename = "BGRA")]
    Bgra,
    /// 5 bits red, 6 bits green, 5 bits blue.
    #[serde(rename = "RGB565")]
    Rgb565,
    #[serde(rename = "HSV")]
    Hsv,
    /// YUV 4:2:0.
    #[serde(rename = "YUV420")]
    Yuv420,
    /// YUV 4:2:0 semi-planar, Y plane then interleaved UV.
    #[serde(rename = "NV12")]
    Nv12,
    /// YUV 4:2:0 semi-planar, Y plane then interleaved VU.
    #[serde(rename = "NV21")]
    Nv21,
    /// YUV 4:2:2.
    #[serde(rename = "YUV422")]
    Yuv422,
}

impl ColorSpace {
    /// Every color space, in declaration order.
    pub const ALL: [ColorSpace; 16] = [
        ColorSpace::Unknown,
        ColorSpace::Grayscale,
        ColorSpace::BayerRg,
        ColorSpace::BayerGr,
        ColorSpace::BayerBg,
        ColorSpace::BayerGb,
        ColorSpace::Rgb,
        ColorSpace::Rgba,
        ColorSpace::Bgr,
        ColorSpace::Bgra,
        ColorSpace::Rgb565,
        ColorSpace::Hsv,
        ColorSpace::Yuv420,
        ColorSpace::Nv12,
        ColorSpace::Nv21,
        ColorSpace::Yuv422,
    ];

    /// Number of channels per pixel. `Unknown` has none.
    pub const fn channel_count(self) -> usize {
        match self {
            ColorSpace::Grayscale
            | ColorSpace::BayerRg
            | ColorSpace::BayerGr
            | ColorSpace::BayerBg
            | ColorSpace::BayerGb => 1,
            ColorSpace::Nv12 | ColorSpace::Nv21 => 2,
            ColorSpace::Rgb
            | ColorSpace::Bgr
            | ColorSpace::Hsv
            | ColorSpace::Rgb565
            | ColorSpace::Yuv420
            | ColorSpace::Yuv422 => 3,
            ColorSpace::Rgba | ColorSpace::Bgra => 4,
            ColorSpace::Unknown => 0,
        }
    }

    /// Wire name of this color space.
    pub const fn as_str(self) -> &'static str {
        match self {
            ColorSpace::Unknown => "unknown",
            ColorSpace::Grayscale => "grayscale",
            ColorSpace::BayerRg => "bayerRG",
            ColorSpace::BayerGr => "bayerGR",
            ColorSpace::BayerBg => "bayerBG",
            ColorSpace::BayerGb => "bayerGB",
            ColorSpace::Rgb => "RGB",
            ColorSpace::Rgba => "RGBA",
            ColorSpace::Bgr => "BGR",
            ColorSpace::Bgra => "BGRA",
            ColorSpace::Rgb565 => "RGB565",
            ColorSpace::Hsv => "HSV",
            ColorSpace::Yuv420 => "YUV420",
            ColorSpace::Nv12 => "NV12",
            ColorSpace::Nv21 => "NV21",
            ColorSpace::Yuv422 => "YUV422",
        }
    }
}

impl fmt::Display for ColorSpace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ColorSpace {
    type Err = ParseNameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ColorSpace::ALL
            .into_iter()
            .find(|space| space.as_str() == s)
            .ok_or_else(|| ParseNameError::new("color space", s))
    }
}
