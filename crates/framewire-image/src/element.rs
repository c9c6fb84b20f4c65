use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ParseNameError;

/// Scalar type of a single channel value.
///
/// Older producers spell the float types `binary32` / `binary64`; both are
/// accepted when parsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ElementType {
    #[default]
    Unknown,
    Boolean,
    Uint8,
    Uint16,
    #[serde(alias = "binary32")]
    Float32,
    #[serde(alias = "binary64")]
    Float64,
}

impl ElementType {
    pub const ALL: [ElementType; 6] = [
        ElementType::Unknown,
        ElementType::Boolean,
        ElementType::Uint8,
        ElementType::Uint16,
        ElementType::Float32,
        ElementType::Float64,
    ];

    /// Size of one element in bytes. `Unknown` occupies nothing.
    pub const fn size(self) -> usize {
        match self {
            ElementType::Boolean | ElementType::Uint8 => 1,
            ElementType::Uint16 => 2,
            ElementType::Float32 => 4,
            ElementType::Float64 => 8,
            ElementType::Unknown => 0,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            ElementType::Unknown => "unknown",
            ElementType::Boolean => "boolean",
            ElementType::Uint8 => "uint8",
            ElementType::Uint16 => "uint16",
            ElementType::Float32 => "float32",
            ElementType::Float64 => "float64",
        }
    }
}

impl fmt::Display for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ElementType {
    type Err = ParseNameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "binary32" => return Ok(ElementType::Float32),
            "binary64" => return Ok(ElementType::Float64),
            _ => {}
        }
        ElementType::ALL
            .into_iter()
            .find(|ty| ty.as_str() == s)
            .ok_or_else(|| ParseNameError::new("element type", s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn element_sizes() {
        assert_eq!(ElementType::Boolean.size(), 1);
        assert_eq!(ElementType::Uint8.size(), 1);
        assert_eq!(ElementType::Uint16.size(), 2);
        assert_eq!(ElementType::Float32.size(), 4);
        assert_eq!(ElementType::Float64.size(), 8);
        assert_eq!(ElementType::Unknown.size(), 0);
    }

    #[test]
    fn legacy_float_names_are_accepted() {
        assert_eq!("binary32".parse::<ElementType>().unwrap(), ElementType::Float32);
        let parsed: ElementType = serde_json::from_str("\"binary64\"").unwrap();
        assert_eq!(parsed, ElementType::Float64);
        assert_eq!(
            serde_json::to_string(&ElementType::Float64).unwrap(),
            "\"float64\""
        );
    }
}
