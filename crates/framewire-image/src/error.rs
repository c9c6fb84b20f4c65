/// A wire name did not match any known variant.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind} name: {name:?}")]
pub struct ParseNameError {
    /// Which enumeration was being parsed (e.g. "color space").
    pub kind: &'static str,
    /// The rejected input.
    pub name: String,
}

impl ParseNameError {
    pub(crate) fn new(kind: &'static str, name: &str) -> Self {
        Self {
            kind,
            name: name.to_string(),
        }
    }
}
