//! Native exceptions as Rust values.
//!
//! The native library reports problems as a tree: one root entry plus its
//! related entries, in the order they were thrown. [`ExceptionBridge`]
//! turns that tree into a [`MagickException`] and releases the native
//! handle; [`WarningSink`] decides what happens to warnings that do not end
//! in an error.

use std::fmt;

use serde::Serialize;

pub mod bridge;
pub mod severity;
pub mod warnings;

pub use bridge::{ExceptionBridge, ExceptionSlot};
pub use severity::{ExceptionKind, Severity};
pub use warnings::{WarningHandler, WarningSink};

pub(crate) const UNKNOWN_ERROR: &str = "unknown error";

/// One node of a native exception tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MagickException {
    pub severity: Severity,
    pub message: String,
    pub description: Option<String>,
    /// Secondary causes, in the order the native library reported them.
    pub related: Vec<MagickException>,
}

impl MagickException {
    pub fn new(severity: impl Into<Severity>, message: impl Into<String>) -> Self {
        Self {
            severity: severity.into(),
            message: message.into(),
            description: None,
            related: Vec::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_related(mut self, related: impl IntoIterator<Item = MagickException>) -> Self {
        self.related.extend(related);
        self
    }

    /// Leaf substituted where a native entry could not be read.
    pub fn unknown() -> Self {
        Self::new(Severity::UNDEFINED, UNKNOWN_ERROR)
    }

    pub fn is_unknown(&self) -> bool {
        self.severity == Severity::UNDEFINED && self.message == UNKNOWN_ERROR
    }

    pub fn is_warning(&self) -> bool {
        self.severity.is_warning()
    }

    pub fn is_error(&self) -> bool {
        self.severity.is_error()
    }

    /// Nodes in the tree, root included.
    pub fn len(&self) -> usize {
        1 + self.related.iter().map(Self::len).sum::<usize>()
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    /// Depth of the tree; a leaf has depth 1.
    pub fn depth(&self) -> usize {
        1 + self.related.iter().map(Self::depth).max().unwrap_or(0)
    }

    /// The root followed by every related entry, depth first, each without
    /// related entries of its own.
    pub fn flatten(mut self) -> Vec<MagickException> {
        let related = std::mem::take(&mut self.related);
        let mut nodes = vec![self];
        for child in related {
            nodes.extend(child.flatten());
        }
        nodes
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

impl fmt::Display for MagickException {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.severity, self.message)?;
        if let Some(description) = &self.description {
            write!(f, " ({description})")?;
        }
        Ok(())
    }
}

impl std::error::Error for MagickException {}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sample() -> MagickException {
        MagickException::new(Severity::CORRUPT_IMAGE_ERROR, "broken")
            .with_description("photo.jpg")
            .with_related([
                MagickException::new(Severity::CORRUPT_IMAGE_WARNING, "first"),
                MagickException::new(Severity::CORRUPT_IMAGE_WARNING, "second")
                    .with_related([MagickException::unknown()]),
            ])
    }

    #[test]
    fn test_display() {
        assert_eq!(sample().to_string(), "CorruptImageError: broken (photo.jpg)");
    }

    #[test]
    fn test_shape() {
        let exception = sample();
        assert_eq!(exception.len(), 4);
        assert_eq!(exception.depth(), 3);
        assert!(exception.related[1].related[0].is_unknown());
        assert!(exception.is_error());
        assert!(exception.related[0].is_warning());
    }

    #[test]
    fn test_flatten_is_depth_first() {
        let nodes = sample().flatten();
        let messages: Vec<_> = nodes.iter().map(|e| e.message.as_str()).collect();
        assert_eq!(messages, vec!["broken", "first", "second", "unknown error"]);
        assert!(nodes.iter().all(|e| e.related.is_empty()));
        assert_eq!(nodes[0].description.as_deref(), Some("photo.jpg"));
    }

    #[test]
    fn test_json_keeps_order() {
        let json: serde_json::Value = serde_json::from_str(&sample().to_json().unwrap()).unwrap();
        assert_eq!(json["severity"], 425);
        assert_eq!(json["related"][0]["message"], "first");
        assert_eq!(json["related"][1]["message"], "second");
    }
}
