//! Exception accumulation inside the engine.
//!
//! Coders report problems into an [`ExceptionInfo`] while they work. When
//! the call returns, the accumulated entries become one [`ExceptionNode`]
//! tree: the first entry with the highest severity is the root and every
//! other entry becomes a related node, in the order it was thrown.

use magick_ffi_common::abi::severity;

/// One node of the tree handed to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExceptionNode {
    pub severity: u32,
    pub message: String,
    pub description: Option<String>,
    pub related: Vec<ExceptionNode>,
}

impl ExceptionNode {
    pub fn new(severity: u32, message: impl Into<String>) -> Self {
        Self {
            severity,
            message: message.into(),
            description: None,
            related: Vec::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Entries thrown during one call, in emission order.
#[derive(Debug, Default)]
pub struct ExceptionInfo {
    entries: Vec<ExceptionNode>,
}

impl ExceptionInfo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn throw(&mut self, severity: u32, message: impl Into<String>) {
        let node = ExceptionNode::new(severity, message);
        tracing::trace!(severity, message = %node.message, "native exception thrown");
        self.entries.push(node);
    }

    pub fn throw_with_description(
        &mut self,
        severity: u32,
        message: impl Into<String>,
        description: impl Into<String>,
    ) {
        self.entries
            .push(ExceptionNode::new(severity, message).with_description(description));
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Highest severity thrown so far, `UNDEFINED` when nothing was thrown.
    pub fn severity(&self) -> u32 {
        self.entries
            .iter()
            .map(|e| e.severity)
            .max()
            .unwrap_or(severity::UNDEFINED)
    }

    pub fn has_error(&self) -> bool {
        self.severity() >= severity::ERROR
    }

    /// Fold the entries into a tree, or `None` when nothing was thrown.
    pub fn into_tree(self) -> Option<ExceptionNode> {
        let worst = self.severity();
        let root_index = self.entries.iter().position(|e| e.severity == worst)?;

        let mut entries = self.entries;
        let mut root = entries.remove(root_index);
        root.related.extend(entries);
        Some(root)
    }
}
