//! Read/write settings carried by a `RawSettings` handle.

use std::collections::BTreeMap;

use magick_ffi_common::ExtentC;

#[derive(Debug, Clone, Default)]
pub struct Settings {
    /// Explicit format, overriding magic-byte detection
    pub format: Option<String>,
    /// Canvas size for pseudo formats such as `xc:`
    pub extent: ExtentC,
    /// Read headers and metadata only
    pub ping: bool,
    /// Coder defines such as `pnm:comment`
    pub options: BTreeMap<String, String>,
}

impl Settings {
    pub fn option(&self, key: &str) -> Option<&str> {
        self.options.get(key).map(String::as_str)
    }

    /// Extent, falling back to 1x1 like the canvas coder does.
    pub fn canvas_extent(&self) -> (usize, usize) {
        let width = if self.extent.width == 0 { 1 } else { self.extent.width };
        let height = if self.extent.height == 0 { 1 } else { self.extent.height };
        (width, height)
    }

    pub fn format_upper(&self) -> Option<String> {
        self.format.as_deref().map(str::to_ascii_uppercase)
    }
}
