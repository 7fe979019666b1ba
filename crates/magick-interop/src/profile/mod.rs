//! Metadata profiles attached to images.
//!
//! A profile is read out of native memory once and never changed in place;
//! edits produce a new byte buffer that replaces the profile wholesale.

use std::sync::Arc;

pub mod eight_bim;
pub mod iptc;

pub use eight_bim::{EightBimProfile, EightBimValue};
pub use iptc::{IptcProfile, IptcTag, IptcValue};

/// Named, immutable profile bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageProfile {
    name: String,
    data: Arc<[u8]>,
}

impl ImageProfile {
    /// Profile names are case-insensitive and stored lowercase.
    pub fn new(name: &str, data: impl Into<Arc<[u8]>>) -> Self {
        Self {
            name: name.to_ascii_lowercase(),
            data: data.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn to_byte_array(&self) -> Vec<u8> {
        self.data.to_vec()
    }
}
