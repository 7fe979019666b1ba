//! IPTC-IIM profile as tag/value pairs.
//!
//! Datasets are `0x1C`, record, dataset number, a 16-bit big-endian length
//! (or, with the top bit set, the number of bytes holding the length) and
//! the value. Tags address record 2 (application record); datasets of other
//! records are kept untouched.

use std::sync::Arc;

use crate::profile::ImageProfile;

const MARKER: u8 = 0x1C;
const APPLICATION_RECORD: u8 = 2;
const EXTENDED_LENGTH: u16 = 0x8000;

/// Dataset number in the application record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct IptcTag(pub u8);

impl IptcTag {
    pub const RECORD_VERSION: Self = Self(0);
    pub const OBJECT_NAME: Self = Self(5);
    pub const URGENCY: Self = Self(10);
    pub const CATEGORY: Self = Self(15);
    pub const SUPPLEMENTAL_CATEGORY: Self = Self(20);
    pub const KEYWORD: Self = Self(25);
    pub const SPECIAL_INSTRUCTIONS: Self = Self(40);
    pub const DATE_CREATED: Self = Self(55);
    pub const TIME_CREATED: Self = Self(60);
    pub const BYLINE: Self = Self(80);
    pub const BYLINE_TITLE: Self = Self(85);
    pub const CITY: Self = Self(90);
    pub const PROVINCE_STATE: Self = Self(95);
    pub const COUNTRY_CODE: Self = Self(100);
    pub const COUNTRY: Self = Self(101);
    pub const ORIGINAL_TRANSMISSION_REFERENCE: Self = Self(103);
    pub const HEADLINE: Self = Self(105);
    pub const CREDIT: Self = Self(110);
    pub const SOURCE: Self = Self(115);
    pub const COPYRIGHT_NOTICE: Self = Self(116);
    pub const CAPTION: Self = Self(120);
    pub const CAPTION_WRITER: Self = Self(122);
}

/// One dataset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IptcValue {
    pub record: u8,
    pub tag: IptcTag,
    pub data: Vec<u8>,
}

impl IptcValue {
    /// Value as text, replacing invalid UTF-8.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.data).into_owned()
    }

    fn is(&self, tag: IptcTag) -> bool {
        self.record == APPLICATION_RECORD && self.tag == tag
    }
}

#[derive(Debug, Clone)]
pub struct IptcProfile {
    original: Arc<[u8]>,
    values: Vec<IptcValue>,
    // Bytes after the last well-formed dataset, kept when rebuilding.
    trailing: Vec<u8>,
    modified: bool,
}

impl IptcProfile {
    pub fn new(data: impl Into<Arc<[u8]>>) -> Self {
        let original: Arc<[u8]> = data.into();
        let (values, consumed) = parse(&original);
        Self {
            trailing: original[consumed..].to_vec(),
            original,
            values,
            modified: false,
        }
    }

    pub fn from_profile(profile: &ImageProfile) -> Self {
        Self::new(profile.data())
    }

    pub fn entries(&self) -> &[IptcValue] {
        &self.values
    }

    /// First value of `tag`.
    pub fn value(&self, tag: IptcTag) -> Option<String> {
        self.values.iter().find(|v| v.is(tag)).map(IptcValue::text)
    }

    /// Every value of a repeatable tag, in profile order.
    pub fn values(&self, tag: IptcTag) -> Vec<String> {
        self.values
            .iter()
            .filter(|v| v.is(tag))
            .map(IptcValue::text)
            .collect()
    }

    /// Replace the first value of `tag`, or append one.
    pub fn set_value(&mut self, tag: IptcTag, value: &str) {
        let data = value.as_bytes().to_vec();
        match self.values.iter_mut().find(|v| v.is(tag)) {
            Some(existing) => existing.data = data,
            None => self.values.push(IptcValue {
                record: APPLICATION_RECORD,
                tag,
                data,
            }),
        }
        self.modified = true;
    }

    /// Append another value for a repeatable tag such as keywords.
    pub fn add_value(&mut self, tag: IptcTag, value: &str) {
        self.values.push(IptcValue {
            record: APPLICATION_RECORD,
            tag,
            data: value.as_bytes().to_vec(),
        });
        self.modified = true;
    }

    /// Remove every value of `tag`.
    pub fn remove_value(&mut self, tag: IptcTag) -> bool {
        let before = self.values.len();
        self.values.retain(|v| !v.is(tag));
        let removed = self.values.len() != before;
        self.modified |= removed;
        removed
    }

    /// Profile bytes: the original buffer when nothing was changed.
    pub fn to_byte_array(&self) -> Vec<u8> {
        if !self.modified {
            return self.original.to_vec();
        }
        let mut out = Vec::with_capacity(self.original.len());
        for value in &self.values {
            write_dataset(&mut out, value);
        }
        out.extend_from_slice(&self.trailing);
        out
    }

    pub fn to_profile(&self) -> ImageProfile {
        ImageProfile::new("iptc", self.to_byte_array())
    }
}

/// Parse datasets until the data ends or stops being well formed. Returns
/// the datasets and the number of bytes they span.
fn parse(data: &[u8]) -> (Vec<IptcValue>, usize) {
    let mut values = Vec::new();
    let mut pos = 0;
    while let Some((value, next)) = parse_dataset(data, pos) {
        values.push(value);
        pos = next;
    }
    (values, pos)
}

fn parse_dataset(data: &[u8], pos: usize) -> Option<(IptcValue, usize)> {
    let header = data.get(pos..pos + 5)?;
    if header[0] != MARKER {
        return None;
    }
    let length_field = u16::from_be_bytes([header[3], header[4]]);
    let mut start = pos + 5;
    let length = if length_field & EXTENDED_LENGTH != 0 {
        let count = usize::from(length_field & !EXTENDED_LENGTH);
        if count == 0 || count > 8 {
            return None;
        }
        let bytes = data.get(start..start + count)?;
        start += count;
        bytes
            .iter()
            .try_fold(0usize, |acc, b| acc.checked_mul(256).map(|v| v + usize::from(*b)))?
    } else {
        usize::from(length_field)
    };
    let end = start.checked_add(length)?;
    let value = data.get(start..end)?;
    Some((
        IptcValue {
            record: header[1],
            tag: IptcTag(header[2]),
            data: value.to_vec(),
        },
        end,
    ))
}

fn write_dataset(out: &mut Vec<u8>, value: &IptcValue) {
    out.extend_from_slice(&[MARKER, value.record, value.tag.0]);
    let len = value.data.len();
    if len < usize::from(EXTENDED_LENGTH) {
        out.extend_from_slice(&(len as u16).to_be_bytes());
    } else {
        out.extend_from_slice(&(EXTENDED_LENGTH | 4).to_be_bytes());
        out.extend_from_slice(&(len as u32).to_be_bytes());
    }
    out.extend_from_slice(&value.data);
}
