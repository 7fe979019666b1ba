//! Photoshop image resource blocks (`8bim` profile).
//!
//! Block layout: `8BIM`, resource id (u16), Pascal name padded to an even
//! length, data size (u32) and data padded to an even length. All integers
//! are big-endian.

use std::sync::Arc;

use crate::profile::{ImageProfile, IptcProfile};

const SIGNATURE: &[u8; 4] = b"8BIM";
const IPTC_RESOURCE_ID: u16 = 0x0404;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EightBimValue {
    pub id: u16,
    pub name: String,
    pub data: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct EightBimProfile {
    data: Arc<[u8]>,
    values: Vec<EightBimValue>,
}

impl EightBimProfile {
    /// Parse resource blocks; parsing stops at the first malformed block.
    pub fn new(data: impl Into<Arc<[u8]>>) -> Self {
        let data: Arc<[u8]> = data.into();
        let values = parse(&data);
        Self { data, values }
    }

    pub fn from_profile(profile: &ImageProfile) -> Self {
        Self::new(profile.data())
    }

    pub fn values(&self) -> &[EightBimValue] {
        &self.values
    }

    pub fn value(&self, id: u16) -> Option<&EightBimValue> {
        self.values.iter().find(|v| v.id == id)
    }

    /// IPTC data embedded as resource 0x0404.
    pub fn iptc(&self) -> Option<IptcProfile> {
        self.value(IPTC_RESOURCE_ID)
            .map(|v| IptcProfile::new(v.data.as_slice()))
    }

    pub fn to_byte_array(&self) -> Vec<u8> {
        self.data.to_vec()
    }
}

fn parse(mut data: &[u8]) -> Vec<EightBimValue> {
    let mut values = Vec::new();
    while let Some((value, rest)) = parse_block(data) {
        values.push(value);
        data = rest;
    }
    values
}

fn parse_block(data: &[u8]) -> Option<(EightBimValue, &[u8])> {
    let rest = data.strip_prefix(SIGNATURE)?;
    let id = u16::from_be_bytes(rest.get(..2)?.try_into().ok()?);
    let rest = &rest[2..];

    let name_len = usize::from(*rest.first()?);
    let name = rest.get(1..1 + name_len)?;
    // length byte plus name, padded to even
    let name_span = (1 + name_len + 1) & !1;
    let rest = rest.get(name_span..)?;

    let size = u32::from_be_bytes(rest.get(..4)?.try_into().ok()?) as usize;
    let rest = &rest[4..];
    let value = rest.get(..size)?;
    let padded = size + (size & 1);
    let rest = rest.get(padded.min(rest.len())..)?;

    Some((
        EightBimValue {
            id,
            name: String::from_utf8_lossy(name).into_owned(),
            data: value.to_vec(),
        },
        rest,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn block(id: u16, name: &str, data: &[u8]) -> Vec<u8> {
        let mut out = SIGNATURE.to_vec();
        out.extend_from_slice(&id.to_be_bytes());
        out.push(name.len() as u8);
        out.extend_from_slice(name.as_bytes());
        if (1 + name.len()) % 2 == 1 {
            out.push(0);
        }
        out.extend_from_slice(&(data.len() as u32).to_be_bytes());
        out.extend_from_slice(data);
        if data.len() % 2 == 1 {
            out.push(0);
        }
        out
    }

    #[test]
    fn test_blocks_and_iptc() {
        let iptc = [0x1C, 0x02, 0x05, 0x00, 0x03, b'a', b'b', b'c'];
        let mut data = block(0x03ED, "", &[0; 16]);
        data.extend(block(0x0404, "", &iptc));
        data.extend(block(0x0422, "x", &[1, 2, 3]));

        let profile = EightBimProfile::new(data.clone());
        let ids: Vec<_> = profile.values().iter().map(|v| v.id).collect();
        assert_eq!(ids, vec![0x03ED, 0x0404, 0x0422]);
        assert_eq!(profile.value(0x0422).unwrap().name, "x");
        assert_eq!(profile.value(0x0422).unwrap().data, vec![1, 2, 3]);

        let iptc_profile = profile.iptc().unwrap();
        assert_eq!(iptc_profile.to_byte_array(), iptc.to_vec());
        assert_eq!(profile.to_byte_array(), data);
    }

    #[test]
    fn test_odd_size_without_final_padding() {
        let mut data = block(0x0404, "", &[0x1C]);
        data.pop();
        let profile = EightBimProfile::new(data);
        assert_eq!(profile.values().len(), 1);
    }

    #[test]
    fn test_stops_at_garbage() {
        let mut data = block(0x0404, "", &[]);
        data.extend_from_slice(b"junk");
        let profile = EightBimProfile::new(data);
        assert_eq!(profile.values().len(), 1);
        assert!(profile.value(0x0001).is_none());
    }
}
