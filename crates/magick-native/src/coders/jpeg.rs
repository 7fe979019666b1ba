//! JPEG structure reader.
//!
//! Walks the marker segments to recover dimensions and APPn profiles and
//! reports stream corruption the way libjpeg words it. The entropy-coded
//! scan data is skipped, not decoded, so the resulting image has no pixel
//! cache.

use magick_ffi_common::abi::severity;

use crate::exception::ExceptionInfo;
use crate::image::Image;
use crate::settings::Settings;

const EXIF_HEADER: &[u8] = b"Exif\0\0";
const XMP_HEADER: &[u8] = b"http://ns.adobe.com/xap/1.0/\0";
const ICC_HEADER: &[u8] = b"ICC_PROFILE\0";
const PHOTOSHOP_HEADER: &[u8] = b"Photoshop 3.0\0";
const BIM_MARKER: &[u8] = b"8BIM";
const IPTC_RESOURCE_ID: u16 = 0x0404;

struct Frame {
    width: usize,
    height: usize,
    precision: u8,
    components: u8,
}

fn is_sof(marker: u8) -> bool {
    matches!(marker, 0xC0..=0xC3 | 0xC5..=0xC7 | 0xC9..=0xCB | 0xCD..=0xCF)
}

pub(super) fn decode(data: &[u8], settings: &Settings, exception: &mut ExceptionInfo) -> Vec<Image> {
    if data.len() < 2 || data[0] != 0xFF || data[1] != 0xD8 {
        let first = data.first().copied().unwrap_or(0);
        let second = data.get(1).copied().unwrap_or(0);
        exception.throw(
            severity::CORRUPT_IMAGE_ERROR,
            format!("Not a JPEG file: starts with 0x{first:02x} 0x{second:02x}"),
        );
        return Vec::new();
    }

    let mut reader = Reader {
        data,
        pos: 2,
        frame: None,
        profiles: Vec::new(),
        icc_chunks: Vec::new(),
    };
    let completed = reader.walk(exception);

    let Some(frame) = reader.frame.take() else {
        if completed {
            exception.throw(
                severity::CORRUPT_IMAGE_ERROR,
                "JPEG datastream contains no image",
            );
        }
        return Vec::new();
    };

    let mut image = Image::header(frame.width, frame.height, u32::from(frame.precision), "JPEG");
    for (name, profile) in reader.profiles.drain(..) {
        image.set_profile(&name, profile);
    }
    if !reader.icc_chunks.is_empty() {
        reader.icc_chunks.sort_by_key(|(seq, _)| *seq);
        let icc: Vec<u8> = reader
            .icc_chunks
            .drain(..)
            .flat_map(|(_, chunk)| chunk)
            .collect();
        image.set_profile("icc", icc);
    }
    image
        .attributes
        .insert("jpeg:components".to_string(), frame.components.to_string());
    if let Some(comment) = settings.option("jpeg:comment") {
        image
            .attributes
            .insert("comment".to_string(), comment.to_string());
    }
    vec![image]
}

struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
    frame: Option<Frame>,
    profiles: Vec<(String, Vec<u8>)>,
    icc_chunks: Vec<(u8, Vec<u8>)>,
}

impl<'a> Reader<'a> {
    /// Walk markers until EOI. Returns false when an error stopped the walk.
    fn walk(&mut self, exception: &mut ExceptionInfo) -> bool {
        loop {
            let start = self.pos;
            while self.pos < self.data.len() && self.data[self.pos] != 0xFF {
                self.pos += 1;
            }
            let extraneous = self.pos - start;
            while self.pos < self.data.len() && self.data[self.pos] == 0xFF {
                self.pos += 1;
            }
            if self.pos >= self.data.len() {
                exception.throw(severity::CORRUPT_IMAGE_WARNING, "Premature end of JPEG file");
                return true;
            }
            let marker = self.data[self.pos];
            self.pos += 1;
            if extraneous > 0 {
                exception.throw(
                    severity::CORRUPT_IMAGE_WARNING,
                    format!(
                        "Corrupt JPEG data: {extraneous} extraneous bytes before marker 0x{marker:02x}"
                    ),
                );
            }

            match marker {
                0xD9 => return true,
                0x01 | 0xD0..=0xD7 => continue,
                _ => {}
            }

            let Some(segment) = self.segment() else {
                exception.throw(severity::CORRUPT_IMAGE_ERROR, "Premature end of JPEG file");
                return false;
            };

            match marker {
                0xDA => {
                    if !self.start_of_scan(segment) {
                        exception.throw(
                            severity::CORRUPT_IMAGE_ERROR,
                            "Invalid SOS parameters for sequential JPEG",
                        );
                        return false;
                    }
                    self.skip_entropy_data();
                }
                m if is_sof(m) => {
                    if !self.start_of_frame(segment) {
                        exception.throw(severity::CORRUPT_IMAGE_ERROR, "Improper image header");
                        return false;
                    }
                }
                0xE1 => self.app1(segment),
                0xE2 => self.app2(segment),
                0xED => self.app13(segment),
                _ => {}
            }
        }
    }

    /// Payload of a length-prefixed segment; advances past it.
    fn segment(&mut self) -> Option<&'a [u8]> {
        let data = self.data;
        let length = usize::from(u16::from_be_bytes([
            *data.get(self.pos)?,
            *data.get(self.pos + 1)?,
        ]));
        if length < 2 {
            return None;
        }
        let payload = data.get(self.pos + 2..self.pos + length)?;
        self.pos += length;
        Some(payload)
    }

    fn start_of_frame(&mut self, segment: &[u8]) -> bool {
        if segment.len() < 6 {
            return false;
        }
        let precision = segment[0];
        let height = usize::from(u16::from_be_bytes([segment[1], segment[2]]));
        let width = usize::from(u16::from_be_bytes([segment[3], segment[4]]));
        let components = segment[5];
        if width == 0 || height == 0 || components == 0 {
            return false;
        }
        self.frame = Some(Frame {
            width,
            height,
            precision,
            components,
        });
        true
    }

    fn start_of_scan(&self, segment: &[u8]) -> bool {
        let Some(frame) = self.frame.as_ref() else {
            return false;
        };
        let Some(&count) = segment.first() else {
            return false;
        };
        count != 0 && count <= frame.components && segment.len() >= 1 + 2 * usize::from(count) + 3
    }

    /// Advance to the next marker that is not a stuffed byte or restart marker.
    fn skip_entropy_data(&mut self) {
        while self.pos + 1 < self.data.len() {
            if self.data[self.pos] == 0xFF {
                let next = self.data[self.pos + 1];
                if next != 0x00 && !(0xD0..=0xD7).contains(&next) && next != 0xFF {
                    return;
                }
            }
            self.pos += 1;
        }
        self.pos = self.data.len();
    }

    fn app1(&mut self, segment: &[u8]) {
        if let Some(exif) = segment.strip_prefix(EXIF_HEADER) {
            self.profiles.push(("exif".to_string(), exif.to_vec()));
        } else if let Some(xmp) = segment.strip_prefix(XMP_HEADER) {
            self.profiles.push(("xmp".to_string(), xmp.to_vec()));
        }
    }

    fn app2(&mut self, segment: &[u8]) {
        if let Some(rest) = segment.strip_prefix(ICC_HEADER) {
            if rest.len() >= 2 {
                self.icc_chunks.push((rest[0], rest[2..].to_vec()));
            }
        }
    }

    fn app13(&mut self, segment: &[u8]) {
        let Some(resources) = segment.strip_prefix(PHOTOSHOP_HEADER) else {
            return;
        };
        self.profiles.push(("8bim".to_string(), resources.to_vec()));
        if let Some(iptc) = find_iptc_resource(resources) {
            self.profiles.push(("iptc".to_string(), iptc.to_vec()));
        }
    }
}

/// Find resource 0x0404 inside Photoshop image resource blocks.
///
/// Block layout: `8BIM`, id (u16), Pascal name padded to even length,
/// size (u32), data padded to even length.
pub(crate) fn find_iptc_resource(mut data: &[u8]) -> Option<&[u8]> {
    while data.len() >= 12 && data.starts_with(BIM_MARKER) {
        let id = u16::from_be_bytes([data[4], data[5]]);
        let name_len = usize::from(data[6]);
        let name_total = (1 + name_len + 1) & !1;
        let size_at = 6 + name_total;
        let size_bytes = data.get(size_at..size_at + 4)?;
        let size = u32::from_be_bytes([size_bytes[0], size_bytes[1], size_bytes[2], size_bytes[3]])
            as usize;
        let body_at = size_at + 4;
        let body = data.get(body_at..body_at + size)?;
        if id == IPTC_RESOURCE_ID {
            return Some(body);
        }
        let padded = (size + 1) & !1;
        data = data.get(body_at + padded..)?;
    }
    None
}
