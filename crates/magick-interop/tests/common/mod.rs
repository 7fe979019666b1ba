//! Shared fixtures for the integration tests.
//!
//! Image files are built in code so every byte the tests assert on is
//! visible here.

#![allow(dead_code)]

use magick_ffi_common::MemoryStatsC;
use magick_interop::native::memory_stats;
use magick_interop::MagickNative;

/// Binary PPM filled with one color.
pub fn ppm(width: usize, height: usize, rgb: [u8; 3]) -> Vec<u8> {
    let mut data = format!("P6\n{width} {height}\n255\n").into_bytes();
    for _ in 0..width * height {
        data.extend_from_slice(&rgb);
    }
    data
}

/// Length-prefixed JPEG segment.
pub fn segment(marker: u8, payload: &[u8]) -> Vec<u8> {
    let mut out = vec![0xFF, marker];
    out.extend_from_slice(&((payload.len() + 2) as u16).to_be_bytes());
    out.extend_from_slice(payload);
    out
}

fn sof(width: u16, height: u16) -> Vec<u8> {
    let mut payload = vec![8];
    payload.extend_from_slice(&height.to_be_bytes());
    payload.extend_from_slice(&width.to_be_bytes());
    payload.extend_from_slice(&[3, 1, 0x22, 0, 2, 0x11, 1, 3, 0x11, 1]);
    segment(0xC0, &payload)
}

fn sos() -> Vec<u8> {
    segment(0xDA, &[3, 1, 0x00, 2, 0x11, 3, 0x11, 0, 63, 0])
}

fn iptc_dataset(tag: u8, value: &[u8]) -> Vec<u8> {
    let mut out = vec![0x1C, 2, tag];
    out.extend_from_slice(&(value.len() as u16).to_be_bytes());
    out.extend_from_slice(value);
    out
}

/// IPTC block of exactly 273 bytes.
pub fn iptc_273() -> Vec<u8> {
    let mut data = iptc_dataset(0, &[0, 4]);
    data.extend(iptc_dataset(5, b"Harbour at dawn"));
    data.extend(iptc_dataset(25, b"harbour"));
    data.extend(iptc_dataset(25, b"boats"));
    data.extend(iptc_dataset(80, b"Jane Photographer"));
    data.extend(iptc_dataset(90, b"Rotterdam"));
    data.extend(iptc_dataset(101, b"Netherlands"));
    let caption_len = 273 - data.len() - 5;
    let caption: Vec<u8> = b"Fishing boats leaving the harbour. "
        .iter()
        .copied()
        .cycle()
        .take(caption_len)
        .collect();
    data.extend(iptc_dataset(120, &caption));
    assert_eq!(data.len(), 273);
    data
}

/// Photoshop resource block holding `iptc` as resource 0x0404.
pub fn eight_bim(iptc: &[u8]) -> Vec<u8> {
    let mut data = b"8BIM".to_vec();
    data.extend_from_slice(&0x0404u16.to_be_bytes());
    data.extend_from_slice(&[0, 0]);
    data.extend_from_slice(&(iptc.len() as u32).to_be_bytes());
    data.extend_from_slice(iptc);
    if iptc.len() % 2 == 1 {
        data.push(0);
    }
    data
}

/// 16x8 JPEG whose APP13 segment carries `iptc`.
pub fn jpeg_with_iptc(iptc: &[u8]) -> Vec<u8> {
    let mut app13 = b"Photoshop 3.0\0".to_vec();
    app13.extend(eight_bim(iptc));

    let mut data = vec![0xFF, 0xD8];
    data.extend(segment(0xED, &app13));
    data.extend(sof(16, 8));
    data.extend(sos());
    data.extend_from_slice(&[0x12, 0xFF, 0x00, 0x34, 0xFF, 0xD9]);
    data
}

/// Valid 16x8 JPEG that ends without EOI: one warning, no error.
pub fn jpeg_without_eoi() -> Vec<u8> {
    let mut data = vec![0xFF, 0xD8];
    data.extend(sof(16, 8));
    data.extend(sos());
    data.extend_from_slice(&[0x12, 0x34]);
    data
}

/// Valid 16x8 JPEG with stray bytes before the frame header and no EOI:
/// two warnings in one read, no error.
pub fn jpeg_with_two_warnings() -> Vec<u8> {
    let mut data = vec![0xFF, 0xD8, 0x00, 0x00];
    data.extend(sof(16, 8));
    data.extend(sos());
    data.extend_from_slice(&[0x12, 0x34]);
    data
}

/// Corrupt JPEG: two runs of stray bytes (two warnings) and a scan without
/// a frame header (error).
pub fn invalid_jpeg() -> Vec<u8> {
    let mut data = vec![0xFF, 0xD8, 0x00, 0x00, 0x00];
    data.extend(segment(0xDB, &[0; 65]));
    data.extend_from_slice(&[0x00, 0x00]);
    data.extend(sos());
    data
}

/// JPEG that decodes a frame header and then fails: the native side
/// returns the partial frame together with the error.
pub fn partial_jpeg() -> Vec<u8> {
    let mut data = vec![0xFF, 0xD8];
    data.extend(sof(4, 4));
    data.extend(segment(0xDA, &[0, 0, 63, 0]));
    data
}

/// Native allocation counters of the current thread.
pub struct Ledger {
    start: MemoryStatsC,
}

impl Ledger {
    pub fn start() -> Self {
        Self {
            start: current_stats(),
        }
    }

    /// Asserts every acquisition since `start` was released exactly once.
    pub fn assert_balanced(&self) {
        let now = current_stats();
        let acquired = now.acquired - self.start.acquired;
        let released = now.released - self.start.released;
        assert_eq!(acquired, released, "leaked native allocations");
        assert_eq!(
            now.invalid_releases, self.start.invalid_releases,
            "invalid native releases"
        );
    }

    pub fn acquired(&self) -> u64 {
        current_stats().acquired - self.start.acquired
    }
}

fn current_stats() -> MemoryStatsC {
    memory_stats(MagickNative::get().unwrap().api())
}
