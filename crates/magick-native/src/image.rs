//! Images and image lists owned by the engine.

use std::collections::BTreeMap;
use std::path::Path;

use magick_ffi_common::abi::severity;

use crate::coders;
use crate::color::ColorInstance;
use crate::exception::ExceptionInfo;
use crate::quantum::{self, Quantum};
use crate::settings::Settings;

/// Largest pixel cache the engine allocates, in pixels.
pub const PIXEL_LIMIT: usize = 1 << 28;

/// `width * height` when it stays within [`PIXEL_LIMIT`].
pub fn pixel_count(width: usize, height: usize) -> Option<usize> {
    width
        .checked_mul(height)
        .filter(|&count| count <= PIXEL_LIMIT)
}

/// One frame.
///
/// Pixels are interleaved `RGB` or `RGBA` quanta, row-major. `pixels` is
/// `None` when the image was pinged or its coder cannot decode the raster.
#[derive(Debug, Clone, PartialEq)]
pub struct Image {
    pub width: usize,
    pub height: usize,
    pub depth: u32,
    pub has_alpha: bool,
    pub format: String,
    pub pixels: Option<Vec<Quantum>>,
    pub profiles: BTreeMap<String, Vec<u8>>,
    pub attributes: BTreeMap<String, String>,
}

impl Image {
    /// A header-only image without pixel cache.
    pub fn header(width: usize, height: usize, depth: u32, format: &str) -> Self {
        Self {
            width,
            height,
            depth,
            has_alpha: false,
            format: format.to_string(),
            pixels: None,
            profiles: BTreeMap::new(),
            attributes: BTreeMap::new(),
        }
    }

    /// A canvas of `color` without pixel cache, as produced by a ping.
    pub fn canvas(width: usize, height: usize, color: &ColorInstance) -> Self {
        Self {
            has_alpha: !color.is_opaque(),
            ..Self::header(width, height, crate::QUANTUM_DEPTH, "XC")
        }
    }

    /// A canvas filled with one color.
    ///
    /// `None` when `width * height` overflows or exceeds [`PIXEL_LIMIT`].
    pub fn filled(width: usize, height: usize, color: &ColorInstance) -> Option<Self> {
        let count = pixel_count(width, height)?;
        let mut image = Self::canvas(width, height, color);
        let pixel: &[Quantum] = if image.has_alpha {
            &[color.red, color.green, color.blue, color.alpha]
        } else {
            &[color.red, color.green, color.blue]
        };
        image.pixels = Some(pixel.repeat(count));
        Some(image)
    }

    pub fn channel_count(&self) -> usize {
        if self.has_alpha {
            4
        } else {
            3
        }
    }

    fn check_area(
        &self,
        x: isize,
        y: isize,
        width: usize,
        height: usize,
        exception: &mut ExceptionInfo,
    ) -> bool {
        let fits = x >= 0
            && y >= 0
            && (x as usize)
                .checked_add(width)
                .is_some_and(|right| right <= self.width)
            && (y as usize)
                .checked_add(height)
                .is_some_and(|bottom| bottom <= self.height);
        if !fits {
            exception.throw_with_description(
                severity::OPTION_ERROR,
                "geometry does not contain image",
                format!("{width}x{height}{x:+}{y:+}"),
            );
        }
        fits
    }

    /// Copy an area out of the pixel cache.
    ///
    /// Returns `None` without an exception when there is no pixel cache.
    pub fn get_area(
        &self,
        x: isize,
        y: isize,
        width: usize,
        height: usize,
        exception: &mut ExceptionInfo,
    ) -> Option<Vec<Quantum>> {
        let pixels = self.pixels.as_ref()?;
        if !self.check_area(x, y, width, height, exception) {
            return None;
        }
        let channels = self.channel_count();
        let mut area = Vec::with_capacity(width * height * channels);
        for row in y as usize..y as usize + height {
            let start = (row * self.width + x as usize) * channels;
            area.extend_from_slice(&pixels[start..start + width * channels]);
        }
        Some(area)
    }

    pub fn set_area(
        &mut self,
        x: isize,
        y: isize,
        width: usize,
        height: usize,
        values: &[Quantum],
        exception: &mut ExceptionInfo,
    ) -> bool {
        if self.pixels.is_none() {
            exception.throw(severity::CACHE_ERROR, "pixel cache is not open");
            return false;
        }
        if !self.check_area(x, y, width, height, exception) {
            return false;
        }
        let channels = self.channel_count();
        if values.len() != width * height * channels {
            exception.throw_with_description(
                severity::OPTION_ERROR,
                "invalid argument",
                format!(
                    "expected {} values, got {}",
                    width * height * channels,
                    values.len()
                ),
            );
            return false;
        }
        let image_width = self.width;
        let Some(pixels) = self.pixels.as_mut() else {
            return false;
        };
        for (i, row) in (y as usize..y as usize + height).enumerate() {
            let start = (row * image_width + x as usize) * channels;
            let source = &values[i * width * channels..(i + 1) * width * channels];
            pixels[start..start + width * channels].copy_from_slice(source);
        }
        true
    }

    pub fn pixel_color(
        &self,
        x: isize,
        y: isize,
        exception: &mut ExceptionInfo,
    ) -> Option<ColorInstance> {
        if self.pixels.is_none() {
            exception.throw(severity::CACHE_ERROR, "pixel cache is not open");
            return None;
        }
        let area = self.get_area(x, y, 1, 1, exception)?;
        Some(ColorInstance {
            red: area[0],
            green: area[1],
            blue: area[2],
            alpha: if self.has_alpha {
                area[3]
            } else {
                quantum::opaque()
            },
            ..ColorInstance::default()
        })
    }

    /// Store a profile; an empty profile removes it.
    pub fn set_profile(&mut self, name: &str, data: Vec<u8>) {
        let name = name.to_ascii_lowercase();
        if data.is_empty() {
            self.profiles.remove(&name);
        } else {
            self.profiles.insert(name, data);
        }
    }

    pub fn profile(&self, name: &str) -> Option<&[u8]> {
        self.profiles
            .get(&name.to_ascii_lowercase())
            .map(Vec::as_slice)
    }

    pub fn encode(&self, settings: &Settings, exception: &mut ExceptionInfo) -> Option<Vec<u8>> {
        coders::encode(std::slice::from_ref(self), settings, exception)
    }
}

/// Ordered frames; owns every image it contains.
#[derive(Debug, Default)]
pub struct ImageList {
    pub images: Vec<Box<Image>>,
}

impl ImageList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn read_blob(data: &[u8], settings: &Settings, exception: &mut ExceptionInfo) -> Self {
        Self {
            images: coders::decode(data, settings, exception)
                .into_iter()
                .map(Box::new)
                .collect(),
        }
    }

    pub fn read_file(path: &str, settings: &Settings, exception: &mut ExceptionInfo) -> Self {
        if let Some(images) = coders::decode_pseudo(path, settings, exception) {
            return Self {
                images: images.into_iter().map(Box::new).collect(),
            };
        }

        let mut settings = settings.clone();
        if settings.format.is_none() {
            settings.format = Path::new(path)
                .extension()
                .and_then(|e| e.to_str())
                .map(str::to_ascii_uppercase);
        }

        match std::fs::read(path) {
            Ok(data) => Self::read_blob(&data, &settings, exception),
            Err(e) => {
                exception.throw_with_description(
                    severity::BLOB_ERROR,
                    format!("unable to open image `{path}'"),
                    e.to_string(),
                );
                Self::new()
            }
        }
    }

    pub fn encode(&self, settings: &Settings, exception: &mut ExceptionInfo) -> Option<Vec<u8>> {
        let frames: Vec<Image> = self.images.iter().map(|i| (**i).clone()).collect();
        coders::encode(&frames, settings, exception)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn red() -> ColorInstance {
        ColorInstance::parse("red").unwrap()
    }

    #[test]
    fn test_pixel_limit() {
        assert_eq!(pixel_count(4, 3), Some(12));
        assert_eq!(pixel_count(PIXEL_LIMIT, 1), Some(PIXEL_LIMIT));
        assert_eq!(pixel_count(PIXEL_LIMIT, 2), None);
        assert_eq!(pixel_count(usize::MAX, 2), None);
        assert!(Image::filled(usize::MAX, usize::MAX, &red()).is_none());
    }

    #[test]
    fn test_filled_canvas_area() {
        let image = Image::filled(4, 3, &red()).unwrap();
        let mut exception = ExceptionInfo::new();
        let area = image.get_area(1, 1, 2, 2, &mut exception).unwrap();
        assert_eq!(area.len(), 2 * 2 * 3);
        assert!(exception.is_empty());
    }

    #[test]
    fn test_area_out_of_bounds_throws() {
        let image = Image::filled(4, 3, &red()).unwrap();
        let mut exception = ExceptionInfo::new();
        assert!(image.get_area(3, 0, 2, 1, &mut exception).is_none());
        assert_eq!(exception.severity(), severity::OPTION_ERROR);
    }

    #[test]
    fn test_header_image_has_no_data() {
        let image = Image::header(10, 10, 8, "JPEG");
        let mut exception = ExceptionInfo::new();
        assert!(image.get_area(0, 0, 1, 1, &mut exception).is_none());
        assert!(exception.is_empty());
    }

    #[test]
    fn test_set_area_then_read_back() {
        let mut image = Image::filled(2, 2, &red()).unwrap();
        let mut exception = ExceptionInfo::new();
        let black = quantum::from_f64(0.0);
        assert!(image.set_area(1, 1, 1, 1, &[black, black, black], &mut exception));
        let color = image.pixel_color(1, 1, &mut exception).unwrap();
        assert_eq!(color.red, black);
        assert_eq!(image.pixel_color(0, 0, &mut exception).unwrap(), red());
    }

    #[test]
    fn test_set_area_length_mismatch() {
        let mut image = Image::filled(2, 2, &red()).unwrap();
        let mut exception = ExceptionInfo::new();
        assert!(!image.set_area(0, 0, 1, 1, &[], &mut exception));
        assert!(exception.has_error());
    }

    #[test]
    fn test_empty_profile_removes() {
        let mut image = Image::header(1, 1, 8, "PNM");
        image.set_profile("IPTC", vec![1, 2, 3]);
        assert_eq!(image.profile("iptc"), Some(&[1u8, 2, 3][..]));
        image.set_profile("iptc", Vec::new());
        assert!(image.profile("iptc").is_none());
    }

    #[test]
    fn test_missing_file_is_blob_error() {
        let mut exception = ExceptionInfo::new();
        let list = ImageList::read_file(
            "/definitely/not/here.ppm",
            &Settings::default(),
            &mut exception,
        );
        assert!(list.images.is_empty());
        assert_eq!(exception.severity(), severity::BLOB_ERROR);
    }
}
