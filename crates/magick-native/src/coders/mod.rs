//! Format detection and dispatch.

use magick_ffi_common::abi::severity;

use crate::color::ColorInstance;
use crate::exception::ExceptionInfo;
use crate::image::Image;
use crate::settings::Settings;

mod jpeg;
mod pnm;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Format {
    Pnm,
    Jpeg,
}

fn detect(data: &[u8]) -> Option<Format> {
    match data {
        [b'P', b'2'..=b'7', ..] => Some(Format::Pnm),
        [0xFF, 0xD8, ..] => Some(Format::Jpeg),
        _ => None,
    }
}

fn from_name(name: &str) -> Option<Format> {
    match name {
        "PNM" | "PPM" | "PGM" | "PAM" => Some(Format::Pnm),
        "JPEG" | "JPG" | "JPE" => Some(Format::Jpeg),
        _ => None,
    }
}

/// Decode every frame of a blob. Frames decoded before a fatal problem are
/// returned together with the exception.
pub(crate) fn decode(data: &[u8], settings: &Settings, exception: &mut ExceptionInfo) -> Vec<Image> {
    let requested = settings.format_upper();
    let format = detect(data).or_else(|| requested.as_deref().and_then(from_name));

    let images = match format {
        Some(Format::Pnm) => pnm::decode(data, settings, exception),
        Some(Format::Jpeg) => jpeg::decode(data, settings, exception),
        None => {
            exception.throw(
                severity::MISSING_DELEGATE_ERROR,
                format!(
                    "no decode delegate for this image format `{}'",
                    requested.unwrap_or_default()
                ),
            );
            Vec::new()
        }
    };
    tracing::trace!(frames = images.len(), "decoded blob");
    images
}

/// Decode pseudo formats addressed by filename (`xc:red`, `canvas:#fff`).
/// Returns `None` when `filename` is not a pseudo format.
pub(crate) fn decode_pseudo(
    filename: &str,
    settings: &Settings,
    exception: &mut ExceptionInfo,
) -> Option<Vec<Image>> {
    let (prefix, argument) = filename.split_once(':')?;
    let prefix = prefix.to_ascii_uppercase();
    if prefix != "XC" && prefix != "CANVAS" {
        return None;
    }

    let argument = if argument.is_empty() { "white" } else { argument };
    let Some(color) = ColorInstance::parse(argument) else {
        exception.throw(
            severity::OPTION_ERROR,
            format!("unrecognized color `{argument}'"),
        );
        return Some(Vec::new());
    };

    let (width, height) = settings.canvas_extent();
    if settings.ping {
        return Some(vec![Image::canvas(width, height, &color)]);
    }
    let Some(image) = Image::filled(width, height, &color) else {
        exception.throw_with_description(
            severity::RESOURCE_LIMIT_ERROR,
            "width or height exceeds limit",
            format!("{width}x{height}"),
        );
        return Some(Vec::new());
    };
    Some(vec![image])
}

/// Encode frames with the requested format, or the first frame's format.
pub(crate) fn encode(
    frames: &[Image],
    settings: &Settings,
    exception: &mut ExceptionInfo,
) -> Option<Vec<u8>> {
    let Some(first) = frames.first() else {
        exception.throw(severity::OPTION_ERROR, "no images defined");
        return None;
    };
    let format = settings
        .format_upper()
        .unwrap_or_else(|| first.format.to_ascii_uppercase());

    match format.as_str() {
        "PNM" | "PPM" | "PAM" => {
            if frames.iter().any(|f| f.pixels.is_none()) {
                exception.throw(severity::CACHE_ERROR, "pixel cache is not open");
                return None;
            }
            let mut out = Vec::new();
            for frame in frames {
                pnm::encode(frame, &format, settings, &mut out);
            }
            Some(out)
        }
        other => {
            exception.throw(
                severity::MISSING_DELEGATE_ERROR,
                format!("no encode delegate for this image format `{other}'"),
            );
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_magic() {
        assert_eq!(detect(b"P6\n1 1\n255\n"), Some(Format::Pnm));
        assert_eq!(detect(&[0xFF, 0xD8, 0xFF]), Some(Format::Jpeg));
        assert_eq!(detect(b"GIF89a"), None);
    }

    #[test]
    fn test_unknown_blob_is_missing_delegate() {
        let mut exception = ExceptionInfo::new();
        let images = decode(b"GIF89a", &Settings::default(), &mut exception);
        assert!(images.is_empty());
        assert_eq!(exception.severity(), severity::MISSING_DELEGATE_ERROR);
    }

    #[test]
    fn test_canvas_uses_extent() {
        let mut settings = Settings::default();
        settings.extent.width = 3;
        settings.extent.height = 2;
        let mut exception = ExceptionInfo::new();
        let images = decode_pseudo("xc:red", &settings, &mut exception).unwrap();
        assert_eq!((images[0].width, images[0].height), (3, 2));
        assert!(exception.is_empty());
    }

    #[test]
    fn test_canvas_over_pixel_limit() {
        let mut settings = Settings::default();
        settings.extent.width = usize::MAX;
        settings.extent.height = usize::MAX;
        let mut exception = ExceptionInfo::new();
        let images = decode_pseudo("xc:red", &settings, &mut exception).unwrap();
        assert!(images.is_empty());
        assert_eq!(exception.severity(), severity::RESOURCE_LIMIT_ERROR);
    }

    #[test]
    fn test_pinged_canvas_has_no_pixels() {
        let mut settings = Settings::default();
        settings.extent.width = usize::MAX;
        settings.extent.height = 2;
        settings.ping = true;
        let mut exception = ExceptionInfo::new();
        let images = decode_pseudo("xc:#ff000080", &settings, &mut exception).unwrap();
        assert_eq!((images[0].width, images[0].height), (usize::MAX, 2));
        assert!(images[0].has_alpha);
        assert!(images[0].pixels.is_none());
        assert!(exception.is_empty());
    }

    #[test]
    fn test_canvas_bad_color() {
        let mut exception = ExceptionInfo::new();
        let images = decode_pseudo("xc:nope", &Settings::default(), &mut exception).unwrap();
        assert!(images.is_empty());
        assert_eq!(exception.severity(), severity::OPTION_ERROR);
    }

    #[test]
    fn test_not_pseudo() {
        let mut exception = ExceptionInfo::new();
        assert!(decode_pseudo("photo.ppm", &Settings::default(), &mut exception).is_none());
        assert!(decode_pseudo("C:/photo.ppm", &Settings::default(), &mut exception).is_none());
    }

    #[test]
    fn test_encode_jpeg_missing_delegate() {
        let mut exception = ExceptionInfo::new();
        let frame = Image::filled(1, 1, &ColorInstance::default()).unwrap();
        let mut settings = Settings::default();
        settings.format = Some("jpeg".to_string());
        assert!(encode(&[frame], &settings, &mut exception).is_none());
        assert_eq!(exception.severity(), severity::MISSING_DELEGATE_ERROR);
    }
}
