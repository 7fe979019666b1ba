//! Image handles.
//!
//! Image pointers come either from a registry allocation (owned) or from
//! inside an image list (borrowed), so accessors only reject NULL.

use std::os::raw::c_char;
use std::ptr;
use std::slice;

use magick_ffi_common::{RawColor, RawException, RawImage, RawSettings};

use super::color::new_color_handle;
use super::settings::settings_or_default;
use super::{store_exception, str_arg};
use crate::exception::ExceptionInfo;
use crate::image::Image;
use crate::memory::{self, InstanceKind};
use crate::quantum::Quantum;

pub(crate) unsafe fn image_ref<'a>(ptr: *const RawImage) -> Option<&'a Image> {
    unsafe { (ptr as *const Image).as_ref() }
}

unsafe fn image_mut<'a>(ptr: *mut RawImage) -> Option<&'a mut Image> {
    unsafe { (ptr as *mut Image).as_mut() }
}

unsafe fn write_len(out: *mut usize, len: usize) {
    if !out.is_null() {
        unsafe { *out = len };
    }
}

// ============================================================================
// Lifecycle
// ============================================================================

/// Deep copy; the result is owned by the caller.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn magick_image_clone(image: *const RawImage) -> *mut RawImage {
    match unsafe { image_ref(image) } {
        Some(image) => {
            memory::register_instance(image.clone(), InstanceKind::Image) as *mut RawImage
        }
        None => ptr::null_mut(),
    }
}

/// Release an owned image. Borrowed frames are refused and counted.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn magick_image_dispose(image: *mut RawImage) {
    unsafe { memory::dispose_instance(image as *mut Image, InstanceKind::Image) }
}

// ============================================================================
// Properties
// ============================================================================

#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn magick_image_width(image: *const RawImage) -> usize {
    unsafe { image_ref(image) }.map(|i| i.width).unwrap_or(0)
}

#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn magick_image_height(image: *const RawImage) -> usize {
    unsafe { image_ref(image) }.map(|i| i.height).unwrap_or(0)
}

#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn magick_image_depth(image: *const RawImage) -> u32 {
    unsafe { image_ref(image) }.map(|i| i.depth).unwrap_or(0)
}

#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn magick_image_channel_count(image: *const RawImage) -> usize {
    unsafe { image_ref(image) }
        .map(Image::channel_count)
        .unwrap_or(0)
}

#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn magick_image_has_alpha(image: *const RawImage) -> bool {
    unsafe { image_ref(image) }.is_some_and(|i| i.has_alpha)
}

/// Acquired string.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn magick_image_format_get(image: *const RawImage) -> *mut c_char {
    match unsafe { image_ref(image) } {
        Some(image) => memory::acquire_string(&image.format),
        None => ptr::null_mut(),
    }
}

#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn magick_image_format_set(image: *mut RawImage, format: *const c_char) -> bool {
    match (unsafe { image_mut(image) }, str_arg(format)) {
        (Some(image), Some(format)) if !format.is_empty() => {
            image.format = format.to_ascii_uppercase();
            true
        }
        _ => false,
    }
}

// ============================================================================
// Pixels
// ============================================================================

/// Acquired copy of an area, interleaved by channel.
///
/// NULL with no exception when the image has no pixel cache; NULL with an
/// exception when the area does not fit.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
#[allow(clippy::too_many_arguments)]
pub extern "C" fn magick_image_get_pixels(
    image: *const RawImage,
    x: isize,
    y: isize,
    width: usize,
    height: usize,
    out_len: *mut usize,
    exception: *mut *mut RawException,
) -> *mut Quantum {
    let mut info = ExceptionInfo::new();
    let area = unsafe { image_ref(image) }
        .and_then(|image| image.get_area(x, y, width, height, &mut info));
    let (ptr, len) = match area {
        Some(area) => memory::acquire_quanta(area),
        None => (ptr::null_mut(), 0),
    };
    unsafe {
        write_len(out_len, len);
        store_exception(info, exception);
    }
    ptr
}

#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
#[allow(clippy::too_many_arguments)]
pub extern "C" fn magick_image_set_pixels(
    image: *mut RawImage,
    x: isize,
    y: isize,
    width: usize,
    height: usize,
    values: *const Quantum,
    len: usize,
    exception: *mut *mut RawException,
) -> bool {
    let mut info = ExceptionInfo::new();
    let values: &[Quantum] = if values.is_null() || len == 0 {
        &[]
    } else {
        unsafe { slice::from_raw_parts(values, len) }
    };
    let ok = unsafe { image_mut(image) }
        .is_some_and(|image| image.set_area(x, y, width, height, values, &mut info));
    unsafe { store_exception(info, exception) };
    ok
}

/// New owned color handle for one pixel.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn magick_image_pixel_color(
    image: *const RawImage,
    x: isize,
    y: isize,
    exception: *mut *mut RawException,
) -> *mut RawColor {
    let mut info = ExceptionInfo::new();
    let color = unsafe { image_ref(image) }.and_then(|image| image.pixel_color(x, y, &mut info));
    unsafe { store_exception(info, exception) };
    color.map(new_color_handle).unwrap_or(ptr::null_mut())
}

// ============================================================================
// Profiles and attributes
// ============================================================================

/// Borrowed profile bytes, valid until the profile or the image changes.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn magick_image_get_profile(
    image: *const RawImage,
    name: *const c_char,
    out_len: *mut usize,
) -> *const u8 {
    let profile = unsafe { image_ref(image) }
        .zip(str_arg(name))
        .and_then(|(image, name)| image.profile(name));
    let (ptr, len) = match profile {
        Some(bytes) => (bytes.as_ptr(), bytes.len()),
        None => (ptr::null(), 0),
    };
    unsafe { write_len(out_len, len) };
    ptr
}

/// Copy `len` bytes into the named profile. An empty profile removes it.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn magick_image_set_profile(
    image: *mut RawImage,
    name: *const c_char,
    data: *const u8,
    len: usize,
) -> bool {
    let (Some(image), Some(name)) = (unsafe { image_mut(image) }, str_arg(name)) else {
        return false;
    };
    if name.is_empty() {
        return false;
    }
    let bytes = if data.is_null() || len == 0 {
        Vec::new()
    } else {
        unsafe { slice::from_raw_parts(data, len) }.to_vec()
    };
    image.set_profile(name, bytes);
    true
}

#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn magick_image_remove_profile(image: *mut RawImage, name: *const c_char) -> bool {
    match (unsafe { image_mut(image) }, str_arg(name)) {
        (Some(image), Some(name)) => image
            .profiles
            .remove(&name.to_ascii_lowercase())
            .is_some(),
        _ => false,
    }
}

/// Acquired comma-separated list, NULL when the image has no profiles.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn magick_image_profile_names(image: *const RawImage) -> *mut c_char {
    match unsafe { image_ref(image) } {
        Some(image) if !image.profiles.is_empty() => {
            let names: Vec<&str> = image.profiles.keys().map(String::as_str).collect();
            memory::acquire_string(&names.join(","))
        }
        _ => ptr::null_mut(),
    }
}

/// Acquired string, NULL when the attribute is not set.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn magick_image_get_attribute(
    image: *const RawImage,
    key: *const c_char,
) -> *mut c_char {
    let value = unsafe { image_ref(image) }
        .zip(str_arg(key))
        .and_then(|(image, key)| image.attributes.get(key));
    match value {
        Some(value) => memory::acquire_string(value),
        None => ptr::null_mut(),
    }
}

/// A NULL value removes the attribute.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn magick_image_set_attribute(
    image: *mut RawImage,
    key: *const c_char,
    value: *const c_char,
) -> bool {
    let (Some(image), Some(key)) = (unsafe { image_mut(image) }, str_arg(key)) else {
        return false;
    };
    match str_arg(value) {
        Some(value) => {
            image.attributes.insert(key.to_string(), value.to_string());
        }
        None => {
            image.attributes.remove(key);
        }
    }
    true
}

// ============================================================================
// Encoding
// ============================================================================

/// Acquired encoded bytes.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn magick_image_write_blob(
    image: *const RawImage,
    settings: *const RawSettings,
    out_len: *mut usize,
    exception: *mut *mut RawException,
) -> *mut u8 {
    let mut info = ExceptionInfo::new();
    let settings = settings_or_default(settings);
    let encoded = unsafe { image_ref(image) }.and_then(|image| image.encode(&settings, &mut info));
    let (ptr, len) = match encoded {
        Some(bytes) => memory::acquire_bytes(bytes),
        None => (ptr::null_mut(), 0),
    };
    unsafe {
        write_len(out_len, len);
        store_exception(info, exception);
    }
    ptr
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::{CStr, CString};
    use std::os::raw::c_void;

    use crate::color::ColorInstance;
    use crate::ffi::color::{magick_color_dispose, magick_color_red_get};
    use crate::ffi::exception::magick_exception_dispose;
    use crate::ffi::magick_memory_relinquish;
    use crate::quantum;

    fn red_canvas(width: usize, height: usize) -> *mut RawImage {
        let color = ColorInstance::parse("red").unwrap();
        let image = Image::filled(width, height, &color).unwrap();
        memory::register_instance(image, InstanceKind::Image) as *mut RawImage
    }

    #[test]
    fn test_properties() {
        let image = red_canvas(3, 2);
        assert_eq!(magick_image_width(image), 3);
        assert_eq!(magick_image_height(image), 2);
        assert_eq!(magick_image_channel_count(image), 3);
        assert!(!magick_image_has_alpha(image));
        magick_image_dispose(image);
    }

    #[test]
    fn test_get_pixels_is_acquired() {
        let image = red_canvas(2, 2);
        let mut len = 0;
        let mut exception = ptr::null_mut();
        let pixels = magick_image_get_pixels(image, 0, 0, 2, 2, &mut len, &mut exception);
        assert_eq!(len, 12);
        assert!(exception.is_null());
        assert_eq!(unsafe { *pixels }, quantum::opaque());
        magick_memory_relinquish(pixels as *mut c_void);
        magick_image_dispose(image);
    }

    #[test]
    fn test_get_pixels_out_of_bounds() {
        let image = red_canvas(2, 2);
        let mut len = 7;
        let mut exception = ptr::null_mut();
        let pixels = magick_image_get_pixels(image, 1, 1, 2, 2, &mut len, &mut exception);
        assert!(pixels.is_null());
        assert_eq!(len, 0);
        assert!(!exception.is_null());
        magick_exception_dispose(exception);
        magick_image_dispose(image);
    }

    #[test]
    fn test_pixel_color_is_owned() {
        let image = red_canvas(1, 1);
        let mut exception = ptr::null_mut();
        let color = magick_image_pixel_color(image, 0, 0, &mut exception);
        assert_eq!(magick_color_red_get(color), quantum::opaque());
        magick_color_dispose(color);
        magick_image_dispose(image);
    }

    #[test]
    fn test_profile_is_borrowed() {
        let image = red_canvas(1, 1);
        let name = CString::new("ICC").unwrap();
        let data = [1u8, 2, 3];
        assert!(magick_image_set_profile(image, name.as_ptr(), data.as_ptr(), data.len()));

        let mut len = 0;
        let profile = magick_image_get_profile(image, name.as_ptr(), &mut len);
        assert_eq!(unsafe { slice::from_raw_parts(profile, len) }, &data);

        let names = magick_image_profile_names(image);
        assert_eq!(unsafe { CStr::from_ptr(names) }.to_str().unwrap(), "icc");
        magick_memory_relinquish(names as *mut c_void);

        assert!(magick_image_remove_profile(image, name.as_ptr()));
        assert!(magick_image_profile_names(image).is_null());
        magick_image_dispose(image);
    }

    #[test]
    fn test_attributes() {
        let image = red_canvas(1, 1);
        let key = CString::new("comment").unwrap();
        let value = CString::new("hi").unwrap();
        assert!(magick_image_set_attribute(image, key.as_ptr(), value.as_ptr()));
        let read = magick_image_get_attribute(image, key.as_ptr());
        assert_eq!(unsafe { CStr::from_ptr(read) }.to_str().unwrap(), "hi");
        magick_memory_relinquish(read as *mut c_void);
        assert!(magick_image_set_attribute(image, key.as_ptr(), ptr::null()));
        assert!(magick_image_get_attribute(image, key.as_ptr()).is_null());
        magick_image_dispose(image);
    }

    #[test]
    fn test_write_blob_ppm() {
        let image = red_canvas(1, 1);
        let format = CString::new("PPM").unwrap();
        assert!(magick_image_format_set(image, format.as_ptr()));
        let mut len = 0;
        let mut exception = ptr::null_mut();
        let blob = magick_image_write_blob(image, ptr::null(), &mut len, &mut exception);
        assert!(exception.is_null());
        assert!(unsafe { slice::from_raw_parts(blob, len) }.starts_with(b"P6"));
        magick_memory_relinquish(blob as *mut c_void);
        magick_image_dispose(image);
    }

    #[test]
    fn test_clone_is_independent() {
        let image = red_canvas(1, 1);
        let copy = magick_image_clone(image);
        let format = CString::new("pam").unwrap();
        magick_image_format_set(copy, format.as_ptr());
        let original = magick_image_format_get(image);
        assert_eq!(unsafe { CStr::from_ptr(original) }.to_str().unwrap(), "XC");
        magick_memory_relinquish(original as *mut c_void);
        magick_image_dispose(copy);
        magick_image_dispose(image);
    }
}
