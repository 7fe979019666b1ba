//! Image list handles.

use std::os::raw::c_char;
use std::ptr;
use std::slice;

use magick_ffi_common::abi::severity;
use magick_ffi_common::{RawException, RawImage, RawImageList, RawSettings};

use super::settings::settings_or_default;
use super::{instance, instance_mut, store_exception, str_arg};
use crate::exception::ExceptionInfo;
use crate::image::{Image, ImageList};
use crate::memory::{self, InstanceKind};

unsafe fn list_ref<'a>(ptr: *const RawImageList) -> Option<&'a ImageList> {
    unsafe { instance(ptr, InstanceKind::ImageList) }
}

unsafe fn list_mut<'a>(ptr: *mut RawImageList) -> Option<&'a mut ImageList> {
    unsafe { instance_mut(ptr, InstanceKind::ImageList) }
}

/// Register a decoded list; an empty list is returned as NULL.
fn into_handle(list: ImageList) -> *mut RawImageList {
    if list.images.is_empty() {
        return ptr::null_mut();
    }
    memory::register_instance(list, InstanceKind::ImageList) as *mut RawImageList
}

// ============================================================================
// Reading
// ============================================================================

/// Decode every frame of a blob.
///
/// Frames decoded before an error are still returned alongside the
/// exception; the caller owns both.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn magick_image_list_read_blob(
    data: *const u8,
    len: usize,
    settings: *const RawSettings,
    exception: *mut *mut RawException,
) -> *mut RawImageList {
    let mut info = ExceptionInfo::new();
    let settings = settings_or_default(settings);
    let data: &[u8] = if data.is_null() || len == 0 {
        &[]
    } else {
        unsafe { slice::from_raw_parts(data, len) }
    };
    let list = if data.is_empty() {
        info.throw(severity::BLOB_ERROR, "zero-length blob not permitted");
        ImageList::new()
    } else {
        ImageList::read_blob(data, &settings, &mut info)
    };
    tracing::debug!(bytes = data.len(), frames = list.images.len(), "native read blob");
    unsafe { store_exception(info, exception) };
    into_handle(list)
}

/// Read a file path or a pseudo format such as `xc:red`.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn magick_image_list_read_file(
    path: *const c_char,
    settings: *const RawSettings,
    exception: *mut *mut RawException,
) -> *mut RawImageList {
    let mut info = ExceptionInfo::new();
    let settings = settings_or_default(settings);
    let list = match str_arg(path) {
        Some(path) => ImageList::read_file(path, &settings, &mut info),
        None => {
            info.throw(severity::OPTION_ERROR, "invalid file name");
            ImageList::new()
        }
    };
    unsafe { store_exception(info, exception) };
    into_handle(list)
}

// ============================================================================
// Lifecycle and membership
// ============================================================================

/// Empty list, owned by the caller.
#[no_mangle]
pub extern "C" fn magick_image_list_create() -> *mut RawImageList {
    memory::register_instance(ImageList::new(), InstanceKind::ImageList) as *mut RawImageList
}

/// Release the list and every frame it still owns.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn magick_image_list_dispose(list: *mut RawImageList) {
    unsafe { memory::dispose_instance(list as *mut ImageList, InstanceKind::ImageList) }
}

#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn magick_image_list_count(list: *const RawImageList) -> usize {
    unsafe { list_ref(list) }
        .map(|l| l.images.len())
        .unwrap_or(0)
}

/// Borrowed frame, valid while it stays in the list.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn magick_image_list_get(list: *mut RawImageList, index: usize) -> *mut RawImage {
    match unsafe { list_mut(list) }.and_then(|l| l.images.get_mut(index)) {
        Some(image) => &mut **image as *mut Image as *mut RawImage,
        None => ptr::null_mut(),
    }
}

/// Detach a frame; the result is owned by the caller.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn magick_image_list_remove(list: *mut RawImageList, index: usize) -> *mut RawImage {
    match unsafe { list_mut(list) } {
        Some(list) if index < list.images.len() => {
            let image = list.images.remove(index);
            memory::register_boxed(image, InstanceKind::Image) as *mut RawImage
        }
        _ => ptr::null_mut(),
    }
}

/// Move an owned image to the end of the list. The image is consumed even
/// when the list handle is invalid.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn magick_image_list_append(list: *mut RawImageList, image: *mut RawImage) -> bool {
    let Some(image) = (unsafe { memory::take_instance(image as *mut Image, InstanceKind::Image) })
    else {
        return false;
    };
    match unsafe { list_mut(list) } {
        Some(list) => {
            list.images.push(image);
            true
        }
        None => false,
    }
}

/// Acquired bytes holding every frame.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn magick_image_list_write_blob(
    list: *const RawImageList,
    settings: *const RawSettings,
    out_len: *mut usize,
    exception: *mut *mut RawException,
) -> *mut u8 {
    let mut info = ExceptionInfo::new();
    let settings = settings_or_default(settings);
    let encoded = unsafe { list_ref(list) }.and_then(|l| l.encode(&settings, &mut info));
    let (ptr, len) = match encoded {
        Some(bytes) => memory::acquire_bytes(bytes),
        None => (ptr::null_mut(), 0),
    };
    if !out_len.is_null() {
        unsafe { *out_len = len };
    }
    unsafe { store_exception(info, exception) };
    ptr
}
