//! Color handles.

use std::os::raw::c_char;
use std::ptr;

use magick_ffi_common::abi::severity;
use magick_ffi_common::{RawColor, RawException};

use super::{instance, instance_mut, store_exception, str_arg};
use crate::color::ColorInstance;
use crate::exception::ExceptionInfo;
use crate::memory::{self, InstanceKind};
use crate::quantum::{self, Quantum};

unsafe fn color_ref<'a>(ptr: *const RawColor) -> Option<&'a ColorInstance> {
    unsafe { instance(ptr, InstanceKind::Color) }
}

unsafe fn color_mut<'a>(ptr: *mut RawColor) -> Option<&'a mut ColorInstance> {
    unsafe { instance_mut(ptr, InstanceKind::Color) }
}

pub(crate) fn new_color_handle(color: ColorInstance) -> *mut RawColor {
    memory::register_instance(color, InstanceKind::Color) as *mut RawColor
}

/// Opaque black.
#[no_mangle]
pub extern "C" fn magick_color_create() -> *mut RawColor {
    new_color_handle(ColorInstance::default())
}

#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn magick_color_dispose(color: *mut RawColor) {
    unsafe { memory::dispose_instance(color as *mut ColorInstance, InstanceKind::Color) }
}

macro_rules! channel_accessors {
    ($($field:ident: $getter:ident, $setter:ident;)*) => {
        $(
            #[no_mangle]
            #[allow(clippy::not_unsafe_ptr_arg_deref)]
            pub extern "C" fn $getter(color: *const RawColor) -> Quantum {
                unsafe { color_ref(color) }
                    .map(|c| c.$field)
                    .unwrap_or_else(|| quantum::from_f64(0.0))
            }

            #[no_mangle]
            #[allow(clippy::not_unsafe_ptr_arg_deref)]
            pub extern "C" fn $setter(color: *mut RawColor, value: Quantum) {
                if let Some(c) = unsafe { color_mut(color) } {
                    c.$field = value;
                }
            }
        )*
    };
}

channel_accessors! {
    red: magick_color_red_get, magick_color_red_set;
    green: magick_color_green_get, magick_color_green_set;
    blue: magick_color_blue_get, magick_color_blue_set;
    alpha: magick_color_alpha_get, magick_color_alpha_set;
    black: magick_color_black_get, magick_color_black_set;
}

#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn magick_color_is_cmyk_get(color: *const RawColor) -> bool {
    unsafe { color_ref(color) }.is_some_and(|c| c.is_cmyk)
}

#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn magick_color_is_cmyk_set(color: *mut RawColor, value: bool) {
    if let Some(c) = unsafe { color_mut(color) } {
        c.is_cmyk = value;
    }
}

/// Replace the channels with the parsed `text`. On failure the color is left
/// untouched and an OptionError is reported.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn magick_color_initialize(
    color: *mut RawColor,
    text: *const c_char,
    exception: *mut *mut RawException,
) -> bool {
    let mut info = ExceptionInfo::new();
    let ok = match (unsafe { color_mut(color) }, str_arg(text)) {
        (Some(target), Some(text)) => match ColorInstance::parse(text) {
            Some(parsed) => {
                *target = parsed;
                true
            }
            None => {
                info.throw(
                    severity::OPTION_ERROR,
                    format!("unrecognized color `{text}'"),
                );
                false
            }
        },
        _ => false,
    };
    unsafe { store_exception(info, exception) };
    ok
}

/// Acquired string, NULL for an invalid handle.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn magick_color_to_string(color: *const RawColor) -> *mut c_char {
    match unsafe { color_ref(color) } {
        Some(c) => memory::acquire_string(&c.to_text()),
        None => ptr::null_mut(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::{CStr, CString};
    use std::os::raw::c_void;

    use crate::ffi::exception::magick_exception_dispose;
    use crate::ffi::magick_memory_relinquish;

    #[test]
    fn test_set_and_get_channels() {
        let color = magick_color_create();
        let half = quantum::from_f64(crate::QUANTUM_RANGE / 2.0);
        magick_color_green_set(color, half);
        magick_color_is_cmyk_set(color, true);
        assert_eq!(magick_color_green_get(color), half);
        assert!(magick_color_is_cmyk_get(color));
        magick_color_dispose(color);
    }

    #[test]
    fn test_initialize_and_to_string() {
        let color = magick_color_create();
        let text = CString::new("#FF0000").unwrap();
        let mut exception = ptr::null_mut();
        assert!(magick_color_initialize(color, text.as_ptr(), &mut exception));
        assert!(exception.is_null());

        let out = magick_color_to_string(color);
        let rendered = unsafe { CStr::from_ptr(out) }.to_str().unwrap().to_string();
        assert!(rendered.starts_with("#FF"));
        magick_memory_relinquish(out as *mut c_void);
        magick_color_dispose(color);
    }

    #[test]
    fn test_initialize_bad_text_reports() {
        let color = magick_color_create();
        let text = CString::new("not-a-color").unwrap();
        let mut exception = ptr::null_mut();
        assert!(!magick_color_initialize(color, text.as_ptr(), &mut exception));
        assert!(!exception.is_null());
        magick_exception_dispose(exception);
        magick_color_dispose(color);
    }

    #[test]
    fn test_disposed_color_is_ignored() {
        let color = magick_color_create();
        magick_color_dispose(color);
        magick_color_red_set(color, quantum::opaque());
        assert!(magick_color_to_string(color).is_null());
    }
}
