//! Settings handles.

use std::os::raw::c_char;
use std::ptr;

use magick_ffi_common::{ExtentC, RawSettings};

use super::{instance, instance_mut, str_arg};
use crate::memory::{self, InstanceKind};
use crate::settings::Settings;

pub(crate) unsafe fn settings_ref<'a>(ptr: *const RawSettings) -> Option<&'a Settings> {
    unsafe { instance(ptr, InstanceKind::Settings) }
}

unsafe fn settings_mut<'a>(ptr: *mut RawSettings) -> Option<&'a mut Settings> {
    unsafe { instance_mut(ptr, InstanceKind::Settings) }
}

/// Settings for a call, falling back to defaults when no handle was given.
pub(crate) fn settings_or_default(ptr: *const RawSettings) -> Settings {
    unsafe { settings_ref(ptr) }.cloned().unwrap_or_default()
}

#[no_mangle]
pub extern "C" fn magick_settings_create() -> *mut RawSettings {
    memory::register_instance(Settings::default(), InstanceKind::Settings) as *mut RawSettings
}

#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn magick_settings_dispose(settings: *mut RawSettings) {
    unsafe { memory::dispose_instance(settings as *mut Settings, InstanceKind::Settings) }
}

/// NULL clears the explicit format.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn magick_settings_format_set(settings: *mut RawSettings, format: *const c_char) {
    if let Some(s) = unsafe { settings_mut(settings) } {
        s.format = str_arg(format).filter(|f| !f.is_empty()).map(str::to_string);
    }
}

/// Acquired string, NULL when no format is set.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn magick_settings_format_get(settings: *const RawSettings) -> *mut c_char {
    match unsafe { settings_ref(settings) }.and_then(|s| s.format.as_deref()) {
        Some(format) => memory::acquire_string(format),
        None => ptr::null_mut(),
    }
}

#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn magick_settings_extent_get(settings: *const RawSettings) -> ExtentC {
    unsafe { settings_ref(settings) }
        .map(|s| s.extent)
        .unwrap_or_default()
}

#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn magick_settings_extent_set(settings: *mut RawSettings, extent: ExtentC) {
    if let Some(s) = unsafe { settings_mut(settings) } {
        s.extent = extent;
    }
}

#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn magick_settings_ping_get(settings: *const RawSettings) -> bool {
    unsafe { settings_ref(settings) }.is_some_and(|s| s.ping)
}

#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn magick_settings_ping_set(settings: *mut RawSettings, ping: bool) {
    if let Some(s) = unsafe { settings_mut(settings) } {
        s.ping = ping;
    }
}

#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn magick_settings_set_option(
    settings: *mut RawSettings,
    key: *const c_char,
    value: *const c_char,
) -> bool {
    match (unsafe { settings_mut(settings) }, str_arg(key), str_arg(value)) {
        (Some(s), Some(key), Some(value)) if !key.is_empty() => {
            s.options.insert(key.to_string(), value.to_string());
            true
        }
        _ => false,
    }
}

/// Acquired string, NULL when the option is not set.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn magick_settings_get_option(
    settings: *const RawSettings,
    key: *const c_char,
) -> *mut c_char {
    let value = unsafe { settings_ref(settings) }
        .zip(str_arg(key))
        .and_then(|(s, key)| s.option(key));
    match value {
        Some(value) => memory::acquire_string(value),
        None => ptr::null_mut(),
    }
}

#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn magick_settings_remove_option(
    settings: *mut RawSettings,
    key: *const c_char,
) -> bool {
    match (unsafe { settings_mut(settings) }, str_arg(key)) {
        (Some(s), Some(key)) => s.options.remove(key).is_some(),
        _ => false,
    }
}
