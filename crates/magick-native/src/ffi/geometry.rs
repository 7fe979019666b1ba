//! Geometry handles.

use std::os::raw::c_char;
use std::ptr;

use magick_ffi_common::abi::geometry_flags;
use magick_ffi_common::{GeometryInfoC, RawGeometry};

use super::{instance, instance_mut, str_arg};
use crate::geometry;
use crate::memory::{self, InstanceKind};

#[no_mangle]
pub extern "C" fn magick_geometry_create() -> *mut RawGeometry {
    memory::register_instance(GeometryInfoC::default(), InstanceKind::Geometry) as *mut RawGeometry
}

#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn magick_geometry_dispose(geometry: *mut RawGeometry) {
    unsafe { memory::dispose_instance(geometry as *mut GeometryInfoC, InstanceKind::Geometry) }
}

/// Parse `text` into the handle and return the parse flags.
/// `NO_VALUE` means nothing was recognized and the handle is unchanged.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn magick_geometry_initialize(
    geometry: *mut RawGeometry,
    text: *const c_char,
) -> u32 {
    let Some(target) = (unsafe { instance_mut::<_, GeometryInfoC>(geometry, InstanceKind::Geometry) })
    else {
        return geometry_flags::NO_VALUE;
    };
    match str_arg(text).and_then(geometry::parse) {
        Some(info) => {
            *target = info;
            info.flags
        }
        None => geometry_flags::NO_VALUE,
    }
}

/// Default (all zero) for an invalid handle.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn magick_geometry_info_get(geometry: *const RawGeometry) -> GeometryInfoC {
    unsafe { instance::<_, GeometryInfoC>(geometry, InstanceKind::Geometry) }
        .copied()
        .unwrap_or_default()
}

#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn magick_geometry_info_set(geometry: *mut RawGeometry, value: GeometryInfoC) {
    if let Some(info) = unsafe { instance_mut::<_, GeometryInfoC>(geometry, InstanceKind::Geometry) } {
        *info = value;
    }
}

/// Acquired string, NULL for an invalid handle.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn magick_geometry_to_string(geometry: *const RawGeometry) -> *mut c_char {
    match unsafe { instance::<_, GeometryInfoC>(geometry, InstanceKind::Geometry) } {
        Some(info) => memory::acquire_string(&geometry::format(info)),
        None => ptr::null_mut(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::{CStr, CString};
    use std::os::raw::c_void;

    use crate::ffi::magick_memory_relinquish;

    #[test]
    fn test_initialize_then_read_info() {
        let geometry = magick_geometry_create();
        let text = CString::new("640x480>").unwrap();
        let flags = magick_geometry_initialize(geometry, text.as_ptr());
        assert_ne!(flags & geometry_flags::GREATER_VALUE, 0);

        let info = magick_geometry_info_get(geometry);
        assert_eq!((info.width, info.height), (640, 480));
        magick_geometry_dispose(geometry);
    }

    #[test]
    fn test_set_info_then_format() {
        let geometry = magick_geometry_create();
        let info = GeometryInfoC {
            x: 5,
            y: -3,
            width: 10,
            height: 20,
            flags: geometry_flags::WIDTH_VALUE
                | geometry_flags::HEIGHT_VALUE
                | geometry_flags::X_VALUE
                | geometry_flags::Y_VALUE,
        };
        magick_geometry_info_set(geometry, info);
        let text = magick_geometry_to_string(geometry);
        assert_eq!(unsafe { CStr::from_ptr(text) }.to_str().unwrap(), "10x20+5-3");
        magick_memory_relinquish(text as *mut c_void);
        magick_geometry_dispose(geometry);
    }

    #[test]
    fn test_unparsable_text_keeps_value() {
        let geometry = magick_geometry_create();
        let text = CString::new("garbage").unwrap();
        assert_eq!(
            magick_geometry_initialize(geometry, text.as_ptr()),
            geometry_flags::NO_VALUE
        );
        magick_geometry_dispose(geometry);
    }
}
