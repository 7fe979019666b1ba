//! Shared C-ABI vocabulary for the magick native boundary.
//!
//! Both sides of the boundary depend on this crate: `magick-native` exports
//! functions in terms of these types, and `magick-interop` declares its
//! function table with the same types, so a signature drift is a compile
//! error instead of a crash.
//!
//! # Memory Ownership
//!
//! - Strings from [`cstring_new_or_empty`] and slices from [`vec_into_raw`]
//!   belong to whoever receives the pointer
//! - They go back through [`free_cstring`] / [`free_boxed_slice`] on the side
//!   that allocated them, never through another allocator
//! - NULL is accepted by every free function and ignored

use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::ptr;

pub mod abi;

pub use abi::{
    ExtentC, GeometryInfoC, MemoryStatsC, RawColor, RawException, RawGeometry, RawImage,
    RawImageList, RawSettings,
};

/// Heap C string for `s`; interior NUL bytes give an empty string.
#[inline]
pub fn cstring_new_or_empty(s: &str) -> *mut c_char {
    CString::new(s).unwrap_or_default().into_raw()
}

/// Release a string from [`cstring_new_or_empty`].
///
/// # Safety
/// `ptr` must come from `CString::into_raw()` and not be released yet, or be
/// null.
#[inline]
pub unsafe fn free_cstring(ptr: *mut c_char) {
    if !ptr.is_null() {
        drop(unsafe { CString::from_raw(ptr) });
    }
}

/// Hand a vector across the boundary as pointer and length.
///
/// An empty vector becomes `(null, 0)`.
#[inline]
pub fn vec_into_raw<T>(vec: Vec<T>) -> (*mut T, usize) {
    if vec.is_empty() {
        return (ptr::null_mut(), 0);
    }
    let len = vec.len();
    (Box::into_raw(vec.into_boxed_slice()) as *mut T, len)
}

/// Release a slice from [`vec_into_raw`].
///
/// # Safety
/// `ptr` and `len` must be exactly what [`vec_into_raw`] returned. Null or a
/// zero length is a no-op.
#[inline]
pub unsafe fn free_boxed_slice<T>(ptr: *mut T, len: usize) {
    if !ptr.is_null() && len > 0 {
        drop(unsafe { Box::from_raw(ptr::slice_from_raw_parts_mut(ptr, len)) });
    }
}

/// Borrow a C string argument as UTF-8.
///
/// # Safety
/// A non-null `ptr` must be NUL-terminated and outlive the returned slice.
pub unsafe fn cstr_to_str<'a>(ptr: *const c_char) -> Result<&'a str, &'static str> {
    if ptr.is_null() {
        return Err("null pointer");
    }
    unsafe { CStr::from_ptr(ptr) }
        .to_str()
        .map_err(|_| "invalid UTF-8")
}

/// Export `$fn_name` returning the crate version as a static C string.
///
/// ```ignore
/// magick_ffi_common::define_version_fn!(magick_native_version);
/// ```
#[macro_export]
macro_rules! define_version_fn {
    ($fn_name:ident) => {
        #[no_mangle]
        pub extern "C" fn $fn_name() -> *const std::os::raw::c_char {
            concat!(env!("CARGO_PKG_VERSION"), "\0").as_ptr() as *const std::os::raw::c_char
        }
    };
}
