//! C-compatible interface of the engine.
//!
//! # Memory Ownership Rules
//!
//! - `*_create`, `magick_image_list_read_*`, `magick_image_clone`,
//!   `magick_image_list_remove`, `magick_image_pixel_color` and
//!   `magick_exception_related` return OWNED handles; release them with the
//!   matching `*_dispose`
//! - `magick_image_list_get` and `magick_image_get_profile` return BORROWED
//!   pointers, valid while their owner lives; never release them
//! - `magick_image_list_append` and `magick_exception_add_related` take
//!   ownership of their argument
//! - `*mut c_char` and `*mut u8` / `*mut Quantum` results were acquired for
//!   the caller; release them with `magick_memory_relinquish`
//! - strings passed in are copied, the caller keeps ownership
//!
//! Fallible functions take a trailing `exception` out-parameter. It is set
//! to NULL on a clean call and to an owned exception tree when anything was
//! thrown, warnings included.

use std::os::raw::{c_char, c_void};
use std::ptr;

use lazy_static::lazy_static;
use parking_lot::RwLock;

use magick_ffi_common::{cstr_to_str, MemoryStatsC, RawException};

use crate::exception::ExceptionInfo;
use crate::memory::{self, InstanceKind};
use crate::{QUANTUM_DEPTH, QUANTUM_IS_HDRI};

pub mod color;
pub mod exception;
pub mod geometry;
pub mod image;
pub mod image_list;
pub mod settings;

pub use color::*;
pub use exception::*;
pub use geometry::*;
pub use image::*;
pub use image_list::*;
pub use settings::*;

lazy_static! {
    static ref CACHE_DIRECTORY: RwLock<Option<String>> = RwLock::new(None);
}

/// Hand the thrown entries to the caller, or NULL when nothing was thrown.
///
/// # Safety
/// `out` must be NULL or valid for writes.
pub(crate) unsafe fn store_exception(info: ExceptionInfo, out: *mut *mut RawException) {
    if out.is_null() {
        return;
    }
    let handle = match info.into_tree() {
        Some(tree) => memory::register_instance(
            exception::ExceptionInstance::from(tree),
            InstanceKind::Exception,
        ) as *mut RawException,
        None => ptr::null_mut(),
    };
    unsafe { *out = handle };
}

/// Borrow a live registered instance. NULL, disposed and foreign pointers
/// yield `None`.
///
/// # Safety
/// A pointer registered as `kind` must point to a `T`.
pub(crate) unsafe fn instance<'a, R, T>(ptr: *const R, kind: InstanceKind) -> Option<&'a T> {
    if !memory::is_live_instance(ptr, kind) {
        return None;
    }
    unsafe { (ptr as *const T).as_ref() }
}

/// Mutable counterpart of [`instance`].
///
/// # Safety
/// Same contract as [`instance`], and no other reference may be alive.
pub(crate) unsafe fn instance_mut<'a, R, T>(ptr: *mut R, kind: InstanceKind) -> Option<&'a mut T> {
    if !memory::is_live_instance(ptr, kind) {
        return None;
    }
    unsafe { (ptr as *mut T).as_mut() }
}

/// Copy an optional string argument. NULL and invalid UTF-8 yield `None`.
pub(crate) fn str_arg<'a>(ptr: *const c_char) -> Option<&'a str> {
    unsafe { cstr_to_str(ptr) }.ok()
}

// ============================================================================
// Library
// ============================================================================

magick_ffi_common::define_version_fn!(magick_native_version);

#[no_mangle]
pub extern "C" fn magick_native_quantum_depth() -> u32 {
    QUANTUM_DEPTH
}

#[no_mangle]
pub extern "C" fn magick_native_quantum_is_hdri() -> bool {
    QUANTUM_IS_HDRI
}

/// Set the process-wide temporary cache directory. NULL clears it.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn magick_native_set_cache_directory(path: *const c_char) {
    let value = str_arg(path).map(str::to_string);
    tracing::debug!(cache_directory = ?value, "native cache directory set");
    *CACHE_DIRECTORY.write() = value;
}

/// Acquired string, NULL when no cache directory was set.
#[no_mangle]
pub extern "C" fn magick_native_cache_directory() -> *mut c_char {
    match CACHE_DIRECTORY.read().as_deref() {
        Some(path) => memory::acquire_string(path),
        None => ptr::null_mut(),
    }
}

// ============================================================================
// Memory
// ============================================================================

#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn magick_memory_relinquish(ptr: *mut c_void) {
    unsafe { memory::relinquish(ptr) }
}

#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn magick_memory_stats(out: *mut MemoryStatsC) -> bool {
    if out.is_null() {
        return false;
    }
    unsafe { *out = memory::stats() };
    true
}
