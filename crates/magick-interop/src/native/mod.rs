//! Native call boundary.
//!
//! # Memory Ownership Rules
//!
//! - Create, read, clone, remove and pixel-color calls return OWNED handles,
//!   wrapped in [`OwnedHandle`] and disposed exactly once on drop
//! - `get` calls return BORROWED handles, wrapped in [`BorrowedHandle`] with
//!   the lifetime of their owner and never disposed by the binding
//! - Calls that take ownership (`append`, `add_related`) receive the pointer
//!   from [`OwnedHandle::into_raw`]
//! - Acquired strings and buffers go through [`NativeString`],
//!   [`NativeBuffer`] or a [`CleanupScope`] and reach
//!   `magick_memory_relinquish` exactly once
//! - Borrowed profile bytes are copied before the owning image can change

use std::ffi::CString;

use magick_ffi_common::MemoryStatsC;

use crate::error::{Error, Result};

mod api;
pub mod cleanup;
pub mod handle;
mod library;

pub use api::NativeApi;
pub use cleanup::{CleanupScope, NativeBuffer, NativeString};
pub use handle::{kind, BorrowedHandle, Field, FieldValue, HandleKind, NativeHandle, OwnedHandle};
pub use library::MagickNative;

/// Allocation counters of the native allocator for the calling thread.
///
/// Zeroed when the library does not report them.
pub fn memory_stats(api: &NativeApi) -> MemoryStatsC {
    let mut stats = MemoryStatsC::default();
    if !unsafe { (api.magick_memory_stats)(&mut stats) } {
        return MemoryStatsC::default();
    }
    stats
}

/// Copy a string argument for a native call.
pub(crate) fn c_string(what: &str, value: &str) -> Result<CString> {
    CString::new(value).map_err(|_| Error::invalid_argument(format!("{what} contains a NUL byte")))
}
