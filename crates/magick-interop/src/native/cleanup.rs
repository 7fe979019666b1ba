//! Release of transient native allocations.
//!
//! Strings and buffers the native library acquires for the caller must reach
//! `magick_memory_relinquish` exactly once. [`NativeBuffer`] and
//! [`NativeString`] guard a single allocation; [`CleanupScope`] collects the
//! allocations of one call and releases them, newest first, when the call
//! returns on any path.

use std::ffi::CStr;
use std::fmt;
use std::os::raw::{c_char, c_void};
use std::ptr::NonNull;
use std::slice;

use crate::native::NativeApi;

/// An acquired native buffer of `len` values of `T`.
pub struct NativeBuffer<T: Copy> {
    ptr: NonNull<T>,
    len: usize,
    api: &'static NativeApi,
}

impl<T: Copy> NativeBuffer<T> {
    /// Take responsibility for an acquired buffer. NULL yields `None`.
    ///
    /// # Safety
    /// A non-null `ptr` must have been acquired for the caller and be valid
    /// for reads of `len` values.
    pub unsafe fn from_raw(api: &'static NativeApi, ptr: *mut T, len: usize) -> Option<Self> {
        NonNull::new(ptr).map(|ptr| Self { ptr, len, api })
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn as_slice(&self) -> &[T] {
        if self.len == 0 {
            return &[];
        }
        unsafe { slice::from_raw_parts(self.ptr.as_ptr(), self.len) }
    }

    pub fn to_vec(&self) -> Vec<T> {
        self.as_slice().to_vec()
    }
}

impl<T: Copy> Drop for NativeBuffer<T> {
    fn drop(&mut self) {
        unsafe { (self.api.magick_memory_relinquish)(self.ptr.as_ptr() as *mut c_void) };
    }
}

impl<T: Copy> fmt::Debug for NativeBuffer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeBuffer")
            .field("ptr", &self.ptr)
            .field("len", &self.len)
            .finish()
    }
}

/// An acquired NUL-terminated native string.
pub struct NativeString {
    ptr: NonNull<c_char>,
    api: &'static NativeApi,
}

impl NativeString {
    /// Take responsibility for an acquired string. NULL yields `None`.
    ///
    /// # Safety
    /// A non-null `ptr` must have been acquired for the caller and be
    /// NUL-terminated.
    pub unsafe fn from_raw(api: &'static NativeApi, ptr: *mut c_char) -> Option<Self> {
        NonNull::new(ptr).map(|ptr| Self { ptr, api })
    }

    pub fn as_c_str(&self) -> &CStr {
        unsafe { CStr::from_ptr(self.ptr.as_ptr()) }
    }

    /// Copy out, replacing invalid UTF-8.
    pub fn to_string_lossy(&self) -> String {
        self.as_c_str().to_string_lossy().into_owned()
    }
}

impl Drop for NativeString {
    fn drop(&mut self) {
        unsafe { (self.api.magick_memory_relinquish)(self.ptr.as_ptr() as *mut c_void) };
    }
}

impl fmt::Debug for NativeString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("NativeString").field(&self.as_c_str()).finish()
    }
}

/// Deferred releases for one logical operation.
pub struct CleanupScope {
    api: &'static NativeApi,
    pending: Vec<NonNull<c_void>>,
}

impl CleanupScope {
    pub fn new(api: &'static NativeApi) -> Self {
        Self {
            api,
            pending: Vec::new(),
        }
    }

    /// Release `ptr` when the scope ends. NULL is ignored.
    ///
    /// # Safety
    /// A non-null `ptr` must have been acquired for the caller and must not
    /// be released elsewhere.
    pub unsafe fn defer(&mut self, ptr: *mut c_void) {
        if let Some(ptr) = NonNull::new(ptr) {
            self.pending.push(ptr);
        }
    }

    /// Copy an acquired string and defer its release.
    ///
    /// # Safety
    /// Same contract as [`defer`](Self::defer); the string must be
    /// NUL-terminated.
    pub unsafe fn string(&mut self, ptr: *mut c_char) -> Option<String> {
        if ptr.is_null() {
            return None;
        }
        unsafe { self.defer(ptr as *mut c_void) };
        Some(unsafe { CStr::from_ptr(ptr) }.to_string_lossy().into_owned())
    }

    /// Allocations still waiting for release.
    pub fn pending(&self) -> usize {
        self.pending.len()
    }
}

impl Drop for CleanupScope {
    fn drop(&mut self) {
        if !self.pending.is_empty() {
            tracing::trace!(count = self.pending.len(), "releasing native allocations");
        }
        while let Some(ptr) = self.pending.pop() {
            unsafe { (self.api.magick_memory_relinquish)(ptr.as_ptr()) };
        }
    }
}

impl fmt::Debug for CleanupScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CleanupScope")
            .field("pending", &self.pending.len())
            .finish()
    }
}

#[cfg(all(test, feature = "bundled"))]
mod tests {
    use super::*;
    use std::ffi::CString;
    use std::sync::OnceLock;

    use crate::native::memory_stats;

    fn api() -> &'static NativeApi {
        static API: OnceLock<NativeApi> = OnceLock::new();
        API.get_or_init(NativeApi::bundled)
    }

    fn acquired_string(text: &str) -> *mut c_char {
        let api = api();
        let text = CString::new(text).unwrap();
        let settings = unsafe { (api.magick_settings_create)() };
        unsafe {
            (api.magick_settings_format_set)(settings, text.as_ptr());
            let out = (api.magick_settings_format_get)(settings);
            (api.magick_settings_dispose)(settings);
            out
        }
    }

    #[test]
    fn test_native_string_released_on_drop() {
        let before = memory_stats(api());
        let string = unsafe { NativeString::from_raw(api(), acquired_string("PNM")) }.unwrap();
        assert_eq!(string.to_string_lossy(), "PNM");
        drop(string);
        let after = memory_stats(api());
        assert_eq!(after.acquired - before.acquired, after.released - before.released);
        assert_eq!(after.invalid_releases, before.invalid_releases);
    }

    #[test]
    fn test_null_is_not_tracked() {
        assert!(unsafe { NativeString::from_raw(api(), std::ptr::null_mut()) }.is_none());
        assert!(unsafe { NativeBuffer::<u8>::from_raw(api(), std::ptr::null_mut(), 4) }.is_none());
    }

    #[test]
    fn test_scope_releases_on_early_return() {
        fn read_two(fail: bool) -> Option<String> {
            let mut scope = CleanupScope::new(api());
            let first = unsafe { scope.string(acquired_string("first")) }?;
            if fail {
                return None;
            }
            let second = unsafe { scope.string(acquired_string("second")) }?;
            Some(first + &second)
        }

        let before = memory_stats(api());
        assert_eq!(read_two(false).as_deref(), Some("firstsecond"));
        assert!(read_two(true).is_none());
        let after = memory_stats(api());
        assert_eq!(after.acquired - before.acquired, after.released - before.released);
        assert_eq!(after.invalid_releases, before.invalid_releases);
    }

    #[test]
    fn test_scope_ignores_null() {
        let mut scope = CleanupScope::new(api());
        unsafe { scope.defer(std::ptr::null_mut()) };
        assert_eq!(scope.pending(), 0);
    }
}
