//! Native exception handles to [`MagickException`] trees.
//!
//! This is the only place that reads native error state. Each fallible call
//! gets an [`ExceptionSlot`]; after the call [`ExceptionBridge::check`]
//! translates whatever the native side stored there and releases it.

use std::ffi::CStr;
use std::os::raw::c_char;
use std::ptr;

use magick_ffi_common::RawException;

use crate::error::{Error, Result};
use crate::exception::{MagickException, Severity, UNKNOWN_ERROR};
use crate::native::{kind, NativeApi, NativeHandle, OwnedHandle};

/// Out-parameter a fallible native call stores its exception tree in.
///
/// Anything left in the slot is released when it drops.
pub struct ExceptionSlot {
    api: &'static NativeApi,
    raw: *mut RawException,
}

impl ExceptionSlot {
    pub fn new(api: &'static NativeApi) -> Self {
        Self {
            api,
            raw: ptr::null_mut(),
        }
    }

    /// Pointer to pass as the trailing `exception` argument.
    pub fn as_out(&mut self) -> *mut *mut RawException {
        &mut self.raw
    }

    pub fn is_set(&self) -> bool {
        !self.raw.is_null()
    }

    fn take(&mut self) -> *mut RawException {
        std::mem::replace(&mut self.raw, ptr::null_mut())
    }
}

impl Drop for ExceptionSlot {
    fn drop(&mut self) {
        let raw = self.take();
        if !raw.is_null() {
            unsafe { (self.api.magick_exception_dispose)(raw) };
        }
    }
}

/// Depth-guarded translation of native exception trees.
#[derive(Debug, Clone, Copy)]
pub struct ExceptionBridge {
    max_depth: usize,
}

impl ExceptionBridge {
    /// `max_depth` is the deepest level of related entries translated;
    /// anything nested deeper becomes an "unknown error" leaf.
    pub fn new(max_depth: usize) -> Self {
        Self {
            max_depth: max_depth.max(1),
        }
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Translate and release an owned native exception. NULL yields `None`.
    ///
    /// # Safety
    /// A non-null `raw` must be an owned exception handle from `api`.
    pub unsafe fn translate(
        &self,
        api: &'static NativeApi,
        raw: *mut RawException,
    ) -> Option<MagickException> {
        let handle = unsafe { OwnedHandle::<kind::Exception>::from_raw_optional(api, raw) }?;
        Some(self.translate_node(&handle, 0))
    }

    /// Translate the slot's content: errors become `Err`, warnings are
    /// returned for the caller's warning policy.
    pub fn check(&self, mut slot: ExceptionSlot) -> Result<Option<MagickException>> {
        let raw = slot.take();
        let Some(exception) = (unsafe { self.translate(slot.api, raw) }) else {
            return Ok(None);
        };
        if exception.is_warning() {
            Ok(Some(exception))
        } else {
            Err(Error::Magick(exception))
        }
    }

    fn translate_node(&self, node: &impl NativeHandle<kind::Exception>, level: usize) -> MagickException {
        let api = node.api();
        let ptr = node.as_const_ptr();

        let severity = Severity(unsafe { (api.magick_exception_severity)(ptr) });
        let message = match unsafe { read_str(api.magick_exception_message, ptr) } {
            Some(Ok(message)) => message,
            _ => {
                tracing::debug!(%severity, "unreadable native exception message");
                UNKNOWN_ERROR.to_string()
            }
        };
        let description = match unsafe { read_str(api.magick_exception_description, ptr) } {
            Some(Ok(description)) => Some(description),
            Some(Err(())) | None => None,
        };

        let count = unsafe { (api.magick_exception_related_count)(ptr) };
        let mut related = Vec::with_capacity(count.min(64));
        for index in 0..count {
            if level + 1 > self.max_depth {
                tracing::debug!(level, "native exception tree truncated");
                related.push(MagickException::unknown());
                continue;
            }
            let child = unsafe { (api.magick_exception_related)(ptr, index) };
            match unsafe { OwnedHandle::<kind::Exception>::from_raw_optional(api, child) } {
                Some(child) => related.push(self.translate_node(&child, level + 1)),
                None => related.push(MagickException::unknown()),
            }
        }

        MagickException {
            severity,
            message,
            description,
            related,
        }
    }
}

impl Default for ExceptionBridge {
    fn default() -> Self {
        Self::new(crate::config::InteropConfig::default().max_exception_depth)
    }
}

/// Read a borrowed string field. NULL yields `None`, invalid UTF-8 `Some(Err)`.
unsafe fn read_str(
    getter: unsafe extern "C" fn(*const RawException) -> *const c_char,
    ptr: *const RawException,
) -> Option<std::result::Result<String, ()>> {
    let text = unsafe { getter(ptr) };
    if text.is_null() {
        return None;
    }
    Some(
        unsafe { CStr::from_ptr(text) }
            .to_str()
            .map(str::to_string)
            .map_err(|_| ()),
    )
}
