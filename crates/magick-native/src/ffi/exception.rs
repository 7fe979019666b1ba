//! Exception handles.

use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::ptr;

use magick_ffi_common::abi::severity;
use magick_ffi_common::RawException;

use super::{instance, instance_mut};
use crate::exception::ExceptionNode;
use crate::memory::{self, InstanceKind};

/// Instance behind a `RawException`. Strings are kept as C strings so the
/// accessors can lend them out.
#[derive(Debug, Clone)]
pub struct ExceptionInstance {
    pub severity: u32,
    pub message: CString,
    pub description: Option<CString>,
    pub related: Vec<ExceptionInstance>,
}

impl From<ExceptionNode> for ExceptionInstance {
    fn from(node: ExceptionNode) -> Self {
        Self {
            severity: node.severity,
            message: CString::new(node.message).unwrap_or_default(),
            description: node
                .description
                .map(|d| CString::new(d).unwrap_or_default()),
            related: node.related.into_iter().map(Self::from).collect(),
        }
    }
}

unsafe fn exception_ref<'a>(ptr: *const RawException) -> Option<&'a ExceptionInstance> {
    unsafe { instance(ptr, InstanceKind::Exception) }
}

// ============================================================================
// Lifecycle
// ============================================================================

/// Create a standalone exception. Message bytes are kept verbatim.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn magick_exception_create(
    severity: u32,
    message: *const c_char,
    description: *const c_char,
) -> *mut RawException {
    let copy = |text: *const c_char| {
        (!text.is_null()).then(|| unsafe { CStr::from_ptr(text) }.to_owned())
    };
    let exception = ExceptionInstance {
        severity,
        message: copy(message).unwrap_or_default(),
        description: copy(description),
        related: Vec::new(),
    };
    memory::register_instance(exception, InstanceKind::Exception) as *mut RawException
}

/// Attach `child` as the last related exception. Takes ownership of `child`
/// even when the parent is invalid.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn magick_exception_add_related(
    parent: *mut RawException,
    child: *mut RawException,
) -> bool {
    let Some(child) = (unsafe {
        memory::take_instance(child as *mut ExceptionInstance, InstanceKind::Exception)
    }) else {
        return false;
    };
    match unsafe { instance_mut::<_, ExceptionInstance>(parent, InstanceKind::Exception) } {
        Some(parent) => {
            parent.related.push(*child);
            true
        }
        None => false,
    }
}

#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn magick_exception_dispose(exception: *mut RawException) {
    unsafe {
        memory::dispose_instance(exception as *mut ExceptionInstance, InstanceKind::Exception)
    }
}

// ============================================================================
// Accessors
// ============================================================================

/// `UNDEFINED` for an invalid handle.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn magick_exception_severity(exception: *const RawException) -> u32 {
    unsafe { exception_ref(exception) }
        .map(|e| e.severity)
        .unwrap_or(severity::UNDEFINED)
}

/// Borrowed, valid while the exception lives.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn magick_exception_message(exception: *const RawException) -> *const c_char {
    unsafe { exception_ref(exception) }
        .map(|e| e.message.as_ptr())
        .unwrap_or(ptr::null())
}

/// Borrowed, NULL when the exception has no description.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn magick_exception_description(exception: *const RawException) -> *const c_char {
    unsafe { exception_ref(exception) }
        .and_then(|e| e.description.as_ref())
        .map(|d| d.as_ptr())
        .unwrap_or(ptr::null())
}

#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn magick_exception_related_count(exception: *const RawException) -> usize {
    unsafe { exception_ref(exception) }
        .map(|e| e.related.len())
        .unwrap_or(0)
}

/// Owned copy of the related exception at `index`, NULL when out of range.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn magick_exception_related(
    exception: *const RawException,
    index: usize,
) -> *mut RawException {
    match unsafe { exception_ref(exception) }.and_then(|e| e.related.get(index)) {
        Some(related) => {
            memory::register_instance(related.clone(), InstanceKind::Exception)
                as *mut RawException
        }
        None => ptr::null_mut(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(exception: *const RawException) -> String {
        unsafe { CStr::from_ptr(magick_exception_message(exception)) }
            .to_str()
            .unwrap()
            .to_string()
    }

    #[test]
    fn test_related_are_kept_in_order() {
        let msg = |s: &str| CString::new(s).unwrap();
        let (root_msg, a_msg, b_msg) = (msg("root"), msg("a"), msg("b"));
        let root = magick_exception_create(425, root_msg.as_ptr(), ptr::null());
        let a = magick_exception_create(325, a_msg.as_ptr(), ptr::null());
        let b = magick_exception_create(330, b_msg.as_ptr(), ptr::null());
        assert!(magick_exception_add_related(root, a));
        assert!(magick_exception_add_related(root, b));

        assert_eq!(magick_exception_related_count(root), 2);
        let first = magick_exception_related(root, 0);
        let second = magick_exception_related(root, 1);
        assert_eq!(message(first), "a");
        assert_eq!(magick_exception_severity(second), 330);
        assert!(magick_exception_related(root, 2).is_null());
        assert!(magick_exception_description(root).is_null());

        magick_exception_dispose(first);
        magick_exception_dispose(second);
        magick_exception_dispose(root);
    }

    #[test]
    fn test_disposed_handle_reads_as_invalid() {
        let before = memory::stats();
        let exception = magick_exception_create(400, ptr::null(), ptr::null());
        magick_exception_dispose(exception);
        assert_eq!(magick_exception_severity(exception), severity::UNDEFINED);
        magick_exception_dispose(exception);
        let after = memory::stats();
        assert_eq!(after.invalid_releases - before.invalid_releases, 1);
    }

    #[test]
    fn test_from_node_keeps_tree() {
        let mut node = ExceptionNode::new(425, "error");
        node.related.push(ExceptionNode::new(325, "warn").with_description("detail"));
        let instance = ExceptionInstance::from(node);
        assert_eq!(instance.related.len(), 1);
        assert_eq!(
            instance.related[0].description.as_deref(),
            Some(CString::new("detail").unwrap().as_c_str())
        );
    }
}
