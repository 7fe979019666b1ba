//! Tracking allocator for everything the engine hands across the boundary.
//!
//! Every instance handle and every acquired buffer is registered under its
//! address. Releasing goes through the registry first, so a double release or
//! a foreign pointer is detected and counted instead of being freed twice.
//! Counters are kept per thread, which lets tests running in parallel assert
//! on their own allocations only.

use std::cell::Cell;
use std::os::raw::{c_char, c_void};
use std::ptr;

use ahash::AHashMap;
use lazy_static::lazy_static;
use parking_lot::Mutex;

use magick_ffi_common::{free_boxed_slice, free_cstring, vec_into_raw, MemoryStatsC};

use crate::quantum::Quantum;

/// Kind of registered instance handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstanceKind {
    Color,
    Geometry,
    Settings,
    Exception,
    Image,
    ImageList,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Allocation {
    CString,
    Bytes { len: usize },
    Quanta { len: usize },
    Instance(InstanceKind),
}

lazy_static! {
    static ref REGISTRY: Mutex<AHashMap<usize, Allocation>> = Mutex::new(AHashMap::new());
}

thread_local! {
    static STATS: Cell<MemoryStatsC> = const { Cell::new(MemoryStatsC {
        acquired: 0,
        released: 0,
        invalid_releases: 0,
    }) };
}

fn record(update: impl FnOnce(&mut MemoryStatsC)) {
    STATS.with(|stats| {
        let mut current = stats.get();
        update(&mut current);
        stats.set(current);
    });
}

fn register(addr: usize, allocation: Allocation) {
    REGISTRY.lock().insert(addr, allocation);
    record(|s| s.acquired += 1);
}

fn record_invalid(addr: usize) {
    tracing::trace!(addr, "invalid native release ignored");
    record(|s| s.invalid_releases += 1);
}

/// Counters for the calling thread.
pub fn stats() -> MemoryStatsC {
    STATS.with(Cell::get)
}

/// Hand a string to the caller. Interior NUL bytes produce an empty string.
pub fn acquire_string(value: &str) -> *mut c_char {
    let ptr = magick_ffi_common::cstring_new_or_empty(value);
    register(ptr as usize, Allocation::CString);
    ptr
}

/// Hand a byte buffer to the caller. Empty buffers are returned as NULL.
pub fn acquire_bytes(bytes: Vec<u8>) -> (*mut u8, usize) {
    let (ptr, len) = vec_into_raw(bytes);
    if !ptr.is_null() {
        register(ptr as usize, Allocation::Bytes { len });
    }
    (ptr, len)
}

/// Hand a quantum buffer to the caller. Empty buffers are returned as NULL.
pub fn acquire_quanta(quanta: Vec<Quantum>) -> (*mut Quantum, usize) {
    let (ptr, len) = vec_into_raw(quanta);
    if !ptr.is_null() {
        register(ptr as usize, Allocation::Quanta { len });
    }
    (ptr, len)
}

/// Release a buffer or string acquired for the caller.
///
/// # Safety
/// `ptr` must be NULL or a pointer previously returned by one of the
/// `acquire_*` functions. Unknown pointers are counted and ignored.
pub unsafe fn relinquish(ptr: *mut c_void) {
    if ptr.is_null() {
        return;
    }
    let addr = ptr as usize;
    let allocation = {
        let mut registry = REGISTRY.lock();
        match registry.get(&addr).copied() {
            Some(Allocation::Instance(_)) | None => None,
            Some(found) => {
                registry.remove(&addr);
                Some(found)
            }
        }
    };
    match allocation {
        Some(Allocation::CString) => unsafe { free_cstring(ptr as *mut c_char) },
        Some(Allocation::Bytes { len }) => unsafe { free_boxed_slice(ptr as *mut u8, len) },
        Some(Allocation::Quanta { len }) => unsafe { free_boxed_slice(ptr as *mut Quantum, len) },
        Some(Allocation::Instance(_)) | None => {
            record_invalid(addr);
            return;
        }
    }
    record(|s| s.released += 1);
}

/// Register a new instance and return its handle.
pub fn register_instance<T>(value: T, kind: InstanceKind) -> *mut T {
    register_boxed(Box::new(value), kind)
}

/// Register an already boxed instance without moving it.
pub fn register_boxed<T>(value: Box<T>, kind: InstanceKind) -> *mut T {
    let ptr = Box::into_raw(value);
    register(ptr as usize, Allocation::Instance(kind));
    ptr
}

/// Remove an instance from the registry and take back ownership.
///
/// Returns `None` (and counts an invalid release) for NULL, unknown, or
/// mismatched pointers.
///
/// # Safety
/// When the pointer is registered as `kind`, it must point to a live `T`.
pub unsafe fn take_instance<T>(ptr: *mut T, kind: InstanceKind) -> Option<Box<T>> {
    if ptr.is_null() {
        return None;
    }
    let addr = ptr as usize;
    let known = {
        let mut registry = REGISTRY.lock();
        if registry.get(&addr) == Some(&Allocation::Instance(kind)) {
            registry.remove(&addr);
            true
        } else {
            false
        }
    };
    if !known {
        record_invalid(addr);
        return None;
    }
    record(|s| s.released += 1);
    Some(unsafe { Box::from_raw(ptr) })
}

/// Release an instance. NULL is a no-op; unknown pointers are counted.
///
/// # Safety
/// Same contract as [`take_instance`].
pub unsafe fn dispose_instance<T>(ptr: *mut T, kind: InstanceKind) {
    if ptr.is_null() {
        return;
    }
    drop(unsafe { take_instance(ptr, kind) });
}

/// Whether `ptr` is a live instance of `kind`.
pub fn is_live_instance<T>(ptr: *const T, kind: InstanceKind) -> bool {
    !ptr.is_null() && REGISTRY.lock().get(&(ptr as usize)) == Some(&Allocation::Instance(kind))
}

/// Reset an out-parameter to NULL.
///
/// # Safety
/// `out` must be NULL or valid for writes.
pub(crate) unsafe fn null_out<T>(out: *mut *mut T) {
    if !out.is_null() {
        unsafe { *out = ptr::null_mut() };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_acquire_and_relinquish_string() {
        let before = stats();
        let ptr = acquire_string("hello");
        assert!(!ptr.is_null());
        unsafe { relinquish(ptr as *mut c_void) };
        let after = stats();
        assert_eq!(after.acquired - before.acquired, 1);
        assert_eq!(after.released - before.released, 1);
        assert_eq!(after.invalid_releases, before.invalid_releases);
    }

    #[test]
    fn test_double_relinquish_is_counted_not_freed() {
        let before = stats();
        let (ptr, len) = acquire_bytes(vec![1, 2, 3]);
        assert_eq!(len, 3);
        unsafe {
            relinquish(ptr as *mut c_void);
            relinquish(ptr as *mut c_void);
        }
        let after = stats();
        assert_eq!(after.released - before.released, 1);
        assert_eq!(after.invalid_releases - before.invalid_releases, 1);
    }

    #[test]
    fn test_empty_buffers_are_null() {
        let (ptr, len) = acquire_quanta(Vec::new());
        assert!(ptr.is_null());
        assert_eq!(len, 0);
    }

    #[test]
    fn test_instance_kind_mismatch_rejected() {
        let ptr = register_instance(7u32, InstanceKind::Color);
        assert!(unsafe { take_instance(ptr, InstanceKind::Image) }.is_none());
        assert!(is_live_instance(ptr, InstanceKind::Color));
        let value = unsafe { take_instance(ptr, InstanceKind::Color) }.unwrap();
        assert_eq!(*value, 7);
        assert!(!is_live_instance(ptr, InstanceKind::Color));
    }

    #[test]
    fn test_relinquish_refuses_instances() {
        let before = stats();
        let ptr = register_instance(1u8, InstanceKind::Settings);
        unsafe { relinquish(ptr as *mut c_void) };
        assert!(is_live_instance(ptr, InstanceKind::Settings));
        unsafe { dispose_instance(ptr, InstanceKind::Settings) };
        let after = stats();
        assert_eq!(after.invalid_releases - before.invalid_releases, 1);
    }
}
