//! Owned and borrowed native handles.
//!
//! A handle that came from a create, read, clone or remove call is an
//! [`OwnedHandle`]: exactly one exists per native object and dropping it
//! calls the matching dispose function once. A handle returned by a get
//! call is a [`BorrowedHandle`] tied to the lifetime of its owner and is
//! never released by the binding.
//!
//! Handles are `Send` but not `Sync`. Moving one to another thread is fine;
//! sharing one between threads needs external synchronization.

use std::fmt;
use std::marker::PhantomData;
use std::mem;
use std::ptr::NonNull;

use magick_ffi_common::{
    ExtentC, GeometryInfoC, RawColor, RawException, RawGeometry, RawImage, RawImageList,
    RawSettings,
};

use crate::error::{Error, Result};
use crate::native::NativeApi;

/// Kind of native object behind a handle.
pub trait HandleKind: 'static {
    /// Opaque type the native functions take.
    type Raw;
    /// Name used in errors and logs.
    const NAME: &'static str;

    fn dispose_fn(api: &NativeApi) -> unsafe extern "C" fn(*mut Self::Raw);
}

/// Marker types for [`HandleKind`].
pub mod kind {
    use super::*;

    macro_rules! handle_kind {
        ($name:ident, $raw:ty, $label:literal, $dispose:ident) => {
            #[derive(Debug)]
            pub enum $name {}

            impl HandleKind for $name {
                type Raw = $raw;
                const NAME: &'static str = $label;

                fn dispose_fn(api: &NativeApi) -> unsafe extern "C" fn(*mut $raw) {
                    api.$dispose
                }
            }
        };
    }

    handle_kind!(Color, RawColor, "color", magick_color_dispose);
    handle_kind!(Geometry, RawGeometry, "geometry", magick_geometry_dispose);
    handle_kind!(Settings, RawSettings, "settings", magick_settings_dispose);
    handle_kind!(Exception, RawException, "exception", magick_exception_dispose);
    handle_kind!(Image, RawImage, "image", magick_image_dispose);
    handle_kind!(ImageList, RawImageList, "image list", magick_image_list_dispose);
}

mod sealed {
    pub trait Sealed {}
}

/// Values a [`Field`] can carry: quantum samples, flags, sizes and the small
/// `#[repr(C)]` structs of the boundary.
pub trait FieldValue: Copy + sealed::Sealed {}

macro_rules! field_values {
    ($($ty:ty),*) => {
        $(
            impl sealed::Sealed for $ty {}
            impl FieldValue for $ty {}
        )*
    };
}

field_values!(u8, u16, f32, u32, usize, bool, ExtentC, GeometryInfoC);

/// One typed native field with its accessor functions.
pub struct Field<K: HandleKind, T: FieldValue> {
    name: &'static str,
    get: unsafe extern "C" fn(*const K::Raw) -> T,
    set: Option<unsafe extern "C" fn(*mut K::Raw, T)>,
}

impl<K: HandleKind, T: FieldValue> Field<K, T> {
    pub const fn read_write(
        name: &'static str,
        get: unsafe extern "C" fn(*const K::Raw) -> T,
        set: unsafe extern "C" fn(*mut K::Raw, T),
    ) -> Self {
        Self {
            name,
            get,
            set: Some(set),
        }
    }

    pub const fn read_only(
        name: &'static str,
        get: unsafe extern "C" fn(*const K::Raw) -> T,
    ) -> Self {
        Self {
            name,
            get,
            set: None,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl<K: HandleKind, T: FieldValue> Clone for Field<K, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<K: HandleKind, T: FieldValue> Copy for Field<K, T> {}

/// Access shared by owned and borrowed handles.
pub trait NativeHandle<K: HandleKind> {
    /// Never NULL.
    fn as_ptr(&self) -> *mut K::Raw;

    fn api(&self) -> &'static NativeApi;

    fn as_const_ptr(&self) -> *const K::Raw {
        self.as_ptr() as *const K::Raw
    }

    fn get<T: FieldValue>(&self, field: Field<K, T>) -> T {
        unsafe { (field.get)(self.as_const_ptr()) }
    }

    fn set<T: FieldValue>(&mut self, field: Field<K, T>, value: T) -> Result<()> {
        let Some(set) = field.set else {
            return Err(Error::invalid_argument(format!(
                "{} field `{}` is read-only",
                K::NAME,
                field.name
            )));
        };
        unsafe { set(self.as_ptr(), value) };
        Ok(())
    }
}

/// Sole owner of a native object.
pub struct OwnedHandle<K: HandleKind> {
    ptr: NonNull<K::Raw>,
    api: &'static NativeApi,
}

// The native object is only touched through this handle, so it may move
// between threads. It is not Sync: native objects are not internally locked.
unsafe impl<K: HandleKind> Send for OwnedHandle<K> {}

impl<K: HandleKind> OwnedHandle<K> {
    /// Take ownership of a pointer returned by a create-style call.
    ///
    /// # Safety
    /// A non-null `ptr` must be an owned `K` object from `api` that nothing
    /// else will release.
    pub unsafe fn from_raw(api: &'static NativeApi, ptr: *mut K::Raw) -> Result<Self> {
        let ptr = NonNull::new(ptr).ok_or(Error::InvalidHandle { kind: K::NAME })?;
        tracing::trace!(kind = K::NAME, ptr = ?ptr, "native handle acquired");
        Ok(Self { ptr, api })
    }

    /// Take ownership of a factory result; NULL is an allocation failure.
    ///
    /// # Safety
    /// Same contract as [`from_raw`](Self::from_raw).
    pub unsafe fn from_created(api: &'static NativeApi, ptr: *mut K::Raw) -> Result<Self> {
        if ptr.is_null() {
            return Err(Error::Allocation(K::NAME));
        }
        unsafe { Self::from_raw(api, ptr) }
    }

    /// Like [`from_raw`](Self::from_raw) but NULL means "nothing returned".
    ///
    /// # Safety
    /// Same contract as [`from_raw`](Self::from_raw).
    pub unsafe fn from_raw_optional(api: &'static NativeApi, ptr: *mut K::Raw) -> Option<Self> {
        unsafe { Self::from_raw(api, ptr) }.ok()
    }

    pub fn borrow(&self) -> BorrowedHandle<'_, K> {
        BorrowedHandle {
            ptr: self.ptr,
            api: self.api,
            _owner: PhantomData,
        }
    }

    /// Give up ownership without disposing, for calls that take ownership.
    pub fn into_raw(self) -> *mut K::Raw {
        let ptr = self.ptr.as_ptr();
        mem::forget(self);
        ptr
    }
}

impl<K: HandleKind> NativeHandle<K> for OwnedHandle<K> {
    fn as_ptr(&self) -> *mut K::Raw {
        self.ptr.as_ptr()
    }

    fn api(&self) -> &'static NativeApi {
        self.api
    }
}

impl<K: HandleKind> Drop for OwnedHandle<K> {
    fn drop(&mut self) {
        tracing::trace!(kind = K::NAME, ptr = ?self.ptr, "native handle released");
        unsafe { K::dispose_fn(self.api)(self.ptr.as_ptr()) };
    }
}

impl<K: HandleKind> fmt::Debug for OwnedHandle<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OwnedHandle")
            .field("kind", &K::NAME)
            .field("ptr", &self.ptr)
            .finish()
    }
}

/// Handle lent out by another native object; valid for `'a`.
pub struct BorrowedHandle<'a, K: HandleKind> {
    ptr: NonNull<K::Raw>,
    api: &'static NativeApi,
    _owner: PhantomData<&'a ()>,
}

impl<'a, K: HandleKind> BorrowedHandle<'a, K> {
    /// Wrap a pointer returned by a get-style call.
    ///
    /// # Safety
    /// A non-null `ptr` must stay valid for `'a` and must not be released by
    /// the binding.
    pub unsafe fn from_raw(api: &'static NativeApi, ptr: *mut K::Raw) -> Result<Self> {
        let ptr = NonNull::new(ptr).ok_or(Error::InvalidHandle { kind: K::NAME })?;
        Ok(Self {
            ptr,
            api,
            _owner: PhantomData,
        })
    }
}

impl<K: HandleKind> NativeHandle<K> for BorrowedHandle<'_, K> {
    fn as_ptr(&self) -> *mut K::Raw {
        self.ptr.as_ptr()
    }

    fn api(&self) -> &'static NativeApi {
        self.api
    }
}

impl<K: HandleKind> fmt::Debug for BorrowedHandle<'_, K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BorrowedHandle")
            .field("kind", &K::NAME)
            .field("ptr", &self.ptr)
            .finish()
    }
}

#[cfg(all(test, feature = "bundled"))]
mod tests {
    use super::*;
    use std::ptr;
    use std::sync::OnceLock;

    use crate::native::memory_stats;
    use crate::quantum::{self, Quantum, QuantumSample};

    fn api() -> &'static NativeApi {
        static API: OnceLock<NativeApi> = OnceLock::new();
        API.get_or_init(NativeApi::bundled)
    }

    fn new_color() -> OwnedHandle<kind::Color> {
        let api = api();
        unsafe { OwnedHandle::from_raw(api, (api.magick_color_create)()) }.unwrap()
    }

    #[test]
    fn test_null_is_invalid_handle() {
        let err =
            unsafe { OwnedHandle::<kind::Image>::from_raw(api(), ptr::null_mut()) }.unwrap_err();
        assert!(matches!(err, Error::InvalidHandle { kind: "image" }));
        let borrowed = unsafe { BorrowedHandle::<kind::Image>::from_raw(api(), ptr::null_mut()) };
        assert!(borrowed.is_err());
    }

    #[test]
    fn test_field_round_trip() {
        let mut color = new_color();
        let red: Field<kind::Color, Quantum> =
            Field::read_write("red", api().magick_color_red_get, api().magick_color_red_set);
        color.set(red, quantum::from_u8(200)).unwrap();
        assert_eq!(color.get(red), quantum::from_u8(200));
        assert_eq!(color.borrow().get(red), quantum::from_u8(200));
    }

    #[test]
    fn test_read_only_field_rejects_set() {
        let api = api();
        let mut geometry: OwnedHandle<kind::Geometry> =
            unsafe { OwnedHandle::from_raw(api, (api.magick_geometry_create)()) }.unwrap();
        let info: Field<kind::Geometry, GeometryInfoC> =
            Field::read_only("info", api.magick_geometry_info_get);
        assert!(geometry.set(info, GeometryInfoC::default()).is_err());
    }

    #[test]
    fn test_drop_releases_exactly_once() {
        let before = memory_stats(api());
        let color = new_color();
        drop(color);
        let after = memory_stats(api());
        assert_eq!(after.acquired - before.acquired, 1);
        assert_eq!(after.released - before.released, 1);
        assert_eq!(after.invalid_releases, before.invalid_releases);
    }

    #[test]
    fn test_into_raw_skips_dispose() {
        let api = api();
        let before = memory_stats(api);
        let raw = new_color().into_raw();
        assert_eq!(memory_stats(api).released, before.released);
        unsafe { (api.magick_color_dispose)(raw) };
        assert_eq!(memory_stats(api).released - before.released, 1);
    }

    #[test]
    fn test_handles_move_across_threads() {
        let color = new_color();
        let value = std::thread::spawn(move || {
            let field: Field<kind::Color, Quantum> =
                Field::read_only("alpha", color.api().magick_color_alpha_get);
            color.get(field)
        })
        .join()
        .unwrap();
        assert_eq!(value, Quantum::from_f64(quantum::QUANTUM_MAX));
    }
}
