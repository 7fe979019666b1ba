//! Function table of the native library.
//!
//! Every symbol the binding calls is declared once here. The table is filled
//! either from the statically linked engine or by resolving the same names
//! in a shared library, so both paths share one signature list. With the
//! `bundled` feature a signature that drifts from the engine's export fails
//! to compile.

use std::os::raw::{c_char, c_void};

use libloading::Library;
use magick_ffi_common::{
    ExtentC, GeometryInfoC, MemoryStatsC, RawColor, RawException, RawGeometry, RawImage,
    RawImageList, RawSettings,
};

use crate::error::{Error, Result};
use crate::quantum::Quantum;

macro_rules! native_api {
    ($(
        $(#[$meta:meta])*
        fn $name:ident($($arg:ty),* $(,)?) $(-> $ret:ty)?;
    )*) => {
        /// Native entry points, one field per exported symbol.
        #[derive(Clone, Copy)]
        pub struct NativeApi {
            $(
                $(#[$meta])*
                pub $name: unsafe extern "C" fn($($arg),*) $(-> $ret)?,
            )*
        }

        impl NativeApi {
            /// Table pointing at the statically linked engine.
            #[cfg(feature = "bundled")]
            pub fn bundled() -> Self {
                Self {
                    $($name: magick_native::ffi::$name,)*
                }
            }

            /// Resolve every symbol from `library`.
            ///
            /// # Safety
            /// `library` must export each symbol with the declared signature
            /// and must outlive the returned table.
            pub(crate) unsafe fn resolve(library: &Library) -> Result<Self> {
                Ok(Self {
                    $(
                        $name: unsafe {
                            *library
                                .get::<unsafe extern "C" fn($($arg),*) $(-> $ret)?>(
                                    concat!(stringify!($name), "\0").as_bytes(),
                                )
                                .map_err(|e| Error::MissingSymbol {
                                    symbol: stringify!($name),
                                    message: e.to_string(),
                                })?
                        },
                    )*
                })
            }

            /// Number of entry points in the table.
            pub const SYMBOL_COUNT: usize = [$(stringify!($name)),*].len();
        }
    };
}

native_api! {
    // Library
    fn magick_native_version() -> *const c_char;
    fn magick_native_quantum_depth() -> u32;
    fn magick_native_quantum_is_hdri() -> bool;
    fn magick_native_set_cache_directory(*const c_char);
    fn magick_native_cache_directory() -> *mut c_char;

    // Memory
    /// Release a string or buffer the native side acquired for the caller.
    fn magick_memory_relinquish(*mut c_void);
    fn magick_memory_stats(*mut MemoryStatsC) -> bool;

    // Exception
    fn magick_exception_create(u32, *const c_char, *const c_char) -> *mut RawException;
    fn magick_exception_add_related(*mut RawException, *mut RawException) -> bool;
    fn magick_exception_dispose(*mut RawException);
    fn magick_exception_severity(*const RawException) -> u32;
    fn magick_exception_message(*const RawException) -> *const c_char;
    fn magick_exception_description(*const RawException) -> *const c_char;
    fn magick_exception_related_count(*const RawException) -> usize;
    fn magick_exception_related(*const RawException, usize) -> *mut RawException;

    // Color
    fn magick_color_create() -> *mut RawColor;
    fn magick_color_dispose(*mut RawColor);
    fn magick_color_red_get(*const RawColor) -> Quantum;
    fn magick_color_red_set(*mut RawColor, Quantum);
    fn magick_color_green_get(*const RawColor) -> Quantum;
    fn magick_color_green_set(*mut RawColor, Quantum);
    fn magick_color_blue_get(*const RawColor) -> Quantum;
    fn magick_color_blue_set(*mut RawColor, Quantum);
    fn magick_color_alpha_get(*const RawColor) -> Quantum;
    fn magick_color_alpha_set(*mut RawColor, Quantum);
    fn magick_color_black_get(*const RawColor) -> Quantum;
    fn magick_color_black_set(*mut RawColor, Quantum);
    fn magick_color_is_cmyk_get(*const RawColor) -> bool;
    fn magick_color_is_cmyk_set(*mut RawColor, bool);
    fn magick_color_initialize(*mut RawColor, *const c_char, *mut *mut RawException) -> bool;
    fn magick_color_to_string(*const RawColor) -> *mut c_char;

    // Geometry
    fn magick_geometry_create() -> *mut RawGeometry;
    fn magick_geometry_dispose(*mut RawGeometry);
    fn magick_geometry_initialize(*mut RawGeometry, *const c_char) -> u32;
    fn magick_geometry_info_get(*const RawGeometry) -> GeometryInfoC;
    fn magick_geometry_info_set(*mut RawGeometry, GeometryInfoC);
    fn magick_geometry_to_string(*const RawGeometry) -> *mut c_char;

    // Settings
    fn magick_settings_create() -> *mut RawSettings;
    fn magick_settings_dispose(*mut RawSettings);
    fn magick_settings_format_set(*mut RawSettings, *const c_char);
    fn magick_settings_format_get(*const RawSettings) -> *mut c_char;
    fn magick_settings_extent_get(*const RawSettings) -> ExtentC;
    fn magick_settings_extent_set(*mut RawSettings, ExtentC);
    fn magick_settings_ping_get(*const RawSettings) -> bool;
    fn magick_settings_ping_set(*mut RawSettings, bool);
    fn magick_settings_set_option(*mut RawSettings, *const c_char, *const c_char) -> bool;
    fn magick_settings_get_option(*const RawSettings, *const c_char) -> *mut c_char;
    fn magick_settings_remove_option(*mut RawSettings, *const c_char) -> bool;

    // Image list
    fn magick_image_list_read_blob(
        *const u8,
        usize,
        *const RawSettings,
        *mut *mut RawException,
    ) -> *mut RawImageList;
    fn magick_image_list_read_file(
        *const c_char,
        *const RawSettings,
        *mut *mut RawException,
    ) -> *mut RawImageList;
    fn magick_image_list_create() -> *mut RawImageList;
    fn magick_image_list_dispose(*mut RawImageList);
    fn magick_image_list_count(*const RawImageList) -> usize;
    /// Borrowed frame.
    fn magick_image_list_get(*mut RawImageList, usize) -> *mut RawImage;
    /// Owned, detached frame.
    fn magick_image_list_remove(*mut RawImageList, usize) -> *mut RawImage;
    /// Takes ownership of the image.
    fn magick_image_list_append(*mut RawImageList, *mut RawImage) -> bool;
    fn magick_image_list_write_blob(
        *const RawImageList,
        *const RawSettings,
        *mut usize,
        *mut *mut RawException,
    ) -> *mut u8;

    // Image
    fn magick_image_clone(*const RawImage) -> *mut RawImage;
    fn magick_image_dispose(*mut RawImage);
    fn magick_image_width(*const RawImage) -> usize;
    fn magick_image_height(*const RawImage) -> usize;
    fn magick_image_depth(*const RawImage) -> u32;
    fn magick_image_channel_count(*const RawImage) -> usize;
    fn magick_image_has_alpha(*const RawImage) -> bool;
    fn magick_image_format_get(*const RawImage) -> *mut c_char;
    fn magick_image_format_set(*mut RawImage, *const c_char) -> bool;
    fn magick_image_get_pixels(
        *const RawImage,
        isize,
        isize,
        usize,
        usize,
        *mut usize,
        *mut *mut RawException,
    ) -> *mut Quantum;
    fn magick_image_set_pixels(
        *mut RawImage,
        isize,
        isize,
        usize,
        usize,
        *const Quantum,
        usize,
        *mut *mut RawException,
    ) -> bool;
    fn magick_image_pixel_color(
        *const RawImage,
        isize,
        isize,
        *mut *mut RawException,
    ) -> *mut RawColor;
    /// Borrowed bytes.
    fn magick_image_get_profile(*const RawImage, *const c_char, *mut usize) -> *const u8;
    fn magick_image_set_profile(*mut RawImage, *const c_char, *const u8, usize) -> bool;
    fn magick_image_remove_profile(*mut RawImage, *const c_char) -> bool;
    fn magick_image_profile_names(*const RawImage) -> *mut c_char;
    fn magick_image_get_attribute(*const RawImage, *const c_char) -> *mut c_char;
    fn magick_image_set_attribute(*mut RawImage, *const c_char, *const c_char) -> bool;
    fn magick_image_write_blob(
        *const RawImage,
        *const RawSettings,
        *mut usize,
        *mut *mut RawException,
    ) -> *mut u8;
}

impl std::fmt::Debug for NativeApi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NativeApi")
            .field("symbols", &Self::SYMBOL_COUNT)
            .finish()
    }
}
