//! Types shared byte-for-byte across the native boundary.

use std::marker::{PhantomData, PhantomPinned};

macro_rules! opaque_handle {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[repr(C)]
        pub struct $name {
            _data: [u8; 0],
            _marker: PhantomData<(*mut u8, PhantomPinned)>,
        }
    };
}

opaque_handle!(
    /// Native color instance (R, G, B, A, K channels plus a CMYK flag).
    RawColor
);
opaque_handle!(
    /// Native geometry instance.
    RawGeometry
);
opaque_handle!(
    /// Native read/write settings instance.
    RawSettings
);
opaque_handle!(
    /// Native exception tree node.
    RawException
);
opaque_handle!(
    /// Native image.
    RawImage
);
opaque_handle!(
    /// Native ordered list of images (frames).
    RawImageList
);

/// Geometry value passed by value across the boundary.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GeometryInfoC {
    pub x: isize,
    pub y: isize,
    pub width: usize,
    pub height: usize,
    /// Bit set of [`geometry_flags`].
    pub flags: u32,
}

/// Canvas extent used by settings.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExtentC {
    pub width: usize,
    pub height: usize,
}

/// Per-thread allocation counters of the native allocator.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MemoryStatsC {
    /// Buffers and instances handed out on this thread
    pub acquired: u64,
    /// Successful releases on this thread
    pub released: u64,
    /// Releases of pointers the allocator did not know (double free, foreign pointer)
    pub invalid_releases: u64,
}

/// Geometry parse flags, numbered like ImageMagick's `GeometryFlags`.
pub mod geometry_flags {
    pub const NO_VALUE: u32 = 0x0000;
    pub const X_VALUE: u32 = 0x0001;
    pub const Y_VALUE: u32 = 0x0002;
    pub const WIDTH_VALUE: u32 = 0x0004;
    pub const HEIGHT_VALUE: u32 = 0x0008;
    pub const PERCENT_VALUE: u32 = 0x1000;
    pub const ASPECT_VALUE: u32 = 0x2000;
    pub const LESS_VALUE: u32 = 0x4000;
    pub const GREATER_VALUE: u32 = 0x8000;
    pub const AREA_VALUE: u32 = 0x10000;
    pub const MINIMUM_VALUE: u32 = 0x40000;
    pub const ASPECT_RATIO_VALUE: u32 = 0x100000;
}

/// Exception severities, numbered like ImageMagick's `ExceptionType`.
///
/// Values below [`ERROR`](severity::ERROR) are warnings, values at or above
/// [`FATAL_ERROR`](severity::FATAL_ERROR) are fatal.
pub mod severity {
    pub const UNDEFINED: u32 = 0;
    pub const WARNING: u32 = 300;
    pub const RESOURCE_LIMIT_WARNING: u32 = 300;
    pub const TYPE_WARNING: u32 = 305;
    pub const OPTION_WARNING: u32 = 310;
    pub const DELEGATE_WARNING: u32 = 315;
    pub const MISSING_DELEGATE_WARNING: u32 = 320;
    pub const CORRUPT_IMAGE_WARNING: u32 = 325;
    pub const FILE_OPEN_WARNING: u32 = 330;
    pub const BLOB_WARNING: u32 = 335;
    pub const STREAM_WARNING: u32 = 340;
    pub const CACHE_WARNING: u32 = 345;
    pub const CODER_WARNING: u32 = 350;
    pub const FILTER_WARNING: u32 = 352;
    pub const MODULE_WARNING: u32 = 355;
    pub const DRAW_WARNING: u32 = 360;
    pub const IMAGE_WARNING: u32 = 365;
    pub const WAND_WARNING: u32 = 370;
    pub const RANDOM_WARNING: u32 = 375;
    pub const XSERVER_WARNING: u32 = 380;
    pub const MONITOR_WARNING: u32 = 385;
    pub const REGISTRY_WARNING: u32 = 390;
    pub const CONFIGURE_WARNING: u32 = 395;
    pub const POLICY_WARNING: u32 = 399;
    pub const ERROR: u32 = 400;
    pub const RESOURCE_LIMIT_ERROR: u32 = 400;
    pub const TYPE_ERROR: u32 = 405;
    pub const OPTION_ERROR: u32 = 410;
    pub const DELEGATE_ERROR: u32 = 415;
    pub const MISSING_DELEGATE_ERROR: u32 = 420;
    pub const CORRUPT_IMAGE_ERROR: u32 = 425;
    pub const FILE_OPEN_ERROR: u32 = 430;
    pub const BLOB_ERROR: u32 = 435;
    pub const STREAM_ERROR: u32 = 440;
    pub const CACHE_ERROR: u32 = 445;
    pub const CODER_ERROR: u32 = 450;
    pub const FILTER_ERROR: u32 = 452;
    pub const MODULE_ERROR: u32 = 455;
    pub const DRAW_ERROR: u32 = 460;
    pub const IMAGE_ERROR: u32 = 465;
    pub const WAND_ERROR: u32 = 470;
    pub const RANDOM_ERROR: u32 = 475;
    pub const XSERVER_ERROR: u32 = 480;
    pub const MONITOR_ERROR: u32 = 485;
    pub const REGISTRY_ERROR: u32 = 490;
    pub const CONFIGURE_ERROR: u32 = 495;
    pub const POLICY_ERROR: u32 = 499;
    pub const FATAL_ERROR: u32 = 700;
    pub const RESOURCE_LIMIT_FATAL_ERROR: u32 = 700;
    pub const TYPE_FATAL_ERROR: u32 = 705;
    pub const OPTION_FATAL_ERROR: u32 = 710;
    pub const DELEGATE_FATAL_ERROR: u32 = 715;
    pub const MISSING_DELEGATE_FATAL_ERROR: u32 = 720;
    pub const CORRUPT_IMAGE_FATAL_ERROR: u32 = 725;
    pub const FILE_OPEN_FATAL_ERROR: u32 = 730;
    pub const BLOB_FATAL_ERROR: u32 = 735;
    pub const STREAM_FATAL_ERROR: u32 = 740;
    pub const CACHE_FATAL_ERROR: u32 = 745;
    pub const CODER_FATAL_ERROR: u32 = 750;
    pub const FILTER_FATAL_ERROR: u32 = 752;
    pub const MODULE_FATAL_ERROR: u32 = 755;
    pub const DRAW_FATAL_ERROR: u32 = 760;
    pub const IMAGE_FATAL_ERROR: u32 = 765;
    pub const WAND_FATAL_ERROR: u32 = 770;
    pub const RANDOM_FATAL_ERROR: u32 = 775;
    pub const XSERVER_FATAL_ERROR: u32 = 780;
    pub const MONITOR_FATAL_ERROR: u32 = 785;
    pub const REGISTRY_FATAL_ERROR: u32 = 790;
    pub const CONFIGURE_FATAL_ERROR: u32 = 795;
    pub const POLICY_FATAL_ERROR: u32 = 799;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::mem::size_of;

    #[test]
    fn test_opaque_handles_are_zero_sized() {
        assert_eq!(size_of::<RawColor>(), 0);
        assert_eq!(size_of::<RawImage>(), 0);
    }

    #[test]
    fn test_geometry_info_layout() {
        // x, y, width, height are pointer sized; flags is padded to pointer alignment
        assert_eq!(size_of::<GeometryInfoC>(), 5 * size_of::<usize>());
    }
}
