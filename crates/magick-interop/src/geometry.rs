//! Geometry (`WxH+X+Y` plus modifiers) parsed and printed by the native
//! library.

use std::fmt;
use std::str::FromStr;

use magick_ffi_common::abi::geometry_flags as flags;
use magick_ffi_common::GeometryInfoC;

use crate::error::{Error, Result};
use crate::native::{
    c_string, kind, Field, MagickNative, NativeApi, NativeHandle, NativeString, OwnedHandle,
};

/// Geometry modifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeometryFlag {
    /// `%`
    Percentage,
    /// `!`
    IgnoreAspectRatio,
    /// `<`
    Less,
    /// `>`
    Greater,
    /// `^`
    FillArea,
    /// `@`
    LimitPixels,
    /// `W:H`
    AspectRatio,
}

impl GeometryFlag {
    fn bit(self) -> u32 {
        match self {
            Self::Percentage => flags::PERCENT_VALUE,
            Self::IgnoreAspectRatio => flags::ASPECT_VALUE,
            Self::Less => flags::LESS_VALUE,
            Self::Greater => flags::GREATER_VALUE,
            Self::FillArea => flags::MINIMUM_VALUE,
            Self::LimitPixels => flags::AREA_VALUE,
            Self::AspectRatio => flags::ASPECT_RATIO_VALUE,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MagickGeometry {
    info: GeometryInfoC,
}

fn info_field(api: &NativeApi) -> Field<kind::Geometry, GeometryInfoC> {
    Field::read_write("info", api.magick_geometry_info_get, api.magick_geometry_info_set)
}

impl MagickGeometry {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            info: GeometryInfoC {
                width,
                height,
                flags: flags::WIDTH_VALUE | flags::HEIGHT_VALUE,
                ..GeometryInfoC::default()
            },
        }
    }

    pub fn with_offset(mut self, x: isize, y: isize) -> Self {
        self.info.x = x;
        self.info.y = y;
        self.info.flags |= flags::X_VALUE | flags::Y_VALUE;
        self
    }

    pub fn with_flag(mut self, flag: GeometryFlag) -> Self {
        self.set(flag, true);
        self
    }

    /// Parse with the native geometry parser.
    pub fn parse(text: &str) -> Result<Self> {
        let native = MagickNative::get()?;
        let api = native.api();
        let c_text = c_string("geometry", text)?;
        let handle = unsafe {
            OwnedHandle::<kind::Geometry>::from_created(api, (api.magick_geometry_create)())
        }?;
        let parsed = unsafe { (api.magick_geometry_initialize)(handle.as_ptr(), c_text.as_ptr()) };
        if parsed == flags::NO_VALUE {
            return Err(Error::invalid_argument(format!("invalid geometry `{text}'")));
        }
        Ok(Self::from_native(&handle))
    }

    pub fn create_native_instance(&self) -> Result<OwnedHandle<kind::Geometry>> {
        let api = MagickNative::get()?.api();
        let mut handle = unsafe {
            OwnedHandle::<kind::Geometry>::from_created(api, (api.magick_geometry_create)())
        }?;
        handle.set(info_field(api), self.info)?;
        Ok(handle)
    }

    pub fn from_native(handle: &impl NativeHandle<kind::Geometry>) -> Self {
        Self {
            info: handle.get(info_field(handle.api())),
        }
    }

    /// Native text form.
    pub fn to_native_string(&self) -> Result<String> {
        let handle = self.create_native_instance()?;
        let api = handle.api();
        let text = unsafe {
            NativeString::from_raw(api, (api.magick_geometry_to_string)(handle.as_const_ptr()))
        }
        .ok_or(Error::Allocation("geometry string"))?;
        Ok(text.to_string_lossy())
    }

    pub fn x(&self) -> isize {
        self.info.x
    }

    pub fn y(&self) -> isize {
        self.info.y
    }

    pub fn width(&self) -> usize {
        self.info.width
    }

    pub fn height(&self) -> usize {
        self.info.height
    }

    pub fn has_offset(&self) -> bool {
        self.info.flags & (flags::X_VALUE | flags::Y_VALUE) != 0
    }

    pub fn has(&self, flag: GeometryFlag) -> bool {
        self.info.flags & flag.bit() != 0
    }

    pub fn set(&mut self, flag: GeometryFlag, enabled: bool) {
        if enabled {
            self.info.flags |= flag.bit();
        } else {
            self.info.flags &= !flag.bit();
        }
    }
}

impl FromStr for MagickGeometry {
    type Err = Error;

    fn from_str(text: &str) -> Result<Self> {
        Self::parse(text)
    }
}

/// Formats through the native library; fails only when it cannot be loaded.
impl fmt::Display for MagickGeometry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = self.to_native_string().map_err(|_| fmt::Error)?;
        f.write_str(&text)
    }
}
