//! Colors crossing the boundary as native color instances.

use std::fmt;

use crate::error::{Error, Result};
use crate::native::{
    c_string, kind, Field, MagickNative, NativeApi, NativeHandle, NativeString, OwnedHandle,
};
use crate::quantum::{self, Quantum, QuantumSample};

/// RGBA or CMYKA color at the process quantum.
///
/// Equality compares the bits of every active channel plus the CMYK flag;
/// `black` only counts for CMYK colors.
#[derive(Debug, Clone, Copy)]
pub struct MagickColor {
    pub red: Quantum,
    pub green: Quantum,
    pub blue: Quantum,
    pub alpha: Quantum,
    pub black: Quantum,
    pub is_cmyk: bool,
}

struct ColorFields {
    red: Field<kind::Color, Quantum>,
    green: Field<kind::Color, Quantum>,
    blue: Field<kind::Color, Quantum>,
    alpha: Field<kind::Color, Quantum>,
    black: Field<kind::Color, Quantum>,
    is_cmyk: Field<kind::Color, bool>,
}

impl ColorFields {
    fn new(api: &NativeApi) -> Self {
        Self {
            red: Field::read_write("red", api.magick_color_red_get, api.magick_color_red_set),
            green: Field::read_write(
                "green",
                api.magick_color_green_get,
                api.magick_color_green_set,
            ),
            blue: Field::read_write("blue", api.magick_color_blue_get, api.magick_color_blue_set),
            alpha: Field::read_write(
                "alpha",
                api.magick_color_alpha_get,
                api.magick_color_alpha_set,
            ),
            black: Field::read_write(
                "black",
                api.magick_color_black_get,
                api.magick_color_black_set,
            ),
            is_cmyk: Field::read_write(
                "is_cmyk",
                api.magick_color_is_cmyk_get,
                api.magick_color_is_cmyk_set,
            ),
        }
    }
}

impl MagickColor {
    pub fn from_rgba(red: Quantum, green: Quantum, blue: Quantum, alpha: Quantum) -> Self {
        Self {
            red,
            green,
            blue,
            alpha,
            black: Quantum::from_f64(0.0),
            is_cmyk: false,
        }
    }

    pub fn from_rgb(red: Quantum, green: Quantum, blue: Quantum) -> Self {
        Self::from_rgba(red, green, blue, Quantum::from_f64(quantum::QUANTUM_MAX))
    }

    /// CMYK color; cyan, magenta and yellow are stored in the RGB channels.
    pub fn from_cmyka(
        cyan: Quantum,
        magenta: Quantum,
        yellow: Quantum,
        black: Quantum,
        alpha: Quantum,
    ) -> Self {
        Self {
            red: cyan,
            green: magenta,
            blue: yellow,
            alpha,
            black,
            is_cmyk: true,
        }
    }

    /// 8-bit channels scaled to the process quantum.
    pub fn from_rgba8(red: u8, green: u8, blue: u8, alpha: u8) -> Self {
        Self::from_rgba(
            quantum::from_u8(red),
            quantum::from_u8(green),
            quantum::from_u8(blue),
            quantum::from_u8(alpha),
        )
    }

    /// Parse color text (`#RRGGBB`, `rgb(...)`, `cmyk(...)`, names) with
    /// the native parser.
    pub fn parse(text: &str) -> Result<Self> {
        let native = MagickNative::get()?;
        let api = native.api();
        let text = c_string("color", text)?;
        let handle =
            unsafe { OwnedHandle::<kind::Color>::from_created(api, (api.magick_color_create)()) }?;

        let warnings = native.warning_sink();
        let parsed = native.call(&warnings, |api, exception| unsafe {
            (api.magick_color_initialize)(handle.as_ptr(), text.as_ptr(), exception)
        })?;
        if !parsed {
            return Err(Error::invalid_argument(format!(
                "unrecognized color `{}'",
                text.to_string_lossy()
            )));
        }
        Ok(Self::from_native(&handle))
    }

    /// Copy into a new native color instance.
    pub fn create_native_instance(&self) -> Result<OwnedHandle<kind::Color>> {
        let api = MagickNative::get()?.api();
        let mut handle =
            unsafe { OwnedHandle::<kind::Color>::from_created(api, (api.magick_color_create)()) }?;
        let fields = ColorFields::new(api);
        handle.set(fields.red, self.red)?;
        handle.set(fields.green, self.green)?;
        handle.set(fields.blue, self.blue)?;
        handle.set(fields.alpha, self.alpha)?;
        handle.set(fields.black, self.black)?;
        handle.set(fields.is_cmyk, self.is_cmyk)?;
        Ok(handle)
    }

    /// Read a native color instance.
    pub fn from_native(handle: &impl NativeHandle<kind::Color>) -> Self {
        let fields = ColorFields::new(handle.api());
        Self {
            red: handle.get(fields.red),
            green: handle.get(fields.green),
            blue: handle.get(fields.blue),
            alpha: handle.get(fields.alpha),
            black: handle.get(fields.black),
            is_cmyk: handle.get(fields.is_cmyk),
        }
    }

    /// Native text form: `#RRGGBBAA` at the build depth, `cmyka(...)` for
    /// CMYK colors.
    pub fn to_hex_string(&self) -> Result<String> {
        let handle = self.create_native_instance()?;
        let api = handle.api();
        let text = unsafe {
            NativeString::from_raw(api, (api.magick_color_to_string)(handle.as_const_ptr()))
        }
        .ok_or(Error::Allocation("color string"))?;
        Ok(text.to_string_lossy())
    }

    pub fn is_opaque(&self) -> bool {
        self.alpha.to_f64() >= quantum::QUANTUM_MAX
    }

    fn active_bits(&self) -> ([Quantum; 5], usize) {
        let channels = [self.red, self.green, self.blue, self.alpha, self.black];
        (channels, if self.is_cmyk { 5 } else { 4 })
    }
}

impl PartialEq for MagickColor {
    fn eq(&self, other: &Self) -> bool {
        if self.is_cmyk != other.is_cmyk {
            return false;
        }
        let (ours, count) = self.active_bits();
        let (theirs, _) = other.active_bits();
        quantum::to_native_bytes(&ours[..count]) == quantum::to_native_bytes(&theirs[..count])
    }
}

impl fmt::Display for MagickColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let channels = if self.is_cmyk {
            format!(
                "cmyka({},{},{},{},{})",
                self.red.to_f64(),
                self.green.to_f64(),
                self.blue.to_f64(),
                self.black.to_f64(),
                self.alpha.to_f64()
            )
        } else {
            format!(
                "rgba({},{},{},{})",
                self.red.to_f64(),
                self.green.to_f64(),
                self.blue.to_f64(),
                self.alpha.to_f64()
            )
        };
        f.write_str(&channels)
    }
}
