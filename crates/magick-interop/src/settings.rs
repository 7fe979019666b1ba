//! Read settings, handed to the native library as a settings instance per
//! call.

use std::collections::BTreeMap;

use magick_ffi_common::ExtentC;

use crate::error::{Error, Result};
use crate::native::{c_string, kind, Field, MagickNative, NativeHandle, OwnedHandle};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReadSettings {
    /// Explicit format, overriding detection from magic bytes or extension.
    pub format: Option<String>,
    /// Canvas width for pseudo formats such as `xc:`.
    pub width: Option<usize>,
    pub height: Option<usize>,
    /// Read headers and metadata without pixels.
    pub ping: bool,
    defines: BTreeMap<String, String>,
}

impl ReadSettings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_format(mut self, format: impl Into<String>) -> Self {
        self.format = Some(format.into());
        self
    }

    pub fn with_size(mut self, width: usize, height: usize) -> Self {
        self.width = Some(width);
        self.height = Some(height);
        self
    }

    pub fn with_ping(mut self, ping: bool) -> Self {
        self.ping = ping;
        self
    }

    /// Coder define, stored as `format:name`.
    pub fn set_define(&mut self, format: &str, name: &str, value: impl Into<String>) {
        self.defines.insert(define_key(format, name), value.into());
    }

    pub fn define(&self, format: &str, name: &str) -> Option<&str> {
        self.defines.get(&define_key(format, name)).map(String::as_str)
    }

    pub fn remove_define(&mut self, format: &str, name: &str) -> bool {
        self.defines.remove(&define_key(format, name)).is_some()
    }

    pub fn defines(&self) -> impl Iterator<Item = (&str, &str)> {
        self.defines.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub(crate) fn to_native(
        &self,
        native: &'static MagickNative,
    ) -> Result<OwnedHandle<kind::Settings>> {
        let api = native.api();
        let mut handle = unsafe {
            OwnedHandle::<kind::Settings>::from_created(api, (api.magick_settings_create)())
        }?;

        if let Some(format) = &self.format {
            let format = c_string("format", format)?;
            unsafe { (api.magick_settings_format_set)(handle.as_ptr(), format.as_ptr()) };
        }

        let extent: Field<kind::Settings, ExtentC> = Field::read_write(
            "extent",
            api.magick_settings_extent_get,
            api.magick_settings_extent_set,
        );
        handle.set(
            extent,
            ExtentC {
                width: self.width.unwrap_or(0),
                height: self.height.unwrap_or(0),
            },
        )?;

        let ping: Field<kind::Settings, bool> =
            Field::read_write("ping", api.magick_settings_ping_get, api.magick_settings_ping_set);
        handle.set(ping, self.ping)?;

        for (key, value) in &self.defines {
            let c_key = c_string("define name", key)?;
            let c_value = c_string("define value", value)?;
            let stored = unsafe {
                (api.magick_settings_set_option)(handle.as_ptr(), c_key.as_ptr(), c_value.as_ptr())
            };
            if !stored {
                return Err(Error::invalid_argument(format!("define `{key}' was rejected")));
            }
        }
        Ok(handle)
    }
}

fn define_key(format: &str, name: &str) -> String {
    if format.is_empty() {
        name.to_string()
    } else {
        format!("{}:{name}", format.to_ascii_lowercase())
    }
}
