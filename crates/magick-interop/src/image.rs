//! Single images.
//!
//! A [`MagickImage`] owns one native image. Reading takes the first frame of
//! whatever was decoded; a read that fails releases every frame it produced
//! before the error is returned.

use std::ffi::CString;
use std::path::Path;

use crate::collection::{self, Source};
use crate::color::MagickColor;
use crate::error::{Error, Result};
use crate::exception::{MagickException, WarningSink};
use crate::native::{
    c_string, kind, Field, MagickNative, NativeApi, NativeBuffer, NativeHandle, NativeString,
    OwnedHandle,
};
use crate::pixels::{self, PixelCollection};
use crate::profile::{EightBimProfile, ImageProfile, IptcProfile};
use crate::quantum;
use crate::settings::ReadSettings;

pub struct MagickImage {
    handle: OwnedHandle<kind::Image>,
    native: &'static MagickNative,
    warnings: WarningSink,
}

impl MagickImage {
    pub(crate) fn from_handle(
        native: &'static MagickNative,
        handle: OwnedHandle<kind::Image>,
        warnings: WarningSink,
    ) -> Self {
        Self {
            handle,
            native,
            warnings,
        }
    }

    /// Read the first frame of an encoded blob.
    pub fn read(data: &[u8]) -> Result<Self> {
        Self::read_blob(data, &ReadSettings::default())
    }

    pub fn read_blob(data: &[u8], settings: &ReadSettings) -> Result<Self> {
        Self::read_first(Source::Blob(data), settings)
    }

    /// Read a file, or a pseudo format such as `xc:red`.
    pub fn read_file(path: impl AsRef<Path>, settings: &ReadSettings) -> Result<Self> {
        Self::read_first(Source::File(path.as_ref()), settings)
    }

    /// Read dimensions and metadata without pixels.
    pub fn ping(data: &[u8]) -> Result<Self> {
        Self::read_blob(data, &ReadSettings::new().with_ping(true))
    }

    /// Canvas of `width` x `height` filled with `color`.
    pub fn canvas(color: &MagickColor, width: usize, height: usize) -> Result<Self> {
        let settings = ReadSettings::new().with_size(width, height);
        Self::read_file(format!("xc:{}", color.to_hex_string()?), &settings)
    }

    /// Like [`read_blob`](Self::read_blob), with `handler` registered before
    /// the read so read-time warnings reach it under
    /// [`WarningPolicy::Notify`](crate::WarningPolicy::Notify).
    pub fn read_blob_with_handler(
        data: &[u8],
        settings: &ReadSettings,
        handler: impl Fn(&MagickException) + Send + Sync + 'static,
    ) -> Result<Self> {
        let native = MagickNative::get()?;
        let warnings = native.warning_sink();
        warnings.on_warning(handler);
        Self::read_into(native, warnings, Source::Blob(data), settings)
    }

    /// File counterpart of [`read_blob_with_handler`](Self::read_blob_with_handler).
    pub fn read_file_with_handler(
        path: impl AsRef<Path>,
        settings: &ReadSettings,
        handler: impl Fn(&MagickException) + Send + Sync + 'static,
    ) -> Result<Self> {
        let native = MagickNative::get()?;
        let warnings = native.warning_sink();
        warnings.on_warning(handler);
        Self::read_into(native, warnings, Source::File(path.as_ref()), settings)
    }

    fn read_first(source: Source<'_>, settings: &ReadSettings) -> Result<Self> {
        let native = MagickNative::get()?;
        Self::read_into(native, native.warning_sink(), source, settings)
    }

    fn read_into(
        native: &'static MagickNative,
        warnings: WarningSink,
        source: Source<'_>,
        settings: &ReadSettings,
    ) -> Result<Self> {
        let list = collection::read_list(native, &warnings, source, settings)?;
        let handle = collection::remove_frame(&list, 0)
            .ok_or_else(|| Error::invalid_argument("no images were read"))?;
        Ok(Self::from_handle(native, handle, warnings))
    }

    pub(crate) fn handle(&self) -> &OwnedHandle<kind::Image> {
        &self.handle
    }

    pub(crate) fn native(&self) -> &'static MagickNative {
        self.native
    }

    pub(crate) fn warnings(&self) -> &WarningSink {
        &self.warnings
    }

    pub(crate) fn into_parts(self) -> (OwnedHandle<kind::Image>, WarningSink) {
        (self.handle, self.warnings)
    }

    pub fn width(&self) -> usize {
        self.handle.get(ImageFields::new(self.native.api()).width)
    }

    pub fn height(&self) -> usize {
        self.handle.get(ImageFields::new(self.native.api()).height)
    }

    /// Bits per channel of the decoded image.
    pub fn depth(&self) -> u32 {
        self.handle.get(ImageFields::new(self.native.api()).depth)
    }

    pub fn channel_count(&self) -> usize {
        self.handle.get(ImageFields::new(self.native.api()).channel_count)
    }

    pub fn has_alpha(&self) -> bool {
        self.handle.get(ImageFields::new(self.native.api()).has_alpha)
    }

    /// Format the image was decoded from or will be encoded to.
    pub fn format(&self) -> Option<String> {
        read_format(&self.handle)
    }

    pub fn set_format(&mut self, format: &str) -> Result<()> {
        let api = self.native.api();
        let c_format = c_string("format", format)?;
        if !unsafe { (api.magick_image_format_set)(self.handle.as_ptr(), c_format.as_ptr()) } {
            return Err(Error::invalid_argument(format!("invalid format `{format}'")));
        }
        Ok(())
    }

    pub fn attribute(&self, name: &str) -> Result<Option<String>> {
        read_attribute(&self.handle, name)
    }

    pub fn set_attribute(&mut self, name: &str, value: &str) -> Result<()> {
        let value = c_string("attribute value", value)?;
        self.write_attribute(name, Some(&value))
    }

    pub fn remove_attribute(&mut self, name: &str) -> Result<()> {
        self.write_attribute(name, None)
    }

    fn write_attribute(&mut self, name: &str, value: Option<&CString>) -> Result<()> {
        let api = self.native.api();
        let c_name = c_string("attribute name", name)?;
        let value = value.map_or(std::ptr::null(), |v| v.as_ptr());
        if !unsafe { (api.magick_image_set_attribute)(self.handle.as_ptr(), c_name.as_ptr(), value) } {
            return Err(Error::invalid_argument(format!("invalid attribute `{name}'")));
        }
        Ok(())
    }

    /// Copy of the named profile.
    pub fn profile(&self, name: &str) -> Result<Option<ImageProfile>> {
        read_profile(&self.handle, name)
    }

    pub fn profile_names(&self) -> Vec<String> {
        read_profile_names(&self.handle)
    }

    pub fn iptc_profile(&self) -> Result<Option<IptcProfile>> {
        Ok(self.profile("iptc")?.as_ref().map(IptcProfile::from_profile))
    }

    pub fn eight_bim_profile(&self) -> Result<Option<EightBimProfile>> {
        Ok(self.profile("8bim")?.as_ref().map(EightBimProfile::from_profile))
    }

    /// Replace the profile with the same name. An empty profile removes it.
    pub fn set_profile(&mut self, profile: &ImageProfile) -> Result<()> {
        let api = self.native.api();
        let c_name = c_string("profile name", profile.name())?;
        let data = profile.data();
        let stored = unsafe {
            (api.magick_image_set_profile)(
                self.handle.as_ptr(),
                c_name.as_ptr(),
                data.as_ptr(),
                data.len(),
            )
        };
        if !stored {
            return Err(Error::invalid_argument(format!(
                "profile `{}' was rejected",
                profile.name()
            )));
        }
        Ok(())
    }

    /// Returns whether the profile existed.
    pub fn remove_profile(&mut self, name: &str) -> Result<bool> {
        let api = self.native.api();
        let c_name = c_string("profile name", name)?;
        Ok(unsafe { (api.magick_image_remove_profile)(self.handle.as_ptr(), c_name.as_ptr()) })
    }

    /// Pixel access. `None` from the getters means the image has no pixel
    /// cache (pinged, or a coder that only reads structure).
    pub fn pixels(&mut self) -> PixelCollection<'_> {
        PixelCollection::new(self)
    }

    pub fn pixel_color(&self, x: usize, y: usize) -> Result<MagickColor> {
        pixels::check_area(self.width(), self.height(), x, y, 1, 1)?;
        let color = self.native.call(&self.warnings, |api, exception| unsafe {
            let raw = (api.magick_image_pixel_color)(
                self.handle.as_const_ptr(),
                x as isize,
                y as isize,
                exception,
            );
            OwnedHandle::<kind::Color>::from_raw_optional(api, raw)
        })?;
        let color = color.ok_or(Error::InvalidHandle { kind: "color" })?;
        Ok(MagickColor::from_native(&color))
    }

    /// Encode with `format`, or with the image's own format.
    pub fn to_byte_array(&self, format: Option<&str>) -> Result<Vec<u8>> {
        let settings = write_settings(self.native, format)?;
        let buffer = self.native.call(&self.warnings, |api, exception| unsafe {
            let mut len = 0;
            let ptr = (api.magick_image_write_blob)(
                self.handle.as_const_ptr(),
                settings.as_const_ptr(),
                &mut len,
                exception,
            );
            NativeBuffer::from_raw(api, ptr, len)
        })?;
        let buffer = buffer.ok_or(Error::Allocation("encoded image"))?;
        Ok(buffer.to_vec())
    }

    /// Encode to a file; without `format` the file extension decides.
    pub fn write_file(&self, path: impl AsRef<Path>, format: Option<&str>) -> Result<()> {
        let path = path.as_ref();
        let extension = path.extension().and_then(|e| e.to_str());
        let bytes = self.to_byte_array(format.or(extension))?;
        std::fs::write(path, bytes)?;
        tracing::debug!(path = %path.display(), "image written");
        Ok(())
    }

    /// Deep copy with its own native image.
    pub fn try_clone(&self) -> Result<Self> {
        clone_image(self.native, &self.handle, self.warnings.fork())
    }

    /// Warnings kept under the collect policy (or with no handler), oldest
    /// first.
    pub fn take_warnings(&self) -> Vec<MagickException> {
        self.warnings.take_warnings()
    }

    /// Register the handler for warnings of later calls on this image.
    ///
    /// Warnings raised while the image was read were already collected; use
    /// [`read_blob_with_handler`](Self::read_blob_with_handler) to see them
    /// as they happen.
    pub fn on_warning(&self, handler: impl Fn(&MagickException) + Send + Sync + 'static) {
        self.warnings.on_warning(handler);
    }
}

#[cfg(feature = "async")]
impl MagickImage {
    /// Read on the blocking pool.
    ///
    /// `stop` is checked before the read starts; a read already in progress
    /// runs to completion.
    pub async fn read_blob_async(
        data: Vec<u8>,
        settings: ReadSettings,
        stop: impl crate::cancellation::Stop + Send + 'static,
    ) -> Result<Self> {
        crate::cancellation::check(&stop)?;
        let task = tokio::task::spawn_blocking(move || {
            crate::cancellation::check(&stop)?;
            Self::read_blob(&data, &settings)
        });
        match task.await {
            Ok(result) => result,
            Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
            Err(_) => Err(Error::Cancelled),
        }
    }
}

impl std::fmt::Debug for MagickImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MagickImage")
            .field("width", &self.width())
            .field("height", &self.height())
            .field("format", &self.format())
            .finish()
    }
}

// ============================================================================
// Accessors shared with borrowed frames
// ============================================================================

pub(crate) struct ImageFields {
    pub width: Field<kind::Image, usize>,
    pub height: Field<kind::Image, usize>,
    pub depth: Field<kind::Image, u32>,
    pub channel_count: Field<kind::Image, usize>,
    pub has_alpha: Field<kind::Image, bool>,
}

impl ImageFields {
    pub fn new(api: &NativeApi) -> Self {
        Self {
            width: Field::read_only("width", api.magick_image_width),
            height: Field::read_only("height", api.magick_image_height),
            depth: Field::read_only("depth", api.magick_image_depth),
            channel_count: Field::read_only("channel_count", api.magick_image_channel_count),
            has_alpha: Field::read_only("has_alpha", api.magick_image_has_alpha),
        }
    }
}

pub(crate) fn read_format(handle: &impl NativeHandle<kind::Image>) -> Option<String> {
    let api = handle.api();
    let text = unsafe { NativeString::from_raw(api, (api.magick_image_format_get)(handle.as_const_ptr())) }?;
    Some(text.to_string_lossy()).filter(|f| !f.is_empty())
}

pub(crate) fn read_attribute(
    handle: &impl NativeHandle<kind::Image>,
    name: &str,
) -> Result<Option<String>> {
    let api = handle.api();
    let c_name = c_string("attribute name", name)?;
    let value = unsafe {
        NativeString::from_raw(
            api,
            (api.magick_image_get_attribute)(handle.as_const_ptr(), c_name.as_ptr()),
        )
    };
    Ok(value.map(|v| v.to_string_lossy()))
}

/// Copy borrowed profile bytes while the image is borrowed.
pub(crate) fn read_profile(
    handle: &impl NativeHandle<kind::Image>,
    name: &str,
) -> Result<Option<ImageProfile>> {
    let api = handle.api();
    let c_name = c_string("profile name", name)?;
    let mut len = 0;
    let data = unsafe {
        let ptr = (api.magick_image_get_profile)(handle.as_const_ptr(), c_name.as_ptr(), &mut len);
        quantum::to_byte_array(ptr, len)
    };
    Ok(data.map(|data| ImageProfile::new(name, data)))
}

pub(crate) fn read_profile_names(handle: &impl NativeHandle<kind::Image>) -> Vec<String> {
    let api = handle.api();
    let names = unsafe {
        NativeString::from_raw(api, (api.magick_image_profile_names)(handle.as_const_ptr()))
    };
    match names {
        Some(names) => names
            .to_string_lossy()
            .split(',')
            .filter(|n| !n.is_empty())
            .map(str::to_string)
            .collect(),
        None => Vec::new(),
    }
}

pub(crate) fn clone_image(
    native: &'static MagickNative,
    handle: &impl NativeHandle<kind::Image>,
    warnings: WarningSink,
) -> Result<MagickImage> {
    let api = native.api();
    let copy = unsafe {
        OwnedHandle::<kind::Image>::from_created(api, (api.magick_image_clone)(handle.as_const_ptr()))
    }?;
    Ok(MagickImage::from_handle(native, copy, warnings))
}

pub(crate) fn write_settings(
    native: &'static MagickNative,
    format: Option<&str>,
) -> Result<OwnedHandle<kind::Settings>> {
    let settings = match format {
        Some(format) => ReadSettings::new().with_format(format),
        None => ReadSettings::new(),
    };
    settings.to_native(native)
}
