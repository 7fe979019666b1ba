//! Multi-frame image lists.
//!
//! # Frame ownership
//!
//! - [`MagickImageCollection::get`] and [`MagickImageCollection::iter`] hand
//!   out [`MagickFrame`]s borrowed from the list. They are never released by
//!   the binding and cannot outlive the collection.
//! - [`MagickImageCollection::take`] detaches a frame into an owned
//!   [`MagickImage`].
//! - [`MagickImageCollection::add`] moves an image into the list, which owns
//!   it from then on.

use std::path::Path;

use crate::cancellation::{self, Stop};
use crate::error::{Error, Result};
use crate::exception::{MagickException, WarningSink};
use crate::image::{self, ImageFields, MagickImage};
use crate::native::{
    c_string, kind, BorrowedHandle, MagickNative, NativeBuffer, NativeHandle, OwnedHandle,
};
use crate::profile::ImageProfile;
use crate::settings::ReadSettings;

pub(crate) enum Source<'a> {
    Blob(&'a [u8]),
    File(&'a Path),
}

/// Decode every frame of `source`.
///
/// On error the frames read so far are released before the error is
/// returned.
pub(crate) fn read_list(
    native: &'static MagickNative,
    warnings: &WarningSink,
    source: Source<'_>,
    settings: &ReadSettings,
) -> Result<OwnedHandle<kind::ImageList>> {
    let settings = settings.to_native(native)?;
    let list = match source {
        Source::Blob(data) => native.call(warnings, |api, exception| unsafe {
            let raw = (api.magick_image_list_read_blob)(
                data.as_ptr(),
                data.len(),
                settings.as_const_ptr(),
                exception,
            );
            OwnedHandle::<kind::ImageList>::from_raw_optional(api, raw)
        })?,
        Source::File(path) => {
            let name = path
                .to_str()
                .ok_or_else(|| Error::invalid_argument("file name is not valid UTF-8"))?;
            let name = c_string("file name", name)?;
            native.call(warnings, |api, exception| unsafe {
                let raw = (api.magick_image_list_read_file)(
                    name.as_ptr(),
                    settings.as_const_ptr(),
                    exception,
                );
                OwnedHandle::<kind::ImageList>::from_raw_optional(api, raw)
            })?
        }
    };
    list.ok_or_else(|| Error::invalid_argument("no images were read"))
}

/// Detach frame `index` from `list`.
pub(crate) fn remove_frame(
    list: &OwnedHandle<kind::ImageList>,
    index: usize,
) -> Option<OwnedHandle<kind::Image>> {
    let api = list.api();
    unsafe {
        OwnedHandle::from_raw_optional(api, (api.magick_image_list_remove)(list.as_ptr(), index))
    }
}

fn frame_count(list: &OwnedHandle<kind::ImageList>) -> usize {
    let api = list.api();
    unsafe { (api.magick_image_list_count)(list.as_const_ptr()) }
}

pub struct MagickImageCollection {
    handle: OwnedHandle<kind::ImageList>,
    native: &'static MagickNative,
    warnings: WarningSink,
}

impl MagickImageCollection {
    /// Empty collection.
    pub fn new() -> Result<Self> {
        let native = MagickNative::get()?;
        let api = native.api();
        let handle = unsafe { OwnedHandle::from_created(api, (api.magick_image_list_create)()) }?;
        Ok(Self {
            handle,
            native,
            warnings: native.warning_sink(),
        })
    }

    pub fn read(data: &[u8]) -> Result<Self> {
        Self::read_blob(data, &ReadSettings::default())
    }

    pub fn read_blob(data: &[u8], settings: &ReadSettings) -> Result<Self> {
        Self::read_source(Source::Blob(data), settings)
    }

    pub fn read_file(path: impl AsRef<Path>, settings: &ReadSettings) -> Result<Self> {
        Self::read_source(Source::File(path.as_ref()), settings)
    }

    fn read_source(source: Source<'_>, settings: &ReadSettings) -> Result<Self> {
        let native = MagickNative::get()?;
        let warnings = native.warning_sink();
        let handle = read_list(native, &warnings, source, settings)?;
        Ok(Self {
            handle,
            native,
            warnings,
        })
    }

    /// Read several files into one collection, checking `stop` before each
    /// file. A cancelled or failed read releases everything read so far.
    pub fn read_files<P: AsRef<Path>>(
        paths: &[P],
        settings: &ReadSettings,
        stop: &impl Stop,
    ) -> Result<Self> {
        let mut collection = Self::new()?;
        collection.append_files(paths, settings, stop)?;
        Ok(collection)
    }

    /// Append the frames of several files. Files read before a cancellation
    /// or failure stay in the collection.
    pub fn append_files<P: AsRef<Path>>(
        &mut self,
        paths: &[P],
        settings: &ReadSettings,
        stop: &impl Stop,
    ) -> Result<()> {
        for path in paths {
            cancellation::check(stop)?;
            let list = read_list(
                self.native,
                &self.warnings,
                Source::File(path.as_ref()),
                settings,
            )?;
            while let Some(frame) = remove_frame(&list, 0) {
                self.append(frame)?;
            }
        }
        tracing::debug!(files = paths.len(), frames = self.len(), "collection read");
        Ok(())
    }

    pub fn len(&self) -> usize {
        frame_count(&self.handle)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Borrowed frame at `index`.
    pub fn get(&self, index: usize) -> Option<MagickFrame<'_>> {
        let api = self.native.api();
        let raw = unsafe { (api.magick_image_list_get)(self.handle.as_ptr(), index) };
        let handle = unsafe { BorrowedHandle::from_raw(api, raw) }.ok()?;
        Some(MagickFrame {
            handle,
            native: self.native,
            warnings: &self.warnings,
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = MagickFrame<'_>> + '_ {
        (0..self.len()).filter_map(move |index| self.get(index))
    }

    /// Detach frame `index` as an owned image.
    pub fn take(&mut self, index: usize) -> Result<MagickImage> {
        let frame = remove_frame(&self.handle, index).ok_or_else(|| {
            Error::invalid_argument(format!("frame {index} is out of range ({})", self.len()))
        })?;
        Ok(MagickImage::from_handle(self.native, frame, self.warnings.fork()))
    }

    /// Move `image` to the end of the list.
    pub fn add(&mut self, image: MagickImage) -> Result<()> {
        let (handle, warnings) = image.into_parts();
        self.warnings.absorb(&warnings);
        self.append(handle)
    }

    fn append(&mut self, frame: OwnedHandle<kind::Image>) -> Result<()> {
        let api = self.native.api();
        let raw = frame.into_raw();
        // consumed by the native side even when the append fails
        if !unsafe { (api.magick_image_list_append)(self.handle.as_ptr(), raw) } {
            return Err(Error::InvalidHandle { kind: "image list" });
        }
        Ok(())
    }

    /// Encode every frame with `format`, or the first frame's format.
    pub fn to_byte_array(&self, format: Option<&str>) -> Result<Vec<u8>> {
        let settings = image::write_settings(self.native, format)?;
        let buffer = self.native.call(&self.warnings, |api, exception| unsafe {
            let mut len = 0;
            let ptr = (api.magick_image_list_write_blob)(
                self.handle.as_const_ptr(),
                settings.as_const_ptr(),
                &mut len,
                exception,
            );
            NativeBuffer::from_raw(api, ptr, len)
        })?;
        let buffer = buffer.ok_or(Error::Allocation("encoded image list"))?;
        Ok(buffer.to_vec())
    }

    pub fn take_warnings(&self) -> Vec<MagickException> {
        self.warnings.take_warnings()
    }

    pub fn on_warning(&self, handler: impl Fn(&MagickException) + Send + Sync + 'static) {
        self.warnings.on_warning(handler);
    }
}

impl std::fmt::Debug for MagickImageCollection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MagickImageCollection")
            .field("len", &self.len())
            .finish()
    }
}

/// Read-only view of a frame owned by a collection.
pub struct MagickFrame<'a> {
    handle: BorrowedHandle<'a, kind::Image>,
    native: &'static MagickNative,
    warnings: &'a WarningSink,
}

impl MagickFrame<'_> {
    pub fn width(&self) -> usize {
        self.handle.get(ImageFields::new(self.native.api()).width)
    }

    pub fn height(&self) -> usize {
        self.handle.get(ImageFields::new(self.native.api()).height)
    }

    pub fn has_alpha(&self) -> bool {
        self.handle.get(ImageFields::new(self.native.api()).has_alpha)
    }

    pub fn format(&self) -> Option<String> {
        image::read_format(&self.handle)
    }

    pub fn attribute(&self, name: &str) -> Result<Option<String>> {
        image::read_attribute(&self.handle, name)
    }

    pub fn profile(&self, name: &str) -> Result<Option<ImageProfile>> {
        image::read_profile(&self.handle, name)
    }

    pub fn profile_names(&self) -> Vec<String> {
        image::read_profile_names(&self.handle)
    }

    /// Owned copy of this frame.
    pub fn to_image(&self) -> Result<MagickImage> {
        image::clone_image(self.native, &self.handle, self.warnings.fork())
    }
}

impl std::fmt::Debug for MagickFrame<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MagickFrame")
            .field("width", &self.width())
            .field("height", &self.height())
            .finish()
    }
}
