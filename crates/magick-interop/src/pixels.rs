//! Pixel areas of an image as quantum samples.
//!
//! Samples are interleaved by channel (`R G B` or `R G B A`) and copied out
//! of native memory before a getter returns. Areas are checked against the
//! image bounds before any native call is made.

use crate::error::{Error, Result};
use crate::image::MagickImage;
use crate::native::NativeHandle;
use crate::quantum::{self, Quantum};

/// Mutable pixel view over one image.
pub struct PixelCollection<'a> {
    image: &'a mut MagickImage,
}

impl<'a> PixelCollection<'a> {
    pub(crate) fn new(image: &'a mut MagickImage) -> Self {
        Self { image }
    }

    /// Samples per pixel.
    pub fn channels(&self) -> usize {
        self.image.channel_count()
    }

    pub fn width(&self) -> usize {
        self.image.width()
    }

    pub fn height(&self) -> usize {
        self.image.height()
    }

    /// Copy of an area, or `None` when the image has no pixel cache.
    pub fn get_area(
        &self,
        x: usize,
        y: usize,
        width: usize,
        height: usize,
    ) -> Result<Option<Vec<Quantum>>> {
        check_area(self.width(), self.height(), x, y, width, height)?;
        let image = &*self.image;
        let handle = image.handle();
        image.native().call(image.warnings(), |api, exception| unsafe {
            let mut len = 0;
            let ptr = (api.magick_image_get_pixels)(
                handle.as_const_ptr(),
                x as isize,
                y as isize,
                width,
                height,
                &mut len,
                exception,
            );
            quantum::owned_to_array(api, ptr, len)
        })
    }

    /// Every pixel, row by row.
    pub fn get_values(&self) -> Result<Option<Vec<Quantum>>> {
        self.get_area(0, 0, self.width(), self.height())
    }

    pub fn get_pixel(&self, x: usize, y: usize) -> Result<Option<Vec<Quantum>>> {
        self.get_area(x, y, 1, 1)
    }

    /// Overwrite an area; `values` must hold `width * height * channels`
    /// samples.
    pub fn set_area(
        &mut self,
        x: usize,
        y: usize,
        width: usize,
        height: usize,
        values: &[Quantum],
    ) -> Result<()> {
        check_area(self.width(), self.height(), x, y, width, height)?;
        let expected = width
            .checked_mul(height)
            .and_then(|n| n.checked_mul(self.channels()))
            .ok_or_else(|| Error::invalid_argument("pixel area is too large"))?;
        if values.len() != expected {
            return Err(Error::invalid_argument(format!(
                "expected {expected} values for a {width}x{height} area, got {}",
                values.len()
            )));
        }

        let image = &*self.image;
        let handle = image.handle();
        let written = image.native().call(image.warnings(), |api, exception| unsafe {
            (api.magick_image_set_pixels)(
                handle.as_ptr(),
                x as isize,
                y as isize,
                width,
                height,
                values.as_ptr(),
                values.len(),
                exception,
            )
        })?;
        if !written {
            return Err(Error::invalid_argument("pixels were not written"));
        }
        Ok(())
    }

    pub fn set_pixel(&mut self, x: usize, y: usize, values: &[Quantum]) -> Result<()> {
        self.set_area(x, y, 1, 1, values)
    }
}

/// Reject empty areas and areas that do not fit in a `width` x `height`
/// image.
pub(crate) fn check_area(
    image_width: usize,
    image_height: usize,
    x: usize,
    y: usize,
    width: usize,
    height: usize,
) -> Result<()> {
    if width == 0 || height == 0 {
        return Err(Error::invalid_argument(format!(
            "empty pixel area {width}x{height}"
        )));
    }
    let fits = x.checked_add(width).is_some_and(|right| right <= image_width)
        && y.checked_add(height).is_some_and(|bottom| bottom <= image_height);
    if !fits {
        return Err(Error::invalid_argument(format!(
            "area {width}x{height}+{x}+{y} is outside the {image_width}x{image_height} image"
        )));
    }
    Ok(())
}
