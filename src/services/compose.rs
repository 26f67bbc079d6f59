//! Crop/compose service
//!
//! Turns a processed pixel buffer and its bounding box into the final trimmed
//! image. This sits outside the worker: the core only reports the rectangle.

use crate::{
    error::{BgTrimError, Result},
    types::{BoundingBox, PixelBuffer},
};
use image::{imageops, Rgba, RgbaImage};
use tracing::warn;

/// Service for producing the final trimmed image
pub struct CropComposer;

impl CropComposer {
    /// Crop `buffer` to `bounding_box`, or produce the placeholder when it is `None`.
    ///
    /// # Errors
    /// - `BgTrimError::Processing` when the box does not fit inside the buffer
    pub fn crop_to_bounds(
        buffer: PixelBuffer,
        bounding_box: Option<BoundingBox>,
    ) -> Result<RgbaImage> {
        let Some(bbox) = bounding_box else {
            warn!("Image is completely transparent after processing. Returning an empty image.");
            return Ok(Self::placeholder_image());
        };

        let (width, height) = buffer.dimensions();
        if bbox.min_x > bbox.max_x
            || bbox.min_y > bbox.max_y
            || bbox.max_x >= width
            || bbox.max_y >= height
        {
            return Err(BgTrimError::processing_stage_error(
                "cropping",
                &format!("bounding box {bbox:?} does not fit"),
                Some(&format!("{width}x{height}")),
            ));
        }

        let image = buffer.into_rgba_image()?;
        if bbox == BoundingBox::full(width, height) {
            return Ok(image);
        }

        Ok(imageops::crop_imm(&image, bbox.min_x, bbox.min_y, bbox.width(), bbox.height())
            .to_image())
    }

    /// 1x1 fully transparent image returned when nothing remains
    #[must_use]
    pub fn placeholder_image() -> RgbaImage {
        RgbaImage::from_pixel(1, 1, Rgba([0, 0, 0, 0]))
    }
}
