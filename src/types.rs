//! Core types for background trimming operations

use crate::{
    config::{OutputFormat, SegmentationStrategy, Tolerance},
    error::{BgTrimError, Result},
};
use chrono::{DateTime, Utc};
use image::{DynamicImage, GenericImageView, RgbaImage};
use log::info;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Bytes per RGBA8 pixel
pub const CHANNELS: usize = 4;

/// Offset of the alpha channel inside one pixel
pub const ALPHA: usize = 3;

/// Rectangular RGBA8 pixel grid stored row-major.
///
/// The byte at `(y * width + x) * 4 + channel` holds the given channel.
/// Width, height and length are checked on construction and never change
/// afterwards, so every index derived from in-bounds coordinates is valid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl PixelBuffer {
    /// Wrap raw RGBA8 bytes, taking ownership of the storage.
    ///
    /// # Errors
    /// - `BgTrimError::InvalidDimensions` when width or height is zero, when
    ///   `width * height * 4` overflows, or when it differs from `data.len()`
    pub fn new(width: u32, height: u32, data: Vec<u8>) -> Result<Self> {
        Self::check_dimensions(width, height, data.len())?;
        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// Fail fast on dimensions that would make traversal unsafe
    ///
    /// # Errors
    /// - Same conditions as [`PixelBuffer::new`]
    pub fn check_dimensions(width: u32, height: u32, len: usize) -> Result<()> {
        let expected = (width as usize)
            .checked_mul(height as usize)
            .and_then(|n| n.checked_mul(CHANNELS));
        match expected {
            Some(expected) if width > 0 && height > 0 && expected == len => Ok(()),
            _ => Err(BgTrimError::invalid_dimensions(width, height, len)),
        }
    }

    /// Take ownership of an `RgbaImage`'s backing storage without copying
    ///
    /// # Errors
    /// - `BgTrimError::InvalidDimensions` for zero-sized images
    pub fn from_rgba_image(image: RgbaImage) -> Result<Self> {
        let (width, height) = image.dimensions();
        Self::new(width, height, image.into_raw())
    }

    /// Decode-side helper: convert any `DynamicImage` to RGBA8 at native resolution
    ///
    /// # Errors
    /// - `BgTrimError::InvalidDimensions` for zero-sized images
    pub fn from_dynamic_image(image: &DynamicImage) -> Result<Self> {
        Self::from_rgba_image(image.to_rgba8())
    }

    /// Hand the storage back as an `RgbaImage` without copying
    ///
    /// # Errors
    /// - `BgTrimError::Internal` if the buffer no longer matches its dimensions
    pub fn into_rgba_image(self) -> Result<RgbaImage> {
        RgbaImage::from_raw(self.width, self.height, self.data)
            .ok_or_else(|| BgTrimError::internal("Pixel buffer length does not match dimensions"))
    }

    #[must_use]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[must_use]
    pub fn height(&self) -> u32 {
        self.height
    }

    #[must_use]
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Number of pixels (`width * height`)
    #[must_use]
    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// RGBA value at `(x, y)`, or `None` outside the grid
    #[must_use]
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let start = self.pixel_index(x, y) * CHANNELS;
        self.data
            .get(start..start + CHANNELS)
            .and_then(|px| px.try_into().ok())
    }

    /// Alpha value at `(x, y)`, or `None` outside the grid
    #[must_use]
    pub fn alpha(&self, x: u32, y: u32) -> Option<u8> {
        self.pixel(x, y).map(|px| px[ALPHA])
    }

    /// Count of pixels whose alpha is nonzero
    #[must_use]
    pub fn opaque_pixel_count(&self) -> usize {
        self.data
            .chunks_exact(CHANNELS)
            .filter(|px| px[ALPHA] > 0)
            .count()
    }

    /// Linear pixel index (not byte offset) of `(x, y)`
    #[inline]
    pub(crate) fn pixel_index(&self, x: u32, y: u32) -> usize {
        y as usize * self.width as usize + x as usize
    }

    /// Whether the pixel at linear index `idx` is background-like
    #[inline]
    #[allow(clippy::indexing_slicing)]
    pub(crate) fn is_background_like(&self, idx: usize, tolerance: Tolerance) -> bool {
        let base = idx * CHANNELS;
        tolerance.admits(self.data[base], self.data[base + 1], self.data[base + 2])
    }

    /// Zero the alpha channel of the pixel at linear index `idx`
    #[inline]
    #[allow(clippy::indexing_slicing)]
    pub(crate) fn erase(&mut self, idx: usize) {
        self.data[idx * CHANNELS + ALPHA] = 0;
    }

    #[inline]
    #[allow(clippy::indexing_slicing)]
    pub(crate) fn alpha_at(&self, idx: usize) -> u8 {
        self.data[idx * CHANNELS + ALPHA]
    }
}

/// Minimal inclusive rectangle around the non-transparent pixels of an image.
///
/// The "no content" case is represented as `Option::<BoundingBox>::None` and is
/// never encoded as a zero- or negative-size rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_x: u32,
    pub min_y: u32,
    pub max_x: u32,
    pub max_y: u32,
}

impl BoundingBox {
    /// Box covering a whole `width x height` image
    ///
    /// Both dimensions must be nonzero.
    #[must_use]
    pub fn full(width: u32, height: u32) -> Self {
        Self {
            min_x: 0,
            min_y: 0,
            max_x: width.saturating_sub(1),
            max_y: height.saturating_sub(1),
        }
    }

    #[must_use]
    pub fn width(&self) -> u32 {
        self.max_x - self.min_x + 1
    }

    #[must_use]
    pub fn height(&self) -> u32 {
        self.max_y - self.min_y + 1
    }

    #[must_use]
    pub fn area(&self) -> u64 {
        u64::from(self.width()) * u64::from(self.height())
    }

    #[must_use]
    pub fn contains(&self, x: u32, y: u32) -> bool {
        (self.min_x..=self.max_x).contains(&x) && (self.min_y..=self.max_y).contains(&y)
    }
}

impl std::fmt::Display for BoundingBox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "({}, {})-({}, {}) [{}x{}]",
            self.min_x,
            self.min_y,
            self.max_x,
            self.max_y,
            self.width(),
            self.height()
        )
    }
}

/// Counters collected while erasing the background
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegmentationStats {
    /// Connected background-like regions discovered
    pub regions_found: usize,
    /// Regions whose alpha was zeroed
    pub regions_erased: usize,
    /// Pixels whose alpha was zeroed
    pub pixels_erased: usize,
}

/// Detailed timing breakdown for one trim run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessingTimings {
    /// Image decoding from bytes or file
    pub image_decode_ms: u64,

    /// Background segmentation and erasure (inside the worker)
    pub segmentation_ms: u64,

    /// Bounding box scan (inside the worker)
    pub bounding_box_ms: u64,

    /// Crop/compose of the final image
    pub crop_ms: u64,

    /// Final image encoding (if saving to file)
    pub image_encode_ms: Option<u64>,

    /// Total end-to-end processing time
    pub total_ms: u64,
}

impl ProcessingTimings {
    /// Time not attributed to a measured stage
    #[must_use]
    pub fn other_overhead_ms(&self) -> u64 {
        let measured = self.image_decode_ms
            + self.segmentation_ms
            + self.bounding_box_ms
            + self.crop_ms
            + self.image_encode_ms.unwrap_or(0);
        self.total_ms.saturating_sub(measured)
    }
}

/// Processing metadata recorded for each result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessingMetadata {
    /// Strategy used for segmentation
    pub strategy: SegmentationStrategy,
    /// Tolerance used for classification
    pub tolerance: Tolerance,
    /// Region and pixel counters
    pub stats: SegmentationStats,
    /// Stage timings
    pub timings: ProcessingTimings,
    /// When processing finished
    pub processed_at: DateTime<Utc>,
}

impl ProcessingMetadata {
    #[must_use]
    pub fn new(strategy: SegmentationStrategy, tolerance: Tolerance) -> Self {
        Self {
            strategy,
            tolerance,
            stats: SegmentationStats::default(),
            timings: ProcessingTimings::default(),
            processed_at: Utc::now(),
        }
    }
}

/// Result of one trim run: the cropped image plus what was found
#[derive(Debug, Clone)]
pub struct TrimResult {
    /// Cropped image (or the 1x1 placeholder when nothing was left)
    pub image: DynamicImage,

    /// Bounding box in source-image coordinates; `None` when no content remained
    pub bounding_box: Option<BoundingBox>,

    /// Original image dimensions
    pub original_dimensions: (u32, u32),

    /// Processing metadata
    pub metadata: ProcessingMetadata,

    /// Original input path (for logging purposes)
    pub input_path: Option<String>,
}

impl TrimResult {
    #[must_use]
    pub fn new(
        image: DynamicImage,
        bounding_box: Option<BoundingBox>,
        original_dimensions: (u32, u32),
        metadata: ProcessingMetadata,
    ) -> Self {
        Self {
            image,
            bounding_box,
            original_dimensions,
            metadata,
            input_path: None,
        }
    }

    /// Whether the whole image was erased
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bounding_box.is_none()
    }

    /// Get image dimensions
    #[must_use]
    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    /// Save the result as PNG with alpha channel
    pub fn save_png<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        self.image.save_with_format(path, image::ImageFormat::Png)?;
        Ok(())
    }

    /// Save in the specified format
    pub fn save<P: AsRef<Path>>(&self, path: P, format: OutputFormat, quality: u8) -> Result<()> {
        match format {
            OutputFormat::Png => self.save_png(path),
            OutputFormat::Rgba8 => {
                std::fs::write(path, self.image.to_rgba8().as_raw())?;
                Ok(())
            },
            OutputFormat::Jpeg | OutputFormat::WebP | OutputFormat::Tiff => {
                std::fs::write(path, self.to_bytes(format, quality)?)?;
                Ok(())
            },
        }
    }

    /// Save and record encoding time in the metadata
    pub fn save_with_timing<P: AsRef<Path>>(
        &mut self,
        path: P,
        format: OutputFormat,
        quality: u8,
    ) -> Result<()> {
        let path_str = path.as_ref().display().to_string();
        let encode_start = instant::Instant::now();
        self.save(&path, format, quality)?;
        let encode_ms = encode_start.elapsed().as_millis() as u64;
        self.metadata.timings.image_encode_ms = Some(encode_ms);

        let input_path = self.input_path.as_deref().unwrap_or("input");
        info!(
            "Trimmed: {} -> {} in {:.2}s",
            input_path,
            path_str,
            (self.metadata.timings.total_ms + encode_ms) as f64 / 1000.0
        );
        Ok(())
    }

    /// Get the image as encoded bytes in the specified format
    pub fn to_bytes(&self, format: OutputFormat, quality: u8) -> Result<Vec<u8>> {
        let mut buffer = Vec::new();
        let mut cursor = std::io::Cursor::new(&mut buffer);
        match format {
            OutputFormat::Png => self.image.write_to(&mut cursor, image::ImageFormat::Png)?,
            OutputFormat::Jpeg => {
                let rgb_image = self.image.to_rgb8();
                let mut encoder =
                    image::codecs::jpeg::JpegEncoder::new_with_quality(&mut cursor, quality);
                encoder.encode_image(&rgb_image)?;
            },
            OutputFormat::WebP => {
                #[cfg(feature = "webp-support")]
                {
                    DynamicImage::ImageRgba8(self.image.to_rgba8())
                        .write_to(&mut cursor, image::ImageFormat::WebP)?;
                }
                #[cfg(not(feature = "webp-support"))]
                {
                    return Err(BgTrimError::invalid_config(
                        "WebP output requires the `webp-support` feature",
                    ));
                }
            },
            OutputFormat::Tiff => self.image.write_to(&mut cursor, image::ImageFormat::Tiff)?,
            OutputFormat::Rgba8 => return Ok(self.image.to_rgba8().into_raw()),
        }
        Ok(buffer)
    }

    /// Encode the result as a PNG data URL
    pub fn to_data_url(&self) -> Result<String> {
        let png = self.to_bytes(OutputFormat::Png, 100)?;
        Ok(crate::services::data_url::encode_png_data_url(&png))
    }

    /// Timing summary for display
    #[must_use]
    pub fn timing_summary(&self) -> String {
        let t = &self.metadata.timings;
        let mut summary = format!(
            "Total: {}ms | Decode: {}ms | Segmentation: {}ms | BBox: {}ms | Crop: {}ms",
            t.total_ms, t.image_decode_ms, t.segmentation_ms, t.bounding_box_ms, t.crop_ms
        );
        if let Some(encode_ms) = t.image_encode_ms {
            summary.push_str(&format!(" | Encode: {}ms", encode_ms));
        }
        let other_ms = t.other_overhead_ms();
        if other_ms > 5 {
            summary.push_str(&format!(" | Other: {}ms", other_ms));
        }
        summary
    }
}
