//! Output format handling service

use crate::config::OutputFormat;
use image::{DynamicImage, RgbaImage};

/// Service for handling output format conversions
pub struct OutputFormatHandler;

impl OutputFormatHandler {
    /// Convert a trimmed RGBA image to the representation used for `format`
    ///
    /// JPEG has no alpha channel, so erased pixels keep their original RGB.
    ///
    /// # Examples
    /// ```rust
    /// use bgtrim::{services::OutputFormatHandler, config::OutputFormat};
    /// use image::RgbaImage;
    ///
    /// let converted = OutputFormatHandler::convert_format(RgbaImage::new(4, 4), OutputFormat::Jpeg);
    /// assert!(converted.as_rgb8().is_some());
    /// ```
    #[must_use]
    pub fn convert_format(rgba_image: RgbaImage, format: OutputFormat) -> DynamicImage {
        match format {
            OutputFormat::Png | OutputFormat::WebP | OutputFormat::Tiff | OutputFormat::Rgba8 => {
                DynamicImage::ImageRgba8(rgba_image)
            },
            OutputFormat::Jpeg => DynamicImage::ImageRgba8(rgba_image).to_rgb8().into(),
        }
    }

    /// File extension (without the dot) for a given output format
    ///
    /// # Examples
    /// ```rust
    /// use bgtrim::{services::OutputFormatHandler, config::OutputFormat};
    ///
    /// assert_eq!(OutputFormatHandler::get_extension(OutputFormat::Png), "png");
    /// assert_eq!(OutputFormatHandler::get_extension(OutputFormat::Jpeg), "jpg");
    /// ```
    #[must_use]
    pub fn get_extension(format: OutputFormat) -> &'static str {
        match format {
            OutputFormat::Png => "png",
            OutputFormat::Jpeg => "jpg",
            OutputFormat::WebP => "webp",
            OutputFormat::Tiff => "tiff",
            OutputFormat::Rgba8 => "raw",
        }
    }

    /// Check if a format supports transparency (alpha channel)
    #[must_use]
    pub fn supports_transparency(format: OutputFormat) -> bool {
        !matches!(format, OutputFormat::Jpeg)
    }

    /// Warn when the chosen format will flatten erased pixels
    pub fn validate_for_background_removal(format: OutputFormat) {
        if !Self::supports_transparency(format) {
            log::warn!(
                "Output format {:?} does not support transparency. Erased background will be flattened.",
                format
            );
        }
    }
}
