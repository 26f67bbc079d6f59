#![allow(clippy::too_many_lines)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::unused_async)]

//! # bgtrim
//!
//! White background removal and auto-crop for product shots, scans and
//! illustrations on a near-white backdrop.
//!
//! Near-white pixels are grouped into 4-connected regions with a flood fill.
//! Regions that are judged to be background get their alpha zeroed, then the
//! image is cropped to the smallest rectangle that still holds visible pixels.
//!
//! ## Features
//!
//! - **Two strategies**: erase everything reachable from the border, or erase
//!   every near-white region larger than a share of the image area
//! - **Worker boundary**: the pixel buffer moves to a blocking worker thread,
//!   with an optional deadline and a distinct failure signal
//! - **Format Support**: PNG, JPEG, WebP, TIFF and raw RGBA8 output
//! - **Data URLs**: base64 image data URLs in, PNG data URLs out
//! - **CLI Integration**: optional command-line interface (enable with `cli` feature)
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use bgtrim::{trim_background_from_reader, SegmentationStrategy, TrimConfig};
//! use tokio::fs::File;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = TrimConfig::builder()
//!     .tolerance(10)
//!     .strategy(SegmentationStrategy::BorderSeeded)
//!     .build()?;
//!
//! let file = File::open("product.jpg").await?;
//! let result = trim_background_from_reader(file, &config).await?;
//! if let Some(bbox) = result.bounding_box {
//!     println!("content at {bbox}");
//! }
//! result.save_png("product_trimmed.png")?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Using the core directly
//!
//! The synchronous core works on a raw RGBA8 buffer and reports the content
//! rectangle without cropping:
//!
//! ```rust
//! use bgtrim::{process_request, PixelBuffer, SegmentationStrategy, Tolerance, TrimRequest};
//!
//! let mut pixels = vec![255u8; 4 * 4 * 4];
//! // one black pixel at (2, 2)
//! pixels[(2 * 4 + 2) * 4..(2 * 4 + 2) * 4 + 3].copy_from_slice(&[0, 0, 0]);
//!
//! let request = TrimRequest::new(PixelBuffer::new(4, 4, pixels).unwrap())
//!     .with_tolerance(Tolerance::new(5))
//!     .with_strategy(SegmentationStrategy::BorderSeeded);
//! let response = process_request(request).unwrap();
//!
//! let bbox = response.bounding_box.unwrap();
//! assert_eq!((bbox.min_x, bbox.min_y, bbox.max_x, bbox.max_y), (2, 2, 2, 2));
//! ```
//!
//! ### Feature Flags
//!
//! - `cli` (default): command-line interface and tracing subscriber setup
//! - `webp-support` (default): WebP output
//! - `tracing-json`: JSON log output for the CLI
//! - `tracing-files`: log to a file through `tracing-appender`

pub mod bounds;
#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod error;
pub mod processor;
pub mod segmentation;
pub mod services;
#[cfg(feature = "cli")]
pub mod tracing_config;
pub mod types;
pub mod worker;

use tokio::io::AsyncRead;

pub use bounds::find_content_bounds;
pub use config::{OutputFormat, SegmentationStrategy, Tolerance, TrimConfig, TrimConfigBuilder};
pub use error::{BgTrimError, Result};
pub use processor::BackgroundTrimProcessor;
pub use segmentation::{erase_background, BackgroundEraser};
pub use services::{
    ConsoleProgressReporter, CropComposer, ImageIOService, NoOpProgressReporter,
    OutputFormatHandler, ProcessingStage, ProgressReporter, ProgressTracker, ProgressUpdate,
};
pub use types::{
    BoundingBox, PixelBuffer, ProcessingMetadata, ProcessingTimings, SegmentationStats,
    TrimResult,
};
pub use worker::{process_request, TrimRequest, TrimResponse, TrimWorker};

#[cfg(feature = "cli")]
pub use tracing_config::{init_cli_tracing, TracingConfig, TracingFormat, TracingOutput};

/// Trim the background of an encoded image held in memory
///
/// # Examples
/// ```rust,no_run
/// use bgtrim::{trim_background_from_bytes, OutputFormat, TrimConfig};
///
/// # async fn example(upload_bytes: Vec<u8>) -> anyhow::Result<()> {
/// let config = TrimConfig::default();
/// let result = trim_background_from_bytes(&upload_bytes, &config).await?;
/// let png = result.to_bytes(OutputFormat::Png, 100)?;
/// # Ok(())
/// # }
/// ```
pub async fn trim_background_from_bytes(
    image_bytes: &[u8],
    config: &TrimConfig,
) -> Result<TrimResult> {
    let mut processor = BackgroundTrimProcessor::new(config.clone())?;
    processor.process_bytes(image_bytes).await
}

/// Trim the background of an already decoded image
///
/// # Examples
/// ```rust,no_run
/// use bgtrim::{trim_background_from_image, TrimConfig};
/// use image::DynamicImage;
///
/// # async fn example(img: DynamicImage) -> anyhow::Result<()> {
/// let result = trim_background_from_image(&img, &TrimConfig::default()).await?;
/// result.save_png("output.png")?;
/// # Ok(())
/// # }
/// ```
pub async fn trim_background_from_image(
    image: &image::DynamicImage,
    config: &TrimConfig,
) -> Result<TrimResult> {
    let mut processor = BackgroundTrimProcessor::new(config.clone())?;
    processor.process_image(image).await
}

/// Trim the background of an image read from an async stream
pub async fn trim_background_from_reader<R: AsyncRead + Unpin>(
    reader: R,
    config: &TrimConfig,
) -> Result<TrimResult> {
    let mut processor = BackgroundTrimProcessor::new(config.clone())?;
    processor.process_reader(reader).await
}
