//! Background trim processor
//!
//! `BackgroundTrimProcessor` runs the whole pipeline: decode, hand the pixels to
//! the worker, crop to the reported bounds and convert to the output format.
//! The CLI and the convenience functions in the crate root all go through it.

use crate::{
    config::{OutputFormat, TrimConfig},
    error::Result,
    services::{
        data_url::decode_data_url, CropComposer, ImageIOService, OutputFormatHandler,
        ProcessingStage, ProgressReporter, ProgressTracker,
    },
    types::{PixelBuffer, ProcessingMetadata, ProcessingTimings, TrimResult},
    worker::{TrimRequest, TrimWorker},
};
use image::{DynamicImage, GenericImageView};
use instant::Instant;
use std::path::Path;
use tracing::{debug, info, instrument, span, Level};

/// End-to-end background trimming pipeline
pub struct BackgroundTrimProcessor {
    config: TrimConfig,
    worker: TrimWorker,
    progress_tracker: Option<ProgressTracker>,
}

impl BackgroundTrimProcessor {
    /// Create a processor for a validated configuration
    ///
    /// # Errors
    /// - `BgTrimError::InvalidConfig` when `config` fails validation
    pub fn new(config: TrimConfig) -> Result<Self> {
        config.validate()?;
        let worker = TrimWorker::with_timeout(config.timeout());
        Ok(Self {
            config,
            worker,
            progress_tracker: None,
        })
    }

    /// Report pipeline stages to `reporter`
    #[must_use]
    pub fn with_progress_reporter(mut self, reporter: Box<dyn ProgressReporter>) -> Self {
        self.progress_tracker = Some(ProgressTracker::new(reporter));
        self
    }

    /// Get the current configuration
    #[must_use]
    pub fn config(&self) -> &TrimConfig {
        &self.config
    }

    /// Load and trim an image file
    ///
    /// # Errors
    /// - File I/O or decode failures
    /// - Any failure from [`Self::process_image`]
    pub async fn process_file<P: AsRef<Path>>(&mut self, input_path: P) -> Result<TrimResult> {
        let input_path = input_path.as_ref();
        self.report_stage(ProcessingStage::ImageLoading);

        let decode_start = Instant::now();
        let image = match ImageIOService::load_image(input_path) {
            Ok(image) => image,
            Err(e) => {
                self.report_error(&e.to_string());
                return Err(e);
            },
        };
        let decode_ms = decode_start.elapsed().as_millis() as u64;

        let mut result = self
            .run_pipeline(&image, decode_ms, self.config.output_format)
            .await?;
        result.input_path = Some(input_path.display().to_string());
        Ok(result)
    }

    /// Trim a decoded image
    ///
    /// # Errors
    /// - `BgTrimError::InvalidDimensions` for zero-sized images
    /// - `BgTrimError::Worker` / `BgTrimError::Timeout` from the worker boundary
    pub async fn process_image(&mut self, image: &DynamicImage) -> Result<TrimResult> {
        self.run_pipeline(image, 0, self.config.output_format).await
    }

    /// Decode and trim an encoded image held in memory
    ///
    /// # Errors
    /// - Decode failures
    /// - Any failure from [`Self::process_image`]
    pub async fn process_bytes(&mut self, image_bytes: &[u8]) -> Result<TrimResult> {
        self.decode_and_run(image_bytes, self.config.output_format).await
    }

    /// Read an async stream to the end, then decode and trim it
    ///
    /// # Examples
    /// ```rust,no_run
    /// use bgtrim::{BackgroundTrimProcessor, TrimConfig};
    /// use tokio::fs::File;
    ///
    /// # async fn example() -> anyhow::Result<()> {
    /// let mut processor = BackgroundTrimProcessor::new(TrimConfig::default())?;
    /// let file = File::open("scan.png").await?;
    /// let result = processor.process_reader(file).await?;
    /// result.save_png("scan_trimmed.png")?;
    /// # Ok(())
    /// # }
    /// ```
    ///
    /// # Errors
    /// - Stream read failures
    /// - Any failure from [`Self::process_bytes`]
    pub async fn process_reader<R: tokio::io::AsyncRead + Unpin>(
        &mut self,
        reader: R,
    ) -> Result<TrimResult> {
        self.report_stage(ProcessingStage::ImageLoading);

        let decode_start = Instant::now();
        let image = match ImageIOService::load_from_reader(reader).await {
            Ok(image) => image,
            Err(e) => {
                self.report_error(&e.to_string());
                return Err(e);
            },
        };
        let decode_ms = decode_start.elapsed().as_millis() as u64;

        self.run_pipeline(&image, decode_ms, self.config.output_format).await
    }

    /// Trim an image given as a base64 data URL and return the result as a PNG data URL
    ///
    /// The result is always an RGBA PNG, whatever `output_format` is configured.
    /// A result with no content left becomes the 1x1 transparent placeholder.
    ///
    /// # Errors
    /// - `BgTrimError::InvalidInput` / `BgTrimError::Base64` for malformed URLs
    /// - Any failure from [`Self::process_bytes`]
    pub async fn process_data_url(&mut self, data_url: &str) -> Result<String> {
        let decoded = decode_data_url(data_url)?;
        debug!(
            "Decoded {} data URL ({} bytes)",
            decoded.mime_type,
            decoded.bytes.len()
        );
        let result = self.decode_and_run(&decoded.bytes, OutputFormat::Png).await?;
        result.to_data_url()
    }

    async fn decode_and_run(
        &mut self,
        image_bytes: &[u8],
        output_format: OutputFormat,
    ) -> Result<TrimResult> {
        self.report_stage(ProcessingStage::ImageLoading);

        let decode_start = Instant::now();
        let image = match ImageIOService::load_from_bytes(image_bytes) {
            Ok(image) => image,
            Err(e) => {
                self.report_error(&e.to_string());
                return Err(e);
            },
        };
        let decode_ms = decode_start.elapsed().as_millis() as u64;

        self.run_pipeline(&image, decode_ms, output_format).await
    }

    #[instrument(
        skip(self, image),
        fields(
            dimensions = %format!("{}x{}", image.width(), image.height()),
            strategy = %self.config.strategy,
            tolerance = %self.config.tolerance
        )
    )]
    async fn run_pipeline(
        &mut self,
        image: &DynamicImage,
        decode_ms: u64,
        output_format: OutputFormat,
    ) -> Result<TrimResult> {
        let total_start = Instant::now();
        let original_dimensions = image.dimensions();
        let mut timings = ProcessingTimings {
            image_decode_ms: decode_ms,
            ..ProcessingTimings::default()
        };

        info!("🎯 Starting background trim");

        let buffer = match PixelBuffer::from_dynamic_image(image) {
            Ok(buffer) => buffer,
            Err(e) => {
                self.report_error(&e.to_string());
                return Err(e);
            },
        };

        self.report_stage(ProcessingStage::Segmentation);
        let request = TrimRequest::new(buffer)
            .with_tolerance(self.config.tolerance)
            .with_strategy(self.config.strategy);
        let response = match self.worker.submit(request).await {
            Ok(response) => response,
            Err(e) => {
                self.report_error(&e.to_string());
                return Err(e);
            },
        };
        timings.segmentation_ms = response.segmentation_ms;
        timings.bounding_box_ms = response.bounding_box_ms;

        self.report_stage(ProcessingStage::BoundingBox);
        match response.bounding_box {
            Some(bbox) => debug!("Content bounds: {}", bbox),
            None => debug!("No content left after segmentation"),
        }

        self.report_stage(ProcessingStage::Cropping);
        let crop_start = Instant::now();
        let cropped = {
            let _span = span!(Level::DEBUG, "crop", bounding_box = ?response.bounding_box).entered();
            CropComposer::crop_to_bounds(response.buffer, response.bounding_box)
        };
        let cropped = match cropped {
            Ok(cropped) => cropped,
            Err(e) => {
                self.report_error(&e.to_string());
                return Err(e);
            },
        };
        timings.crop_ms = crop_start.elapsed().as_millis() as u64;

        self.report_stage(ProcessingStage::FormatConversion);
        OutputFormatHandler::validate_for_background_removal(output_format);
        let final_image = OutputFormatHandler::convert_format(cropped, output_format);

        timings.total_ms = total_start.elapsed().as_millis() as u64 + decode_ms;

        let mut metadata =
            ProcessingMetadata::new(self.config.strategy, self.config.tolerance);
        metadata.stats = response.stats;
        metadata.timings = timings.clone();

        let result = TrimResult::new(
            final_image,
            response.bounding_box,
            original_dimensions,
            metadata,
        );

        info!(
            regions_erased = response.stats.regions_erased,
            pixels_erased = response.stats.pixels_erased,
            output = %format!("{}x{}", result.dimensions().0, result.dimensions().1),
            "✅ Background trim finished"
        );

        if let Some(ref mut tracker) = self.progress_tracker {
            tracker.report_stage(ProcessingStage::Completed);
            tracker.report_completion(timings);
        }

        Ok(result)
    }

    fn report_stage(&mut self, stage: ProcessingStage) {
        if let Some(ref mut tracker) = self.progress_tracker {
            tracker.report_stage(stage);
        }
    }

    fn report_error(&self, error: &str) {
        if let Some(ref tracker) = self.progress_tracker {
            tracker.report_error(error);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::{OutputFormat, SegmentationStrategy},
        error::BgTrimError,
        services::{ProgressUpdate, ProgressReporter},
        types::BoundingBox,
    };
    use image::{Rgba, RgbaImage};
    use std::sync::{Arc, Mutex};

    #[derive(Default, Clone)]
    struct RecordingReporter {
        stages: Arc<Mutex<Vec<ProcessingStage>>>,
        errors: Arc<Mutex<Vec<String>>>,
    }

    impl ProgressReporter for RecordingReporter {
        fn report_progress(&self, update: ProgressUpdate) {
            self.stages.lock().unwrap().push(update.stage);
        }

        fn report_completion(&self, _timings: ProcessingTimings) {}

        fn report_error(&self, _stage: ProcessingStage, error: &str) {
            self.errors.lock().unwrap().push(error.to_string());
        }
    }

    fn framed_subject() -> DynamicImage {
        let mut image = RgbaImage::from_pixel(20, 12, Rgba([255, 255, 255, 255]));
        for y in 3..7 {
            for x in 5..11 {
                image.put_pixel(x, y, Rgba([30, 60, 90, 255]));
            }
        }
        DynamicImage::ImageRgba8(image)
    }

    fn png_bytes(image: &DynamicImage) -> Vec<u8> {
        let mut bytes = Vec::new();
        image
            .write_to(&mut std::io::Cursor::new(&mut bytes), image::ImageFormat::Png)
            .unwrap();
        bytes
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        let config = TrimConfig {
            jpeg_quality: 101,
            ..TrimConfig::default()
        };
        assert!(matches!(
            BackgroundTrimProcessor::new(config),
            Err(BgTrimError::InvalidConfig(_))
        ));
    }

    #[tokio::test]
    async fn test_process_image_crops_to_subject() {
        let mut processor = BackgroundTrimProcessor::new(TrimConfig::default()).unwrap();
        let result = processor.process_image(&framed_subject()).await.unwrap();

        assert_eq!(
            result.bounding_box,
            Some(BoundingBox {
                min_x: 5,
                min_y: 3,
                max_x: 10,
                max_y: 6
            })
        );
        assert_eq!(result.dimensions(), (6, 4));
        assert_eq!(result.original_dimensions, (20, 12));
        assert_eq!(result.metadata.stats.regions_erased, 1);
    }

    #[tokio::test]
    async fn test_process_bytes_records_decode_time_and_stages() {
        let reporter = RecordingReporter::default();
        let stages = reporter.stages.clone();
        let mut processor = BackgroundTrimProcessor::new(
            TrimConfig::builder()
                .strategy(SegmentationStrategy::BorderSeeded)
                .build()
                .unwrap(),
        )
        .unwrap()
        .with_progress_reporter(Box::new(reporter));

        let result = processor
            .process_bytes(&png_bytes(&framed_subject()))
            .await
            .unwrap();
        assert_eq!(result.dimensions(), (6, 4));

        let stages = stages.lock().unwrap();
        assert_eq!(
            *stages,
            vec![
                ProcessingStage::ImageLoading,
                ProcessingStage::Segmentation,
                ProcessingStage::BoundingBox,
                ProcessingStage::Cropping,
                ProcessingStage::FormatConversion,
                ProcessingStage::Completed,
            ]
        );
    }

    #[tokio::test]
    async fn test_undecodable_bytes_are_reported() {
        let reporter = RecordingReporter::default();
        let errors = reporter.errors.clone();
        let mut processor = BackgroundTrimProcessor::new(TrimConfig::default())
            .unwrap()
            .with_progress_reporter(Box::new(reporter));

        assert!(processor.process_bytes(b"not an image").await.is_err());
        assert_eq!(errors.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_all_white_returns_placeholder() {
        let image = DynamicImage::ImageRgba8(RgbaImage::from_pixel(
            10,
            10,
            Rgba([255, 255, 255, 255]),
        ));
        let mut processor = BackgroundTrimProcessor::new(TrimConfig::default()).unwrap();
        let result = processor.process_image(&image).await.unwrap();

        assert!(result.is_empty());
        assert_eq!(result.dimensions(), (1, 1));
        assert_eq!(result.metadata.stats.pixels_erased, 100);
    }

    #[tokio::test]
    async fn test_jpeg_output_is_rgb() {
        let config = TrimConfig::builder()
            .output_format(OutputFormat::Jpeg)
            .build()
            .unwrap();
        let mut processor = BackgroundTrimProcessor::new(config).unwrap();
        let result = processor.process_image(&framed_subject()).await.unwrap();
        assert!(result.image.as_rgb8().is_some());
    }

    #[tokio::test]
    async fn test_process_data_url_round_trip() {
        let url = crate::services::data_url::encode_png_data_url(&png_bytes(&framed_subject()));
        let mut processor = BackgroundTrimProcessor::new(TrimConfig::default()).unwrap();

        let output = processor.process_data_url(&url).await.unwrap();
        let decoded = decode_data_url(&output).unwrap();
        let image = image::load_from_memory(&decoded.bytes).unwrap();
        assert_eq!((image.width(), image.height()), (6, 4));
    }

    #[tokio::test]
    async fn test_process_data_url_keeps_alpha_for_jpeg_config() {
        // notch the subject's top-left corner so the crop holds an erased pixel
        let mut subject = framed_subject().to_rgba8();
        subject.put_pixel(5, 3, Rgba([255, 255, 255, 255]));
        let url = crate::services::data_url::encode_png_data_url(&png_bytes(
            &DynamicImage::ImageRgba8(subject),
        ));

        let config = TrimConfig::builder()
            .strategy(SegmentationStrategy::BorderSeeded)
            .output_format(OutputFormat::Jpeg)
            .build()
            .unwrap();
        let mut processor = BackgroundTrimProcessor::new(config).unwrap();

        let output = processor.process_data_url(&url).await.unwrap();
        let decoded = decode_data_url(&output).unwrap();
        assert_eq!(decoded.mime_type, "image/png");

        let image = image::load_from_memory(&decoded.bytes).unwrap().to_rgba8();
        assert_eq!(image.dimensions(), (6, 4));
        assert_eq!(image.get_pixel(0, 0)[3], 0);
        assert_eq!(image.get_pixel(1, 0), &Rgba([30, 60, 90, 255]));

        // regular results still follow the configured format
        let result = processor.process_image(&framed_subject()).await.unwrap();
        assert!(result.image.as_rgb8().is_some());
    }

    #[tokio::test]
    async fn test_process_data_url_rejects_non_image() {
        let mut processor = BackgroundTrimProcessor::new(TrimConfig::default()).unwrap();
        let err = processor
            .process_data_url("data:application/pdf;base64,AAAA")
            .await
            .unwrap_err();
        assert!(matches!(err, BgTrimError::InvalidInput(_)));
    }
}
