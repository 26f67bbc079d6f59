//! Progress reporting service
//!
//! This module separates progress reporting concerns from business logic,
//! allowing different frontends to implement their own progress handling.

use crate::types::ProcessingTimings;
use instant::Instant;

/// Progress stages during background trimming
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessingStage {
    /// Loading and decoding input image
    ImageLoading,
    /// Flood-filling near-white background regions
    Segmentation,
    /// Reducing the alpha channel to a content rectangle
    BoundingBox,
    /// Cropping to the content rectangle
    Cropping,
    /// Converting to output format
    FormatConversion,
    /// Saving result to file
    FileSaving,
    /// Processing completed
    Completed,

    /// Initializing batch processing
    BatchInitialization,
    /// Processing individual item in batch
    BatchItemProcessing,
    /// Finalizing batch processing
    BatchFinalization,
}

impl ProcessingStage {
    /// Get a human-readable description of the processing stage
    #[must_use]
    pub fn description(&self) -> &'static str {
        match self {
            ProcessingStage::ImageLoading => "Loading input image",
            ProcessingStage::Segmentation => "Erasing background regions",
            ProcessingStage::BoundingBox => "Finding content bounds",
            ProcessingStage::Cropping => "Cropping to content",
            ProcessingStage::FormatConversion => "Converting output format",
            ProcessingStage::FileSaving => "Saving result",
            ProcessingStage::Completed => "Processing completed",
            ProcessingStage::BatchInitialization => "Initializing batch processing",
            ProcessingStage::BatchItemProcessing => "Processing batch item",
            ProcessingStage::BatchFinalization => "Finalizing batch processing",
        }
    }

    /// Get the typical progress percentage for this stage
    #[must_use]
    pub fn progress_percentage(&self) -> u8 {
        match self {
            ProcessingStage::ImageLoading => 10,
            ProcessingStage::Segmentation => 60,
            ProcessingStage::BoundingBox => 80,
            ProcessingStage::Cropping => 90,
            ProcessingStage::FormatConversion => 95,
            ProcessingStage::FileSaving => 99,
            ProcessingStage::Completed => 100,
            ProcessingStage::BatchInitialization => 5,
            ProcessingStage::BatchItemProcessing => 50, // varies with item count
            ProcessingStage::BatchFinalization => 98,
        }
    }
}

/// Progress update containing stage and timing information
#[derive(Debug, Clone)]
pub struct ProgressUpdate {
    /// Current processing stage
    pub stage: ProcessingStage,
    /// Progress percentage (0-100)
    pub progress: u8,
    /// Human-readable stage description
    pub description: String,
    /// Elapsed time since processing started (milliseconds)
    pub elapsed_ms: u64,
    /// Estimated time remaining (milliseconds, if available)
    pub eta_ms: Option<u64>,
}

impl ProgressUpdate {
    #[must_use]
    pub fn new(stage: ProcessingStage, start_time: Instant) -> Self {
        Self {
            progress: stage.progress_percentage(),
            description: stage.description().to_string(),
            elapsed_ms: start_time.elapsed().as_millis() as u64,
            eta_ms: None,
            stage,
        }
    }

    #[must_use]
    pub fn with_description(
        stage: ProcessingStage,
        description: String,
        start_time: Instant,
    ) -> Self {
        Self {
            progress: stage.progress_percentage(),
            elapsed_ms: start_time.elapsed().as_millis() as u64,
            eta_ms: None,
            stage,
            description,
        }
    }

    #[must_use]
    pub fn with_eta(mut self, eta_ms: u64) -> Self {
        self.eta_ms = Some(eta_ms);
        self
    }
}

/// Statistics for batch processing operations
#[derive(Debug, Clone)]
pub struct BatchProcessingStats {
    pub items_completed: usize,
    pub items_total: usize,
    pub items_failed: usize,
    /// Name/path of the current item being processed
    pub current_item_name: String,
    /// Items per second
    pub processing_rate: f64,
    pub eta_seconds: Option<u64>,
}

/// Nested progress update for batch operations
#[derive(Debug, Clone)]
pub struct BatchProgressUpdate {
    pub total_progress: ProgressUpdate,
    pub current_item_progress: Option<ProgressUpdate>,
    pub stats: BatchProcessingStats,
}

/// Trait for reporting progress during trimming
pub trait ProgressReporter: Send + Sync {
    /// Report a progress update
    fn report_progress(&self, update: ProgressUpdate);

    /// Report processing completion with final timings
    fn report_completion(&self, timings: ProcessingTimings);

    /// Report an error during processing
    fn report_error(&self, stage: ProcessingStage, error: &str);

    /// Report batch progress update with nested item progress
    fn report_batch_progress(&self, update: BatchProgressUpdate) {
        drop(update);
    }
}

/// No-op progress reporter that discards all progress updates
pub struct NoOpProgressReporter;

impl ProgressReporter for NoOpProgressReporter {
    fn report_progress(&self, _update: ProgressUpdate) {}

    fn report_completion(&self, _timings: ProcessingTimings) {}

    fn report_error(&self, _stage: ProcessingStage, _error: &str) {}
}

/// Console progress reporter that logs progress through `log`
pub struct ConsoleProgressReporter {
    verbose: bool,
}

impl ConsoleProgressReporter {
    #[must_use]
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }
}

impl ProgressReporter for ConsoleProgressReporter {
    fn report_progress(&self, update: ProgressUpdate) {
        if self.verbose {
            if let Some(eta) = update.eta_ms {
                log::info!(
                    "[{}%] {} ({}ms elapsed, ~{}ms remaining)",
                    update.progress,
                    update.description,
                    update.elapsed_ms,
                    eta
                );
            } else {
                log::info!(
                    "[{}%] {} ({}ms elapsed)",
                    update.progress,
                    update.description,
                    update.elapsed_ms
                );
            }
        } else {
            log::info!("[{}%] {}", update.progress, update.description);
        }
    }

    fn report_completion(&self, timings: ProcessingTimings) {
        log::info!("✅ Background trim completed in {}ms", timings.total_ms);

        if self.verbose {
            log::info!("  📊 Detailed timings:");
            log::info!("    • Image decode: {}ms", timings.image_decode_ms);
            log::info!("    • Segmentation: {}ms", timings.segmentation_ms);
            log::info!("    • Bounding box: {}ms", timings.bounding_box_ms);
            log::info!("    • Crop: {}ms", timings.crop_ms);
        }
    }

    fn report_error(&self, stage: ProcessingStage, error: &str) {
        log::error!("❌ Error during {}: {}", stage.description(), error);
    }
}

/// Progress reporter with a per-batch summary line
pub struct BatchProgressReporter {
    verbose: bool,
}

impl BatchProgressReporter {
    #[must_use]
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }

    fn progress_bar(percentage: u8) -> String {
        let filled = (usize::from(percentage.min(100)) * 20) / 100;
        format!("{}{}", "█".repeat(filled), "░".repeat(20 - filled))
    }

    fn format_eta(eta_seconds: Option<u64>) -> String {
        match eta_seconds {
            Some(seconds) if seconds < 60 => format!("{seconds}s"),
            Some(seconds) => format!("{}m {}s", seconds / 60, seconds % 60),
            None => "calculating...".to_string(),
        }
    }
}

impl ProgressReporter for BatchProgressReporter {
    fn report_progress(&self, update: ProgressUpdate) {
        ConsoleProgressReporter::new(self.verbose).report_progress(update);
    }

    fn report_completion(&self, timings: ProcessingTimings) {
        ConsoleProgressReporter::new(self.verbose).report_completion(timings);
    }

    fn report_error(&self, stage: ProcessingStage, error: &str) {
        log::error!("❌ Error during {}: {}", stage.description(), error);
    }

    fn report_batch_progress(&self, update: BatchProgressUpdate) {
        log::info!(
            "📁 Batch: {}/{} files, {} failed ({:.1} files/sec) - ETA: {}",
            update.stats.items_completed,
            update.stats.items_total,
            update.stats.items_failed,
            update.stats.processing_rate,
            Self::format_eta(update.stats.eta_seconds)
        );
        log::info!(
            "[{}] {}% Overall Progress",
            Self::progress_bar(update.total_progress.progress),
            update.total_progress.progress
        );

        if let Some(ref item_progress) = update.current_item_progress {
            log::info!(
                "📄 Current: {} [{}] {}",
                update.stats.current_item_name,
                Self::progress_bar(item_progress.progress),
                item_progress.description
            );
        }
    }
}

/// Progress tracker that manages timing and progress reporting
pub struct ProgressTracker {
    reporter: Box<dyn ProgressReporter>,
    start_time: Instant,
    current_stage: Option<ProcessingStage>,
}

impl ProgressTracker {
    #[must_use]
    pub fn new(reporter: Box<dyn ProgressReporter>) -> Self {
        Self {
            reporter,
            start_time: Instant::now(),
            current_stage: None,
        }
    }

    pub fn report_stage(&mut self, stage: ProcessingStage) {
        self.current_stage = Some(stage.clone());
        let update = ProgressUpdate::new(stage, self.start_time);
        self.reporter.report_progress(update);
    }

    pub fn report_stage_with_description(&mut self, stage: ProcessingStage, description: String) {
        self.current_stage = Some(stage.clone());
        let update = ProgressUpdate::with_description(stage, description, self.start_time);
        self.reporter.report_progress(update);
    }

    pub fn report_completion(&self, timings: ProcessingTimings) {
        self.reporter.report_completion(timings);
    }

    /// Report an error against the most recent stage
    pub fn report_error(&self, error: &str) {
        let stage = self
            .current_stage
            .clone()
            .unwrap_or(ProcessingStage::ImageLoading);
        self.reporter.report_error(stage, error);
    }

    #[must_use]
    pub fn elapsed_ms(&self) -> u64 {
        self.start_time.elapsed().as_millis() as u64
    }

    #[must_use]
    pub fn current_stage(&self) -> Option<&ProcessingStage> {
        self.current_stage.as_ref()
    }
}

/// Pick a reporter for the CLI
///
/// `--progress` with more than one input gets the batch reporter.
pub fn create_cli_progress_reporter(
    enable_progress: bool,
    verbose: bool,
    batch_size: usize,
) -> Box<dyn ProgressReporter> {
    if enable_progress && batch_size > 1 {
        Box::new(BatchProgressReporter::new(verbose))
    } else {
        Box::new(ConsoleProgressReporter::new(verbose))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct TestProgressReporter {
        progress_updates: Arc<Mutex<Vec<ProgressUpdate>>>,
        completions: Arc<Mutex<Vec<ProcessingTimings>>>,
        errors: Arc<Mutex<Vec<(ProcessingStage, String)>>>,
    }

    impl ProgressReporter for TestProgressReporter {
        fn report_progress(&self, update: ProgressUpdate) {
            self.progress_updates.lock().unwrap().push(update);
        }

        fn report_completion(&self, timings: ProcessingTimings) {
            self.completions.lock().unwrap().push(timings);
        }

        fn report_error(&self, stage: ProcessingStage, error: &str) {
            self.errors.lock().unwrap().push((stage, error.to_string()));
        }
    }

    const PIPELINE: [ProcessingStage; 7] = [
        ProcessingStage::ImageLoading,
        ProcessingStage::Segmentation,
        ProcessingStage::BoundingBox,
        ProcessingStage::Cropping,
        ProcessingStage::FormatConversion,
        ProcessingStage::FileSaving,
        ProcessingStage::Completed,
    ];

    #[test]
    fn test_pipeline_progress_is_ascending() {
        for pair in PIPELINE.windows(2) {
            assert!(pair[0].progress_percentage() < pair[1].progress_percentage());
        }
        assert_eq!(ProcessingStage::Completed.progress_percentage(), 100);
    }

    #[test]
    fn test_processing_stage_descriptions() {
        assert_eq!(
            ProcessingStage::Segmentation.description(),
            "Erasing background regions"
        );
        for stage in &PIPELINE {
            assert!(!stage.description().is_empty());
        }
    }

    #[test]
    fn test_progress_update_creation() {
        let update = ProgressUpdate::new(ProcessingStage::Cropping, Instant::now()).with_eta(1500);

        assert_eq!(update.stage, ProcessingStage::Cropping);
        assert_eq!(update.progress, 90);
        assert_eq!(update.description, "Cropping to content");
        assert_eq!(update.eta_ms, Some(1500));
    }

    #[test]
    fn test_progress_tracker() {
        let reporter = TestProgressReporter::default();
        let updates = reporter.progress_updates.clone();
        let completions = reporter.completions.clone();
        let errors = reporter.errors.clone();

        let mut tracker = ProgressTracker::new(Box::new(reporter));
        tracker.report_stage(ProcessingStage::ImageLoading);
        tracker.report_stage_with_description(
            ProcessingStage::Segmentation,
            "Flooding from 12 border seeds".to_string(),
        );
        tracker.report_completion(ProcessingTimings::default());
        tracker.report_error("worker timed out");

        let updates = updates.lock().unwrap();
        assert_eq!(updates.len(), 2);
        assert_eq!(updates[1].description, "Flooding from 12 border seeds");
        assert_eq!(completions.lock().unwrap().len(), 1);

        let errors = errors.lock().unwrap();
        assert_eq!(errors[0].0, ProcessingStage::Segmentation);
        assert_eq!(errors[0].1, "worker timed out");
        assert_eq!(tracker.current_stage(), Some(&ProcessingStage::Segmentation));
    }

    #[test]
    fn test_error_before_any_stage_uses_loading() {
        let reporter = TestProgressReporter::default();
        let errors = reporter.errors.clone();
        let tracker = ProgressTracker::new(Box::new(reporter));

        tracker.report_error("boom");
        assert_eq!(errors.lock().unwrap()[0].0, ProcessingStage::ImageLoading);
    }

    #[test]
    fn test_trait_object_safety() {
        let reporters: Vec<Box<dyn ProgressReporter>> = vec![
            Box::new(NoOpProgressReporter),
            Box::new(ConsoleProgressReporter::new(true)),
            create_cli_progress_reporter(true, false, 3),
        ];

        let batch_update = BatchProgressUpdate {
            total_progress: ProgressUpdate::new(
                ProcessingStage::BatchItemProcessing,
                Instant::now(),
            ),
            current_item_progress: None,
            stats: BatchProcessingStats {
                items_completed: 1,
                items_total: 3,
                items_failed: 0,
                current_item_name: "scan.png".to_string(),
                processing_rate: 1.0,
                eta_seconds: Some(60),
            },
        };

        for reporter in reporters {
            reporter.report_progress(ProgressUpdate::new(
                ProcessingStage::BoundingBox,
                Instant::now(),
            ));
            reporter.report_completion(ProcessingTimings::default());
            reporter.report_error(ProcessingStage::FileSaving, "Test error");
            reporter.report_batch_progress(batch_update.clone());
        }
    }

    #[test]
    fn test_batch_progress_bar_width() {
        assert_eq!(BatchProgressReporter::progress_bar(0).chars().count(), 20);
        assert_eq!(BatchProgressReporter::progress_bar(100), "█".repeat(20));
        assert_eq!(BatchProgressReporter::format_eta(Some(125)), "2m 5s");
        assert_eq!(BatchProgressReporter::format_eta(None), "calculating...");
    }
}
