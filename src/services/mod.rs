//! Service layer
//!
//! Infrastructure around the trim core: decoding and file access, output
//! formats, cropping, data URLs and progress reporting.

pub mod compose;
pub mod data_url;
pub mod format;
pub mod io;
pub mod progress;

pub use compose::CropComposer;
pub use data_url::{decode_data_url, encode_png_data_url, validate_mime_type, DataUrl};
pub use format::OutputFormatHandler;
pub use io::ImageIOService;
pub use progress::{
    create_cli_progress_reporter, BatchProcessingStats, BatchProgressReporter,
    BatchProgressUpdate, ConsoleProgressReporter, NoOpProgressReporter, ProcessingStage,
    ProgressReporter, ProgressTracker, ProgressUpdate,
};
