//! Error types for background trimming operations

use thiserror::Error;

/// Result type alias for background trimming operations
pub type Result<T> = std::result::Result<T, BgTrimError>;

/// Error types for background trimming operations
#[derive(Error, Debug)]
pub enum BgTrimError {
    /// Input/output errors (file not found, permission denied, etc.)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Image decode/encode errors from the `image` crate
    #[error("Image processing error: {0}")]
    Image(#[from] image::ImageError),

    /// Pixel buffer whose dimensions cannot be traversed safely
    #[error("Invalid dimensions: {width}x{height} with {len} bytes (expected {expected})")]
    InvalidDimensions {
        width: u32,
        height: u32,
        len: usize,
        expected: usize,
    },

    /// Invalid configuration or parameters
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Malformed data URL or MIME type
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Base64 payload could not be decoded
    #[error("Base64 decode error: {0}")]
    Base64(#[from] base64::DecodeError),

    /// Errors raised while running the pipeline
    #[error("Processing error: {0}")]
    Processing(String),

    /// The worker context terminated before posting a result
    #[error("Worker failure: {0}")]
    Worker(String),

    /// The worker did not post a result within the configured deadline
    #[error("Worker timed out after {0:?}")]
    Timeout(std::time::Duration),

    /// Generic error for unexpected conditions
    #[error("Internal error: {0}")]
    Internal(String),
}

impl BgTrimError {
    /// Create a new invalid configuration error
    pub fn invalid_config<S: Into<String>>(msg: S) -> Self {
        Self::InvalidConfig(msg.into())
    }

    /// Create a new invalid input error
    pub fn invalid_input<S: Into<String>>(msg: S) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Create a new processing error
    pub fn processing<S: Into<String>>(msg: S) -> Self {
        Self::Processing(msg.into())
    }

    /// Create a new worker failure
    pub fn worker<S: Into<String>>(msg: S) -> Self {
        Self::Worker(msg.into())
    }

    /// Create a new internal error
    pub fn internal<S: Into<String>>(msg: S) -> Self {
        Self::Internal(msg.into())
    }

    /// Create an invalid dimensions error for a buffer of `len` bytes
    #[must_use]
    pub fn invalid_dimensions(width: u32, height: u32, len: usize) -> Self {
        let expected = (width as usize)
            .checked_mul(height as usize)
            .and_then(|n| n.checked_mul(4))
            .unwrap_or(usize::MAX);
        Self::InvalidDimensions {
            width,
            height,
            len,
            expected,
        }
    }

    /// Create file I/O error with operation context
    pub fn file_io_error<P: AsRef<std::path::Path>>(
        operation: &str,
        path: P,
        error: &std::io::Error,
    ) -> Self {
        let path_display = path.as_ref().display();
        Self::Io(std::io::Error::new(
            error.kind(),
            format!("Failed to {} '{}': {}", operation, path_display, error),
        ))
    }

    /// Create configuration error with valid ranges
    pub fn config_value_error<T: std::fmt::Display>(
        parameter: &str,
        value: T,
        valid_range: &str,
        recommended: Option<T>,
    ) -> Self {
        let recommendation = match recommended {
            Some(rec) => format!(" Recommended: {}", rec),
            None => String::new(),
        };

        Self::InvalidConfig(format!(
            "Invalid {}: {} (valid range: {}).{}",
            parameter, value, valid_range, recommendation
        ))
    }

    /// Create processing error with stage context
    pub fn processing_stage_error(stage: &str, details: &str, input_info: Option<&str>) -> Self {
        let input_context = match input_info {
            Some(info) => format!(" (input: {})", info),
            None => String::new(),
        };

        Self::Processing(format!(
            "Processing failed at stage '{}'{}: {}",
            stage, input_context, details
        ))
    }

    /// Whether the failure happened at the worker boundary rather than in the algorithm
    #[must_use]
    pub fn is_boundary_failure(&self) -> bool {
        matches!(self, Self::Worker(_) | Self::Timeout(_))
    }
}
