//! Worker boundary for the trim core
//!
//! A [`TrimRequest`] owns its pixel buffer. Submitting it moves the buffer into
//! a blocking worker thread (no copy), the synchronous core runs to completion
//! there, and the same buffer comes back inside the [`TrimResponse`]. The
//! caller holds no reference to the pixels while the worker owns them.
//!
//! There is no mid-computation cancellation. When a deadline is configured and
//! elapses, the call returns [`BgTrimError::Timeout`] and the detached worker's
//! eventual result is dropped.

use crate::{
    bounds::find_content_bounds,
    config::{SegmentationStrategy, Tolerance},
    error::{BgTrimError, Result},
    segmentation::BackgroundEraser,
    types::{BoundingBox, PixelBuffer, SegmentationStats},
};
use instant::Instant;
use std::any::Any;
use std::time::Duration;
use tracing::{debug, instrument, span, warn, Level};

/// Input message: a pixel buffer plus classification parameters
#[derive(Debug, Clone)]
pub struct TrimRequest {
    pub buffer: PixelBuffer,
    pub tolerance: Tolerance,
    pub strategy: SegmentationStrategy,
}

impl TrimRequest {
    /// Request with the default tolerance and strategy
    #[must_use]
    pub fn new(buffer: PixelBuffer) -> Self {
        Self {
            buffer,
            tolerance: Tolerance::default(),
            strategy: SegmentationStrategy::default(),
        }
    }

    /// Build a request from raw RGBA8 bytes
    ///
    /// # Errors
    /// - `BgTrimError::InvalidDimensions` when the bytes do not match the dimensions
    pub fn from_raw(width: u32, height: u32, data: Vec<u8>) -> Result<Self> {
        Ok(Self::new(PixelBuffer::new(width, height, data)?))
    }

    #[must_use]
    pub fn with_tolerance(mut self, tolerance: Tolerance) -> Self {
        self.tolerance = tolerance;
        self
    }

    #[must_use]
    pub fn with_strategy(mut self, strategy: SegmentationStrategy) -> Self {
        self.strategy = strategy;
        self
    }
}

/// Output message: the mutated buffer and the content rectangle
#[derive(Debug, Clone)]
pub struct TrimResponse {
    /// Same dimensions as the request buffer; only alpha differs
    pub buffer: PixelBuffer,
    /// `None` when no pixel with nonzero alpha remains
    pub bounding_box: Option<BoundingBox>,
    pub stats: SegmentationStats,
    pub segmentation_ms: u64,
    pub bounding_box_ms: u64,
}

/// Run the core synchronously: validate, erase background, reduce bounding box.
///
/// # Errors
/// - `BgTrimError::InvalidDimensions` for a buffer that cannot be traversed
/// - `BgTrimError::InvalidConfig` for invalid strategy parameters
pub fn process_request(request: TrimRequest) -> Result<TrimResponse> {
    let TrimRequest {
        mut buffer,
        tolerance,
        strategy,
    } = request;

    let (width, height) = buffer.dimensions();
    PixelBuffer::check_dimensions(width, height, buffer.as_bytes().len())?;
    strategy.validate()?;

    let segmentation_start = Instant::now();
    let stats = {
        let _span = span!(Level::DEBUG, "segmentation", width, height, strategy = %strategy)
            .entered();
        strategy.erase_background(&mut buffer, tolerance)
    };
    let segmentation_ms = segmentation_start.elapsed().as_millis() as u64;

    let bbox_start = Instant::now();
    let bounding_box = {
        let _span = span!(Level::DEBUG, "bounding_box", width, height).entered();
        find_content_bounds(&buffer)
    };
    let bounding_box_ms = bbox_start.elapsed().as_millis() as u64;

    debug!(
        ?bounding_box,
        segmentation_ms, bounding_box_ms, "Trim core finished"
    );

    Ok(TrimResponse {
        buffer,
        bounding_box,
        stats,
        segmentation_ms,
        bounding_box_ms,
    })
}

/// Offloads the trim core to tokio's blocking pool
#[derive(Debug, Clone, Default)]
pub struct TrimWorker {
    timeout: Option<Duration>,
}

impl TrimWorker {
    /// Worker without a deadline
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Worker that gives up waiting after `timeout`
    #[must_use]
    pub fn with_timeout(timeout: Option<Duration>) -> Self {
        Self { timeout }
    }

    #[must_use]
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Move `request` to a worker thread and await its response.
    ///
    /// # Errors
    /// - Any error from [`process_request`]
    /// - `BgTrimError::Worker` when the worker panics or is cancelled
    /// - `BgTrimError::Timeout` when the deadline elapses first
    #[instrument(
        skip(self, request),
        fields(
            dimensions = %format!("{}x{}", request.buffer.width(), request.buffer.height()),
            strategy = %request.strategy,
            tolerance = %request.tolerance
        )
    )]
    pub async fn submit(&self, request: TrimRequest) -> Result<TrimResponse> {
        self.run(move || process_request(request)).await
    }

    /// Run `job` on the blocking pool, applying the deadline and mapping join failures
    pub(crate) async fn run<T, F>(&self, job: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce() -> Result<T> + Send + 'static,
    {
        let handle = tokio::task::spawn_blocking(job);

        let joined = match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, handle).await {
                Ok(joined) => joined,
                Err(_) => {
                    warn!(timeout_ms = limit.as_millis() as u64, "Worker did not respond in time");
                    return Err(BgTrimError::Timeout(limit));
                },
            },
            None => handle.await,
        };

        match joined {
            Ok(result) => result,
            Err(e) if e.is_panic() => {
                let message = panic_message(&*e.into_panic());
                warn!(%message, "Worker panicked");
                Err(BgTrimError::worker(format!("worker panicked: {message}")))
            },
            Err(e) => Err(BgTrimError::worker(format!("worker cancelled: {e}"))),
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
