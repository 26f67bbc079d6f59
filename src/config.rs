//! Configuration types for background trimming operations

use crate::error::{BgTrimError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Default per-channel deviation from pure white still treated as background
pub const DEFAULT_TOLERANCE: u8 = 10;

/// Default minimum region size, in percent of the image area, for area-filtered erasing
pub const DEFAULT_MIN_AREA_PERCENTAGE: f64 = 10.0;

/// Default deadline for one worker call
pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;

/// Maximum per-channel deviation from pure white (255, 255, 255) for a pixel
/// to be classified background-like.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Tolerance(u8);

impl Tolerance {
    #[must_use]
    pub const fn new(value: u8) -> Self {
        Self(value)
    }

    #[must_use]
    pub const fn value(self) -> u8 {
        self.0
    }

    /// Whether an RGB triple lies within tolerance of pure white
    #[inline]
    #[must_use]
    pub fn admits(self, r: u8, g: u8, b: u8) -> bool {
        let floor = 255 - self.0;
        r >= floor && g >= floor && b >= floor
    }
}

impl Default for Tolerance {
    fn default() -> Self {
        Self(DEFAULT_TOLERANCE)
    }
}

impl From<u8> for Tolerance {
    fn from(value: u8) -> Self {
        Self(value)
    }
}

impl std::fmt::Display for Tolerance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// How background-like regions are chosen for erasure
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SegmentationStrategy {
    /// Erase everything reachable from the image border through background-like pixels.
    /// White regions fully enclosed by the subject are kept.
    BorderSeeded,
    /// Erase every connected background-like region whose pixel count strictly
    /// exceeds `min_area_percentage` percent of the image area, wherever it lies.
    AreaFiltered { min_area_percentage: f64 },
}

impl SegmentationStrategy {
    /// Area-filtered strategy with the default threshold
    #[must_use]
    pub fn area_filtered() -> Self {
        Self::AreaFiltered {
            min_area_percentage: DEFAULT_MIN_AREA_PERCENTAGE,
        }
    }

    /// Validate strategy parameters
    ///
    /// # Errors
    /// - `min_area_percentage` is not finite or lies outside `[0, 100]`
    pub fn validate(&self) -> Result<()> {
        if let Self::AreaFiltered {
            min_area_percentage,
        } = *self
        {
            if !min_area_percentage.is_finite() || !(0.0..=100.0).contains(&min_area_percentage) {
                return Err(BgTrimError::config_value_error(
                    "min area percentage",
                    min_area_percentage,
                    "0-100",
                    Some(DEFAULT_MIN_AREA_PERCENTAGE),
                ));
            }
        }
        Ok(())
    }
}

impl Default for SegmentationStrategy {
    fn default() -> Self {
        Self::area_filtered()
    }
}

impl std::fmt::Display for SegmentationStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BorderSeeded => write!(f, "border-seeded"),
            Self::AreaFiltered {
                min_area_percentage,
            } => write!(f, "area-filtered({min_area_percentage}%)"),
        }
    }
}

/// Output image format options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// PNG with alpha channel transparency
    #[default]
    Png,
    /// JPEG (no transparency, alpha dropped)
    Jpeg,
    /// WebP with alpha channel transparency
    WebP,
    /// TIFF with alpha channel transparency
    Tiff,
    /// Raw RGBA8 pixel data (4 bytes per pixel)
    Rgba8,
}

/// Configuration for background trimming operations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrimConfig {
    /// Per-channel tolerance for background-like pixels
    pub tolerance: Tolerance,

    /// Region selection strategy
    pub strategy: SegmentationStrategy,

    /// Output format
    pub output_format: OutputFormat,

    /// JPEG quality (0-100, only used for JPEG output)
    pub jpeg_quality: u8,

    /// Deadline for the worker call in milliseconds (None = wait indefinitely)
    pub timeout_ms: Option<u64>,
}

impl Default for TrimConfig {
    fn default() -> Self {
        Self {
            tolerance: Tolerance::default(),
            strategy: SegmentationStrategy::default(),
            output_format: OutputFormat::default(),
            jpeg_quality: 90,
            timeout_ms: Some(DEFAULT_TIMEOUT_MS),
        }
    }
}

impl TrimConfig {
    /// Create a new configuration builder
    ///
    /// # Examples
    ///
    /// ```rust
    /// use bgtrim::{SegmentationStrategy, TrimConfig};
    ///
    /// let config = TrimConfig::builder()
    ///     .tolerance(5)
    ///     .strategy(SegmentationStrategy::BorderSeeded)
    ///     .build()
    ///     .unwrap();
    /// assert_eq!(config.tolerance.value(), 5);
    /// ```
    #[must_use]
    pub fn builder() -> TrimConfigBuilder {
        TrimConfigBuilder::default()
    }

    /// Worker deadline as a `Duration`
    #[must_use]
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }

    /// Validate all configuration parameters
    ///
    /// # Errors
    /// - Invalid strategy parameters
    /// - JPEG quality above 100
    /// - A zero timeout
    pub fn validate(&self) -> Result<()> {
        self.strategy.validate()?;

        if self.jpeg_quality > 100 {
            return Err(BgTrimError::config_value_error(
                "JPEG quality",
                self.jpeg_quality,
                "0-100",
                Some(90),
            ));
        }

        if self.timeout_ms == Some(0) {
            return Err(BgTrimError::invalid_config(
                "Timeout must be positive; omit it to wait indefinitely",
            ));
        }

        Ok(())
    }

    /// Parse and validate a JSON configuration
    ///
    /// Missing fields take their default values.
    ///
    /// # Errors
    /// - Malformed JSON
    /// - Validation failures
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| BgTrimError::invalid_config(format!("Failed to parse config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a JSON configuration file
    ///
    /// # Errors
    /// - File cannot be read
    /// - Malformed JSON or validation failures
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| BgTrimError::file_io_error("read config file", path, &e))?;
        Self::from_json_str(&content)
    }
}

/// Builder for `TrimConfig`
#[derive(Debug, Default)]
pub struct TrimConfigBuilder {
    config: TrimConfig,
}

impl TrimConfigBuilder {
    #[must_use]
    pub fn tolerance(mut self, tolerance: u8) -> Self {
        self.config.tolerance = Tolerance::new(tolerance);
        self
    }

    #[must_use]
    pub fn strategy(mut self, strategy: SegmentationStrategy) -> Self {
        self.config.strategy = strategy;
        self
    }

    /// Shorthand for the area-filtered strategy with a given threshold
    #[must_use]
    pub fn min_area_percentage(mut self, percentage: f64) -> Self {
        self.config.strategy = SegmentationStrategy::AreaFiltered {
            min_area_percentage: percentage,
        };
        self
    }

    #[must_use]
    pub fn output_format(mut self, format: OutputFormat) -> Self {
        self.config.output_format = format;
        self
    }

    #[must_use]
    pub fn jpeg_quality(mut self, quality: u8) -> Self {
        self.config.jpeg_quality = quality.clamp(0, 100);
        self
    }

    #[must_use]
    pub fn timeout(mut self, timeout: Option<Duration>) -> Self {
        self.config.timeout_ms = timeout.map(|t| t.as_millis() as u64);
        self
    }

    /// Build and validate the configuration
    ///
    /// # Errors
    /// - Any failure reported by [`TrimConfig::validate`]
    pub fn build(self) -> Result<TrimConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}
