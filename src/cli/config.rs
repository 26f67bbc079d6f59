//! Configuration conversion utilities for CLI arguments

use crate::cli::main_impl::{Cli, CliOutputFormat, CliStrategy};
use crate::config::{OutputFormat, SegmentationStrategy, Tolerance, TrimConfig};
use anyhow::{Context, Result};
use std::time::Duration;

/// Convert CLI arguments to a `TrimConfig`
pub(crate) struct CliConfigBuilder;

impl CliConfigBuilder {
    /// Build a `TrimConfig` from CLI arguments
    ///
    /// A `--config` file provides the base values; explicit flags override it.
    pub(crate) fn from_cli(cli: &Cli) -> Result<TrimConfig> {
        let mut config = match &cli.config {
            Some(path) => TrimConfig::from_json_file(path)
                .with_context(|| format!("Failed to load config file {}", path.display()))?,
            None => TrimConfig::default(),
        };

        if let Some(tolerance) = cli.tolerance {
            config.tolerance = Tolerance::new(tolerance);
        }

        config.strategy = Self::resolve_strategy(cli, config.strategy);

        if let Some(format) = cli.format {
            config.output_format = Self::output_format(format);
        }

        if let Some(quality) = cli.jpeg_quality {
            config.jpeg_quality = quality;
        }

        if let Some(secs) = cli.timeout_secs {
            config.timeout_ms = if secs == 0 {
                None
            } else {
                Some(Duration::from_secs(secs).as_millis() as u64)
            };
        }

        config.validate().context("Invalid configuration")?;
        Ok(config)
    }

    fn resolve_strategy(cli: &Cli, base: SegmentationStrategy) -> SegmentationStrategy {
        let base_percentage = match base {
            SegmentationStrategy::AreaFiltered {
                min_area_percentage,
            } => min_area_percentage,
            SegmentationStrategy::BorderSeeded => crate::config::DEFAULT_MIN_AREA_PERCENTAGE,
        };

        match (cli.strategy, cli.min_area_percentage) {
            (Some(CliStrategy::Border), _) => SegmentationStrategy::BorderSeeded,
            (Some(CliStrategy::Area), percentage) => SegmentationStrategy::AreaFiltered {
                min_area_percentage: percentage.unwrap_or(base_percentage),
            },
            (None, Some(percentage)) => SegmentationStrategy::AreaFiltered {
                min_area_percentage: percentage,
            },
            (None, None) => base,
        }
    }

    fn output_format(format: CliOutputFormat) -> OutputFormat {
        match format {
            CliOutputFormat::Png => OutputFormat::Png,
            CliOutputFormat::Jpeg => OutputFormat::Jpeg,
            CliOutputFormat::Webp => OutputFormat::WebP,
            CliOutputFormat::Tiff => OutputFormat::Tiff,
            CliOutputFormat::Rgba8 => OutputFormat::Rgba8,
        }
    }

    /// Validate CLI arguments for consistency
    pub(crate) fn validate_cli(cli: &Cli) -> Result<()> {
        if cli.strategy == Some(CliStrategy::Border) && cli.min_area_percentage.is_some() {
            anyhow::bail!("--min-area-percentage only applies to the area strategy");
        }

        if let Some(percentage) = cli.min_area_percentage {
            SegmentationStrategy::AreaFiltered {
                min_area_percentage: percentage,
            }
            .validate()
            .context("Invalid --min-area-percentage")?;
        }

        if cli.jpeg_quality.is_some_and(|q| q > 100) {
            anyhow::bail!("JPEG quality must be between 0 and 100");
        }

        if cli.report && cli.output.as_deref() == Some("-") {
            anyhow::bail!("--report cannot be combined with image output to stdout");
        }

        if cli.data_url && cli.input.iter().any(|input| input != "-") {
            anyhow::bail!("--data-url reads a single data URL from stdin; use '-' as the input");
        }

        Ok(())
    }
}
