//! Background trim CLI tool
//!
//! Command-line interface for erasing near-white backgrounds and cropping to content.

use super::config::CliConfigBuilder;
use crate::{
    processor::BackgroundTrimProcessor,
    services::{
        create_cli_progress_reporter, BatchProcessingStats, BatchProgressUpdate, ImageIOService,
        OutputFormatHandler, ProcessingStage, ProgressUpdate,
    },
    tracing_config::{events, init_cli_tracing, spans},
    types::TrimResult,
    OutputFormat,
};
use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use log::{error, info, warn};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::Instrument;

/// Remove near-white backgrounds and crop images to their content
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(name = "bgtrim")]
#[allow(clippy::struct_excessive_bools)]
pub struct Cli {
    /// Input image files or directories (use "-" for stdin)
    #[arg(value_name = "INPUT", required = true)]
    pub input: Vec<String>,

    /// Output file (single input) or directory (batch processing). Use "-" for stdout.
    #[arg(short, long, value_name = "OUTPUT")]
    pub output: Option<String>,

    /// Output format [default: png]
    #[arg(short, long, value_enum)]
    pub format: Option<CliOutputFormat>,

    /// Per-channel distance from pure white still treated as background (0-255) [default: 10]
    #[arg(short, long)]
    pub tolerance: Option<u8>,

    /// Which background regions to erase [default: area]
    #[arg(short, long, value_enum)]
    pub strategy: Option<CliStrategy>,

    /// Minimum region size, in percent of the image area, for the area strategy [default: 10]
    #[arg(long, value_name = "PERCENT")]
    pub min_area_percentage: Option<f64>,

    /// Seconds to wait for one image before giving up (0 = no limit) [default: 30]
    #[arg(long, value_name = "SECONDS")]
    pub timeout_secs: Option<u64>,

    /// JPEG quality (0-100) [default: 90]
    #[arg(long)]
    pub jpeg_quality: Option<u8>,

    /// Load base settings from a JSON file; flags override it
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Print a JSON report (bounds, region counts, timings) for each image
    #[arg(long)]
    pub report: bool,

    /// Read a base64 image data URL from stdin and print a PNG data URL
    #[arg(long)]
    pub data_url: bool,

    /// Enable verbose logging (-v: DEBUG, -vv: TRACE)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Process directory recursively
    #[arg(short, long)]
    pub recursive: bool,

    /// Pattern for batch processing (e.g., "*.jpg")
    #[arg(long)]
    pub pattern: Option<String>,

    /// Show per-batch progress summaries instead of a progress bar
    #[arg(long)]
    pub progress: bool,
}

#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum, Debug)]
pub enum CliOutputFormat {
    Png,
    Jpeg,
    Webp,
    Tiff,
    Rgba8,
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum, Debug)]
pub enum CliStrategy {
    /// Erase background reachable from the image border
    Border,
    /// Erase every large near-white region
    Area,
}

pub async fn main() -> Result<()> {
    let cli = Cli::parse();

    let _tracing_guard = init_cli_tracing(cli.verbose).context("Failed to initialize tracing")?;

    CliConfigBuilder::validate_cli(&cli).context("Invalid CLI arguments")?;
    let config = CliConfigBuilder::from_cli(&cli).context("Failed to build configuration")?;

    info!("Starting background trim");
    info!("Input(s): {}", cli.input.join(", "));
    info!(
        "Strategy: {}, tolerance: {}",
        config.strategy, config.tolerance
    );

    let mut processor = BackgroundTrimProcessor::new(config)
        .context("Failed to create background trim processor")?;

    if cli.data_url {
        return process_data_url_stdin(&mut processor).await;
    }

    let start_time = Instant::now();
    let processed_count = process_inputs(&cli, &mut processor).await?;

    let total_time = start_time.elapsed();
    info!(
        "Processed {} image(s) in {:.2}s",
        processed_count,
        total_time.as_secs_f64()
    );

    Ok(())
}

async fn process_inputs(cli: &Cli, processor: &mut BackgroundTrimProcessor) -> Result<usize> {
    if cli.input.len() == 1 && cli.input.first().is_some_and(|s| s == "-") {
        return process_stdin(cli, processor).await;
    }

    let mut all_files = Vec::new();

    for input in &cli.input {
        let path = PathBuf::from(input);

        if path.is_file() {
            if ImageIOService::is_supported_format(&path) {
                all_files.push(path);
            } else {
                warn!("Skipping unsupported file: {}", path.display());
            }
        } else if path.is_dir() {
            all_files.extend(find_image_files(&path, cli.recursive, cli.pattern.as_deref())?);
        } else {
            anyhow::bail!(
                "Input path does not exist or is not accessible: {}",
                path.display()
            );
        }
    }

    if all_files.is_empty() {
        warn!("No supported image files found in the provided inputs");
        return Ok(0);
    }

    all_files.sort();
    let file_count = all_files.len();
    info!("Found {} image file(s) to process", file_count);

    let output_dir = prepare_output_dir(cli.output.as_deref(), file_count)?;
    let progress_reporter = create_cli_progress_reporter(cli.progress, cli.verbose > 0, file_count);

    let progress_bar = if !cli.progress && file_count > 1 {
        let pb = ProgressBar::new(file_count as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template(
                    "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}",
                )
                .context("Invalid progress bar template")?
                .progress_chars("#>-"),
        );
        Some(pb)
    } else {
        None
    };

    let mut processed_count = 0;
    let mut failed_count = 0;
    let batch_start_time = Instant::now();
    let batch_span = spans::batch_processing(file_count);

    for input_file in &all_files {
        let file_start_time = instant::Instant::now();

        if let Some(ref pb) = progress_bar {
            pb.set_message(format!("Processing {}", input_file.display()));
        }

        if cli.progress && file_count > 1 {
            let elapsed_seconds = batch_start_time.elapsed().as_secs_f64();
            let processing_rate = if elapsed_seconds > 0.0 && processed_count > 0 {
                processed_count as f64 / elapsed_seconds
            } else {
                0.0
            };
            let remaining_items = file_count - processed_count - failed_count;
            let eta_seconds = (processing_rate > 0.0)
                .then(|| (remaining_items as f64 / processing_rate) as u64);

            progress_reporter.report_batch_progress(BatchProgressUpdate {
                total_progress: ProgressUpdate::with_description(
                    ProcessingStage::BatchItemProcessing,
                    format!("{}/{} files", processed_count + failed_count, file_count),
                    file_start_time,
                ),
                current_item_progress: Some(ProgressUpdate::new(
                    ProcessingStage::ImageLoading,
                    file_start_time,
                )),
                stats: BatchProcessingStats {
                    items_completed: processed_count,
                    items_total: file_count,
                    items_failed: failed_count,
                    current_item_name: input_file.display().to_string(),
                    processing_rate,
                    eta_seconds,
                },
            });
        }

        let output_path = if file_count == 1 {
            cli.output.as_ref().map(PathBuf::from)
        } else {
            output_dir.as_ref().map(|dir| {
                generate_output_path_with_dir(input_file, dir, processor.config().output_format)
            })
        };

        let file_span = spans::file_processing(
            input_file,
            OutputFormatHandler::get_extension(processor.config().output_format),
        );
        let outcome = process_single_file(cli, processor, input_file, output_path)
            .instrument(file_span)
            .instrument(batch_span.clone())
            .await;

        match outcome {
            Ok(()) => processed_count += 1,
            Err(e) => {
                error!("Failed to process image {}: {:#}", input_file.display(), e);
                events::error_with_context(&*e, "Failed to process image");
                failed_count += 1;
                progress_reporter.report_error(
                    ProcessingStage::BatchItemProcessing,
                    &format!("Failed to process image {}", input_file.display()),
                );
            },
        }

        if let Some(ref pb) = progress_bar {
            pb.inc(1);
        }
    }

    if let Some(pb) = progress_bar {
        pb.finish_with_message(format!(
            "Completed! Processed: {processed_count}, Failed: {failed_count}"
        ));
    }

    let batch_total_time = batch_start_time.elapsed();
    events::performance_metric("batch", batch_total_time.as_millis() as u64);

    if file_count > 1 {
        info!("📊 Batch summary:");
        info!("  ├─ Files processed: {}", processed_count);
        info!("  ├─ Files failed: {}", failed_count);
        info!("  └─ Total time: {:.2}s", batch_total_time.as_secs_f64());
    }

    if processed_count == 0 && failed_count > 0 {
        anyhow::bail!("Failed to process image(s): {failed_count} of {file_count} failed");
    }
    if failed_count > 0 {
        warn!("Some files failed to process. Processed: {processed_count}, Failed: {failed_count}");
    }

    Ok(processed_count)
}

/// Validate and create the output directory for batch processing
fn prepare_output_dir(output: Option<&str>, file_count: usize) -> Result<Option<PathBuf>> {
    if file_count <= 1 {
        return Ok(None);
    }
    let Some(output) = output else {
        return Ok(None);
    };

    if output == "-" {
        anyhow::bail!("Cannot use stdout (-) as output when processing multiple files");
    }

    let output_path = PathBuf::from(output);
    if output_path.is_file() {
        anyhow::bail!(
            "Output path exists and is a file, not a directory: {}",
            output_path.display()
        );
    }
    std::fs::create_dir_all(&output_path).with_context(|| {
        format!(
            "Failed to create output directory: {}",
            output_path.display()
        )
    })?;
    Ok(Some(output_path))
}

/// Trim an image read from stdin; output defaults to stdout
async fn process_stdin(cli: &Cli, processor: &mut BackgroundTrimProcessor) -> Result<usize> {
    info!("Reading image from stdin");

    let image_data = read_stdin()?;
    match image::guess_format(&image_data) {
        Ok(format) => info!("Detected image format: {:?}", format),
        Err(_) => warn!("Could not detect image format from stdin data"),
    }

    let mut result = processor
        .process_bytes(&image_data)
        .await
        .context("Failed to process image")?;
    result.input_path = Some("<stdin>".to_string());

    match cli.output.as_deref() {
        Some(target) if target != "-" => save_result(processor, &mut result, Path::new(target))?,
        _ => {
            let config = processor.config();
            let output_data = result.to_bytes(config.output_format, config.jpeg_quality)?;
            write_stdout(&output_data)?;
            info!("Image written to stdout");
        },
    }

    if cli.report {
        print_report(&result)?;
    }

    Ok(1)
}

/// Read a data URL from stdin and print the trimmed PNG data URL
async fn process_data_url_stdin(processor: &mut BackgroundTrimProcessor) -> Result<()> {
    let mut data_url = String::new();
    io::stdin()
        .read_to_string(&mut data_url)
        .context("Failed to read data URL from stdin")?;

    let output = processor
        .process_data_url(data_url.trim())
        .await
        .context("Failed to process image")?;
    write_stdout(output.as_bytes())?;
    write_stdout(b"\n")?;
    Ok(())
}

async fn process_single_file(
    cli: &Cli,
    processor: &mut BackgroundTrimProcessor,
    input_path: &Path,
    output_path: Option<PathBuf>,
) -> Result<()> {
    let mut result = processor
        .process_file(input_path)
        .await
        .context("Failed to process image")?;

    info!("📊 {}: {}", input_path.display(), result.timing_summary());
    match result.bounding_box {
        Some(bbox) => info!("  └─ Content: {}", bbox),
        None => info!("  └─ No content left, wrote placeholder"),
    }

    match output_path {
        Some(target) if target.as_os_str() == "-" => {
            let config = processor.config();
            let output_data = result.to_bytes(config.output_format, config.jpeg_quality)?;
            write_stdout(&output_data)?;
        },
        Some(target) => save_result(processor, &mut result, &target)?,
        None => {
            let target = generate_output_path(input_path, processor.config().output_format);
            save_result(processor, &mut result, &target)?;
        },
    }

    if cli.report {
        print_report(&result)?;
    }

    Ok(())
}

fn save_result(
    processor: &BackgroundTrimProcessor,
    result: &mut TrimResult,
    target: &Path,
) -> Result<()> {
    ImageIOService::ensure_parent_dir(target)?;
    let config = processor.config();
    result
        .save_with_timing(target, config.output_format, config.jpeg_quality)
        .with_context(|| format!("Failed to save result to {}", target.display()))
}

/// Print the per-image JSON report line
fn print_report(result: &TrimResult) -> Result<()> {
    let report = serde_json::json!({
        "input": result.input_path,
        "original_dimensions": result.original_dimensions,
        "output_dimensions": result.dimensions(),
        "bounding_box": result.bounding_box,
        "empty": result.is_empty(),
        "strategy": result.metadata.strategy,
        "tolerance": result.metadata.tolerance,
        "stats": result.metadata.stats,
        "timings": result.metadata.timings,
        "processed_at": result.metadata.processed_at,
    });
    println!("{}", serde_json::to_string(&report)?);
    Ok(())
}

fn read_stdin() -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    io::stdin()
        .read_to_end(&mut buffer)
        .context("Failed to read image data from stdin")?;

    if buffer.is_empty() {
        anyhow::bail!("No data received from stdin");
    }

    Ok(buffer)
}

fn write_stdout(data: &[u8]) -> Result<()> {
    let mut stdout = io::stdout().lock();
    stdout
        .write_all(data)
        .context("Failed to write image data to stdout")?;
    stdout.flush().context("Failed to flush stdout")?;
    Ok(())
}

/// Find image files in a directory
fn find_image_files(dir: &Path, recursive: bool, pattern: Option<&str>) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    if recursive {
        for entry in walkdir::WalkDir::new(dir) {
            let entry = entry?;
            if entry.file_type().is_file() {
                let path = entry.path();
                if ImageIOService::is_supported_format(path) && matches_pattern(path, pattern) {
                    files.push(path.to_path_buf());
                }
            }
        }
    } else {
        for entry in std::fs::read_dir(dir)? {
            let entry = entry?;
            if entry.file_type()?.is_file() {
                let path = entry.path();
                if ImageIOService::is_supported_format(&path) && matches_pattern(&path, pattern) {
                    files.push(path);
                }
            }
        }
    }

    Ok(files)
}

/// Check if the file name matches the given glob pattern
fn matches_pattern(path: &Path, pattern: Option<&str>) -> bool {
    match pattern {
        Some(pat) => path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|filename| {
                glob::Pattern::new(pat)
                    .map(|p| p.matches(filename))
                    .unwrap_or(false)
            }),
        None => true,
    }
}

/// `<dir>/<stem>_trimmed.<ext>` next to the input
fn generate_output_path(input_path: &Path, format: OutputFormat) -> PathBuf {
    let dir = input_path.parent().unwrap_or(Path::new("."));
    generate_output_path_with_dir(input_path, dir, format)
}

fn generate_output_path_with_dir(
    input_path: &Path,
    output_dir: &Path,
    format: OutputFormat,
) -> PathBuf {
    let stem = input_path.file_stem().unwrap_or_default();
    output_dir.join(format!(
        "{}_trimmed.{}",
        stem.to_string_lossy(),
        OutputFormatHandler::get_extension(format)
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_cli_parsing() {
        let cli = Cli::try_parse_from([
            "bgtrim",
            "a.png",
            "b.jpg",
            "-o",
            "out",
            "-s",
            "area",
            "--min-area-percentage",
            "4",
            "-vv",
        ])
        .unwrap();

        assert_eq!(cli.input, vec!["a.png", "b.jpg"]);
        assert_eq!(cli.output.as_deref(), Some("out"));
        assert_eq!(cli.strategy, Some(CliStrategy::Area));
        assert_eq!(cli.min_area_percentage, Some(4.0));
        assert_eq!(cli.verbose, 2);
        assert!(!cli.report);
    }

    #[test]
    fn test_cli_requires_input() {
        assert!(Cli::try_parse_from(["bgtrim"]).is_err());
        assert!(Cli::try_parse_from(["bgtrim", "x.png", "-s", "diagonal"]).is_err());
    }

    #[test]
    fn test_matches_pattern() {
        assert!(matches_pattern(Path::new("dir/shot_01.png"), Some("shot_*.png")));
        assert!(!matches_pattern(Path::new("dir/other.png"), Some("shot_*.png")));
        assert!(matches_pattern(Path::new("any.png"), None));
        assert!(!matches_pattern(Path::new("any.png"), Some("[")));
    }

    #[test]
    fn test_generate_output_path() {
        assert_eq!(
            generate_output_path(Path::new("/tmp/in/photo.jpg"), OutputFormat::Png),
            PathBuf::from("/tmp/in/photo_trimmed.png")
        );
        assert_eq!(
            generate_output_path_with_dir(
                Path::new("/tmp/in/photo.png"),
                Path::new("/tmp/out"),
                OutputFormat::Jpeg
            ),
            PathBuf::from("/tmp/out/photo_trimmed.jpg")
        );
    }

    #[test]
    fn test_find_image_files() {
        let temp_dir = tempdir().unwrap();
        let nested = temp_dir.path().join("nested");
        std::fs::create_dir(&nested).unwrap();
        std::fs::write(temp_dir.path().join("a.png"), b"").unwrap();
        std::fs::write(temp_dir.path().join("b.txt"), b"").unwrap();
        std::fs::write(nested.join("c.jpg"), b"").unwrap();

        let flat = find_image_files(temp_dir.path(), false, None).unwrap();
        assert_eq!(flat.len(), 1);

        let mut deep = find_image_files(temp_dir.path(), true, None).unwrap();
        deep.sort();
        assert_eq!(deep.len(), 2);

        let filtered = find_image_files(temp_dir.path(), true, Some("*.jpg")).unwrap();
        assert_eq!(filtered, vec![nested.join("c.jpg")]);
    }

    #[test]
    fn test_prepare_output_dir() {
        let temp_dir = tempdir().unwrap();
        let out = temp_dir.path().join("out");

        assert!(prepare_output_dir(Some("-"), 2).is_err());
        assert_eq!(prepare_output_dir(Some("ignored"), 1).unwrap(), None);
        assert_eq!(
            prepare_output_dir(out.to_str(), 3).unwrap(),
            Some(out.clone())
        );
        assert!(out.is_dir());
    }
}
