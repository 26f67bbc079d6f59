//! Image I/O operations service
//!
//! Decoding and file access live here so the processor only sees pixels.

use crate::error::{BgTrimError, Result};
use image::DynamicImage;
use std::path::Path;

/// Service for handling image file input/output operations
pub struct ImageIOService;

impl ImageIOService {
    /// Load an image from a file path
    ///
    /// Falls back to content-based detection when the extension is wrong.
    ///
    /// # Examples
    /// ```rust,no_run
    /// use bgtrim::services::ImageIOService;
    ///
    /// let image = ImageIOService::load_image("input.png")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn load_image<P: AsRef<Path>>(path: P) -> Result<DynamicImage> {
        let path_ref = path.as_ref();

        if !path_ref.exists() {
            return Err(BgTrimError::file_io_error(
                "read image file",
                path_ref,
                &std::io::Error::new(std::io::ErrorKind::NotFound, "file does not exist"),
            ));
        }

        match image::open(path_ref) {
            Ok(img) => Ok(img),
            Err(e) => {
                log::debug!(
                    "Extension-based loading failed for {}: {}. Attempting content-based detection.",
                    path_ref.display(),
                    e
                );

                let data = std::fs::read(path_ref).map_err(|io_err| {
                    BgTrimError::file_io_error("read image data", path_ref, &io_err)
                })?;

                image::load_from_memory(&data).map_err(|content_err| {
                    let extension = path_ref
                        .extension()
                        .and_then(|s| s.to_str())
                        .unwrap_or("unknown");

                    BgTrimError::processing_stage_error(
                        "image loading",
                        &format!(
                            "Failed to load image with both extension-based ({extension}) and content-based detection. Extension error: {e}. Content error: {content_err}"
                        ),
                        Some(&format!("path: {}, size: {} bytes", path_ref.display(), data.len())),
                    )
                })
            },
        }
    }

    /// Check if a file path has a supported image extension
    pub fn is_supported_format<P: AsRef<Path>>(path: P) -> bool {
        path.as_ref()
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| {
                matches!(
                    ext.to_lowercase().as_str(),
                    "jpg" | "jpeg" | "png" | "webp" | "tiff" | "tif"
                )
            })
    }

    /// Decode an image held in memory
    pub fn load_from_bytes(bytes: &[u8]) -> Result<DynamicImage> {
        image::load_from_memory(bytes)
            .map_err(|e| BgTrimError::processing(format!("Failed to decode image from bytes: {e}")))
    }

    /// Read a whole async stream and decode it
    ///
    /// # Examples
    /// ```rust,no_run
    /// use bgtrim::services::ImageIOService;
    /// use tokio::fs::File;
    ///
    /// # async fn example() -> anyhow::Result<()> {
    /// let file = File::open("image.png").await?;
    /// let image = ImageIOService::load_from_reader(file).await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn load_from_reader<R: tokio::io::AsyncRead + Unpin>(
        mut reader: R,
    ) -> Result<DynamicImage> {
        use tokio::io::AsyncReadExt;

        let mut buffer = Vec::new();
        AsyncReadExt::read_to_end(&mut reader, &mut buffer)
            .await
            .map_err(|e| BgTrimError::processing(format!("Failed to read from stream: {e}")))?;

        Self::load_from_bytes(&buffer)
    }

    /// Create the parent directory of an output path
    pub fn ensure_parent_dir<P: AsRef<Path>>(path: P) -> Result<()> {
        if let Some(parent) = path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    BgTrimError::file_io_error("create output directory", parent, &e)
                })?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let mut bytes = Vec::new();
        DynamicImage::new_rgba8(width, height)
            .write_to(&mut std::io::Cursor::new(&mut bytes), image::ImageFormat::Png)
            .unwrap();
        bytes
    }

    #[test]
    fn test_is_supported_format() {
        assert!(ImageIOService::is_supported_format("test.jpg"));
        assert!(ImageIOService::is_supported_format("test.PNG"));
        assert!(ImageIOService::is_supported_format("file.name.with.dots.tif"));
        assert!(!ImageIOService::is_supported_format("test.txt"));
        assert!(!ImageIOService::is_supported_format("test"));
    }

    #[test]
    fn test_load_nonexistent_file() {
        let err = ImageIOService::load_image("nonexistent.png").unwrap_err();
        assert!(err.to_string().contains("does not exist"));
    }

    #[test]
    fn test_load_with_wrong_extension_uses_content() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("actually_png.jpg");
        std::fs::write(&path, png_bytes(3, 2)).unwrap();

        let image = ImageIOService::load_image(&path).unwrap();
        assert_eq!((image.width(), image.height()), (3, 2));
    }

    #[test]
    fn test_load_garbage_file_reports_stage() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("garbage.png");
        std::fs::write(&path, b"not an image").unwrap();

        let err = ImageIOService::load_image(&path).unwrap_err();
        assert!(err.to_string().contains("image loading"));
    }

    #[test]
    fn test_load_from_bytes() {
        assert!(ImageIOService::load_from_bytes(&png_bytes(1, 1)).is_ok());
        assert!(ImageIOService::load_from_bytes(b"This is not an image").is_err());
        assert!(ImageIOService::load_from_bytes(&[]).is_err());
    }

    #[tokio::test]
    async fn test_load_from_reader() {
        let bytes = png_bytes(4, 4);
        let image = ImageIOService::load_from_reader(std::io::Cursor::new(bytes))
            .await
            .unwrap();
        assert_eq!(image.width(), 4);
    }

    #[test]
    fn test_ensure_parent_dir_creates_nested() {
        let temp_dir = tempdir().unwrap();
        let nested = temp_dir.path().join("a").join("b").join("out.png");

        ImageIOService::ensure_parent_dir(&nested).unwrap();
        assert!(nested.parent().unwrap().is_dir());
        assert!(ImageIOService::ensure_parent_dir("bare.png").is_ok());
    }
}
