//! Base64 data URL decoding and encoding
//!
//! Accepts `data:image/<subtype>;base64,<payload>` and rejects everything else.

use crate::error::{BgTrimError, Result};
use base64::{engine::general_purpose, Engine as _};

const DATA_PREFIX: &str = "data:";
const BASE64_MARKER: &str = ";base64,";

/// A decoded data URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataUrl {
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

/// Reject MIME types that do not describe an image
pub fn validate_mime_type(mime_type: &str) -> Result<()> {
    if mime_type.starts_with("image/") && mime_type.len() > "image/".len() {
        Ok(())
    } else {
        Err(BgTrimError::invalid_input(format!(
            "Invalid MIME type: {mime_type:?} is not an image type"
        )))
    }
}

/// Split a data URL into its MIME type and decoded payload
///
/// # Errors
/// - `BgTrimError::InvalidInput` when the URL is not a base64 image data URL
/// - `BgTrimError::Base64` when the payload is not valid base64
pub fn decode_data_url(url: &str) -> Result<DataUrl> {
    let rest = url
        .trim()
        .strip_prefix(DATA_PREFIX)
        .ok_or_else(|| BgTrimError::invalid_input("Invalid data URL: missing 'data:' prefix"))?;

    let (mime_type, payload) = rest
        .split_once(BASE64_MARKER)
        .ok_or_else(|| BgTrimError::invalid_input("Invalid data URL: expected base64 encoding"))?;

    validate_mime_type(mime_type)?;

    let bytes = general_purpose::STANDARD.decode(payload.trim())?;
    if bytes.is_empty() {
        return Err(BgTrimError::invalid_input("Invalid data URL: empty payload"));
    }

    Ok(DataUrl {
        mime_type: mime_type.to_string(),
        bytes,
    })
}

/// Wrap PNG bytes in a `data:image/png;base64,` URL
#[must_use]
pub fn encode_png_data_url(png: &[u8]) -> String {
    format!(
        "{DATA_PREFIX}image/png{BASE64_MARKER}{}",
        general_purpose::STANDARD.encode(png)
    )
}
