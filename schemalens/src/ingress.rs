//! Upload validation run before the pipeline starts.

use base64::{engine::general_purpose::STANDARD, Engine};
use thiserror::Error;

use crate::config::{Settings, DEFAULT_MAX_IMAGE_SIZE};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Invalid content type '{0}': expected an image")]
    InvalidContentType(String),
    #[error("Image is {size} bytes, limit is {limit} bytes")]
    TooLarge { size: usize, limit: usize },
    #[error("Invalid base64 image data: {0}")]
    InvalidBase64(String),
}

/// Decode a base64 image payload. A leading `data:<mime>;base64,` prefix and
/// embedded whitespace are tolerated.
pub fn decode_base64(encoded: &str) -> Result<Vec<u8>, ValidationError> {
    let payload = match encoded.trim().strip_prefix("data:") {
        Some(rest) => rest
            .split_once(',')
            .map(|(_, data)| data)
            .ok_or_else(|| ValidationError::InvalidBase64("malformed data URL".to_string()))?,
        None => encoded.trim(),
    };
    let compact: String = payload.chars().filter(|c| !c.is_whitespace()).collect();
    STANDARD
        .decode(compact)
        .map_err(|e| ValidationError::InvalidBase64(e.to_string()))
}

/// MIME type guessed from a file extension, for callers that only have a path.
pub fn content_type_for_extension(extension: &str) -> Option<&'static str> {
    match extension.to_lowercase().as_str() {
        "jpg" | "jpeg" => Some("image/jpeg"),
        "png" => Some("image/png"),
        "gif" => Some("image/gif"),
        "webp" => Some("image/webp"),
        "bmp" => Some("image/bmp"),
        "tif" | "tiff" => Some("image/tiff"),
        _ => None,
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ImageValidator {
    max_size: usize,
}

impl ImageValidator {
    pub fn new(max_size: usize) -> Self {
        Self { max_size }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(settings.max_image_size)
    }

    pub fn validate(&self, content_type: &str, bytes: &[u8]) -> Result<(), ValidationError> {
        if !content_type.trim().to_lowercase().starts_with("image/") {
            return Err(ValidationError::InvalidContentType(content_type.to_string()));
        }
        if bytes.len() > self.max_size {
            return Err(ValidationError::TooLarge {
                size: bytes.len(),
                limit: self.max_size,
            });
        }
        Ok(())
    }
}

impl Default for ImageValidator {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_IMAGE_SIZE)
    }
}
