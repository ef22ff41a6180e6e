//! The upload boundary: a user-supplied image payload.
//!
//! Payloads arrive as a file path, raw bytes, or a data URI. All processing
//! is local; nothing is uploaded anywhere.

use crate::core::errors::OcrError;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use image::RgbImage;
use std::path::Path;

/// The raw image payload for one analysis session.
///
/// Source of truth for the session: all derived state (heatmap, shapes,
/// crops, words) is reset whenever a new payload replaces this one.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    bytes: Vec<u8>,
}

impl UploadedFile {
    /// Wraps raw encoded image bytes.
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    /// Reads an image file from disk.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, OcrError> {
        Ok(Self {
            bytes: std::fs::read(path)?,
        })
    }

    /// Parses a `data:` URI into its payload bytes.
    ///
    /// Base64 payloads are decoded; other payloads are percent-decoded.
    pub fn from_data_uri(uri: &str) -> Result<Self, OcrError> {
        let (header, payload) = uri.split_once(',').ok_or_else(|| OcrError::InvalidUpload {
            message: "data URI has no ',' separator".to_string(),
        })?;

        let bytes = if header.contains("base64") {
            BASE64
                .decode(payload.trim())
                .map_err(|e| OcrError::InvalidUpload {
                    message: format!("base64 payload: {e}"),
                })?
        } else {
            percent_decode(payload)?
        };

        Ok(Self { bytes })
    }

    /// The raw payload bytes.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Decodes the payload into an RGB image, failing fast on malformed or
    /// zero-sized inputs.
    pub fn decode_image(&self) -> Result<RgbImage, OcrError> {
        let image = image::load_from_memory(&self.bytes)?.to_rgb8();
        if image.width() == 0 || image.height() == 0 {
            return Err(OcrError::zero_sized_image(image.width(), image.height()));
        }
        Ok(image)
    }
}

fn percent_decode(payload: &str) -> Result<Vec<u8>, OcrError> {
    let raw = payload.as_bytes();
    let mut bytes = Vec::with_capacity(raw.len());
    let mut i = 0;
    while i < raw.len() {
        if raw[i] == b'%' {
            let hex = raw.get(i + 1..i + 3).ok_or_else(|| OcrError::InvalidUpload {
                message: "truncated percent escape".to_string(),
            })?;
            let value = u8::from_str_radix(
                std::str::from_utf8(hex).map_err(|_| OcrError::InvalidUpload {
                    message: "non-ASCII percent escape".to_string(),
                })?,
                16,
            )
            .map_err(|_| OcrError::InvalidUpload {
                message: "invalid percent escape".to_string(),
            })?;
            bytes.push(value);
            i += 3;
        } else {
            bytes.push(raw[i]);
            i += 1;
        }
    }
    Ok(bytes)
}
