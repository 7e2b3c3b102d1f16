use image::{DynamicImage, ImageFormat, ImageReader};
use std::io::Cursor;
use std::path::Path;

use crate::error::{RecognitionError, Result};

/// Extensions accepted when a capture is read from disk.
const IMAGE_EXTENSIONS: &[(&str, &str)] = &[
    ("jpg", "image/jpeg"),
    ("jpeg", "image/jpeg"),
    ("png", "image/png"),
    ("bmp", "image/bmp"),
    ("gif", "image/gif"),
    ("webp", "image/webp"),
    ("tiff", "image/tiff"),
    ("tif", "image/tiff"),
];

/// Raw image payload for a single recognition attempt.
///
/// Consumed by [`CaptureRequest::decode`]; a request is never decoded twice.
#[derive(Debug, Clone)]
pub struct CaptureRequest {
    bytes: Vec<u8>,
    mime_type: String,
}

impl CaptureRequest {
    pub fn new(bytes: impl Into<Vec<u8>>, mime_type: impl Into<String>) -> Self {
        Self {
            bytes: bytes.into(),
            mime_type: mime_type.into(),
        }
    }

    /// Read a capture from a file, guessing the MIME type from its extension.
    pub fn from_path(path: &Path) -> Result<Self> {
        let mime_type = mime_from_path(path).ok_or_else(|| {
            RecognitionError::Decode(format!("Not an image file: {:?}", path))
        })?;
        let bytes = std::fs::read(path)?;
        Ok(Self::new(bytes, mime_type))
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Decode the payload into an in-memory bitmap.
    ///
    /// The container format is sniffed from the bytes. The declared MIME type
    /// must be `image/*` and is only used when sniffing finds nothing.
    pub fn decode(self) -> Result<DynamicImage> {
        if self.bytes.is_empty() {
            return Err(RecognitionError::Decode("Image payload is empty".to_string()));
        }

        let mime = self.mime_type.trim().to_ascii_lowercase();
        if !mime.starts_with("image/") {
            return Err(RecognitionError::Decode(format!(
                "Unsupported MIME type: {:?}",
                self.mime_type
            )));
        }

        let mut reader = ImageReader::new(Cursor::new(self.bytes.as_slice()))
            .with_guessed_format()
            .map_err(|e| RecognitionError::Decode(e.to_string()))?;

        if reader.format().is_none() {
            match ImageFormat::from_mime_type(&mime) {
                Some(format) => reader.set_format(format),
                None => {
                    return Err(RecognitionError::Decode(format!(
                        "Unrecognized image format for MIME type {:?}",
                        self.mime_type
                    )));
                }
            }
        }

        reader
            .decode()
            .map_err(|e| RecognitionError::Decode(e.to_string()))
    }
}

/// MIME type for a path with a known image extension.
pub fn mime_from_path(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_string_lossy().to_lowercase();
    IMAGE_EXTENSIONS
        .iter()
        .find(|(known, _)| *known == ext)
        .map(|(_, mime)| *mime)
}

pub fn is_image_file(path: &Path) -> bool {
    mime_from_path(path).is_some()
}
