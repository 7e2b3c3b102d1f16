use std::time::Duration;
use thiserror::Error;

/// Notice shown when the classifier saw the image but produced no labels.
pub const NOTICE_NOT_RECOGNIZED: &str = "Could not recognize the item.";

/// Notice shown for every other failure.
pub const NOTICE_PROCESSING_FAILED: &str = "An error occurred while processing the image.";

/// Main error type for the library
#[derive(Error, Debug)]
pub enum RecognitionError {
    #[error("Image decoding failed: {0}")]
    Decode(String),

    #[error("Classifier returned no predictions")]
    NoPredictions,

    #[error("Classifier error: {0}")]
    Classifier(String),

    #[error("Classifier call timed out after {0:?}")]
    Timeout(Duration),

    #[error("Recognition was cancelled")]
    Cancelled,

    #[error("A recognition is already in progress")]
    Busy,

    #[error("TOML config file error: {0}")]
    TomlConfig(#[from] toml::de::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl RecognitionError {
    /// User-facing notice for this failure.
    pub fn notice(&self) -> &'static str {
        match self {
            RecognitionError::NoPredictions => NOTICE_NOT_RECOGNIZED,
            _ => NOTICE_PROCESSING_FAILED,
        }
    }
}

/// Result type with default RecognitionError
pub type Result<T, E = RecognitionError> = std::result::Result<T, E>;
