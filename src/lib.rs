mod capture;
mod classifier;
mod error;
mod logging;
mod prediction;
mod progress_bar;
mod recognize;
mod toml_utils;

pub use capture::{CaptureRequest, is_image_file, mime_from_path};
pub use classifier::{
    ClassifierLoader, ImageClassifier, ModelCache, SharedModel, YoloClassifier,
    YoloClassifierLoader,
};
pub use error::{NOTICE_NOT_RECOGNIZED, NOTICE_PROCESSING_FAILED, RecognitionError, Result};
pub use logging::init_logger;
pub use prediction::{Prediction, Predictions};
pub use progress_bar::{processing_spinner, spinner_style};
pub use toml_utils::parse_toml;

// Core recognition workflow
pub use recognize::{CancelToken, ProcessingState, RecognizeArgs, Recognizer};
