// -- submodules
mod cache;
mod yolo;

pub use cache::{ModelCache, SharedModel};
pub use yolo::{YoloClassifier, YoloClassifierLoader};

// -- external imports
use image::DynamicImage;

use crate::error::Result;
use crate::prediction::Prediction;

// -- traits

/// A loaded image-labelling model.
///
/// Implementations return predictions ordered by descending confidence.
/// Calls run on the blocking thread pool, so they may be CPU-heavy.
pub trait ImageClassifier: Send + 'static {
    fn classify(&mut self, image: &DynamicImage) -> Result<Vec<Prediction>>;
}

/// Produces a ready-to-use [`ImageClassifier`].
pub trait ClassifierLoader: Send + Sync + 'static {
    type Model: ImageClassifier;

    fn load(&self) -> Result<Self::Model>;
}
