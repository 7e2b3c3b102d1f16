use image::DynamicImage;
use std::path::PathBuf;
use ultralytics_inference as ul;

use crate::error::{RecognitionError, Result};
use crate::prediction::Prediction;
use crate::recognize::RecognizeArgs;

use super::{ClassifierLoader, ImageClassifier};

impl TryFrom<&RecognizeArgs> for ul::InferenceConfig {
    type Error = RecognitionError;

    fn try_from(args: &RecognizeArgs) -> std::result::Result<Self, Self::Error> {
        let mut config = Self::new().with_half(args.half).with_batch(1);

        if let Some(sz) = args.imgsz {
            config = config.with_imgsz(sz, sz);
        }

        if let Some(ref device_str) = args.device {
            let device: ul::Device = device_str
                .parse()
                .map_err(|_| RecognitionError::Config(format!("Invalid device: {}", device_str)))?;
            config = config.with_device(device);
        }

        Ok(config)
    }
}

/// Loads a YOLO classification checkpoint (ONNX).
#[derive(Debug, Clone)]
pub struct YoloClassifierLoader {
    args: RecognizeArgs,
}

impl YoloClassifierLoader {
    pub fn new(args: RecognizeArgs) -> Self {
        Self { args }
    }

    pub fn model_path(&self) -> &PathBuf {
        &self.args.model
    }
}

impl ClassifierLoader for YoloClassifierLoader {
    type Model = YoloClassifier;

    fn load(&self) -> Result<YoloClassifier> {
        let config: ul::InferenceConfig = (&self.args).try_into()?;
        tracing::debug!("[Model]: {:?}", self.args.model);

        let model = ul::YOLOModel::load_with_config(&self.args.model, config)
            .map_err(|e| RecognitionError::Classifier(format!("Model loading failed: {}", e)))?;

        Ok(YoloClassifier {
            model,
            top_k: self.args.top_k.max(1),
        })
    }
}

/// YOLO classification model returning its top-k classes.
pub struct YoloClassifier {
    model: ul::YOLOModel,
    top_k: usize,
}

impl ImageClassifier for YoloClassifier {
    fn classify(&mut self, image: &DynamicImage) -> Result<Vec<Prediction>> {
        let results_vec = self
            .model
            .predict_image(image, String::new())
            .map_err(|e| RecognitionError::Classifier(format!("YOLO inference error: {}", e)))?;

        // One image at a time
        let Some(result) = results_vec.into_iter().next() else {
            return Ok(Vec::new());
        };

        let probs = result.probs.as_ref().ok_or_else(|| {
            RecognitionError::Classifier(
                "Model produced no class probabilities; a classification model is required"
                    .to_string(),
            )
        })?;

        let predictions = probs
            .top_k(self.top_k)
            .into_iter()
            .map(|class_id| {
                let label = result
                    .names
                    .get(&class_id)
                    .cloned()
                    .unwrap_or_else(|| format!("class_{}", class_id));
                Prediction::new(label, probs.data[class_id])
            })
            .collect();

        Ok(predictions)
    }
}
