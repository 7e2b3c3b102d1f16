// -- submodules
mod cancel;
mod state;

pub use cancel::CancelToken;
pub use state::ProcessingState;

// -- external imports
use image::DynamicImage;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use crate::capture::CaptureRequest;
use crate::classifier::{
    ClassifierLoader, ImageClassifier, ModelCache, SharedModel, YoloClassifierLoader,
};
use crate::error::{RecognitionError, Result};
use crate::prediction::{Prediction, Predictions};

use state::StateFlag;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RecognizeArgs {
    /// Path to ONNX classification model file
    pub model: PathBuf,

    /// Device to use (cpu, cuda:0, mps, coreml, directml:0, openvino, tensorrt:0, etc.)
    pub device: Option<String>,

    /// Inference image size
    pub imgsz: Option<usize>,

    /// Use FP16 half-precision inference
    pub half: bool,

    /// Number of ranked predictions requested from the model
    pub top_k: usize,

    /// Classifier call timeout in milliseconds (0 disables it)
    pub timeout_ms: u64,

    /// Log every ranked prediction
    pub verbose: bool,
}

impl Default for RecognizeArgs {
    fn default() -> Self {
        Self {
            model: PathBuf::new(),
            device: None,
            imgsz: None,
            half: false,
            top_k: 5,
            timeout_ms: 30_000,
            verbose: false,
        }
    }
}

impl RecognizeArgs {
    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_ms > 0).then(|| Duration::from_millis(self.timeout_ms))
    }
}

/// Capture-and-classify workflow.
///
/// One recognizer handles one recognition at a time; a second call made while
/// the first is in flight fails with [`RecognitionError::Busy`]. The loaded
/// model is kept in a [`ModelCache`] and reused across calls.
pub struct Recognizer<L: ClassifierLoader> {
    models: ModelCache<L>,
    timeout: Option<Duration>,
    verbose: bool,
    state: StateFlag,
}

impl Recognizer<YoloClassifierLoader> {
    /// Recognizer backed by the YOLO classification model named in `args`.
    pub fn from_args(args: &RecognizeArgs) -> Result<Self> {
        if args.top_k == 0 {
            return Err(RecognitionError::Config("top_k must be at least 1".to_string()));
        }
        Ok(Self::new(YoloClassifierLoader::new(args.clone()))
            .with_timeout(args.timeout())
            .with_verbose(args.verbose))
    }
}

impl<L: ClassifierLoader> Recognizer<L> {
    pub fn new(loader: L) -> Self {
        Self {
            models: ModelCache::new(loader),
            timeout: RecognizeArgs::default().timeout(),
            verbose: false,
            state: StateFlag::default(),
        }
    }

    /// Limit for a single classifier call. `None` waits indefinitely.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn models(&self) -> &ModelCache<L> {
        &self.models
    }

    pub fn state(&self) -> ProcessingState {
        self.state.get()
    }

    /// Recognize the item in an image payload and return its top label.
    pub async fn recognize_item(
        &self,
        image_bytes: impl Into<Vec<u8>>,
        mime_type: &str,
    ) -> Result<String> {
        self.recognize(CaptureRequest::new(image_bytes, mime_type), &CancelToken::new())
            .await
    }

    /// Run one recognition: decode, classify, keep the top label.
    ///
    /// The payload is decoded before the model is touched, so undecodable
    /// input never loads or calls the classifier.
    pub async fn recognize(&self, request: CaptureRequest, cancel: &CancelToken) -> Result<String> {
        let _guard = self.state.try_begin().ok_or(RecognitionError::Busy)?;
        let start_time = Instant::now();

        tracing::debug!(
            "Recognizing {} bytes ({})",
            request.len(),
            request.mime_type()
        );

        let image = decode(request, cancel).await?;
        tracing::debug!("Decoded image: {}x{}", image.width(), image.height());

        let model = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(RecognitionError::Cancelled),
            model = self.models.get() => model?,
        };

        let predictions = self.classify(model, image, cancel).await?;
        if self.verbose {
            for (rank, p) in predictions.as_slice().iter().enumerate() {
                tracing::debug!("  #{} {} {:.3}", rank + 1, p.label, p.confidence);
            }
        }

        let top = predictions
            .into_top()
            .ok_or(RecognitionError::NoPredictions)?;

        tracing::info!(
            "Recognized {:?} ({:.2}) in {:.3?}",
            top.label,
            top.confidence,
            start_time.elapsed()
        );
        Ok(top.label)
    }

    /// Run one recognition and hand the label to `on_item_recognized`.
    ///
    /// On failure the callback is not invoked and the user-facing notice is
    /// returned instead.
    pub async fn recognize_with_callback<F>(
        &self,
        request: CaptureRequest,
        cancel: &CancelToken,
        on_item_recognized: F,
    ) -> std::result::Result<(), &'static str>
    where
        F: FnOnce(String),
    {
        match self.recognize(request, cancel).await {
            Ok(label) => {
                on_item_recognized(label);
                Ok(())
            }
            Err(RecognitionError::NoPredictions) => {
                tracing::warn!("Classifier returned no predictions");
                Err(RecognitionError::NoPredictions.notice())
            }
            Err(e) => {
                tracing::error!("Error processing image: {}", e);
                Err(e.notice())
            }
        }
    }

    async fn classify(
        &self,
        model: SharedModel<L::Model>,
        image: DynamicImage,
        cancel: &CancelToken,
    ) -> Result<Predictions> {
        let task = tokio::task::spawn_blocking(move || -> Result<Vec<Prediction>> {
            // A panicked call leaves the model usable for the next one.
            let mut model = model.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            model.classify(&image)
        });
        let call = async move {
            match task.await {
                Ok(res) => res,
                Err(e) => Err(RecognitionError::Classifier(format!(
                    "Classifier task failed: {}",
                    e
                ))),
            }
        };

        let raw = match self.timeout {
            Some(limit) => tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(RecognitionError::Cancelled),
                res = tokio::time::timeout(limit, call) => {
                    res.map_err(|_| RecognitionError::Timeout(limit))??
                }
            },
            None => tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(RecognitionError::Cancelled),
                res = call => res?,
            },
        };

        Ok(Predictions::ranked(raw))
    }
}

async fn decode(request: CaptureRequest, cancel: &CancelToken) -> Result<DynamicImage> {
    let task = tokio::task::spawn_blocking(move || request.decode());
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(RecognitionError::Cancelled),
        res = task => res.map_err(|e| {
            RecognitionError::Decode(format!("Decoding task failed: {}", e))
        })?,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgb, RgbImage};
    use std::io::Cursor;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Clone, Default)]
    struct Calls {
        loads: Arc<AtomicUsize>,
        classifies: Arc<AtomicUsize>,
    }

    struct StubLoader {
        calls: Calls,
        output: Vec<Prediction>,
        delay: Duration,
    }

    struct Stub {
        calls: Calls,
        output: Vec<Prediction>,
        delay: Duration,
    }

    impl ClassifierLoader for StubLoader {
        type Model = Stub;

        fn load(&self) -> Result<Stub> {
            self.calls.loads.fetch_add(1, Ordering::SeqCst);
            Ok(Stub {
                calls: self.calls.clone(),
                output: self.output.clone(),
                delay: self.delay,
            })
        }
    }

    impl ImageClassifier for Stub {
        fn classify(&mut self, _image: &DynamicImage) -> Result<Vec<Prediction>> {
            self.calls.classifies.fetch_add(1, Ordering::SeqCst);
            std::thread::sleep(self.delay);
            Ok(self.output.clone())
        }
    }

    fn recognizer(output: Vec<Prediction>, delay: Duration) -> (Recognizer<StubLoader>, Calls) {
        let calls = Calls::default();
        let loader = StubLoader {
            calls: calls.clone(),
            output,
            delay,
        };
        (Recognizer::new(loader), calls)
    }

    fn red_png() -> Vec<u8> {
        let img = RgbImage::from_pixel(10, 10, Rgb([255, 0, 0]));
        let mut buf = Cursor::new(Vec::new());
        DynamicImage::ImageRgb8(img)
            .write_to(&mut buf, ImageFormat::Png)
            .unwrap();
        buf.into_inner()
    }

    #[tokio::test]
    async fn test_returns_top_label() {
        let (rec, calls) = recognizer(
            vec![Prediction::new("pear", 0.3), Prediction::new("apple", 0.9)],
            Duration::ZERO,
        );
        let label = rec.recognize_item(red_png(), "image/png").await.unwrap();
        assert_eq!(label, "apple");
        assert_eq!(calls.classifies.load(Ordering::SeqCst), 1);
        assert_eq!(rec.state(), ProcessingState::Idle);
    }

    #[tokio::test]
    async fn test_model_loaded_once_across_calls() {
        let (rec, calls) = recognizer(vec![Prediction::new("apple", 0.9)], Duration::ZERO);
        for _ in 0..3 {
            rec.recognize_item(red_png(), "image/png").await.unwrap();
        }
        assert_eq!(calls.loads.load(Ordering::SeqCst), 1);
        assert_eq!(calls.classifies.load(Ordering::SeqCst), 3);

        rec.models().teardown().await;
        rec.recognize_item(red_png(), "image/png").await.unwrap();
        assert_eq!(calls.loads.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_decode_error_skips_classifier() {
        let (rec, calls) = recognizer(vec![Prediction::new("apple", 0.9)], Duration::ZERO);
        let err = rec
            .recognize_item(b"\x89PNG\r\n\x1a\ngarbage".to_vec(), "image/png")
            .await
            .unwrap_err();
        assert!(matches!(err, RecognitionError::Decode(_)));
        assert_eq!(calls.loads.load(Ordering::SeqCst), 0);
        assert_eq!(calls.classifies.load(Ordering::SeqCst), 0);
        assert_eq!(rec.state(), ProcessingState::Idle);
    }

    #[tokio::test]
    async fn test_timeout_resets_state() {
        let (rec, _calls) = recognizer(
            vec![Prediction::new("apple", 0.9)],
            Duration::from_millis(500),
        );
        let rec = rec.with_timeout(Some(Duration::from_millis(50)));
        let err = rec.recognize_item(red_png(), "image/png").await.unwrap_err();
        assert!(matches!(err, RecognitionError::Timeout(_)));
        assert_eq!(rec.state(), ProcessingState::Idle);
    }

    #[tokio::test]
    async fn test_cancel_before_start() {
        let (rec, calls) = recognizer(vec![Prediction::new("apple", 0.9)], Duration::ZERO);
        let cancel = CancelToken::new();
        cancel.cancel();
        let err = rec
            .recognize(CaptureRequest::new(red_png(), "image/png"), &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, RecognitionError::Cancelled));
        assert_eq!(calls.classifies.load(Ordering::SeqCst), 0);
        assert_eq!(rec.state(), ProcessingState::Idle);
    }

    #[tokio::test]
    async fn test_callback_notice_on_empty_predictions() {
        let (rec, _calls) = recognizer(Vec::new(), Duration::ZERO);
        let mut recognized = None;
        let outcome = rec
            .recognize_with_callback(
                CaptureRequest::new(red_png(), "image/png"),
                &CancelToken::new(),
                |label| recognized = Some(label),
            )
            .await;
        assert_eq!(outcome, Err(crate::error::NOTICE_NOT_RECOGNIZED));
        assert!(recognized.is_none());
    }

    #[test]
    fn test_from_args_rejects_zero_top_k() {
        let args = RecognizeArgs {
            top_k: 0,
            ..Default::default()
        };
        assert!(matches!(
            Recognizer::from_args(&args),
            Err(RecognitionError::Config(_))
        ));
    }

    #[test]
    fn test_timeout_zero_disables() {
        let args = RecognizeArgs {
            timeout_ms: 0,
            ..Default::default()
        };
        assert_eq!(args.timeout(), None);
        assert_eq!(
            RecognizeArgs::default().timeout(),
            Some(Duration::from_millis(30_000))
        );
    }
}
