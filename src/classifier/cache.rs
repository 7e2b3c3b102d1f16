use std::sync::{Arc, Mutex};
use std::time::Instant;

use crate::error::{RecognitionError, Result};

use super::ClassifierLoader;

/// Loaded model shared between the cache and in-flight classifier calls.
pub type SharedModel<M> = Arc<Mutex<M>>;

type Slot<M> = Arc<tokio::sync::Mutex<Option<SharedModel<M>>>>;

/// Holds a loaded model for reuse across recognitions.
///
/// The model is loaded lazily on the first [`ModelCache::get`] or eagerly with
/// [`ModelCache::init`]. Loading happens under an async lock, so concurrent
/// first callers wait for a single load. Failed loads are not cached.
pub struct ModelCache<L: ClassifierLoader> {
    loader: Arc<L>,
    slot: Slot<L::Model>,
}

impl<L: ClassifierLoader> ModelCache<L> {
    pub fn new(loader: L) -> Self {
        Self {
            loader: Arc::new(loader),
            slot: Arc::new(tokio::sync::Mutex::new(None)),
        }
    }

    pub fn loader(&self) -> &L {
        &self.loader
    }

    /// Load the model now if it is not loaded yet.
    pub async fn init(&self) -> Result<()> {
        self.get().await.map(|_| ())
    }

    /// Get the loaded model, loading it on first use.
    ///
    /// The load runs in its own task holding the slot lock. A caller that
    /// stops waiting leaves it running, and the next caller picks up its model.
    pub async fn get(&self) -> Result<SharedModel<L::Model>> {
        if let Some(model) = self.slot.lock().await.as_ref() {
            return Ok(Arc::clone(model));
        }

        let slot = Arc::clone(&self.slot);
        let loader = Arc::clone(&self.loader);
        tokio::spawn(load_into(slot, loader)).await.map_err(|e| {
            RecognitionError::Classifier(format!("Model loading task failed: {}", e))
        })?
    }

    /// Drop the loaded model. The next [`ModelCache::get`] reloads it.
    ///
    /// Calls already holding the model finish with it.
    pub async fn teardown(&self) {
        if self.slot.lock().await.take().is_some() {
            tracing::info!("Classifier model unloaded");
        }
    }

    pub async fn is_loaded(&self) -> bool {
        self.slot.lock().await.is_some()
    }
}

async fn load_into<L: ClassifierLoader>(
    slot: Slot<L::Model>,
    loader: Arc<L>,
) -> Result<SharedModel<L::Model>> {
    let mut slot = slot.lock_owned().await;
    if let Some(model) = slot.as_ref() {
        return Ok(Arc::clone(model));
    }

    tracing::info!("Loading classifier model...");
    let start_time = Instant::now();

    let model = tokio::task::spawn_blocking(move || loader.load())
        .await
        .map_err(|e| {
            RecognitionError::Classifier(format!("Model loading task failed: {}", e))
        })?
        .map_err(|e| match e {
            err @ RecognitionError::Classifier(_) => err,
            other => RecognitionError::Classifier(format!("Model loading failed: {}", other)),
        })?;

    tracing::info!("Classifier model loaded in {:.3?}", start_time.elapsed());

    let model = Arc::new(Mutex::new(model));
    *slot = Some(Arc::clone(&model));
    Ok(model)
}
