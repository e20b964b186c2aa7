use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use super::engine::Engine;
use crate::config::EngineConfig;
use crate::engine::{OcrEngine, OcrError, OcrInput, OcrOutput, Result};

/// An [`Engine`] behind a mutex, driven from async code.
///
/// Each recognition runs on the blocking pool and holds the lock for the
/// whole set-image/recognize/fetch sequence, so concurrent callers queue
/// up on the single native handle.
#[derive(Clone)]
pub struct TesseractOcr {
    engine: Arc<Mutex<Engine>>,
}

impl TesseractOcr {
    pub fn new(config: &EngineConfig) -> Result<Self> {
        Ok(Self::from_engine(Engine::new(config)?))
    }

    pub fn from_engine(engine: Engine) -> Self {
        Self {
            engine: Arc::new(Mutex::new(engine)),
        }
    }

    /// Runs `f` with exclusive access to the engine on the blocking pool.
    pub async fn with_engine<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Engine) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let engine = self.engine.clone();
        tokio::task::spawn_blocking(move || f(&mut engine.lock()))
            .await
            .map_err(|e| OcrError::Recognition(e.to_string()))?
    }

    /// Releases the native handle now rather than when the last clone drops.
    pub fn close(&self) {
        self.engine.lock().close();
    }
}

#[async_trait]
impl OcrEngine for TesseractOcr {
    async fn recognize(&self, input: &OcrInput) -> Result<OcrOutput> {
        let input = input.clone();
        self.with_engine(move |engine| {
            let image = input.image.view()?;
            let text = engine.read_image(&image, &input.options)?;
            let mean_confidence = engine.mean_text_conf().ok();
            Ok(OcrOutput {
                text,
                mean_confidence,
            })
        })
        .await
    }
}
