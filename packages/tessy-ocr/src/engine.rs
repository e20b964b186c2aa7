use std::path::PathBuf;

use async_trait::async_trait;
use thiserror::Error;

use crate::image::OwnedImage;
use crate::tesseract::ReadOptions;

/// A decoded image plus the options to read it with.
#[derive(Debug, Clone)]
pub struct OcrInput {
    pub image: OwnedImage,
    pub options: ReadOptions,
}

impl OcrInput {
    pub fn new(image: OwnedImage) -> Self {
        Self {
            image,
            options: ReadOptions::default(),
        }
    }

    pub fn with_options(mut self, options: ReadOptions) -> Self {
        self.options = options;
        self
    }
}

#[derive(Debug, Clone)]
pub struct OcrOutput {
    pub text: String,
    /// Mean word confidence (0-100) reported for this recognition.
    pub mean_confidence: Option<i32>,
}

#[derive(Debug, Error)]
pub enum OcrError {
    #[error("tesseract library not found: {0}")]
    LibraryNotFound(String),
    #[error("failed to load {}: {reason}", path.display())]
    LibraryLoad { path: PathBuf, reason: String },
    #[error("engine initialisation failed: {0}")]
    EngineInit(String),
    #[error("invalid image: {0}")]
    InvalidImage(String),
    #[error("recognition failed: {0}")]
    Recognition(String),
    #[error("engine is closed")]
    EngineClosed,
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("unsupported operation: {0}")]
    Unsupported(String),
}

pub type Result<T> = std::result::Result<T, OcrError>;

#[async_trait]
pub trait OcrEngine: Send + Sync {
    async fn recognize(&self, input: &OcrInput) -> Result<OcrOutput>;
}
