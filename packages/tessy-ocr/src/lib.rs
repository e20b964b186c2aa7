//! # tessy-ocr
//!
//! Calls straight into an installed Tesseract-OCR shared library instead of
//! spawning the `tesseract` executable.
//!
//! ```ignore
//! use tessy_ocr::{Engine, EngineConfig, ReadOptions};
//!
//! let mut engine = Engine::new(&EngineConfig::default())?;
//! let text = engine.read(&pixels, width, height, 1, &ReadOptions::raw(300))?;
//! engine.close();
//! ```

pub mod config;
pub mod engine;
pub mod image;
pub mod locator;
pub mod tesseract;

pub use config::{EngineConfig, OcrEngineMode, PageSegMode};
pub use engine::{OcrEngine, OcrError, OcrInput, OcrOutput, Result};
pub use image::{ImageView, OwnedImage, SUPPORTED_BYTES_PER_PIXEL};
pub use locator::{ExplicitLocator, LocateLibrary, SearchLocator};
pub use tesseract::{Engine, ReadOptions, TessApi, TessLibrary, TesseractOcr};
