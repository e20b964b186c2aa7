//! # tessy-rs
//!
//! Fast OCR from Rust by calling the installed Tesseract library directly.
//!
//! ## Features
//!
//! - **No subprocess**: pixels go straight into libtesseract through [`tessy_ocr`]
//! - **Image decoding**: PNG, JPEG, WebP and friends via the `image` crate, flattened to 1, 3 or 4 bytes per pixel
//! - **Preprocessing**: optional upscaling and sharpening before recognition
//! - **Configuration**: JSON config files layered under command line overrides
//!
//! ## Quick Start
//!
//! ```ignore
//! use tessy_rs::prelude::*;
//!
//! let ocr = TesseractOcr::new(&EngineConfig::default())?;
//! let reports = read_files(&ocr, &["scan.png".into()], &ReadOptions::raw(300), &Preprocess::default()).await?;
//! for report in reports {
//!     println!("{}: {}", report.path.display(), report.text.trim());
//! }
//! ```

pub mod image_loader;
pub mod reader;
pub mod settings;

// Re-export commonly used types at the root level
pub use image_loader::{decode_bytes, decode_image, prepare, LoadError, Preprocess};
pub use reader::{read_files, ReadReport};
pub use settings::{load_config_file, resolve_config, Overrides};

/// Prelude module for convenient imports
///
/// Import everything you need with:
/// ```ignore
/// use tessy_rs::prelude::*;
/// ```
pub mod prelude {
    pub use crate::{
        decode_bytes, decode_image, load_config_file, read_files, resolve_config, Overrides, Preprocess,
        ReadReport,
    };
    pub use tessy_ocr::{
        Engine, EngineConfig, OcrEngine, OcrEngineMode, OcrError, OcrInput, OcrOutput, OwnedImage, PageSegMode,
        ReadOptions, TesseractOcr,
    };
}
