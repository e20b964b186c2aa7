//! Tesseract-OCR through its C API, loaded at runtime.

mod api;
mod engine;
mod ffi;
mod shared;

pub use api::{TessApi, TessBaseApi, TessHandle};
pub use engine::{Engine, ReadOptions, DEFAULT_RESOLUTION};
pub use ffi::TessLibrary;
pub use shared::TesseractOcr;
