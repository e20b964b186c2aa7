//! Raw pixel buffers handed to the engine.
//!
//! Every buffer is checked here, before it can reach the native library:
//! Tesseract reads `width * height * bytes_per_pixel` bytes from whatever
//! pointer it is given, so a short buffer would be an out-of-bounds read.

use std::os::raw::c_int;

use crate::engine::{OcrError, Result};

/// Pixel depths the native `SetImage` call understands.
pub const SUPPORTED_BYTES_PER_PIXEL: [u32; 3] = [1, 3, 4];

/// A validated, borrowed view over tightly packed pixel rows.
///
/// The engine never takes ownership of the pixels; Tesseract copies them
/// during the set-image call.
#[derive(Debug, Clone, Copy)]
pub struct ImageView<'a> {
    data: &'a [u8],
    width: u32,
    height: u32,
    bytes_per_pixel: u32,
}

impl<'a> ImageView<'a> {
    pub fn new(data: &'a [u8], width: u32, height: u32, bytes_per_pixel: u32) -> Result<Self> {
        if !SUPPORTED_BYTES_PER_PIXEL.contains(&bytes_per_pixel) {
            return Err(OcrError::InvalidImage(format!(
                "unsupported bytes per pixel {bytes_per_pixel}, expected one of {SUPPORTED_BYTES_PER_PIXEL:?}"
            )));
        }
        if width == 0 || height == 0 {
            return Err(OcrError::InvalidImage(format!(
                "image dimensions must be non-zero, got {width}x{height}"
            )));
        }

        let stride = width
            .checked_mul(bytes_per_pixel)
            .filter(|stride| *stride <= c_int::MAX as u32)
            .ok_or_else(|| OcrError::InvalidImage(format!("row of {width} pixels is too wide")))?;
        if height > c_int::MAX as u32 {
            return Err(OcrError::InvalidImage(format!("height {height} is too large")));
        }

        let expected = (stride as usize)
            .checked_mul(height as usize)
            .ok_or_else(|| OcrError::InvalidImage("image size overflows".into()))?;
        if data.len() != expected {
            return Err(OcrError::InvalidImage(format!(
                "buffer holds {} bytes but {width}x{height}x{bytes_per_pixel} needs {expected}",
                data.len()
            )));
        }

        Ok(Self {
            data,
            width,
            height,
            bytes_per_pixel,
        })
    }

    pub fn data(&self) -> &'a [u8] {
        self.data
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn bytes_per_pixel(&self) -> u32 {
        self.bytes_per_pixel
    }

    pub fn bytes_per_line(&self) -> u32 {
        self.width * self.bytes_per_pixel
    }
}

/// Owned pixels, for callers that need to move an image across threads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OwnedImage {
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub bytes_per_pixel: u32,
}

impl OwnedImage {
    pub fn new(data: Vec<u8>, width: u32, height: u32, bytes_per_pixel: u32) -> Self {
        Self {
            data,
            width,
            height,
            bytes_per_pixel,
        }
    }

    pub fn view(&self) -> Result<ImageView<'_>> {
        ImageView::new(&self.data, self.width, self.height, self.bytes_per_pixel)
    }
}
