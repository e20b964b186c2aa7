//! Decoding image files into the raw pixel layout the engine reads.
use image::imageops::FilterType;
use image::{ColorType, DynamicImage};
use std::path::Path;
use tessy_ocr::OwnedImage;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LoadError {
  #[error("failed to decode {path}: {source}")]
  Decode {
    path: String,
    #[source]
    source: image::ImageError,
  },
  #[error("scale factor must be at least 1")]
  InvalidScale,
  #[error("scaled image would be {width}x{height}, which is too large")]
  TooLarge { width: u64, height: u64 },
}

/// Optional clean-up applied before recognition
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Preprocess {
  /// Integer upsampling factor; small glyphs read better when enlarged
  pub scale: u32,
  /// Unsharp-mask sigma, if sharpening is wanted
  pub sharpen: Option<f32>,
}

impl Default for Preprocess {
  fn default() -> Self {
    Self {
      scale: 1,
      sharpen: None,
    }
  }
}

/// Opens and decodes an image file, guessing the format from its contents
pub fn decode_image(path: &Path, preprocess: &Preprocess) -> Result<OwnedImage, LoadError> {
  let decoded = image::ImageReader::open(path)
    .map_err(image::ImageError::IoError)
    .and_then(|reader| reader.with_guessed_format().map_err(image::ImageError::IoError))
    .and_then(|reader| reader.decode())
    .map_err(|source| LoadError::Decode {
      path: path.display().to_string(),
      source,
    })?;
  prepare(decoded, preprocess)
}

/// Decodes an in-memory encoded image (PNG, JPEG, ...)
pub fn decode_bytes(bytes: &[u8], preprocess: &Preprocess) -> Result<OwnedImage, LoadError> {
  let decoded = image::load_from_memory(bytes).map_err(|source| LoadError::Decode {
    path: "<memory>".into(),
    source,
  })?;
  prepare(decoded, preprocess)
}

/// Applies preprocessing and flattens to 1, 3 or 4 bytes per pixel.
///
/// Grayscale (with or without alpha) becomes 1 byte, RGB 3 bytes, and
/// everything else RGBA.
pub fn prepare(image: DynamicImage, preprocess: &Preprocess) -> Result<OwnedImage, LoadError> {
  if preprocess.scale == 0 {
    return Err(LoadError::InvalidScale);
  }

  let mut image = image;
  if preprocess.scale > 1 {
    let width = u64::from(image.width()) * u64::from(preprocess.scale);
    let height = u64::from(image.height()) * u64::from(preprocess.scale);
    if width > i32::MAX as u64 || height > i32::MAX as u64 {
      return Err(LoadError::TooLarge { width, height });
    }
    image = image.resize_exact(width as u32, height as u32, FilterType::Lanczos3);
  }
  if let Some(sigma) = preprocess.sharpen {
    image = image.unsharpen(sigma, 1);
  }

  let (width, height) = (image.width(), image.height());
  let owned = match image.color() {
    ColorType::L8 | ColorType::L16 | ColorType::La8 | ColorType::La16 => {
      OwnedImage::new(image.to_luma8().into_raw(), width, height, 1)
    }
    ColorType::Rgb8 | ColorType::Rgb16 | ColorType::Rgb32F => {
      OwnedImage::new(image.to_rgb8().into_raw(), width, height, 3)
    }
    _ => OwnedImage::new(image.to_rgba8().into_raw(), width, height, 4),
  };
  Ok(owned)
}
