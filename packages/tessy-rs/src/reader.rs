//! Reading text out of image files with any [`OcrEngine`].

use anyhow::{Context, Result};
use serde::Serialize;
use std::path::PathBuf;
use tessy_ocr::{OcrEngine, OcrInput, ReadOptions};
use tracing::{debug, info};

use crate::image_loader::{decode_image, Preprocess};

/// What was read from one file
#[derive(Debug, Clone, Serialize)]
pub struct ReadReport {
    pub path: PathBuf,
    pub text: String,
    pub confidence: Option<i32>,
}

/// Decodes and reads each file in turn, stopping at the first failure
pub async fn read_files<E>(
    engine: &E,
    files: &[PathBuf],
    options: &ReadOptions,
    preprocess: &Preprocess,
) -> Result<Vec<ReadReport>>
where
    E: OcrEngine + ?Sized,
{
    let mut reports = Vec::with_capacity(files.len());

    for path in files {
        let image = {
            let path = path.clone();
            let preprocess = *preprocess;
            tokio::task::spawn_blocking(move || decode_image(&path, &preprocess))
                .await
                .context("Image decoding task failed")??
        };
        debug!(
            path = %path.display(),
            width = image.width,
            height = image.height,
            bytes_per_pixel = image.bytes_per_pixel,
            "decoded image"
        );

        let input = OcrInput::new(image).with_options(options.clone());
        let output = engine
            .recognize(&input)
            .await
            .with_context(|| format!("OCR failed for {}", path.display()))?;
        info!(path = %path.display(), chars = output.text.len(), "read image");

        reports.push(ReadReport {
            path: path.clone(),
            text: output.text,
            confidence: output.mean_confidence,
        });
    }

    Ok(reports)
}
