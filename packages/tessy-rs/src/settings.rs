//! Engine configuration assembled from an optional JSON file and command
//! line overrides.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tessy_ocr::{EngineConfig, OcrEngineMode, PageSegMode};

/// Values given explicitly on the command line. Anything set here wins
/// over the config file.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub library_path: Option<PathBuf>,
    pub tesseract_dir: Option<PathBuf>,
    pub data_path: Option<PathBuf>,
    pub language: Option<String>,
    pub engine_mode: Option<OcrEngineMode>,
    pub page_seg_mode: Option<PageSegMode>,
    pub char_whitelist: Option<String>,
    pub variables: Vec<(String, String)>,
}

impl Overrides {
    pub fn apply(self, config: &mut EngineConfig) {
        if self.library_path.is_some() {
            config.library_path = self.library_path;
        }
        if self.tesseract_dir.is_some() {
            config.tesseract_dir = self.tesseract_dir;
        }
        if self.data_path.is_some() {
            config.data_path = self.data_path;
        }
        if let Some(language) = self.language {
            config.language = language;
        }
        if let Some(mode) = self.engine_mode {
            config.engine_mode = mode;
        }
        if self.page_seg_mode.is_some() {
            config.page_seg_mode = self.page_seg_mode;
        }
        if self.char_whitelist.is_some() {
            config.char_whitelist = self.char_whitelist;
        }
        config.variables.extend(self.variables);
    }
}

/// Reads an [`EngineConfig`] from a JSON file. Missing keys take defaults.
pub fn load_config_file(path: &Path) -> Result<EngineConfig> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;
    serde_json::from_str(&contents)
        .with_context(|| format!("Failed to parse config file {}", path.display()))
}

/// The file (if any) with overrides layered on top.
pub fn resolve_config(file: Option<&Path>, overrides: Overrides) -> Result<EngineConfig> {
    let mut config = match file {
        Some(path) => load_config_file(path)?,
        None => EngineConfig::default(),
    };
    overrides.apply(&mut config);
    Ok(config)
}
