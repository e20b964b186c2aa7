//! Engine configuration and trained-data discovery.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::Deserialize;
use tracing::debug;

use crate::engine::{OcrError, Result};
use crate::locator::{ExplicitLocator, LocateLibrary, SearchLocator};

pub const DEFAULT_LANGUAGE: &str = "eng";
pub const TESSDATA_DIRNAME: &str = "tessdata";
pub const TESSERACT_DIRNAME: &str = "Tesseract-OCR";

/// Where distributions and package managers put trained data.
const STANDARD_TESSDATA_DIRS: &[&str] = &[
    "/usr/share/tesseract-ocr/5/tessdata",
    "/usr/share/tesseract-ocr/4.00/tessdata",
    "/usr/share/tessdata",
    "/usr/local/share/tessdata",
    "/opt/homebrew/share/tessdata",
    "/opt/local/share/tessdata",
];

/// Mirrors `TessPageSegMode` from the C API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(i32)]
pub enum PageSegMode {
    OsdOnly = 0,
    AutoOsd = 1,
    AutoOnly = 2,
    Auto = 3,
    SingleColumn = 4,
    SingleBlockVertText = 5,
    SingleBlock = 6,
    SingleLine = 7,
    SingleWord = 8,
    CircleWord = 9,
    SingleChar = 10,
    SparseText = 11,
    SparseTextOsd = 12,
    RawLine = 13,
}

impl PageSegMode {
    pub const ALL: [PageSegMode; 14] = [
        PageSegMode::OsdOnly,
        PageSegMode::AutoOsd,
        PageSegMode::AutoOnly,
        PageSegMode::Auto,
        PageSegMode::SingleColumn,
        PageSegMode::SingleBlockVertText,
        PageSegMode::SingleBlock,
        PageSegMode::SingleLine,
        PageSegMode::SingleWord,
        PageSegMode::CircleWord,
        PageSegMode::SingleChar,
        PageSegMode::SparseText,
        PageSegMode::SparseTextOsd,
        PageSegMode::RawLine,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PageSegMode::OsdOnly => "osd_only",
            PageSegMode::AutoOsd => "auto_osd",
            PageSegMode::AutoOnly => "auto_only",
            PageSegMode::Auto => "auto",
            PageSegMode::SingleColumn => "single_column",
            PageSegMode::SingleBlockVertText => "single_block_vert_text",
            PageSegMode::SingleBlock => "single_block",
            PageSegMode::SingleLine => "single_line",
            PageSegMode::SingleWord => "single_word",
            PageSegMode::CircleWord => "circle_word",
            PageSegMode::SingleChar => "single_char",
            PageSegMode::SparseText => "sparse_text",
            PageSegMode::SparseTextOsd => "sparse_text_osd",
            PageSegMode::RawLine => "raw_line",
        }
    }
}

impl TryFrom<i32> for PageSegMode {
    type Error = OcrError;

    fn try_from(value: i32) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|mode| *mode as i32 == value)
            .ok_or_else(|| {
                OcrError::InvalidArgument(format!("unknown page segmentation mode {value}"))
            })
    }
}

impl FromStr for PageSegMode {
    type Err = OcrError;

    /// Accepts the numeric `--psm` value tesseract uses or the snake_case name.
    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if let Ok(value) = s.parse::<i32>() {
            return Self::try_from(value);
        }
        Self::ALL
            .into_iter()
            .find(|mode| mode.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| {
                OcrError::InvalidArgument(format!("unknown page segmentation mode '{s}'"))
            })
    }
}

impl fmt::Display for PageSegMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", *self as i32, self.as_str())
    }
}

/// Mirrors `TessOcrEngineMode`; passed once, at engine initialisation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(i32)]
pub enum OcrEngineMode {
    TesseractOnly = 0,
    LstmOnly = 1,
    TesseractLstmCombined = 2,
    #[default]
    Default = 3,
}

impl FromStr for OcrEngineMode {
    type Err = OcrError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "0" | "tesseract_only" => Ok(OcrEngineMode::TesseractOnly),
            "1" | "lstm_only" => Ok(OcrEngineMode::LstmOnly),
            "2" | "tesseract_lstm_combined" => Ok(OcrEngineMode::TesseractLstmCombined),
            "3" | "default" => Ok(OcrEngineMode::Default),
            other => Err(OcrError::InvalidArgument(format!("unknown engine mode '{other}'"))),
        }
    }
}

/// Everything needed to bring an [`Engine`](crate::Engine) to the ready state.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Exact path of the shared library. Skips the search when set.
    pub library_path: Option<PathBuf>,
    /// Directory searched before the platform defaults.
    pub tesseract_dir: Option<PathBuf>,
    /// Library name suffix, e.g. `-5` for `libtesseract-5.dll`.
    pub api_version: Option<String>,
    /// The `tessdata` directory. Used verbatim when set.
    pub data_path: Option<PathBuf>,
    pub language: String,
    pub engine_mode: OcrEngineMode,
    pub page_seg_mode: Option<PageSegMode>,
    pub char_whitelist: Option<String>,
    /// Extra `SetVariable` calls made right after initialisation.
    pub variables: BTreeMap<String, String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            library_path: None,
            tesseract_dir: None,
            api_version: None,
            data_path: None,
            language: DEFAULT_LANGUAGE.to_string(),
            engine_mode: OcrEngineMode::Default,
            page_seg_mode: None,
            char_whitelist: None,
            variables: BTreeMap::new(),
        }
    }
}

impl EngineConfig {
    /// The locator this configuration asks for: the explicit path if one
    /// was given, the host search otherwise.
    pub fn locator(&self) -> Result<Box<dyn LocateLibrary>> {
        match &self.library_path {
            Some(path) => Ok(Box::new(ExplicitLocator::new(path))),
            None => Ok(Box::new(SearchLocator::for_host(
                self.tesseract_dir.as_deref(),
                self.api_version.as_deref(),
            )?)),
        }
    }

    /// Picks the trained-data directory for a library found at `library`.
    ///
    /// An explicit `data_path` that is not a directory is an init failure.
    /// `Ok(None)` leaves the choice to the library's compiled-in default.
    pub fn resolve_data_path(&self, library: &Path) -> Result<Option<PathBuf>> {
        if let Some(path) = &self.data_path {
            if !path.is_dir() {
                return Err(OcrError::EngineInit(format!(
                    "data path {} is not a directory",
                    path.display()
                )));
            }
            return Ok(Some(path.clone()));
        }

        let cwd = std::env::current_dir().unwrap_or_default();
        let prefix = std::env::var_os("TESSDATA_PREFIX").map(PathBuf::from);
        let found = data_path_candidates(library, &cwd, prefix.as_deref())
            .into_iter()
            .find(|candidate| candidate.is_dir());
        debug!(data_path = ?found, "resolved tessdata directory");
        Ok(found)
    }
}

/// Trained-data directories in the order they are tried.
pub fn data_path_candidates(library: &Path, cwd: &Path, prefix: Option<&Path>) -> Vec<PathBuf> {
    let mut candidates = Vec::new();
    if let Some(prefix) = prefix {
        candidates.push(prefix.to_path_buf());
        candidates.push(prefix.join(TESSDATA_DIRNAME));
    }

    let mut roots = vec![cwd.to_path_buf()];
    if let Some(parent) = cwd.parent() {
        roots.push(parent.to_path_buf());
    }
    for root in roots {
        candidates.push(root.join(TESSDATA_DIRNAME));
        candidates.push(root.join(TESSERACT_DIRNAME).join(TESSDATA_DIRNAME));
    }

    if let Some(dir) = library.parent() {
        candidates.push(dir.join(TESSDATA_DIRNAME));
        if let Some(prefix) = dir.parent() {
            candidates.push(prefix.join("share").join(TESSDATA_DIRNAME));
        }
    }

    candidates.extend(STANDARD_TESSDATA_DIRS.iter().map(PathBuf::from));
    candidates
}
