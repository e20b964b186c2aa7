//! Command line arguments backing the `tessy` binary.
use clap::{Args as ClapArgs, Parser, Subcommand};
use std::path::PathBuf;
use tessy_ocr::{OcrEngineMode, PageSegMode};
use tessy_rs::Overrides;

#[derive(Parser, Debug)]
#[command(
  name = "tessy",
  about = "Read text from images through the installed Tesseract-OCR library",
  version
)]
pub struct Args {
  #[command(subcommand)]
  pub command: Commands,

  #[command(flatten)]
  pub engine: EngineArgs,

  /// Log progress to stderr
  #[arg(long, short = 'v', global = true)]
  pub verbose: bool,
}

#[derive(ClapArgs, Debug, Default)]
pub struct EngineArgs {
  /// JSON file with engine settings
  #[arg(long, global = true)]
  pub config: Option<PathBuf>,

  /// Exact path to the Tesseract shared library
  #[arg(long, env = "TESSY_LIBRARY", global = true)]
  pub library: Option<PathBuf>,

  /// Directory searched for the library before the platform defaults
  #[arg(long, global = true)]
  pub tesseract_dir: Option<PathBuf>,

  /// Trained data directory (usually named "tessdata")
  #[arg(long, env = "TESSY_DATA_PATH", global = true)]
  pub data_path: Option<PathBuf>,

  /// Language code(s), e.g. "eng" or "eng+deu"
  #[arg(long, short = 'l', global = true)]
  pub lang: Option<String>,

  /// Page segmentation mode, by number (0-13) or name
  #[arg(long, global = true)]
  pub psm: Option<PageSegMode>,

  /// OCR engine mode, by number (0-3) or name
  #[arg(long, global = true)]
  pub oem: Option<OcrEngineMode>,

  /// Only recognise these characters
  #[arg(long, global = true)]
  pub whitelist: Option<String>,

  /// Set a Tesseract variable, as in a config file
  #[arg(short = 'c', value_name = "NAME=VALUE", value_parser = parse_key_val, global = true)]
  pub variables: Vec<(String, String)>,
}

impl EngineArgs {
  pub fn overrides(&self) -> Overrides {
    Overrides {
      library_path: self.library.clone(),
      tesseract_dir: self.tesseract_dir.clone(),
      data_path: self.data_path.clone(),
      language: self.lang.clone(),
      engine_mode: self.oem,
      page_seg_mode: self.psm,
      char_whitelist: self.whitelist.clone(),
      variables: self.variables.clone(),
    }
  }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
  /// Print version information
  Version,
  /// List the languages available in the trained data directory
  Languages,
  /// Read text from one or more image files
  Read {
    /// Images to read
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// Source resolution in dpi, passed to the engine whenever given
    #[arg(long)]
    dpi: Option<u32>,

    /// Pass the exact pixel layout and resolution to the engine
    #[arg(long)]
    raw: bool,

    /// Upscale the image by this factor before reading
    #[arg(long, default_value = "1")]
    scale: u32,

    /// Sharpen with an unsharp mask of this sigma
    #[arg(long)]
    sharpen: Option<f32>,

    /// Print one JSON object per file
    #[arg(long)]
    json: bool,
  },
}

fn parse_key_val(s: &str) -> Result<(String, String), String> {
  let (key, value) = s
    .split_once('=')
    .ok_or_else(|| format!("expected NAME=VALUE, got '{s}'"))?;
  if key.is_empty() {
    return Err(format!("missing variable name in '{s}'"));
  }
  Ok((key.to_string(), value.to_string()))
}
