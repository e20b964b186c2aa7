mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Args, Commands};
use tessy_ocr::{Engine, EngineConfig, LocateLibrary, ReadOptions, TessApi, TessLibrary, TesseractOcr};
use tessy_rs::{read_files, resolve_config, Preprocess};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
  let args = Args::parse();

  let filter = EnvFilter::try_from_default_env()
    .unwrap_or_else(|_| EnvFilter::new(if args.verbose { "info" } else { "warn" }));
  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(std::io::stderr)
    .init();

  if let Err(e) = run(args).await {
    eprintln!("Error: {:#}", e);
    std::process::exit(1);
  }
}

async fn run(args: Args) -> Result<()> {
  let config = resolve_config(args.engine.config.as_deref(), args.engine.overrides())?;

  match args.command {
    Commands::Version => {
      println!("tessy {}", env!("CARGO_PKG_VERSION"));
      match library_version(&config) {
        Ok(version) => println!("tesseract {}", version),
        Err(e) => eprintln!("tesseract unavailable: {:#}", e),
      }
    }
    Commands::Languages => {
      let engine = Engine::new(&config).context("Failed to start tesseract")?;
      for language in engine.available_languages()? {
        println!("{}", language);
      }
    }
    Commands::Read {
      files,
      dpi,
      raw,
      scale,
      sharpen,
      json,
    } => {
      let ocr = TesseractOcr::new(&config).context("Failed to start tesseract")?;
      let options = ReadOptions {
        resolution: dpi,
        raw,
        page_seg_mode: None,
      };
      let preprocess = Preprocess { scale, sharpen };

      let reports = read_files(&ocr, &files, &options, &preprocess).await?;
      ocr.close();

      let headers = reports.len() > 1;
      for report in &reports {
        if json {
          println!("{}", serde_json::to_string(report)?);
        } else {
          if headers {
            println!("==> {} <==", report.path.display());
          }
          println!("{}", report.text.trim_end());
        }
      }
    }
  }

  Ok(())
}

fn library_version(config: &EngineConfig) -> Result<String> {
  let path = config.locator()?.locate()?;
  let library = TessLibrary::open(&path)?;
  Ok(format!("{} ({})", library.version(), path.display()))
}
