//! Tests against the installed Tesseract library.
//!
//! Each test that needs the real library skips when it cannot be found or
//! the English trained data is missing.

use std::path::PathBuf;
use std::sync::Arc;

use tessy_ocr::{Engine, EngineConfig, LocateLibrary, OcrError, PageSegMode, ReadOptions, TessLibrary};

fn installed_library() -> Option<PathBuf> {
    let locator = EngineConfig::default().locator().ok()?;
    match locator.locate() {
        Ok(path) => Some(path),
        Err(e) => {
            eprintln!("skipping test: {e}");
            None
        }
    }
}

fn english_engine(config: EngineConfig) -> Option<Engine> {
    installed_library()?;
    match Engine::new(&config) {
        Ok(engine) => Some(engine),
        Err(e) => {
            eprintln!("skipping test: {e}");
            None
        }
    }
}

const GLYPH_H: [&str; 7] = ["X...X", "X...X", "X...X", "XXXXX", "X...X", "X...X", "X...X"];
const GLYPH_E: [&str; 7] = ["XXXXX", "X....", "X....", "XXXX.", "X....", "X....", "XXXXX"];
const GLYPH_L: [&str; 7] = ["X....", "X....", "X....", "X....", "X....", "X....", "XXXXX"];
const GLYPH_O: [&str; 7] = [".XXX.", "X...X", "X...X", "X...X", "X...X", "X...X", ".XXX."];

/// Renders black block letters on white, one byte per pixel.
fn render_word(glyphs: &[[&str; 7]], scale: usize) -> (Vec<u8>, u32, u32) {
    let margin = 4 * scale;
    let advance = 7 * scale;
    let width = margin * 2 + advance * glyphs.len() - 2 * scale;
    let height = margin * 2 + 7 * scale;
    let mut pixels = vec![255u8; width * height];

    for (index, glyph) in glyphs.iter().enumerate() {
        for (row, line) in glyph.iter().enumerate() {
            for (col, cell) in line.bytes().enumerate() {
                if cell != b'X' {
                    continue;
                }
                for dy in 0..scale {
                    let y = margin + row * scale + dy;
                    let x = margin + index * advance + col * scale;
                    pixels[y * width + x..y * width + x + scale].fill(0);
                }
            }
        }
    }
    (pixels, width as u32, height as u32)
}

#[test]
fn test_missing_explicit_library() {
    let config = EngineConfig {
        library_path: Some(PathBuf::from("/nonexistent/path/libtesseract.so.5")),
        ..Default::default()
    };
    assert!(matches!(Engine::new(&config), Err(OcrError::LibraryNotFound(_))));
}

#[test]
fn test_missing_data_directory() {
    let Some(library) = installed_library() else {
        return;
    };
    let config = EngineConfig {
        library_path: Some(library),
        data_path: Some(PathBuf::from("/nonexistent/tessdata")),
        ..Default::default()
    };
    assert!(matches!(Engine::new(&config), Err(OcrError::EngineInit(_))));
}

#[test]
fn test_library_is_loaded_once_per_path() {
    let Some(library) = installed_library() else {
        return;
    };
    let first = TessLibrary::open(&library).unwrap();
    let second = TessLibrary::open(&library).unwrap();
    assert!(Arc::ptr_eq(&first, &second));
}

#[test]
fn test_reads_rendered_hello() {
    let config = EngineConfig {
        page_seg_mode: Some(PageSegMode::SingleLine),
        ..Default::default()
    };
    let Some(mut engine) = english_engine(config) else {
        return;
    };

    let (pixels, width, height) = render_word(&[GLYPH_H, GLYPH_E, GLYPH_L, GLYPH_L, GLYPH_O], 8);
    let text = engine
        .read(&pixels, width, height, 1, &ReadOptions::raw(300))
        .unwrap();
    assert_eq!(text.trim(), "HELLO");

    let confidence = engine.mean_text_conf().unwrap();
    assert!((0..=100).contains(&confidence));
}

#[test]
fn test_blank_pixel_reads_as_empty() {
    let Some(mut engine) = english_engine(EngineConfig::default()) else {
        return;
    };
    let text = engine.read(&[255u8], 1, 1, 1, &ReadOptions::default()).unwrap();
    assert_eq!(text.trim(), "");
}

#[test]
fn test_valid_buffers_never_crash() {
    let Some(mut engine) = english_engine(EngineConfig::default()) else {
        return;
    };
    for (width, height) in [(1, 1), (3, 2), (17, 5), (64, 64)] {
        for bpp in [1u32, 3, 4] {
            let pixels = vec![200u8; (width * height * bpp) as usize];
            match engine.read(&pixels, width, height, bpp, &ReadOptions::default()) {
                Ok(_) | Err(OcrError::Recognition(_)) => {}
                Err(other) => panic!("{width}x{height}x{bpp}: {other}"),
            }
        }
    }
}

#[test]
fn test_mismatched_buffer_is_rejected() {
    let Some(mut engine) = english_engine(EngineConfig::default()) else {
        return;
    };
    let err = engine
        .read(&[255u8; 10], 4, 4, 1, &ReadOptions::default())
        .unwrap_err();
    assert!(matches!(err, OcrError::InvalidImage(_)));
}

#[test]
fn test_engine_introspection_and_teardown() {
    let Some(mut engine) = english_engine(EngineConfig::default()) else {
        return;
    };
    assert!(!engine.version().is_empty());
    assert!(engine.available_languages().unwrap().iter().any(|l| l == "eng"));

    engine.set_page_seg_mode(PageSegMode::SingleWord).unwrap();
    assert_eq!(engine.page_seg_mode().unwrap(), PageSegMode::SingleWord);
    assert!(engine.set_variable("tessedit_char_whitelist", "HELO").unwrap());

    engine.close();
    engine.close();
    assert!(engine.is_closed());
    assert!(matches!(engine.available_languages(), Err(OcrError::EngineClosed)));
}
