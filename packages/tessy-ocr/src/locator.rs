//! Finding the Tesseract shared library on disk.
//!
//! Discovery sits behind [`LocateLibrary`] so the engine can be pointed at
//! an explicit file, the platform search, or anything a caller injects.

use std::env;
use std::path::{Path, PathBuf};

use tracing::{debug, trace};

use crate::engine::{OcrError, Result};

pub trait LocateLibrary {
    /// Returns an absolute path to a library file that existed when checked.
    fn locate(&self) -> Result<PathBuf>;
}

impl<L: LocateLibrary + ?Sized> LocateLibrary for Box<L> {
    fn locate(&self) -> Result<PathBuf> {
        (**self).locate()
    }
}

/// Uses a caller-supplied path as is.
#[derive(Debug, Clone)]
pub struct ExplicitLocator {
    path: PathBuf,
}

impl ExplicitLocator {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl LocateLibrary for ExplicitLocator {
    fn locate(&self) -> Result<PathBuf> {
        if !self.path.is_file() {
            return Err(OcrError::LibraryNotFound(format!(
                "{} does not exist",
                self.path.display()
            )));
        }
        std::path::absolute(&self.path)
            .map_err(|e| OcrError::LibraryNotFound(format!("{}: {e}", self.path.display())))
    }
}

/// Tries every `dir/name` pair, directories outermost, and takes the first
/// regular file.
#[derive(Debug, Clone, Default)]
pub struct SearchLocator {
    names: Vec<String>,
    dirs: Vec<PathBuf>,
}

impl SearchLocator {
    pub fn new<N, D>(names: N, dirs: D) -> Self
    where
        N: IntoIterator,
        N::Item: Into<String>,
        D: IntoIterator,
        D::Item: Into<PathBuf>,
    {
        let mut locator = Self {
            names: names.into_iter().map(Into::into).collect(),
            dirs: Vec::new(),
        };
        for dir in dirs {
            locator.push_dir(dir.into());
        }
        locator
    }

    /// The search this platform gets when no library path is configured.
    ///
    /// `hint` is searched first; `api_version` replaces the default
    /// library name suffix where the platform uses one.
    pub fn for_host(hint: Option<&Path>, api_version: Option<&str>) -> Result<Self> {
        let names = host_library_names(api_version)?;
        let mut dirs = Vec::new();
        if let Some(hint) = hint {
            dirs.push(hint.to_path_buf());
        }
        dirs.extend(host_search_dirs());
        Ok(Self::new(names, dirs))
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn dirs(&self) -> &[PathBuf] {
        &self.dirs
    }

    fn push_dir(&mut self, dir: PathBuf) {
        if !dir.as_os_str().is_empty() && !self.dirs.contains(&dir) {
            self.dirs.push(dir);
        }
    }
}

impl LocateLibrary for SearchLocator {
    fn locate(&self) -> Result<PathBuf> {
        for dir in &self.dirs {
            for name in &self.names {
                let candidate = dir.join(name);
                if candidate.is_file() {
                    debug!(path = %candidate.display(), "found tesseract library");
                    return std::path::absolute(&candidate).map_err(|e| {
                        OcrError::LibraryNotFound(format!("{}: {e}", candidate.display()))
                    });
                }
                trace!(path = %candidate.display(), "no library here");
            }
        }
        Err(OcrError::LibraryNotFound(format!(
            "none of {:?} in {} searched directories",
            self.names,
            self.dirs.len()
        )))
    }
}

#[cfg(target_os = "linux")]
fn host_library_names(_api_version: Option<&str>) -> Result<Vec<String>> {
    Ok(vec![
        "libtesseract.so.5".into(),
        "libtesseract.so.4".into(),
        "libtesseract.so".into(),
    ])
}

#[cfg(target_os = "macos")]
fn host_library_names(_api_version: Option<&str>) -> Result<Vec<String>> {
    Ok(vec![
        "libtesseract.5.dylib".into(),
        "libtesseract.4.dylib".into(),
        "libtesseract.dylib".into(),
    ])
}

#[cfg(target_os = "windows")]
fn host_library_names(api_version: Option<&str>) -> Result<Vec<String>> {
    Ok(match api_version {
        Some(version) => vec![format!("libtesseract{version}.dll")],
        None => vec!["libtesseract-5.dll".into(), "libtesseract-4.dll".into()],
    })
}

#[cfg(not(any(target_os = "linux", target_os = "macos", target_os = "windows")))]
fn host_library_names(_api_version: Option<&str>) -> Result<Vec<String>> {
    Err(OcrError::Unsupported(format!(
        "no tesseract library search for {}; pass an explicit library path",
        env::consts::OS
    )))
}

fn env_dirs(var: &str) -> Vec<PathBuf> {
    env::var_os(var)
        .map(|value| env::split_paths(&value).collect())
        .unwrap_or_default()
}

#[cfg(target_os = "linux")]
fn host_search_dirs() -> Vec<PathBuf> {
    let mut dirs = env_dirs("LD_LIBRARY_PATH");
    let multiarch = format!("/usr/lib/{}-linux-gnu", env::consts::ARCH);
    dirs.extend(
        [
            multiarch.as_str(),
            "/usr/lib64",
            "/usr/lib",
            "/usr/local/lib64",
            "/usr/local/lib",
            "/lib",
        ]
        .into_iter()
        .map(PathBuf::from),
    );
    dirs.extend(env_dirs("PATH"));
    dirs
}

#[cfg(target_os = "macos")]
fn host_search_dirs() -> Vec<PathBuf> {
    let mut dirs = env_dirs("DYLD_LIBRARY_PATH");
    dirs.extend(
        ["/opt/homebrew/lib", "/usr/local/lib", "/opt/local/lib"]
            .into_iter()
            .map(PathBuf::from),
    );
    dirs.extend(env_dirs("PATH"));
    dirs
}

#[cfg(target_os = "windows")]
fn host_search_dirs() -> Vec<PathBuf> {
    use crate::config::TESSERACT_DIRNAME;

    let mut dirs = Vec::new();
    if let Ok(cwd) = env::current_dir() {
        let run_path = cwd.parent().map(Path::to_path_buf).unwrap_or(cwd);
        dirs.push(run_path.clone());
        dirs.push(run_path.join(TESSERACT_DIRNAME));
    }
    for var in ["PROGRAMFILES", "PROGRAMFILES(X86)"] {
        if let Some(root) = env::var_os(var) {
            dirs.push(PathBuf::from(root).join(TESSERACT_DIRNAME));
        }
    }
    dirs.extend(env_dirs("PATH"));
    dirs
}

#[cfg(not(any(target_os = "linux", target_os = "macos", target_os = "windows")))]
fn host_search_dirs() -> Vec<PathBuf> {
    env_dirs("PATH")
}
