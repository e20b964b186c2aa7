use std::ffi::{CStr, CString};
use std::os::raw::c_int;
use std::path::Path;
use std::sync::Arc;

use tracing::{debug, info, warn};

use super::api::{NativeText, TessApi, TessHandle};
use super::ffi::TessLibrary;
use crate::config::{EngineConfig, PageSegMode};
use crate::engine::{OcrError, Result};
use crate::image::ImageView;
use crate::locator::LocateLibrary;

/// Resolution assumed for raw reads that do not name one.
pub const DEFAULT_RESOLUTION: u32 = 96;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReadOptions {
    /// Source resolution in dpi. Forwarded whenever set.
    pub resolution: Option<u32>,
    /// Hand the exact pixel layout and resolution to the engine instead of
    /// letting it estimate them. Assumes 96 dpi if no resolution is set.
    pub raw: bool,
    /// Changes the engine's page segmentation mode before reading. The
    /// mode stays in effect for later reads.
    pub page_seg_mode: Option<PageSegMode>,
}

impl ReadOptions {
    pub fn raw(resolution: u32) -> Self {
        Self {
            resolution: Some(resolution),
            raw: true,
            page_seg_mode: None,
        }
    }

    fn source_resolution(&self) -> Result<Option<c_int>> {
        if let Some(resolution) = self.resolution {
            if resolution == 0 || resolution > c_int::MAX as u32 {
                return Err(OcrError::InvalidArgument(format!(
                    "resolution must be a positive dpi value, got {resolution}"
                )));
            }
        }
        let resolution = match (self.resolution, self.raw) {
            (Some(resolution), _) => Some(resolution),
            (None, true) => Some(DEFAULT_RESOLUTION),
            (None, false) => None,
        };
        Ok(resolution.map(|resolution| resolution as c_int))
    }
}

/// One initialised Tesseract session.
///
/// The native handle is deleted exactly once, by [`close`](Engine::close)
/// or on drop, whichever comes first. Calls take `&mut self` because the
/// handle must not be used from two threads at the same time; share an
/// engine through a mutex or create one per thread.
pub struct Engine {
    api: Arc<dyn TessApi>,
    handle: Option<TessHandle>,
}

// The handle is only reachable through `&mut self` or `&self` on a type that
// is not `Sync`, so moving it to another thread is fine.
unsafe impl Send for Engine {}

impl Engine {
    /// Finds the library the config asks for, loads it and initialises a
    /// session.
    pub fn new(config: &EngineConfig) -> Result<Self> {
        let locator = config.locator()?;
        Self::with_locator(&locator, config)
    }

    pub fn with_locator<L: LocateLibrary + ?Sized>(locator: &L, config: &EngineConfig) -> Result<Self> {
        let path = locator.locate()?;
        let library = TessLibrary::open(&path)?;
        let data_path = config.resolve_data_path(&path)?;
        Self::with_api(library, data_path.as_deref(), config)
    }

    /// Initialises a session on an already loaded API table.
    pub fn with_api(
        api: Arc<dyn TessApi>,
        data_path: Option<&Path>,
        config: &EngineConfig,
    ) -> Result<Self> {
        let data_path_c = data_path.map(path_to_cstring).transpose()?;
        let language = to_cstring("language", &config.language)?;
        let variables = config_variables(config)?;

        let handle = api
            .create()
            .ok_or_else(|| OcrError::EngineInit("TessBaseAPICreate returned null".into()))?;
        // From here on, dropping `engine` deletes the handle.
        let mut engine = Self {
            api,
            handle: Some(handle),
        };

        let status = unsafe {
            engine.api.init(
                handle,
                data_path_c.as_deref(),
                &language,
                config.engine_mode as c_int,
            )
        };
        if status != 0 {
            return Err(OcrError::EngineInit(format!(
                "could not initialise language '{}' from {}",
                config.language,
                data_path.map_or_else(|| "the default data path".into(), |p| p.display().to_string())
            )));
        }

        if let Some(mode) = config.page_seg_mode {
            engine.set_page_seg_mode(mode)?;
        }
        for (name, value) in &variables {
            let accepted = unsafe { engine.api.set_variable(handle, name, value) };
            if !accepted {
                return Err(OcrError::EngineInit(format!(
                    "unknown tesseract variable '{}'",
                    name.to_string_lossy()
                )));
            }
        }

        info!(
            language = %config.language,
            data_path = ?data_path,
            "tesseract engine ready"
        );
        Ok(engine)
    }

    /// Reads the text in a tightly packed pixel buffer.
    ///
    /// The buffer is checked before anything reaches the native library.
    /// No text is a valid result and comes back as an empty string.
    pub fn read(
        &mut self,
        data: &[u8],
        width: u32,
        height: u32,
        bytes_per_pixel: u32,
        options: &ReadOptions,
    ) -> Result<String> {
        let image = ImageView::new(data, width, height, bytes_per_pixel)?;
        self.read_image(&image, options)
    }

    pub fn read_image(&mut self, image: &ImageView<'_>, options: &ReadOptions) -> Result<String> {
        let text = self.recognize(image, options)?;
        Ok(text.to_string_lossy())
    }

    /// Like [`read`](Engine::read) but returns the UTF-8 buffer undecoded.
    pub fn read_bytes(
        &mut self,
        data: &[u8],
        width: u32,
        height: u32,
        bytes_per_pixel: u32,
        options: &ReadOptions,
    ) -> Result<Vec<u8>> {
        let image = ImageView::new(data, width, height, bytes_per_pixel)?;
        let text = self.recognize(&image, options)?;
        Ok(text.as_bytes().to_vec())
    }

    fn recognize(&mut self, image: &ImageView<'_>, options: &ReadOptions) -> Result<NativeText<'_>> {
        let resolution = options.source_resolution()?;
        if let Some(mode) = options.page_seg_mode {
            self.set_page_seg_mode(mode)?;
        }
        let handle = self.handle()?;

        debug!(
            width = image.width(),
            height = image.height(),
            bytes_per_pixel = image.bytes_per_pixel(),
            raw = options.raw,
            "recognizing image"
        );

        let api = &*self.api;
        unsafe {
            api.set_image(handle, image);
            if let Some(ppi) = resolution {
                api.set_source_resolution(handle, ppi);
            }
            let status = api.recognize(handle);
            if status != 0 {
                return Err(OcrError::Recognition(format!(
                    "TessBaseAPIRecognize returned {status}"
                )));
            }
            NativeText::from_raw(api, api.utf8_text(handle)).ok_or_else(|| {
                OcrError::Recognition("TessBaseAPIGetUTF8Text returned null".into())
            })
        }
    }

    /// Version string of the loaded library. Works on a closed engine.
    pub fn version(&self) -> String {
        self.api.version()
    }

    /// Languages with trained data in the engine's data path.
    pub fn available_languages(&self) -> Result<Vec<String>> {
        let handle = self.handle()?;
        let mut languages = Vec::new();
        unsafe {
            let array = self.api.available_languages(handle);
            if array.is_null() {
                return Ok(languages);
            }
            let mut index = 0;
            while let Some(entry) = (*array.add(index)).as_ref() {
                languages.push(CStr::from_ptr(entry).to_string_lossy().into_owned());
                index += 1;
            }
            self.api.delete_text_array(array);
        }
        Ok(languages)
    }

    /// Sets an internal Tesseract parameter, as a config file would.
    /// Returns `false` if the library does not know the name.
    pub fn set_variable(&mut self, name: &str, value: &str) -> Result<bool> {
        let name = to_cstring("variable name", name)?;
        let value = to_cstring("variable value", value)?;
        let handle = self.handle()?;
        Ok(unsafe { self.api.set_variable(handle, &name, &value) })
    }

    pub fn set_page_seg_mode(&mut self, mode: PageSegMode) -> Result<()> {
        let handle = self.handle()?;
        unsafe { self.api.set_page_seg_mode(handle, mode as c_int) };
        Ok(())
    }

    pub fn page_seg_mode(&self) -> Result<PageSegMode> {
        let handle = self.handle()?;
        PageSegMode::try_from(unsafe { self.api.page_seg_mode(handle) })
    }

    /// Average word confidence (0-100) of the last recognition.
    pub fn mean_text_conf(&self) -> Result<i32> {
        let handle = self.handle()?;
        Ok(unsafe { self.api.mean_text_conf(handle) })
    }

    /// Ends the session and releases the native handle. Calling it again
    /// does nothing.
    pub fn close(&mut self) {
        match self.handle.take() {
            Some(handle) => {
                debug!("deleting tesseract handle");
                unsafe { self.api.delete(handle) };
            }
            None => debug!("tesseract handle already released"),
        }
    }

    pub fn is_closed(&self) -> bool {
        self.handle.is_none()
    }

    fn handle(&self) -> Result<TessHandle> {
        self.handle.ok_or(OcrError::EngineClosed)
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        if self.handle.is_some() && std::thread::panicking() {
            warn!("releasing tesseract handle while unwinding");
        }
        self.close();
    }
}

fn to_cstring(what: &str, value: &str) -> Result<CString> {
    CString::new(value)
        .map_err(|_| OcrError::InvalidArgument(format!("{what} contains a NUL byte")))
}

fn path_to_cstring(path: &Path) -> Result<CString> {
    let path_str = path
        .to_str()
        .ok_or_else(|| OcrError::InvalidArgument(format!("non-utf8 path {}", path.display())))?;
    to_cstring("path", path_str)
}

fn config_variables(config: &EngineConfig) -> Result<Vec<(CString, CString)>> {
    let mut variables = Vec::new();
    if let Some(whitelist) = &config.char_whitelist {
        variables.push((
            to_cstring("variable name", "tessedit_char_whitelist")?,
            to_cstring("character whitelist", whitelist)?,
        ));
    }
    for (name, value) in &config.variables {
        variables.push((
            to_cstring("variable name", name)?,
            to_cstring("variable value", value)?,
        ));
    }
    Ok(variables)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tesseract::api::fake::FakeApi;
    use std::path::PathBuf;

    fn ready_engine(api: &Arc<FakeApi>) -> Engine {
        Engine::with_api(api.clone(), None, &EngineConfig::default()).unwrap()
    }

    #[test]
    fn test_init_passes_language_data_path_and_mode() {
        let api = Arc::new(FakeApi::default());
        let config = EngineConfig {
            language: "deu+eng".into(),
            engine_mode: crate::config::OcrEngineMode::LstmOnly,
            ..Default::default()
        };
        let _engine = Engine::with_api(api.clone(), Some(Path::new("/data/tessdata")), &config).unwrap();

        let init = api.state.lock().init_args.clone().unwrap();
        assert_eq!(
            init,
            (Some("/data/tessdata".to_string()), "deu+eng".to_string(), 1)
        );
        assert_eq!(api.calls(), vec!["create", "init"]);
    }

    #[test]
    fn test_read_returns_text_and_frees_buffer_once() {
        let api = Arc::new(FakeApi::default());
        let mut engine = ready_engine(&api);

        let pixels = vec![255u8; 4 * 3];
        let text = engine.read(&pixels, 4, 3, 1, &ReadOptions::default()).unwrap();
        assert_eq!(text, "HELLO\n");

        let state = api.state.lock();
        assert_eq!(state.live_texts, 0);
        assert_eq!(state.freed_texts, 1);
        assert_eq!(state.last_image, Some((12, 4, 3, 1, 4)));
        assert_eq!(state.resolution, None);
    }

    #[test]
    fn test_invalid_buffer_never_reaches_native_code() {
        let api = Arc::new(FakeApi::default());
        let mut engine = ready_engine(&api);
        let before = api.calls();

        let err = engine
            .read(&[0u8; 5], 2, 2, 1, &ReadOptions::default())
            .unwrap_err();
        assert!(matches!(err, OcrError::InvalidImage(_)));

        let err = engine
            .read(&[0u8; 8], 2, 2, 2, &ReadOptions::default())
            .unwrap_err();
        assert!(matches!(err, OcrError::InvalidImage(_)));
        assert_eq!(api.calls(), before);
    }

    #[test]
    fn test_raw_mode_forwards_resolution() {
        let api = Arc::new(FakeApi::default());
        let mut engine = ready_engine(&api);

        engine.read(&[0u8; 3], 1, 1, 3, &ReadOptions::raw(300)).unwrap();
        assert_eq!(api.state.lock().resolution, Some(300));

        let options = ReadOptions {
            raw: true,
            ..Default::default()
        };
        engine.read(&[0u8; 4], 1, 1, 4, &options).unwrap();
        assert_eq!(api.state.lock().resolution, Some(DEFAULT_RESOLUTION as c_int));

        let calls = api.calls();
        let set_image = calls.iter().position(|c| c == "set_image").unwrap();
        let resolution = calls.iter().position(|c| c == "set_source_resolution").unwrap();
        let recognize = calls.iter().position(|c| c == "recognize").unwrap();
        assert!(set_image < resolution && resolution < recognize);
    }

    #[test]
    fn test_explicit_resolution_is_forwarded_without_raw() {
        let api = Arc::new(FakeApi::default());
        let mut engine = ready_engine(&api);
        let options = ReadOptions {
            resolution: Some(300),
            raw: false,
            ..Default::default()
        };
        engine.read(&[255u8], 1, 1, 1, &options).unwrap();
        assert_eq!(api.state.lock().resolution, Some(300));
    }

    #[test]
    fn test_default_read_leaves_resolution_to_the_engine() {
        let api = Arc::new(FakeApi::default());
        let mut engine = ready_engine(&api);
        engine.read(&[255u8], 1, 1, 1, &ReadOptions::default()).unwrap();
        assert_eq!(api.state.lock().resolution, None);
        assert!(!api.calls().contains(&"set_source_resolution".to_string()));
    }

    #[test]
    fn test_zero_resolution_is_rejected() {
        let api = Arc::new(FakeApi::default());
        let mut engine = ready_engine(&api);
        let err = engine
            .read(&[0u8; 1], 1, 1, 1, &ReadOptions::raw(0))
            .unwrap_err();
        assert!(matches!(err, OcrError::InvalidArgument(_)));
        assert!(!api.calls().contains(&"set_image".to_string()));
    }

    #[test]
    fn test_empty_text_is_not_an_error() {
        let api = Arc::new(FakeApi {
            text: Some(String::new()),
            ..Default::default()
        });
        let mut engine = ready_engine(&api);
        let text = engine.read(&[255u8], 1, 1, 1, &ReadOptions::default()).unwrap();
        assert_eq!(text, "");
        assert_eq!(api.state.lock().freed_texts, 1);
    }

    #[test]
    fn test_recognition_failure() {
        let api = Arc::new(FakeApi {
            recognize_status: -1,
            ..Default::default()
        });
        let mut engine = ready_engine(&api);
        let err = engine.read(&[255u8], 1, 1, 1, &ReadOptions::default()).unwrap_err();
        assert!(matches!(err, OcrError::Recognition(_)));
        assert!(!api.calls().contains(&"utf8_text".to_string()));

        drop(engine);
        assert_eq!(api.state.lock().live_handles, 0);
    }

    #[test]
    fn test_null_text_is_a_recognition_error() {
        let api = Arc::new(FakeApi {
            text: None,
            ..Default::default()
        });
        let mut engine = ready_engine(&api);
        let err = engine.read(&[255u8], 1, 1, 1, &ReadOptions::default()).unwrap_err();
        assert!(matches!(err, OcrError::Recognition(_)));
        assert!(!api.calls().contains(&"delete_text".to_string()));
    }

    #[test]
    fn test_read_bytes_keeps_raw_utf8() {
        let api = Arc::new(FakeApi {
            text: Some("Größe\n".into()),
            ..Default::default()
        });
        let mut engine = ready_engine(&api);
        let bytes = engine.read_bytes(&[0u8; 3], 3, 1, 1, &ReadOptions::default()).unwrap();
        assert_eq!(bytes, "Größe\n".as_bytes());
        assert_eq!(api.state.lock().live_texts, 0);
    }

    #[test]
    fn test_failed_init_deletes_handle() {
        let api = Arc::new(FakeApi {
            init_status: -1,
            ..Default::default()
        });
        let err = Engine::with_api(api.clone(), Some(Path::new("/missing")), &EngineConfig::default())
            .err()
            .unwrap();
        assert!(matches!(err, OcrError::EngineInit(_)));

        let state = api.state.lock();
        assert_eq!(state.live_handles, 0);
        assert_eq!(state.deleted_handles, 1);
    }

    #[test]
    fn test_null_create_is_an_init_error() {
        let api = Arc::new(FakeApi {
            create_fails: true,
            ..Default::default()
        });
        let err = Engine::with_api(api.clone(), None, &EngineConfig::default())
            .err()
            .unwrap();
        assert!(matches!(err, OcrError::EngineInit(_)));
        assert_eq!(api.calls(), vec!["create"]);
    }

    #[test]
    fn test_unknown_config_variable_fails_init_and_releases() {
        let api = Arc::new(FakeApi::default());
        let mut config = EngineConfig::default();
        config.variables.insert("bogus_option".into(), "1".into());

        let err = Engine::with_api(api.clone(), None, &config).err().unwrap();
        assert!(matches!(err, OcrError::EngineInit(_)));
        assert_eq!(api.state.lock().live_handles, 0);
    }

    #[test]
    fn test_nul_in_language_fails_before_create() {
        let api = Arc::new(FakeApi::default());
        let config = EngineConfig {
            language: "en\0g".into(),
            ..Default::default()
        };
        let err = Engine::with_api(api.clone(), None, &config).err().unwrap();
        assert!(matches!(err, OcrError::InvalidArgument(_)));
        assert!(api.calls().is_empty());
    }

    #[test]
    fn test_config_applies_psm_whitelist_and_variables() {
        let api = Arc::new(FakeApi::default());
        let mut config = EngineConfig {
            page_seg_mode: Some(PageSegMode::SingleLine),
            char_whitelist: Some("0123456789.".into()),
            ..Default::default()
        };
        config
            .variables
            .insert("classify_bln_numeric_mode".into(), "1".into());

        let engine = Engine::with_api(api.clone(), None, &config).unwrap();
        assert_eq!(engine.page_seg_mode().unwrap(), PageSegMode::SingleLine);

        let state = api.state.lock();
        assert_eq!(
            state.variables.get("tessedit_char_whitelist").map(String::as_str),
            Some("0123456789.")
        );
        assert_eq!(
            state.variables.get("classify_bln_numeric_mode").map(String::as_str),
            Some("1")
        );
    }

    #[test]
    fn test_close_is_idempotent() {
        let api = Arc::new(FakeApi::default());
        let mut engine = ready_engine(&api);

        engine.close();
        engine.close();
        assert!(engine.is_closed());
        drop(engine);

        let state = api.state.lock();
        assert_eq!(state.deleted_handles, 1);
        assert_eq!(state.live_handles, 0);
    }

    #[test]
    fn test_closed_engine_rejects_calls() {
        let api = Arc::new(FakeApi::default());
        let mut engine = ready_engine(&api);
        engine.close();

        let err = engine.read(&[255u8], 1, 1, 1, &ReadOptions::default()).unwrap_err();
        assert!(matches!(err, OcrError::EngineClosed));
        assert!(matches!(engine.mean_text_conf(), Err(OcrError::EngineClosed)));
        assert!(matches!(engine.set_variable("a", "b"), Err(OcrError::EngineClosed)));
        assert_eq!(engine.version(), "5.3.0-fake");
    }

    #[test]
    fn test_per_read_page_seg_mode_sticks() {
        let api = Arc::new(FakeApi::default());
        let mut engine = ready_engine(&api);
        assert_eq!(engine.page_seg_mode().unwrap(), PageSegMode::Auto);

        let options = ReadOptions {
            page_seg_mode: Some(PageSegMode::SingleWord),
            ..Default::default()
        };
        engine.read(&[255u8], 1, 1, 1, &options).unwrap();
        assert_eq!(engine.page_seg_mode().unwrap(), PageSegMode::SingleWord);
    }

    #[test]
    fn test_languages_and_confidence() {
        let api = Arc::new(FakeApi::default());
        let mut engine = ready_engine(&api);
        assert_eq!(engine.available_languages().unwrap(), vec!["eng", "osd"]);
        assert!(api.calls().contains(&"delete_text_array".to_string()));

        assert!(engine.set_variable("tessedit_char_blacklist", "xyz").unwrap());
        assert!(!engine.set_variable("bogus", "1").unwrap());
        assert_eq!(engine.mean_text_conf().unwrap(), 87);
    }

    #[test]
    fn test_missing_library_through_locator() {
        let locator = crate::locator::ExplicitLocator::new(PathBuf::from("/nonexistent/libtesseract.so"));
        let err = Engine::with_locator(&locator, &EngineConfig::default()).err().unwrap();
        assert!(matches!(err, OcrError::LibraryNotFound(_)));
    }

    #[test]
    fn test_explicit_missing_library_in_config() {
        let config = EngineConfig {
            library_path: Some(PathBuf::from("/nonexistent/libtesseract.so.5")),
            ..Default::default()
        };
        assert!(matches!(Engine::new(&config), Err(OcrError::LibraryNotFound(_))));
    }
}
