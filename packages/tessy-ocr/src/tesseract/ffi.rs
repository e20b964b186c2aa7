use std::collections::HashMap;
use std::ffi::{c_void, CStr};
use std::os::raw::{c_char, c_int};
use std::path::{Path, PathBuf};
use std::ptr::{self, NonNull};
use std::sync::{Arc, OnceLock};

use libloading::Library;
use parking_lot::Mutex;
use tracing::{debug, info};

use super::api::{TessApi, TessBaseApi, TessHandle};
use crate::engine::{OcrError, Result};
use crate::image::ImageView;

type TessVersionFn = unsafe extern "C" fn() -> *const c_char;
type CreateFn = unsafe extern "C" fn() -> *mut TessBaseApi;
type DeleteFn = unsafe extern "C" fn(*mut TessBaseApi);
type Init2Fn =
    unsafe extern "C" fn(*mut TessBaseApi, *const c_char, *const c_char, c_int) -> c_int;
type SetImageFn = unsafe extern "C" fn(*mut TessBaseApi, *const u8, c_int, c_int, c_int, c_int);
type SetSourceResolutionFn = unsafe extern "C" fn(*mut TessBaseApi, c_int);
type SetPageSegModeFn = unsafe extern "C" fn(*mut TessBaseApi, c_int);
type GetPageSegModeFn = unsafe extern "C" fn(*const TessBaseApi) -> c_int;
type SetVariableFn = unsafe extern "C" fn(*mut TessBaseApi, *const c_char, *const c_char) -> c_int;
type RecognizeFn = unsafe extern "C" fn(*mut TessBaseApi, *mut c_void) -> c_int;
type GetUtf8TextFn = unsafe extern "C" fn(*mut TessBaseApi) -> *mut c_char;
type DeleteTextFn = unsafe extern "C" fn(*const c_char);
type MeanTextConfFn = unsafe extern "C" fn(*mut TessBaseApi) -> c_int;
type GetLanguagesFn = unsafe extern "C" fn(*const TessBaseApi) -> *mut *mut c_char;
type DeleteTextArrayFn = unsafe extern "C" fn(*mut *mut c_char);

/// Entry points resolved from one loaded copy of libtesseract.
///
/// The function pointers stay valid for as long as `_library` is alive,
/// which is the lifetime of this struct.
pub struct TessLibrary {
    path: PathBuf,
    version: TessVersionFn,
    create: CreateFn,
    delete: DeleteFn,
    init2: Init2Fn,
    set_image: SetImageFn,
    set_source_resolution: SetSourceResolutionFn,
    set_page_seg_mode: SetPageSegModeFn,
    get_page_seg_mode: GetPageSegModeFn,
    set_variable: SetVariableFn,
    recognize: RecognizeFn,
    get_utf8_text: GetUtf8TextFn,
    delete_text: DeleteTextFn,
    mean_text_conf: MeanTextConfFn,
    get_available_languages: GetLanguagesFn,
    delete_text_array: DeleteTextArrayFn,
    _library: Library,
}

/// Loaded libraries by canonical path. Entries are never removed, so a
/// library stays mapped until the process exits.
static LIBRARIES: OnceLock<Mutex<HashMap<PathBuf, Arc<TessLibrary>>>> = OnceLock::new();

impl TessLibrary {
    /// Loads the library at `path`, or returns the copy already loaded from
    /// the same file.
    pub fn open(path: &Path) -> Result<Arc<TessLibrary>> {
        let key = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
        let mut libraries = LIBRARIES.get_or_init(Default::default).lock();
        if let Some(library) = libraries.get(&key) {
            debug!(path = %key.display(), "reusing loaded tesseract library");
            return Ok(library.clone());
        }

        let library = Arc::new(Self::load(&key)?);
        info!(
            path = %key.display(),
            version = %library.version(),
            "loaded tesseract library"
        );
        libraries.insert(key, library.clone());
        Ok(library)
    }

    /// Loads without touching the cache.
    pub fn load(path: &Path) -> Result<TessLibrary> {
        let load_error = |reason: String| OcrError::LibraryLoad {
            path: path.to_path_buf(),
            reason,
        };

        // Loading runs the library's initialisers; libtesseract has no
        // requirements on them beyond being loaded once per path.
        let library = unsafe { Library::new(path) }.map_err(|e| load_error(e.to_string()))?;

        unsafe fn symbol<T: Copy>(library: &Library, name: &[u8]) -> std::result::Result<T, String> {
            library.get::<T>(name).map(|symbol| *symbol).map_err(|e| {
                let name = String::from_utf8_lossy(&name[..name.len() - 1]);
                format!("missing symbol {name}: {e}")
            })
        }

        unsafe {
            Ok(Self {
                path: path.to_path_buf(),
                version: symbol(&library, b"TessVersion\0").map_err(load_error)?,
                create: symbol(&library, b"TessBaseAPICreate\0").map_err(load_error)?,
                delete: symbol(&library, b"TessBaseAPIDelete\0").map_err(load_error)?,
                init2: symbol(&library, b"TessBaseAPIInit2\0").map_err(load_error)?,
                set_image: symbol(&library, b"TessBaseAPISetImage\0").map_err(load_error)?,
                set_source_resolution: symbol(&library, b"TessBaseAPISetSourceResolution\0")
                    .map_err(load_error)?,
                set_page_seg_mode: symbol(&library, b"TessBaseAPISetPageSegMode\0")
                    .map_err(load_error)?,
                get_page_seg_mode: symbol(&library, b"TessBaseAPIGetPageSegMode\0")
                    .map_err(load_error)?,
                set_variable: symbol(&library, b"TessBaseAPISetVariable\0").map_err(load_error)?,
                recognize: symbol(&library, b"TessBaseAPIRecognize\0").map_err(load_error)?,
                get_utf8_text: symbol(&library, b"TessBaseAPIGetUTF8Text\0").map_err(load_error)?,
                delete_text: symbol(&library, b"TessDeleteText\0").map_err(load_error)?,
                mean_text_conf: symbol(&library, b"TessBaseAPIMeanTextConf\0")
                    .map_err(load_error)?,
                get_available_languages: symbol(
                    &library,
                    b"TessBaseAPIGetAvailableLanguagesAsVector\0",
                )
                .map_err(load_error)?,
                delete_text_array: symbol(&library, b"TessDeleteTextArray\0").map_err(load_error)?,
                _library: library,
            })
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TessApi for TessLibrary {
    fn version(&self) -> String {
        let version = unsafe { (self.version)() };
        if version.is_null() {
            return String::new();
        }
        // Static string inside the library; not freed.
        unsafe { CStr::from_ptr(version) }
            .to_string_lossy()
            .into_owned()
    }

    fn create(&self) -> Option<TessHandle> {
        NonNull::new(unsafe { (self.create)() })
    }

    unsafe fn delete(&self, handle: TessHandle) {
        (self.delete)(handle.as_ptr())
    }

    unsafe fn init(
        &self,
        handle: TessHandle,
        data_path: Option<&CStr>,
        language: &CStr,
        engine_mode: c_int,
    ) -> c_int {
        let data_path = data_path.map_or(ptr::null(), CStr::as_ptr);
        (self.init2)(handle.as_ptr(), data_path, language.as_ptr(), engine_mode)
    }

    unsafe fn set_image(&self, handle: TessHandle, image: &ImageView<'_>) {
        // ImageView keeps every dimension within c_int.
        (self.set_image)(
            handle.as_ptr(),
            image.data().as_ptr(),
            image.width() as c_int,
            image.height() as c_int,
            image.bytes_per_pixel() as c_int,
            image.bytes_per_line() as c_int,
        )
    }

    unsafe fn set_source_resolution(&self, handle: TessHandle, ppi: c_int) {
        (self.set_source_resolution)(handle.as_ptr(), ppi)
    }

    unsafe fn set_page_seg_mode(&self, handle: TessHandle, mode: c_int) {
        (self.set_page_seg_mode)(handle.as_ptr(), mode)
    }

    unsafe fn page_seg_mode(&self, handle: TessHandle) -> c_int {
        (self.get_page_seg_mode)(handle.as_ptr())
    }

    unsafe fn set_variable(&self, handle: TessHandle, name: &CStr, value: &CStr) -> bool {
        (self.set_variable)(handle.as_ptr(), name.as_ptr(), value.as_ptr()) != 0
    }

    unsafe fn recognize(&self, handle: TessHandle) -> c_int {
        (self.recognize)(handle.as_ptr(), ptr::null_mut())
    }

    unsafe fn utf8_text(&self, handle: TessHandle) -> *mut c_char {
        (self.get_utf8_text)(handle.as_ptr())
    }

    unsafe fn delete_text(&self, text: *mut c_char) {
        (self.delete_text)(text)
    }

    unsafe fn mean_text_conf(&self, handle: TessHandle) -> c_int {
        (self.mean_text_conf)(handle.as_ptr())
    }

    unsafe fn available_languages(&self, handle: TessHandle) -> *mut *mut c_char {
        (self.get_available_languages)(handle.as_ptr())
    }

    unsafe fn delete_text_array(&self, array: *mut *mut c_char) {
        (self.delete_text_array)(array)
    }
}
