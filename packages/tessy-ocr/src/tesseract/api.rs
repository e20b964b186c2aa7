use std::ffi::CStr;
use std::os::raw::{c_char, c_int};
use std::ptr::NonNull;

use crate::image::ImageView;

/// Opaque `TessBaseAPI` as seen from Rust.
#[repr(C)]
pub struct TessBaseApi {
    _private: [u8; 0],
}

pub type TessHandle = NonNull<TessBaseApi>;

/// The subset of the Tesseract C API the engine drives.
///
/// [`TessLibrary`](super::TessLibrary) implements it over the loaded shared
/// library. Every `unsafe` method requires a handle returned by
/// [`create`](TessApi::create) on the same table that has not yet been
/// passed to [`delete`](TessApi::delete).
pub trait TessApi: Send + Sync {
    fn version(&self) -> String;

    fn create(&self) -> Option<TessHandle>;

    unsafe fn delete(&self, handle: TessHandle);

    /// Returns 0 on success.
    unsafe fn init(
        &self,
        handle: TessHandle,
        data_path: Option<&CStr>,
        language: &CStr,
        engine_mode: c_int,
    ) -> c_int;

    unsafe fn set_image(&self, handle: TessHandle, image: &ImageView<'_>);

    unsafe fn set_source_resolution(&self, handle: TessHandle, ppi: c_int);

    unsafe fn set_page_seg_mode(&self, handle: TessHandle, mode: c_int);

    unsafe fn page_seg_mode(&self, handle: TessHandle) -> c_int;

    /// `false` when the variable name is unknown.
    unsafe fn set_variable(&self, handle: TessHandle, name: &CStr, value: &CStr) -> bool;

    /// Returns 0 on success. Runs headless, with no progress monitor.
    unsafe fn recognize(&self, handle: TessHandle) -> c_int;

    /// The caller owns the returned buffer and must hand it to
    /// [`delete_text`](TessApi::delete_text).
    unsafe fn utf8_text(&self, handle: TessHandle) -> *mut c_char;

    unsafe fn delete_text(&self, text: *mut c_char);

    unsafe fn mean_text_conf(&self, handle: TessHandle) -> c_int;

    /// Null-terminated array owned by the caller, freed with
    /// [`delete_text_array`](TessApi::delete_text_array).
    unsafe fn available_languages(&self, handle: TessHandle) -> *mut *mut c_char;

    unsafe fn delete_text_array(&self, array: *mut *mut c_char);
}

/// A text buffer allocated by the native library, freed on drop.
pub(crate) struct NativeText<'a> {
    api: &'a dyn TessApi,
    ptr: NonNull<c_char>,
}

impl<'a> NativeText<'a> {
    /// # Safety
    /// `ptr` must be null or a buffer returned by `api.utf8_text` that
    /// nothing else will free.
    pub(crate) unsafe fn from_raw(api: &'a dyn TessApi, ptr: *mut c_char) -> Option<Self> {
        NonNull::new(ptr).map(|ptr| Self { api, ptr })
    }

    pub(crate) fn as_bytes(&self) -> &[u8] {
        unsafe { CStr::from_ptr(self.ptr.as_ptr()) }.to_bytes()
    }

    pub(crate) fn to_string_lossy(&self) -> String {
        String::from_utf8_lossy(self.as_bytes()).into_owned()
    }
}

impl Drop for NativeText<'_> {
    fn drop(&mut self) {
        unsafe { self.api.delete_text(self.ptr.as_ptr()) }
    }
}
