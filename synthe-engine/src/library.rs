//! Shared-library engine using libloading.
//!
//! The library must export a synthesize/release pair with the AquesTalk ABI:
//!
//! ```c
//! unsigned char *AquesTalk_Synthe_Utf8(const char *koe, int speed, int *size);
//! void AquesTalk_FreeWave(unsigned char *wav);
//! ```
//!
//! On success the returned buffer holds `*size` bytes and belongs to the
//! library until handed back through the release symbol. On failure the
//! return is null and `*size` holds the library's error code.

use std::ffi::{c_char, c_int, c_uchar, CString};
use std::path::{Path, PathBuf};
use std::ptr::NonNull;

use libloading::Library;
use synthe_core::config::LibrarySettings;
use synthe_core::{EngineError, SynthesisEngine};
use tracing::{debug, info, warn};

/// `unsigned char *synthesize(const char *text, int speed, int *size)`
pub type SynthesizeFn = unsafe extern "C" fn(*const c_char, c_int, *mut c_int) -> *mut c_uchar;

/// `void release(unsigned char *wav)`
pub type ReleaseFn = unsafe extern "C" fn(*mut c_uchar);

/// Waveform memory owned by the loaded library.
pub struct ForeignWave {
    ptr: NonNull<c_uchar>,
    len: usize,
}

impl AsRef<[u8]> for ForeignWave {
    fn as_ref(&self) -> &[u8] {
        // SAFETY: the library returned `len` readable bytes at `ptr`, and the
        // buffer stays valid until passed to the release symbol, which takes
        // the `ForeignWave` by value.
        unsafe { std::slice::from_raw_parts(self.ptr.as_ptr(), self.len) }
    }
}

/// A synthesis library loaded from disk.
pub struct LibraryEngine {
    path: PathBuf,
    synthesize_fn: SynthesizeFn,
    release_fn: ReleaseFn,
    /// Library handle (kept alive so the function pointers stay valid)
    _library: Library,
}

impl LibraryEngine {
    /// Load `path` and resolve the symbols named in `settings`.
    ///
    /// # Safety
    ///
    /// This runs the library's initialisers and later calls into it through
    /// the configured symbols, trusting them to match the ABI above. Only
    /// load libraries from trusted sources.
    pub fn load(path: &Path, settings: &LibrarySettings) -> Result<Self, EngineError> {
        debug!(target: "engine", path = %path.display(), "Loading synthesis library");

        let library = unsafe {
            Library::new(path).map_err(|e| {
                EngineError::Library(format!("failed to load {}: {}", path.display(), e))
            })?
        };

        let synthesize_fn: SynthesizeFn = unsafe {
            *library
                .get::<SynthesizeFn>(settings.synthesize_symbol.as_bytes())
                .map_err(|e| {
                    EngineError::Library(format!(
                        "missing symbol {}: {}",
                        settings.synthesize_symbol, e
                    ))
                })?
        };

        let release_fn: ReleaseFn = unsafe {
            *library
                .get::<ReleaseFn>(settings.release_symbol.as_bytes())
                .map_err(|e| {
                    EngineError::Library(format!(
                        "missing symbol {}: {}",
                        settings.release_symbol, e
                    ))
                })?
        };

        info!(
            target: "engine",
            path = %path.display(),
            synthesize = %settings.synthesize_symbol,
            release = %settings.release_symbol,
            "Loaded synthesis library"
        );

        Ok(Self {
            path: path.to_path_buf(),
            synthesize_fn,
            release_fn,
            _library: library,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SynthesisEngine for LibraryEngine {
    type Buffer = ForeignWave;

    fn name(&self) -> String {
        format!("library:{}", self.path.display())
    }

    fn synthesize(&self, text: &[u8], speed: i32) -> Result<ForeignWave, EngineError> {
        let koe = CString::new(text).map_err(|e| {
            EngineError::InvalidText(format!("interior NUL at byte {}", e.nul_position()))
        })?;

        let mut size: c_int = 0;
        // SAFETY: `koe` is NUL-terminated and outlives the call; `size` is a
        // valid out-pointer.
        let raw = unsafe { (self.synthesize_fn)(koe.as_ptr(), speed as c_int, &mut size) };

        let ptr = match NonNull::new(raw) {
            Some(ptr) => ptr,
            None => return Err(EngineError::Synthesis { code: size }),
        };

        match usize::try_from(size) {
            Ok(len) => Ok(ForeignWave { ptr, len }),
            Err(_) => {
                warn!(target: "engine", size, "Library returned a buffer with negative size");
                // SAFETY: non-null buffer from the synthesize symbol, released once.
                unsafe { (self.release_fn)(ptr.as_ptr()) };
                Err(EngineError::Library(format!(
                    "negative waveform size {}",
                    size
                )))
            }
        }
    }

    fn release(&self, buffer: ForeignWave) {
        // SAFETY: `buffer` came from this library's synthesize symbol and is
        // consumed here, so it cannot be released twice.
        unsafe { (self.release_fn)(buffer.ptr.as_ptr()) };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_missing_library() {
        let result = LibraryEngine::load(
            Path::new("/nonexistent/libAquesTalk.so"),
            &LibrarySettings::default(),
        );
        match result {
            Err(EngineError::Library(msg)) => assert!(msg.contains("failed to load")),
            Err(other) => panic!("unexpected error: {other}"),
            Ok(_) => panic!("loading a missing library should fail"),
        }
    }

    #[cfg(all(target_os = "linux", target_env = "gnu"))]
    #[test]
    fn test_load_library_without_symbols() {
        let result = LibraryEngine::load(Path::new("libc.so.6"), &LibrarySettings::default());
        match result {
            Err(EngineError::Library(msg)) => {
                assert!(msg.contains("missing symbol AquesTalk_Synthe_Utf8"))
            }
            Err(other) => panic!("unexpected error: {other}"),
            Ok(_) => panic!("libc does not export the synthesis symbols"),
        }
    }
}
