//! Process-wide native library state.
//!
//! [`MagickNative`] owns the resolved function table, the configuration and
//! the exception bridge. It is installed once per process, either by an
//! explicit [`MagickNative::initialize`] or by the first wrapper that needs
//! it, and never changes afterwards.

use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use libloading::Library;
use magick_ffi_common::RawException;

use crate::config::InteropConfig;
use crate::error::{Error, Result};
use crate::exception::{ExceptionBridge, ExceptionSlot, WarningSink};
use crate::native::NativeApi;
use crate::quantum::{QUANTUM_DEPTH, QUANTUM_IS_HDRI};

static NATIVE: OnceLock<MagickNative> = OnceLock::new();

const LIBRARY_NAME: &str = "magick_native";

pub struct MagickNative {
    api: NativeApi,
    config: InteropConfig,
    bridge: ExceptionBridge,
    version: String,
    // Keeps the symbols in `api` valid; None when bundled.
    _library: Option<Library>,
}

impl MagickNative {
    /// Install the native library with `config`.
    ///
    /// Fails with [`Error::AlreadyInitialized`] when the layer is already
    /// set up, including implicitly by an earlier wrapper call.
    pub fn initialize(config: InteropConfig) -> Result<&'static MagickNative> {
        if NATIVE.get().is_some() {
            return Err(Error::AlreadyInitialized);
        }
        let native = Self::load(config)?;
        NATIVE.set(native).map_err(|_| Error::AlreadyInitialized)?;
        Self::installed()
    }

    /// The installed library, loading it with the default configuration on
    /// first use.
    pub fn get() -> Result<&'static MagickNative> {
        if let Some(native) = NATIVE.get() {
            return Ok(native);
        }
        let native = Self::load(InteropConfig::default())?;
        // A concurrent first use may have won; either instance is equivalent.
        let _ = NATIVE.set(native);
        Self::installed()
    }

    pub fn is_initialized() -> bool {
        NATIVE.get().is_some()
    }

    fn installed() -> Result<&'static MagickNative> {
        NATIVE.get().ok_or(Error::Allocation("native library state"))
    }

    fn load(config: InteropConfig) -> Result<Self> {
        config.validate()?;

        let (api, library) = if config.library_path.is_some() || !config.library_search_paths.is_empty()
        {
            load_dynamic(&config)?
        } else {
            load_default(&config)?
        };

        verify_quantum(
            unsafe { (api.magick_native_quantum_depth)() },
            unsafe { (api.magick_native_quantum_is_hdri)() },
        )?;

        let version = unsafe { read_static_str((api.magick_native_version)()) };
        if let Some(directory) = &config.cache_directory {
            let directory = path_to_cstring(directory)?;
            unsafe { (api.magick_native_set_cache_directory)(directory.as_ptr()) };
        }

        tracing::debug!(
            version = %version,
            bundled = library.is_none(),
            quantum_depth = QUANTUM_DEPTH,
            hdri = QUANTUM_IS_HDRI,
            "native library loaded"
        );

        Ok(Self {
            api,
            bridge: ExceptionBridge::new(config.max_exception_depth),
            config,
            version,
            _library: library,
        })
    }

    pub fn api(&'static self) -> &'static NativeApi {
        &self.api
    }

    pub fn config(&self) -> &InteropConfig {
        &self.config
    }

    pub fn bridge(&self) -> &ExceptionBridge {
        &self.bridge
    }

    /// Version string reported by the native library.
    pub fn version(&self) -> &str {
        &self.version
    }

    /// New warning sink following the configured policy.
    pub fn warning_sink(&self) -> WarningSink {
        WarningSink::new(self.config.warning_policy)
    }

    /// Run one fallible native call and route its exception slot.
    ///
    /// `f` receives the trailing `exception` argument. Its value is dropped
    /// before an error is returned, so an owned handle it produced is
    /// released before the caller sees the failure.
    pub(crate) fn call<R>(
        &'static self,
        warnings: &WarningSink,
        f: impl FnOnce(&'static NativeApi, *mut *mut RawException) -> R,
    ) -> Result<R> {
        let mut slot = ExceptionSlot::new(&self.api);
        let value = f(&self.api, slot.as_out());
        match warnings.handle(self.bridge.check(slot)) {
            Ok(()) => Ok(value),
            Err(e) => {
                drop(value);
                Err(e)
            }
        }
    }
}

impl std::fmt::Debug for MagickNative {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MagickNative")
            .field("version", &self.version)
            .field("bundled", &self._library.is_none())
            .field("config", &self.config)
            .finish()
    }
}

/// Reject a native library built with another quantum.
pub(crate) fn verify_quantum(depth: u32, hdri: bool) -> Result<()> {
    if depth != QUANTUM_DEPTH || hdri != QUANTUM_IS_HDRI {
        return Err(Error::QuantumMismatch {
            expected_depth: QUANTUM_DEPTH,
            expected_hdri: QUANTUM_IS_HDRI,
            actual_depth: depth,
            actual_hdri: hdri,
        });
    }
    Ok(())
}

#[cfg(feature = "bundled")]
fn load_default(_config: &InteropConfig) -> Result<(NativeApi, Option<Library>)> {
    Ok((NativeApi::bundled(), None))
}

#[cfg(not(feature = "bundled"))]
fn load_default(config: &InteropConfig) -> Result<(NativeApi, Option<Library>)> {
    load_dynamic(config)
}

/// Candidate library files, in search order.
pub(crate) fn library_candidates(config: &InteropConfig) -> Vec<PathBuf> {
    if let Some(path) = &config.library_path {
        return vec![path.clone()];
    }
    let file_name = libloading::library_filename(LIBRARY_NAME);
    let mut candidates: Vec<PathBuf> = config
        .search_directories()
        .into_iter()
        .map(|directory| directory.join(&file_name))
        .collect();
    candidates.push(PathBuf::from(file_name));
    candidates
}

fn load_dynamic(config: &InteropConfig) -> Result<(NativeApi, Option<Library>)> {
    let mut last_error = None;
    for path in library_candidates(config) {
        match open(&path) {
            Ok(library) => {
                let api = unsafe { NativeApi::resolve(&library) }?;
                return Ok((api, Some(library)));
            }
            Err(e) => {
                tracing::debug!(path = %path.display(), error = %e, "native library not loaded");
                last_error = Some(e);
            }
        }
    }
    Err(last_error.unwrap_or_else(|| Error::LibraryLoad {
        path: PathBuf::from(LIBRARY_NAME),
        message: "no candidate paths".to_string(),
    }))
}

fn open(path: &Path) -> Result<Library> {
    unsafe {
        Library::new(path).map_err(|e| Error::LibraryLoad {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }
}

fn path_to_cstring(path: &Path) -> Result<CString> {
    let text = path
        .to_str()
        .ok_or_else(|| Error::Config(format!("cache directory {path:?} is not valid UTF-8")))?;
    CString::new(text)
        .map_err(|_| Error::Config(format!("cache directory {path:?} contains a NUL byte")))
}

unsafe fn read_static_str(ptr: *const c_char) -> String {
    if ptr.is_null() {
        return String::new();
    }
    unsafe { CStr::from_ptr(ptr) }.to_string_lossy().into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verify_quantum() {
        assert!(verify_quantum(QUANTUM_DEPTH, QUANTUM_IS_HDRI).is_ok());
        let err = verify_quantum(QUANTUM_DEPTH * 2, QUANTUM_IS_HDRI).unwrap_err();
        assert!(matches!(err, Error::QuantumMismatch { .. }));
        assert!(verify_quantum(QUANTUM_DEPTH, !QUANTUM_IS_HDRI).is_err());
    }

    #[test]
    fn test_explicit_path_is_only_candidate() {
        let config = InteropConfig {
            library_path: Some(PathBuf::from("/opt/magick/libcustom.so")),
            library_search_paths: vec![PathBuf::from("/ignored")],
            ..InteropConfig::default()
        };
        assert_eq!(
            library_candidates(&config),
            vec![PathBuf::from("/opt/magick/libcustom.so")]
        );
    }

    #[test]
    fn test_search_paths_then_bare_name() {
        let config = InteropConfig {
            library_search_paths: vec![PathBuf::from("/opt/a"), PathBuf::from("/opt/b")],
            ..InteropConfig::default()
        };
        let candidates = library_candidates(&config);
        let file_name = libloading::library_filename(LIBRARY_NAME);
        assert_eq!(candidates[0], Path::new("/opt/a").join(&file_name));
        assert_eq!(candidates[1], Path::new("/opt/b").join(&file_name));
        assert_eq!(candidates.last(), Some(&PathBuf::from(file_name)));
    }

    #[test]
    fn test_missing_library_is_load_error() {
        let dir = tempfile::tempdir().unwrap();
        let config = InteropConfig {
            library_path: Some(dir.path().join("missing-library.so")),
            ..InteropConfig::default()
        };
        let err = MagickNative::load(config).unwrap_err();
        assert!(matches!(err, Error::LibraryLoad { .. }));
    }

    #[test]
    fn test_invalid_config_rejected_before_loading() {
        let config = InteropConfig {
            max_exception_depth: 0,
            ..InteropConfig::default()
        };
        assert!(matches!(MagickNative::load(config), Err(Error::Config(_))));
    }

    #[cfg(feature = "bundled")]
    #[test]
    fn test_get_installs_default() {
        let native = MagickNative::get().unwrap();
        assert!(MagickNative::is_initialized());
        assert_eq!(native.version(), env!("CARGO_PKG_VERSION"));
        assert!(std::ptr::eq(native, MagickNative::get().unwrap()));
        assert!(matches!(
            MagickNative::initialize(InteropConfig::default()),
            Err(Error::AlreadyInitialized)
        ));
    }
}
