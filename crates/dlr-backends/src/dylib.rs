//! Shared-object loading helpers used by both backends.

use libloading::{Library, Symbol};
use std::path::Path;
use tracing::debug;

use dlr_kernel::{DlrError, DlrResult};

/// Open `path` with immediate binding and local symbol visibility.
#[cfg(unix)]
pub(crate) fn open_library(path: &Path) -> DlrResult<Library> {
    use libloading::os::unix::{RTLD_LOCAL, RTLD_NOW};
    unsafe { libloading::os::unix::Library::open(Some(path), RTLD_NOW | RTLD_LOCAL) }
        .map(Library::from)
        .map_err(|e| DlrError::LibraryLoad(e.to_string()))
}

#[cfg(not(unix))]
pub(crate) fn open_library(path: &Path) -> DlrResult<Library> {
    unsafe { Library::new(path) }.map_err(|e| DlrError::LibraryLoad(e.to_string()))
}

/// Resolve `name` and copy the function pointer out of the symbol.
///
/// # Safety
///
/// `T` must match the exported function's signature, and the pointer must
/// not outlive `library`.
pub(crate) unsafe fn find_symbol<T: Copy>(library: &Library, name: &str) -> DlrResult<T> {
    debug!("Loading {}", name);
    let symbol: Symbol<T> = unsafe { library.get(name.as_bytes()) }.map_err(|e| {
        DlrError::SymbolNotFound {
            symbol: name.to_string(),
            reason: e.to_string(),
        }
    })?;
    Ok(*symbol)
}
