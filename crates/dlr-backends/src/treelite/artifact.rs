//! Treelite artifact discovery.

use dlr_kernel::fs::{file_name, file_name_ends_with, list_files_in_directories};
use dlr_kernel::{DlrError, DlrResult};
use std::path::{Path, PathBuf};
use tracing::warn;

/// Dynamic library suffix on this platform.
#[cfg(target_os = "windows")]
pub const LIBEXT: &str = ".dll";
#[cfg(target_os = "macos")]
pub const LIBEXT: &str = ".dylib";
#[cfg(not(any(target_os = "windows", target_os = "macos")))]
pub const LIBEXT: &str = ".so";

/// The runtime's own library, never a model.
#[cfg(target_os = "windows")]
pub const LIBDLR: &str = "dlr.dll";
#[cfg(target_os = "macos")]
pub const LIBDLR: &str = "libdlr.dylib";
#[cfg(not(any(target_os = "windows", target_os = "macos")))]
pub const LIBDLR: &str = "libdlr.so";

/// Optional version manifest shipped with compiled models.
pub const VERSION_JSON: &str = "version.json";

/// Files that make up a Treelite model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeliteArtifact {
    /// Compiled tree-ensemble library.
    pub model_lib: PathBuf,
    /// `version.json`, recognized but not consumed.
    pub ver_json: Option<PathBuf>,
}

impl TreeliteArtifact {
    /// Scan `dirs` for the model library.
    ///
    /// Several candidate libraries resolve to the last one in scan order.
    pub fn locate<P: AsRef<Path>>(dirs: &[P]) -> DlrResult<Self> {
        let mut model_lib: Option<PathBuf> = None;
        let mut ver_json = None;

        for path in list_files_in_directories(dirs)? {
            let name = file_name(&path);
            if name != LIBDLR && file_name_ends_with(&path, LIBEXT) {
                if let Some(previous) = &model_lib {
                    warn!(
                        previous = %previous.display(),
                        chosen = %path.display(),
                        "multiple Treelite model libraries found"
                    );
                }
                model_lib = Some(path);
            } else if name == VERSION_JSON {
                ver_json = Some(path);
            }
        }

        let model_lib = model_lib.ok_or_else(|| DlrError::ArtifactNotFound {
            what: "valid Treelite model files".to_string(),
            dirs: dirs.iter().map(|d| d.as_ref().to_path_buf()).collect(),
        })?;

        Ok(Self {
            model_lib,
            ver_json,
        })
    }
}
