//! Hexagon artifact discovery.

use dlr_kernel::fs::{file_name, file_name_ends_with, list_files_in_directory};
use dlr_kernel::{DlrError, DlrResult};
use std::path::{Path, PathBuf};
use tracing::info;

/// Suffix of the compiled Hexagon model shared object.
pub const MODEL_SUFFIX: &str = "_hexagon_model.so";

/// Exact file name of the Hexagon NN skeleton library.
pub const SKELETON_FILE: &str = "libhexagon_nn_skel.so";

/// Search path consulted by the DSP loader for the skeleton library.
pub const ADSP_LIBRARY_PATH: &str = "ADSP_LIBRARY_PATH";

/// Files that make up a Hexagon model directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HexagonArtifact {
    /// Directory the artifact was found in.
    pub dir: PathBuf,
    /// The single `*_hexagon_model.so` file.
    pub model_file: PathBuf,
    /// `libhexagon_nn_skel.so`, when shipped next to the model.
    pub skeleton_file: Option<PathBuf>,
}

impl HexagonArtifact {
    /// Scan `dir` for exactly one model file and an optional skeleton.
    pub fn locate(dir: impl AsRef<Path>) -> DlrResult<Self> {
        let dir = dir.as_ref();
        let mut model_file = None;
        let mut skeleton_file = None;

        for path in list_files_in_directory(dir)? {
            if file_name_ends_with(&path, MODEL_SUFFIX) {
                if model_file.is_some() {
                    return Err(DlrError::AmbiguousArtifact {
                        what: MODEL_SUFFIX.to_string(),
                        dir: dir.to_path_buf(),
                    });
                }
                model_file = Some(path);
            } else if file_name(&path) == SKELETON_FILE {
                skeleton_file = Some(path);
            }
        }

        let model_file = model_file.ok_or_else(|| DlrError::ArtifactNotFound {
            what: format!("{} file", MODEL_SUFFIX),
            dirs: vec![dir.to_path_buf()],
        })?;

        Ok(Self {
            dir: dir.to_path_buf(),
            model_file,
            skeleton_file,
        })
    }

    /// Export [`ADSP_LIBRARY_PATH`] pointing at the artifact directory when a
    /// skeleton library ships with the model.
    ///
    /// The variable is process-wide: the last adapter constructed wins, and two
    /// adapters built concurrently from different directories race. The DSP
    /// loader reads it during session init.
    pub fn export_skeleton_search_path(&self) -> DlrResult<Option<PathBuf>> {
        if self.skeleton_file.is_none() {
            info!(
                "{} file is not found. User needs to set {} to point to {} file folder",
                SKELETON_FILE, ADSP_LIBRARY_PATH, SKELETON_FILE
            );
            return Ok(None);
        }

        let abs = std::fs::canonicalize(&self.dir)?;
        info!("{}={}", ADSP_LIBRARY_PATH, abs.display());
        // SAFETY: mutates process environment; adapters are constructed from a
        // single thread and nothing in this crate reads the variable back.
        unsafe { std::env::set_var(ADSP_LIBRARY_PATH, &abs) };
        Ok(Some(abs))
    }
}
