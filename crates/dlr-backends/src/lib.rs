//! # dlr-backends
//!
//! Backend adapters that present vendor inference engines through the
//! common [`Model`] contract:
//!
//! | Backend    | Artifact                                       | Binding |
//! |------------|------------------------------------------------|---------|
//! | Hexagon    | one `*_hexagon_model.so` (+ skeleton library)  | six C entry points resolved from the model |
//! | Treelite   | one compiled model library (+ `version.json`)  | Treelite runtime C API |
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use dlr_backends::load_model;
//! use dlr_kernel::{DeviceContext, Model, RuntimeConfig};
//!
//! let config = RuntimeConfig::from_env().unwrap();
//! let mut model = load_model(&["/models/xgboost"], DeviceContext::cpu(), &config).unwrap();
//! model.set_input_f32("data", &[1, 3], &[0.5, f32::NAN, 1.5]).unwrap();
//! model.run().unwrap();
//! println!("{:?}", model.get_output_f32(0).unwrap());
//! ```

mod dylib;
pub mod hexagon;
pub mod treelite;

pub use hexagon::HexagonModel;
pub use treelite::TreeliteModel;

use dlr_kernel::fs::{file_name, file_name_ends_with, list_files_in_directory};
use dlr_kernel::{
    Backend, DeviceContext, DlrError, DlrResult, IntoLoadReport, LoadResult, Model, RuntimeConfig,
};
use error_stack::ResultExt;
use std::path::{Path, PathBuf};
use tracing::info;

/// Decide which backend serves the artifacts in `dirs`.
///
/// A `*_hexagon_model.so` selects Hexagon; otherwise a non-reserved dynamic
/// library selects Treelite.
pub fn detect_backend<P: AsRef<Path>>(dirs: &[P]) -> DlrResult<Backend> {
    if hexagon_model_dir(dirs)?.is_some() {
        return Ok(Backend::Hexagon);
    }
    for dir in dirs {
        let found = list_files_in_directory(dir)?.iter().any(|p| {
            file_name(p) != treelite::LIBDLR && file_name_ends_with(p, treelite::LIBEXT)
        });
        if found {
            return Ok(Backend::Treelite);
        }
    }
    Err(DlrError::ArtifactNotFound {
        what: "supported model artifact".to_string(),
        dirs: dirs.iter().map(|d| d.as_ref().to_path_buf()).collect(),
    })
}

/// First directory holding a Hexagon model file.
fn hexagon_model_dir<P: AsRef<Path>>(dirs: &[P]) -> DlrResult<Option<PathBuf>> {
    for dir in dirs {
        let found = list_files_in_directory(dir)?
            .iter()
            .any(|p| file_name_ends_with(p, hexagon::MODEL_SUFFIX));
        if found {
            return Ok(Some(dir.as_ref().to_path_buf()));
        }
    }
    Ok(None)
}

/// Detect the backend for `dirs` and construct the matching adapter.
///
/// `OMP_NUM_THREADS` is consulted at construction when `config` sets no
/// Treelite worker thread count.
pub fn load_model<P: AsRef<Path>>(
    dirs: &[P],
    ctx: DeviceContext,
    config: &RuntimeConfig,
) -> LoadResult<Box<dyn Model>> {
    let backend = detect_backend(dirs)
        .into_report()
        .attach("detecting model backend")?;
    info!(%backend, device = %ctx, "loading model");

    match backend {
        Backend::Hexagon => {
            let dir = hexagon_model_dir(dirs).into_report()?.ok_or_else(|| {
                error_stack::Report::new(DlrError::ArtifactNotFound {
                    what: format!("{} file", hexagon::MODEL_SUFFIX),
                    dirs: dirs.iter().map(|d| d.as_ref().to_path_buf()).collect(),
                })
            })?;
            let model = HexagonModel::load(dir, ctx, config.hexagon_debug_level)?;
            Ok(Box::new(model))
        }
        Backend::Treelite => {
            let model = TreeliteModel::load(dirs, ctx, config)?;
            Ok(Box::new(model))
        }
    }
}
