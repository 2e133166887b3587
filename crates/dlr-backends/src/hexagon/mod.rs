//! Hexagon DSP backend.
//!
//! A Hexagon model directory holds exactly one `*_hexagon_model.so` and,
//! optionally, `libhexagon_nn_skel.so`. The model shared object exports six
//! C entry points which are resolved at runtime.

mod artifact;
mod backend;
mod ffi;
mod model;

pub use artifact::{ADSP_LIBRARY_PATH, HexagonArtifact, MODEL_SUFFIX, SKELETON_FILE};
pub use backend::{BackendBuffer, HexagonBackend, HexagonSession, InitFailure, TensorSpec};
pub use ffi::DynamicHexagonBackend;
pub use model::{HexagonModel, LOG_BUFFER_SIZE};
