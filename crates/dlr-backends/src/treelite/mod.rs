//! Treelite tree-ensemble backend.
//!
//! A Treelite model is a compiled shared library next to an optional
//! `version.json`. Predictions go through the Treelite runtime C API, which
//! is opened at runtime from [`RuntimeConfig::treelite_runtime_library`].
//!
//! [`RuntimeConfig::treelite_runtime_library`]: dlr_kernel::RuntimeConfig::treelite_runtime_library

mod artifact;
mod csr;
mod ffi;
mod model;
mod runtime;

pub use artifact::{LIBDLR, LIBEXT, TreeliteArtifact, VERSION_JSON};
pub use csr::CsrMatrix;
pub use ffi::DynamicTreeliteRuntime;
pub use model::{INPUT_NAME, TENSOR_TYPE, TreeliteModel};
pub use runtime::{CsrBatchHandle, PredictorEntry, PredictorHandle, TreeliteRuntime};
