//! # dlr-kernel
//!
//! Shared building blocks for the DLR backend adapters:
//!
//! - [`Model`]: the uniform load / set input / run / get output contract
//!   every backend adapter implements
//! - [`DeviceContext`] and [`Backend`]: where a model runs and who runs it
//! - [`DlrError`]: the error taxonomy, split into fatal configuration errors
//!   and recoverable backend errors
//! - [`RuntimeConfig`]: runtime knobs read from files and the environment
//! - [`fs`]: artifact directory scanning helpers
//!
//! Adapters live in the `dlr-backends` crate.

pub mod config;
pub mod context;
pub mod error;
pub mod fs;
pub mod model;

pub use config::RuntimeConfig;
pub use context::{Backend, DeviceContext, DeviceType};
pub use error::{DlrError, DlrResult, IntoLoadReport, LoadResult, Severity};
pub use model::Model;
