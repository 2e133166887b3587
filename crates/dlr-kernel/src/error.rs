//! Error types shared by every backend adapter.
//!
//! Two families of failure exist:
//!
//! - **Fatal**: a misconfigured deployment or a programming error (missing or
//!   ambiguous artifact, unresolved symbol, shape mismatch, unsupported call).
//!   Inference correctness cannot be guaranteed past these.
//! - **Recoverable**: a backend library reported a failure through its own
//!   error contract. The message is the backend's last-error string.
//!
//! Construction paths return [`LoadResult`], an [`error_stack::Report`] that
//! carries the stage and directory being processed. Per-call operations
//! return the plain [`DlrResult`]. Callers decide whether to terminate.

use error_stack::Report;
use std::path::PathBuf;
use thiserror::Error;

use crate::context::Backend;

/// Plain result alias for per-call model operations.
pub type DlrResult<T> = Result<T, DlrError>;

/// Error-stack–backed result alias for model construction.
///
/// Equivalent to `Result<T, error_stack::Report<DlrError>>`.
pub type LoadResult<T> = ::std::result::Result<T, Report<DlrError>>;

/// Extension trait to convert [`DlrResult<T>`] into [`LoadResult<T>`].
pub trait IntoLoadReport<T> {
    /// Wrap the error in an `error_stack::Report`.
    fn into_report(self) -> LoadResult<T>;
}

impl<T> IntoLoadReport<T> for DlrResult<T> {
    #[inline]
    fn into_report(self) -> LoadResult<T> {
        self.map_err(Report::new)
    }
}

/// How a caller should treat an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Configuration or contract violation; continuing is unsafe.
    Fatal,
    /// The backend rejected a call through its own error contract.
    Recoverable,
}

/// Errors raised by the DLR backend adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum DlrError {
    /// No file in the scanned directories satisfies the artifact convention.
    #[error("No {what} found under folder(s): {}", display_dirs(.dirs))]
    ArtifactNotFound { what: String, dirs: Vec<PathBuf> },

    /// More than one file claims the same artifact role.
    #[error("Multiple {what} files under the folder: {}", .dir.display())]
    AmbiguousArtifact { what: String, dir: PathBuf },

    /// The shared object could not be opened.
    #[error("Model file open error: {0}")]
    LibraryLoad(String),

    /// A required entry point is missing from the shared object.
    #[error("dlsym error for {symbol}: {reason}")]
    SymbolNotFound { symbol: String, reason: String },

    /// A backend entry point returned a nonzero status code.
    #[error("{call} failed: {code}")]
    BackendStatus { call: &'static str, code: i32 },

    /// The named input does not exist.
    #[error("Input Tensor not found, name: {0}")]
    InputNotFound(String),

    /// The caller's rank disagrees with the model's declared rank.
    #[error("Incorrect input dim: expected {expected}, got {actual}")]
    DimMismatch { expected: usize, actual: usize },

    /// The caller's shape disagrees with the model's declared shape.
    #[error("Incorrect input shape at dimension {axis}: {detail}")]
    ShapeMismatch { axis: usize, detail: String },

    /// An input or output index is beyond the declared count.
    #[error("{kind} index is out of range: {index} >= {count}")]
    IndexOutOfRange {
        kind: &'static str,
        index: usize,
        count: usize,
    },

    /// The caller's buffer cannot hold the tensor.
    #[error("Buffer too small: need {needed} bytes, got {actual}")]
    BufferTooSmall { needed: usize, actual: usize },

    /// An operation that needs an input ran before `set_input`.
    #[error("Input has not been set")]
    InputNotSet,

    /// Output was requested before `run` produced it.
    #[error("Output is not available; call run() after set_input()")]
    OutputNotReady,

    /// A post-condition the backend must satisfy does not hold.
    #[error("Precondition violated: {0}")]
    Precondition(String),

    /// The backend offers no such control.
    #[error("{op} is not supported by {backend} backend")]
    Unsupported { op: &'static str, backend: Backend },

    /// A Treelite C API call failed; carries `TreeliteGetLastError()`.
    #[error("{call} failed: {message}")]
    Treelite { call: &'static str, message: String },

    /// Runtime configuration could not be loaded.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A low-level I/O error while scanning artifact directories.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

fn display_dirs(dirs: &[PathBuf]) -> String {
    dirs.iter()
        .map(|d| d.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

impl DlrError {
    /// Create an unsupported-operation error.
    pub fn unsupported(op: &'static str, backend: Backend) -> Self {
        Self::Unsupported { op, backend }
    }

    /// Create a Treelite backend error.
    pub fn treelite(call: &'static str, message: impl Into<String>) -> Self {
        Self::Treelite {
            call,
            message: message.into(),
        }
    }

    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Classify the error.
    pub fn severity(&self) -> Severity {
        match self {
            Self::Treelite { .. } => Severity::Recoverable,
            _ => Severity::Fatal,
        }
    }

    /// Shorthand for `severity() == Severity::Fatal`.
    pub fn is_fatal(&self) -> bool {
        self.severity() == Severity::Fatal
    }
}
