//! The Hexagon backend capability set.
//!
//! A compiled Hexagon model exports exactly six entry points. They are
//! modelled here as the [`HexagonBackend`] trait so the adapter can be driven
//! by the dynamically loaded shared object or by any other implementation.

use dlr_kernel::{DlrError, DlrResult};

/// Discovered metadata for one input or output tensor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TensorSpec {
    pub name: String,
    /// Rank; equals `shape.len()`.
    pub dim: usize,
    pub shape: Vec<i64>,
    /// Serialized byte size.
    pub bytes: usize,
    /// Element count.
    pub size: usize,
}

/// Non-owning view of a buffer allocated by the backend.
///
/// Valid only between session init and close. The adapter writes into and
/// reads from it but never frees it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackendBuffer {
    ptr: *mut u8,
}

impl BackendBuffer {
    /// Wrap a pointer handed out by the backend.
    pub fn from_raw(ptr: *mut u8) -> Self {
        Self { ptr }
    }

    pub fn as_ptr(&self) -> *mut u8 {
        self.ptr
    }

    pub fn is_null(&self) -> bool {
        self.ptr.is_null()
    }

    /// Copy `src` to the start of the buffer.
    ///
    /// # Safety
    ///
    /// The session owning the buffer must be live and the buffer must hold at
    /// least `src.len()` bytes.
    pub unsafe fn write(&self, src: &[u8]) -> DlrResult<()> {
        if self.ptr.is_null() {
            return Err(DlrError::Precondition("backend buffer is null".into()));
        }
        unsafe { std::ptr::copy_nonoverlapping(src.as_ptr(), self.ptr, src.len()) };
        Ok(())
    }

    /// Fill `dst` from the start of the buffer.
    ///
    /// # Safety
    ///
    /// The session owning the buffer must be live and the buffer must hold at
    /// least `dst.len()` bytes.
    pub unsafe fn read(&self, dst: &mut [u8]) -> DlrResult<()> {
        if self.ptr.is_null() {
            return Err(DlrError::Precondition("backend buffer is null".into()));
        }
        unsafe { std::ptr::copy_nonoverlapping(self.ptr, dst.as_mut_ptr(), dst.len()) };
        Ok(())
    }
}

/// A live inference session: graph id plus the backend-owned tensors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HexagonSession {
    pub graph_id: i32,
    pub input: BackendBuffer,
    pub output: BackendBuffer,
}

/// A failed `dlr_hexagon_model_init`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InitFailure {
    /// Graph id the backend wrote before failing; `0` if none.
    pub graph_id: i32,
    /// Nonzero status code.
    pub code: i32,
}

/// The six entry points of a compiled Hexagon model.
///
/// Status-returning calls yield `Err(code)` with the backend's nonzero code.
pub trait HexagonBackend: Send {
    /// `dlr_hexagon_model_init`: create the graph and its I/O buffers.
    fn model_init(&self, debug_level: i32) -> Result<HexagonSession, InitFailure>;

    /// `dlr_hexagon_model_exec`: run the graph over `input` into `output`.
    fn model_exec(&self, session: &HexagonSession) -> Result<(), i32>;

    /// `dlr_hexagon_model_close`: tear the graph down.
    fn model_close(&self, graph_id: i32);

    /// `dlr_hexagon_nn_getlog`: copy the backend diagnostic log into `buf`
    /// as a NUL-terminated string.
    fn nn_getlog(&self, graph_id: i32, buf: &mut [u8]) -> Result<(), i32>;

    /// `dlr_hexagon_input_spec`: metadata for input `id`, `None` past the last.
    fn input_spec(&self, id: i32) -> DlrResult<Option<TensorSpec>>;

    /// `dlr_hexagon_output_spec`: metadata for output `id`, `None` past the last.
    fn output_spec(&self, id: i32) -> DlrResult<Option<TensorSpec>>;
}
