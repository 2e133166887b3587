//! The subset of the Treelite runtime C API the adapter drives.

use dlr_kernel::DlrResult;
use std::ffi::c_void;
use std::os::raw::c_int;
use std::path::Path;

use super::csr::CsrMatrix;

/// Opaque predictor handle returned by `TreelitePredictorLoad`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PredictorHandle(*mut c_void);

impl PredictorHandle {
    pub fn from_raw(ptr: *mut c_void) -> Self {
        Self(ptr)
    }

    pub fn as_ptr(&self) -> *mut c_void {
        self.0
    }
}

/// Opaque sparse batch handle returned by `TreeliteAssembleSparseBatch`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CsrBatchHandle(*mut c_void);

impl CsrBatchHandle {
    pub fn from_raw(ptr: *mut c_void) -> Self {
        Self(ptr)
    }

    pub fn as_ptr(&self) -> *mut c_void {
        self.0
    }
}

/// One feature slot of a single-instance prediction.
#[repr(C)]
#[derive(Clone, Copy)]
pub union PredictorEntry {
    /// `-1` marks the feature as missing.
    pub missing: c_int,
    pub fvalue: f32,
}

impl PredictorEntry {
    pub fn value(v: f32) -> Self {
        Self { fvalue: v }
    }

    pub fn missing() -> Self {
        Self { missing: -1 }
    }
}

impl Default for PredictorEntry {
    fn default() -> Self {
        Self::value(0.0)
    }
}

/// Treelite runtime calls used by [`TreeliteModel`](super::TreeliteModel).
///
/// Failed calls surface as [`DlrError::Treelite`](dlr_kernel::DlrError::Treelite)
/// carrying the runtime's last-error string.
pub trait TreeliteRuntime: Send {
    /// `TreelitePredictorLoad`. `num_worker_threads == -1` uses every core.
    fn predictor_load(&self, library: &Path, num_worker_threads: i32)
    -> DlrResult<PredictorHandle>;

    /// `TreelitePredictorQueryNumFeature`.
    fn query_num_feature(&self, predictor: PredictorHandle) -> DlrResult<usize>;

    /// `TreelitePredictorQueryNumOutputGroup`.
    fn query_num_output_group(&self, predictor: PredictorHandle) -> DlrResult<usize>;

    /// `TreelitePredictorPredictInst`; returns the number of values written.
    fn predict_inst(
        &self,
        predictor: PredictorHandle,
        inst: &mut [PredictorEntry],
        pred_margin: bool,
        out: &mut [f32],
    ) -> DlrResult<usize>;

    /// `TreeliteAssembleSparseBatch`.
    ///
    /// # Safety
    ///
    /// The returned batch borrows the buffers of `csr`; `csr` must stay alive
    /// and unmodified until the batch is passed to
    /// [`delete_sparse_batch`](TreeliteRuntime::delete_sparse_batch).
    unsafe fn assemble_sparse_batch(&self, csr: &CsrMatrix) -> DlrResult<CsrBatchHandle>;

    /// `TreeliteDeleteSparseBatch`.
    fn delete_sparse_batch(&self, batch: CsrBatchHandle) -> DlrResult<()>;

    /// `TreelitePredictorPredictBatch` over a sparse batch; returns the number
    /// of values written.
    fn predict_batch(
        &self,
        predictor: PredictorHandle,
        batch: CsrBatchHandle,
        verbose: bool,
        pred_margin: bool,
        out: &mut [f32],
    ) -> DlrResult<usize>;

    /// `TreelitePredictorFree`.
    fn predictor_free(&self, predictor: PredictorHandle) -> DlrResult<()>;
}
