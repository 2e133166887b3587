//! Runtime-loaded bindings to the Treelite runtime C API.

use libloading::Library;
use std::ffi::{CStr, CString, c_void};
use std::os::raw::{c_char, c_int};
use std::path::Path;
use tracing::info;

use super::csr::CsrMatrix;
use super::runtime::{CsrBatchHandle, PredictorEntry, PredictorHandle, TreeliteRuntime};
use crate::dylib::{find_symbol, open_library};
use dlr_kernel::{DlrError, DlrResult};

type GetLastErrorFn = unsafe extern "C" fn() -> *const c_char;
type PredictorLoadFn = unsafe extern "C" fn(*const c_char, c_int, *mut *mut c_void) -> c_int;
type QueryFn = unsafe extern "C" fn(*mut c_void, *mut usize) -> c_int;
type PredictInstFn =
    unsafe extern "C" fn(*mut c_void, *mut PredictorEntry, c_int, *mut f32, *mut usize) -> c_int;
type AssembleSparseBatchFn = unsafe extern "C" fn(
    *const f32,
    *const u32,
    *const usize,
    usize,
    usize,
    *mut *mut c_void,
) -> c_int;
type HandleFn = unsafe extern "C" fn(*mut c_void) -> c_int;
type PredictBatchFn = unsafe extern "C" fn(
    *mut c_void,
    *mut c_void,
    c_int,
    c_int,
    c_int,
    *mut f32,
    *mut usize,
) -> c_int;

/// [`TreeliteRuntime`] over a dynamically opened Treelite runtime library.
pub struct DynamicTreeliteRuntime {
    get_last_error: GetLastErrorFn,
    predictor_load: PredictorLoadFn,
    query_num_feature: QueryFn,
    query_num_output_group: QueryFn,
    predict_inst: PredictInstFn,
    assemble_sparse_batch: AssembleSparseBatchFn,
    delete_sparse_batch: HandleFn,
    predict_batch: PredictBatchFn,
    predictor_free: HandleFn,
    _library: Library,
}

impl DynamicTreeliteRuntime {
    /// Open the runtime library and resolve the C API.
    pub fn open(runtime_library: impl AsRef<Path>) -> DlrResult<Self> {
        let path = runtime_library.as_ref();
        info!(path = %path.display(), "Loading Treelite runtime");
        let library = open_library(path)?;

        unsafe {
            Ok(Self {
                get_last_error: find_symbol(&library, "TreeliteGetLastError")?,
                predictor_load: find_symbol(&library, "TreelitePredictorLoad")?,
                query_num_feature: find_symbol(&library, "TreelitePredictorQueryNumFeature")?,
                query_num_output_group: find_symbol(
                    &library,
                    "TreelitePredictorQueryNumOutputGroup",
                )?,
                predict_inst: find_symbol(&library, "TreelitePredictorPredictInst")?,
                assemble_sparse_batch: find_symbol(&library, "TreeliteAssembleSparseBatch")?,
                delete_sparse_batch: find_symbol(&library, "TreeliteDeleteSparseBatch")?,
                predict_batch: find_symbol(&library, "TreelitePredictorPredictBatch")?,
                predictor_free: find_symbol(&library, "TreelitePredictorFree")?,
                _library: library,
            })
        }
    }

    fn last_error(&self) -> String {
        unsafe {
            let err_ptr = (self.get_last_error)();
            if err_ptr.is_null() {
                "Unknown error".to_string()
            } else {
                CStr::from_ptr(err_ptr).to_string_lossy().into_owned()
            }
        }
    }

    fn check(&self, call: &'static str, status: c_int) -> DlrResult<()> {
        if status != 0 {
            return Err(DlrError::treelite(call, self.last_error()));
        }
        Ok(())
    }
}

impl TreeliteRuntime for DynamicTreeliteRuntime {
    fn predictor_load(
        &self,
        library: &Path,
        num_worker_threads: i32,
    ) -> DlrResult<PredictorHandle> {
        let path = CString::new(library.to_string_lossy().as_ref())
            .map_err(|_| DlrError::treelite("TreelitePredictorLoad", "Invalid path encoding"))?;
        let mut out: *mut c_void = std::ptr::null_mut();
        let status = unsafe { (self.predictor_load)(path.as_ptr(), num_worker_threads, &mut out) };
        self.check("TreelitePredictorLoad", status)?;
        Ok(PredictorHandle::from_raw(out))
    }

    fn query_num_feature(&self, predictor: PredictorHandle) -> DlrResult<usize> {
        let mut out = 0usize;
        let status = unsafe { (self.query_num_feature)(predictor.as_ptr(), &mut out) };
        self.check("TreelitePredictorQueryNumFeature", status)?;
        Ok(out)
    }

    fn query_num_output_group(&self, predictor: PredictorHandle) -> DlrResult<usize> {
        let mut out = 0usize;
        let status = unsafe { (self.query_num_output_group)(predictor.as_ptr(), &mut out) };
        self.check("TreelitePredictorQueryNumOutputGroup", status)?;
        Ok(out)
    }

    fn predict_inst(
        &self,
        predictor: PredictorHandle,
        inst: &mut [PredictorEntry],
        pred_margin: bool,
        out: &mut [f32],
    ) -> DlrResult<usize> {
        let mut out_size = 0usize;
        let status = unsafe {
            (self.predict_inst)(
                predictor.as_ptr(),
                inst.as_mut_ptr(),
                c_int::from(pred_margin),
                out.as_mut_ptr(),
                &mut out_size,
            )
        };
        self.check("TreelitePredictorPredictInst", status)?;
        Ok(out_size)
    }

    unsafe fn assemble_sparse_batch(&self, csr: &CsrMatrix) -> DlrResult<CsrBatchHandle> {
        let mut out: *mut c_void = std::ptr::null_mut();
        let status = unsafe {
            (self.assemble_sparse_batch)(
                csr.data().as_ptr(),
                csr.col_ind().as_ptr(),
                csr.row_ptr().as_ptr(),
                csr.num_row(),
                csr.num_col(),
                &mut out,
            )
        };
        self.check("TreeliteAssembleSparseBatch", status)?;
        Ok(CsrBatchHandle::from_raw(out))
    }

    fn delete_sparse_batch(&self, batch: CsrBatchHandle) -> DlrResult<()> {
        let status = unsafe { (self.delete_sparse_batch)(batch.as_ptr()) };
        self.check("TreeliteDeleteSparseBatch", status)
    }

    fn predict_batch(
        &self,
        predictor: PredictorHandle,
        batch: CsrBatchHandle,
        verbose: bool,
        pred_margin: bool,
        out: &mut [f32],
    ) -> DlrResult<usize> {
        let mut out_size = 0usize;
        let status = unsafe {
            (self.predict_batch)(
                predictor.as_ptr(),
                batch.as_ptr(),
                1,
                c_int::from(verbose),
                c_int::from(pred_margin),
                out.as_mut_ptr(),
                &mut out_size,
            )
        };
        self.check("TreelitePredictorPredictBatch", status)?;
        Ok(out_size)
    }

    fn predictor_free(&self, predictor: PredictorHandle) -> DlrResult<()> {
        let status = unsafe { (self.predictor_free)(predictor.as_ptr()) };
        self.check("TreelitePredictorFree", status)
    }
}
