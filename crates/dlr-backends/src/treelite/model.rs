//! [`Model`] adapter over a compiled Treelite tree ensemble.

use dlr_kernel::model::f32_from_ne_bytes;
use dlr_kernel::{
    Backend, DeviceContext, DlrError, DlrResult, IntoLoadReport, LoadResult, Model, RuntimeConfig,
};
use error_stack::{Report, ResultExt};
use std::path::Path;
use tracing::{debug, info, warn};

use super::artifact::TreeliteArtifact;
use super::csr::CsrMatrix;
use super::ffi::DynamicTreeliteRuntime;
use super::runtime::{CsrBatchHandle, PredictorEntry, PredictorHandle, TreeliteRuntime};

/// Name of the single input every Treelite model accepts.
pub const INPUT_NAME: &str = "data";
/// Element type of the input and output.
pub const TENSOR_TYPE: &str = "float32";

const F32_BYTES: usize = std::mem::size_of::<f32>();

/// The sparse input currently registered with the runtime.
struct TreeliteInput {
    // Borrowed by `batch` until the batch is deleted.
    csr: CsrMatrix,
    batch: CsrBatchHandle,
}

/// Tree-ensemble model compiled by Treelite.
///
/// Takes one 2-D float32 input named `data` (rows x features, `NaN` for
/// missing) and yields one 2-D float32 output.
pub struct TreeliteModel {
    ctx: DeviceContext,
    artifact: TreeliteArtifact,
    runtime: Box<dyn TreeliteRuntime>,
    predictor: PredictorHandle,
    num_feature: usize,
    /// Per-row slots the runtime may write during batch prediction.
    num_output_group: usize,
    /// Per-row values actually produced; smaller than `num_output_group` when
    /// a multi-class model predicts the class index only.
    output_width: usize,
    input: Option<TreeliteInput>,
    output: Vec<f32>,
    output_ready: bool,
}

// SAFETY: the predictor and batch handles are only used through this
// adapter's methods, which require `&mut self` for mutation; the runtime is
// `Send`.
unsafe impl Send for TreeliteModel {}

impl TreeliteModel {
    /// Load the model found in `model_dirs`, binding the Treelite runtime
    /// named by `config`.
    ///
    /// Worker threads come from `config.num_worker_threads`, falling back to
    /// `OMP_NUM_THREADS` and then to every core.
    pub fn load<P: AsRef<Path>>(
        model_dirs: &[P],
        ctx: DeviceContext,
        config: &RuntimeConfig,
    ) -> LoadResult<Self> {
        info!("Initializing TreeliteModel");
        let artifact = TreeliteArtifact::locate(model_dirs)
            .into_report()
            .attach("locating Treelite artifact")?;

        let runtime = DynamicTreeliteRuntime::open(&config.treelite_runtime_library)
            .into_report()
            .attach(format!(
                "binding Treelite runtime {}",
                config.treelite_runtime_library.display()
            ))?;

        Self::with_runtime(artifact, Box::new(runtime), ctx, config.worker_threads_arg())
    }

    /// Build the adapter over an already bound runtime.
    ///
    /// `num_worker_threads == -1` lets the runtime use every core.
    pub fn with_runtime(
        artifact: TreeliteArtifact,
        runtime: Box<dyn TreeliteRuntime>,
        ctx: DeviceContext,
        num_worker_threads: i32,
    ) -> LoadResult<Self> {
        let predictor = runtime
            .predictor_load(&artifact.model_lib, num_worker_threads)
            .into_report()
            .attach(format!("loading {}", artifact.model_lib.display()))?;

        let mut model = Self {
            ctx,
            artifact,
            runtime,
            predictor,
            num_feature: 0,
            num_output_group: 0,
            output_width: 0,
            input: None,
            output: Vec::new(),
            output_ready: false,
        };
        model.query_schema()?;

        info!(
            num_feature = model.num_feature,
            num_output_group = model.num_output_group,
            output_width = model.output_width,
            "TreeliteModel was created"
        );
        Ok(model)
    }

    fn query_schema(&mut self) -> LoadResult<()> {
        self.num_feature = self
            .runtime
            .query_num_feature(self.predictor)
            .into_report()?;
        self.num_output_group = self
            .runtime
            .query_num_output_group(self.predictor)
            .into_report()?;

        // A multi-class model may emit either per-class scores or only the
        // class index; one throwaway prediction tells them apart.
        let mut inst = vec![PredictorEntry::default(); self.num_feature];
        let mut out = vec![0f32; self.num_output_group];
        self.output_width = self
            .runtime
            .predict_inst(self.predictor, &mut inst, false, &mut out)
            .into_report()
            .attach("probing output width")?;

        if self.output_width > self.num_output_group {
            return Err(Report::new(DlrError::Precondition(format!(
                "output width {} exceeds output group count {}",
                self.output_width, self.num_output_group
            ))));
        }
        Ok(())
    }

    pub fn artifact(&self) -> &TreeliteArtifact {
        &self.artifact
    }

    pub fn num_feature(&self) -> usize {
        self.num_feature
    }

    pub fn num_output_group(&self) -> usize {
        self.num_output_group
    }

    /// Sparse form of the current input.
    pub fn sparse_input(&self) -> Option<&CsrMatrix> {
        self.input.as_ref().map(|i| &i.csr)
    }

    fn num_row(&self) -> Option<usize> {
        self.input.as_ref().map(|i| i.csr.num_row())
    }

    fn registered_input(&self) -> DlrResult<&TreeliteInput> {
        self.input.as_ref().ok_or(DlrError::InputNotSet)
    }

    fn release_input(&mut self, input: TreeliteInput) {
        if let Err(e) = self.runtime.delete_sparse_batch(input.batch) {
            warn!(error = %e, "failed to release sparse batch");
        }
    }

    fn check_index(kind: &'static str, index: usize) -> DlrResult<()> {
        if index >= 1 {
            return Err(DlrError::IndexOutOfRange {
                kind,
                index,
                count: 1,
            });
        }
        Ok(())
    }
}

fn extent(shape: &[i64], axis: usize) -> DlrResult<usize> {
    usize::try_from(shape[axis]).map_err(|_| DlrError::ShapeMismatch {
        axis,
        detail: format!("negative extent {}", shape[axis]),
    })
}

impl Model for TreeliteModel {
    fn backend(&self) -> Backend {
        Backend::Treelite
    }

    fn device(&self) -> &DeviceContext {
        &self.ctx
    }

    fn num_inputs(&self) -> usize {
        1
    }

    fn num_outputs(&self) -> usize {
        1
    }

    fn input_name(&self, index: usize) -> DlrResult<&str> {
        Self::check_index("Input", index)?;
        Ok(INPUT_NAME)
    }

    fn input_type(&self, index: usize) -> DlrResult<&str> {
        Self::check_index("Input", index)?;
        Ok(TENSOR_TYPE)
    }

    fn input_shape(&self, index: usize) -> DlrResult<Vec<i64>> {
        Self::check_index("Input", index)?;
        let rows = self.num_row().map_or(-1, |r| r as i64);
        Ok(vec![rows, self.num_feature as i64])
    }

    fn input_size(&self, index: usize) -> DlrResult<i64> {
        Self::check_index("Input", index)?;
        let rows = self.num_row().unwrap_or(1);
        Ok((rows * self.num_feature) as i64)
    }

    fn input_dim(&self, index: usize) -> DlrResult<usize> {
        Self::check_index("Input", index)?;
        Ok(2)
    }

    fn set_input(&mut self, _name: &str, shape: &[i64], input: &[u8]) -> DlrResult<()> {
        if shape.len() != 2 {
            return Err(DlrError::DimMismatch {
                expected: 2,
                actual: shape.len(),
            });
        }
        let num_row = extent(shape, 0)?;
        let num_col = extent(shape, 1)?;
        // Fewer columns than features is allowed; the rest are missing.
        if num_col > self.num_feature {
            return Err(DlrError::ShapeMismatch {
                axis: 1,
                detail: format!(
                    "ClientError: Value read: {}, Expected: {} or less",
                    num_col, self.num_feature
                ),
            });
        }

        let needed = num_row
            .checked_mul(num_col)
            .and_then(|n| n.checked_mul(F32_BYTES))
            .ok_or_else(|| DlrError::ShapeMismatch {
                axis: 0,
                detail: format!("{} x {} float32 values overflow", num_row, num_col),
            })?;
        if input.len() < needed {
            return Err(DlrError::BufferTooSmall {
                needed,
                actual: input.len(),
            });
        }
        let values = f32_from_ne_bytes(&input[..needed]);
        let csr = CsrMatrix::from_dense(&values, num_row, num_col, self.num_feature)?;

        // SAFETY: `csr` moves into `self.input` next to its batch and is only
        // dropped after the batch is deleted. Moving the matrix does not move
        // its heap buffers.
        let batch = unsafe { self.runtime.assemble_sparse_batch(&csr) }?;
        debug!(
            rows = num_row,
            cols = num_col,
            present = csr.data().len(),
            "registered sparse batch"
        );

        if let Some(previous) = self.input.replace(TreeliteInput { csr, batch }) {
            self.release_input(previous);
        }
        self.output.clear();
        self.output_ready = false;
        Ok(())
    }

    fn get_input(&self, _name: &str, _out: &mut [u8]) -> DlrResult<()> {
        Err(DlrError::unsupported("GetInput", Backend::Treelite))
    }

    fn output_shape(&self, index: usize) -> DlrResult<Vec<i64>> {
        Self::check_index("Output", index)?;
        let rows = self.num_row().map_or(-1, |r| r as i64);
        Ok(vec![rows, self.output_width as i64])
    }

    fn output_size(&self, index: usize) -> DlrResult<i64> {
        Self::check_index("Output", index)?;
        let rows = self.num_row().unwrap_or(1);
        Ok((rows * self.output_width) as i64)
    }

    fn output_dim(&self, index: usize) -> DlrResult<usize> {
        Self::check_index("Output", index)?;
        Ok(2)
    }

    fn output_type(&self, index: usize) -> DlrResult<&str> {
        Self::check_index("Output", index)?;
        Ok(TENSOR_TYPE)
    }

    fn get_output(&self, index: usize, out: &mut [u8]) -> DlrResult<()> {
        Self::check_index("Output", index)?;
        let input = self.registered_input()?;
        if !self.output_ready {
            return Err(DlrError::OutputNotReady);
        }

        let count = input.csr.num_row() * self.output_width;
        let needed = count * F32_BYTES;
        if out.len() < needed {
            return Err(DlrError::BufferTooSmall {
                needed,
                actual: out.len(),
            });
        }
        for (dst, v) in out[..needed]
            .chunks_exact_mut(F32_BYTES)
            .zip(&self.output[..count])
        {
            dst.copy_from_slice(&v.to_ne_bytes());
        }
        Ok(())
    }

    fn run(&mut self) -> DlrResult<()> {
        let input = self.input.as_ref().ok_or(DlrError::InputNotSet)?;
        self.output
            .resize(input.csr.num_row() * self.num_output_group, 0.0);

        let written =
            self.runtime
                .predict_batch(self.predictor, input.batch, false, false, &mut self.output)?;
        debug!(written, "batch prediction finished");
        self.output_ready = true;
        Ok(())
    }

    fn set_num_threads(&mut self, _threads: i32) -> DlrResult<()> {
        Err(DlrError::unsupported("SetNumThreads", Backend::Treelite))
    }

    fn use_cpu_affinity(&mut self, _enabled: bool) -> DlrResult<()> {
        Err(DlrError::unsupported("UseCPUAffinity", Backend::Treelite))
    }

    fn weight_names(&self) -> DlrResult<Vec<String>> {
        Err(DlrError::unsupported("GetWeightNames", Backend::Treelite))
    }

    fn weight_name(&self, _index: usize) -> DlrResult<&str> {
        Err(DlrError::unsupported("GetWeightName", Backend::Treelite))
    }
}

impl Drop for TreeliteModel {
    fn drop(&mut self) {
        if let Some(input) = self.input.take() {
            self.release_input(input);
        }
        if let Err(e) = self.runtime.predictor_free(self.predictor) {
            warn!(error = %e, "failed to free Treelite predictor");
        }
        info!("TreeliteModel was deleted");
    }
}
