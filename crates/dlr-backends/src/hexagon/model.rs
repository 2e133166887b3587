//! [`Model`] adapter over a compiled Hexagon model.

use dlr_kernel::{
    Backend, DeviceContext, DlrError, DlrResult, IntoLoadReport, LoadResult, Model,
};
use error_stack::{Report, ResultExt};
use std::path::Path;
use tracing::{debug, info};

use super::artifact::HexagonArtifact;
use super::backend::{HexagonBackend, HexagonSession, TensorSpec};
use super::ffi::DynamicHexagonBackend;

/// Size of the buffer the backend diagnostic log is drained into.
pub const LOG_BUFFER_SIZE: usize = 2 * 1024 * 1024;

/// Hexagon DSP model.
///
/// Construction locates the artifact, binds the six entry points, opens a
/// session and discovers the tensor specs. A returned value is always ready
/// for `set_input` / `run` / `get_output`.
pub struct HexagonModel {
    ctx: DeviceContext,
    artifact: HexagonArtifact,
    debug_level: i32,
    log_buf: Option<Box<[u8]>>,
    session: Option<HexagonSession>,
    input_specs: Vec<TensorSpec>,
    output_specs: Vec<TensorSpec>,
    input_names: Vec<String>,
    backend: Box<dyn HexagonBackend>,
}

// SAFETY: the session buffers are only touched through `&mut self` /
// `&self` methods of this adapter, and the backend is `Send`.
unsafe impl Send for HexagonModel {}

impl HexagonModel {
    /// Load the model in `model_dir`.
    ///
    /// Sets `ADSP_LIBRARY_PATH` when a skeleton library ships with the model.
    pub fn load(
        model_dir: impl AsRef<Path>,
        ctx: DeviceContext,
        debug_level: i32,
    ) -> LoadResult<Self> {
        let model_dir = model_dir.as_ref();
        info!(dir = %model_dir.display(), "Initializing HexagonModel");

        let artifact = HexagonArtifact::locate(model_dir)
            .into_report()
            .attach(format!("locating Hexagon artifact in {}", model_dir.display()))?;
        artifact
            .export_skeleton_search_path()
            .into_report()
            .attach("exporting skeleton library search path")?;

        let backend = DynamicHexagonBackend::open(&artifact.model_file)
            .into_report()
            .attach(format!("binding {}", artifact.model_file.display()))?;

        Self::with_backend(artifact, Box::new(backend), ctx, debug_level)
    }

    /// Build the adapter over an already bound backend.
    pub fn with_backend(
        artifact: HexagonArtifact,
        backend: Box<dyn HexagonBackend>,
        ctx: DeviceContext,
        debug_level: i32,
    ) -> LoadResult<Self> {
        let mut model = Self {
            ctx,
            artifact,
            debug_level,
            log_buf: Some(vec![0u8; LOG_BUFFER_SIZE].into_boxed_slice()),
            session: None,
            input_specs: Vec::new(),
            output_specs: Vec::new(),
            input_names: Vec::new(),
            backend,
        };

        model.init_session()?;
        model.discover_tensor_specs()?;

        info!(
            inputs = model.input_specs.len(),
            outputs = model.output_specs.len(),
            "HexagonModel was created"
        );
        Ok(model)
    }

    pub fn artifact(&self) -> &HexagonArtifact {
        &self.artifact
    }

    pub fn input_specs(&self) -> &[TensorSpec] {
        &self.input_specs
    }

    pub fn output_specs(&self) -> &[TensorSpec] {
        &self.output_specs
    }

    fn init_session(&mut self) -> LoadResult<()> {
        match self.backend.model_init(self.debug_level) {
            Ok(session) => {
                self.session = Some(session);
                self.drain_backend_log(session.graph_id);
                Ok(())
            }
            Err(failure) => {
                self.drain_backend_log(failure.graph_id);
                Err(Report::new(DlrError::BackendStatus {
                    call: "dlr_hexagon_model_init",
                    code: failure.code,
                }))
                .attach(format!("debug level {}", self.debug_level))
            }
        }
    }

    /// Re-emit the backend diagnostic log through `tracing`.
    fn drain_backend_log(&mut self, graph_id: i32) {
        let Some(buf) = self.log_buf.as_deref_mut() else {
            return;
        };
        buf[0] = 0;
        if self.backend.nn_getlog(graph_id, buf).is_ok() {
            let end = buf.iter().position(|&b| b == 0).unwrap_or(buf.len());
            if end > 0 {
                info!(target: "dlr::hexagon::nn", "{}", String::from_utf8_lossy(&buf[..end]));
            }
        }
    }

    fn discover_tensor_specs(&mut self) -> LoadResult<()> {
        self.input_specs = collect_specs(|id| self.backend.input_spec(id))
            .into_report()
            .attach("discovering input tensor specs")?;
        self.input_names = self.input_specs.iter().map(|s| s.name.clone()).collect();

        self.output_specs = collect_specs(|id| self.backend.output_spec(id))
            .into_report()
            .attach("discovering output tensor specs")?;
        Ok(())
    }

    fn live_session(&self) -> DlrResult<&HexagonSession> {
        self.session
            .as_ref()
            .ok_or_else(|| DlrError::Precondition("Hexagon session is not initialized".into()))
    }

    fn input_spec(&self, index: usize) -> DlrResult<&TensorSpec> {
        self.input_specs.get(index).ok_or(DlrError::IndexOutOfRange {
            kind: "Input",
            index,
            count: self.input_specs.len(),
        })
    }

    fn output_spec(&self, index: usize) -> DlrResult<&TensorSpec> {
        self.output_specs.get(index).ok_or(DlrError::IndexOutOfRange {
            kind: "Output",
            index,
            count: self.output_specs.len(),
        })
    }
}

/// Query specs by ascending id until the backend reports no more.
fn collect_specs<F>(mut query: F) -> DlrResult<Vec<TensorSpec>>
where
    F: FnMut(i32) -> DlrResult<Option<TensorSpec>>,
{
    let mut specs = Vec::new();
    let mut id = 0;
    while let Some(spec) = query(id)? {
        debug!(id, name = %spec.name, shape = ?spec.shape, bytes = spec.bytes, "tensor spec");
        specs.push(spec);
        id += 1;
    }
    Ok(specs)
}

fn check_shape(spec: &TensorSpec, shape: &[i64]) -> DlrResult<()> {
    if shape.len() != spec.dim {
        return Err(DlrError::DimMismatch {
            expected: spec.dim,
            actual: shape.len(),
        });
    }
    for (axis, (&got, &want)) in shape.iter().zip(&spec.shape).enumerate() {
        if got != want {
            return Err(DlrError::ShapeMismatch {
                axis,
                detail: format!("expected {}, got {}", want, got),
            });
        }
    }
    Ok(())
}

fn check_len(needed: usize, actual: usize) -> DlrResult<()> {
    if actual < needed {
        return Err(DlrError::BufferTooSmall { needed, actual });
    }
    Ok(())
}

impl Model for HexagonModel {
    fn backend(&self) -> Backend {
        Backend::Hexagon
    }

    fn device(&self) -> &DeviceContext {
        &self.ctx
    }

    fn num_inputs(&self) -> usize {
        self.input_specs.len()
    }

    fn num_outputs(&self) -> usize {
        self.output_specs.len()
    }

    fn input_name(&self, index: usize) -> DlrResult<&str> {
        self.input_spec(index)?;
        Ok(&self.input_names[index])
    }

    fn input_type(&self, _index: usize) -> DlrResult<&str> {
        Err(DlrError::unsupported("GetInputType", Backend::Hexagon))
    }

    fn input_shape(&self, index: usize) -> DlrResult<Vec<i64>> {
        Ok(self.input_spec(index)?.shape.clone())
    }

    fn input_size(&self, index: usize) -> DlrResult<i64> {
        Ok(self.input_spec(index)?.size as i64)
    }

    fn input_dim(&self, index: usize) -> DlrResult<usize> {
        Ok(self.input_spec(index)?.dim)
    }

    fn set_input(&mut self, name: &str, shape: &[i64], input: &[u8]) -> DlrResult<()> {
        let spec = self.input_spec(self.input_index(name)?)?;
        check_shape(spec, shape)?;
        check_len(spec.bytes, input.len())?;

        let session = self.live_session()?;
        // SAFETY: the session is live and the backend sized its input buffer
        // to `spec.bytes`.
        unsafe { session.input.write(&input[..spec.bytes]) }
    }

    fn get_input(&self, name: &str, out: &mut [u8]) -> DlrResult<()> {
        let spec = self.input_spec(self.input_index(name)?)?;
        check_len(spec.bytes, out.len())?;

        let session = self.live_session()?;
        // SAFETY: see `set_input`.
        unsafe { session.input.read(&mut out[..spec.bytes]) }
    }

    fn output_shape(&self, index: usize) -> DlrResult<Vec<i64>> {
        Ok(self.output_spec(index)?.shape.clone())
    }

    fn output_size(&self, index: usize) -> DlrResult<i64> {
        Ok(self.output_spec(index)?.size as i64)
    }

    fn output_dim(&self, index: usize) -> DlrResult<usize> {
        Ok(self.output_spec(index)?.dim)
    }

    fn output_type(&self, _index: usize) -> DlrResult<&str> {
        Err(DlrError::unsupported("GetOutputType", Backend::Hexagon))
    }

    fn get_output(&self, index: usize, out: &mut [u8]) -> DlrResult<()> {
        let spec = self.output_spec(index)?;
        check_len(spec.bytes, out.len())?;

        let session = self.live_session()?;
        // SAFETY: the session is live and the backend sized its output buffer
        // to `spec.bytes`.
        unsafe { session.output.read(&mut out[..spec.bytes]) }
    }

    fn run(&mut self) -> DlrResult<()> {
        let session = self.live_session()?;
        self.backend
            .model_exec(session)
            .map_err(|code| DlrError::BackendStatus {
                call: "dlr_hexagon_model_exec",
                code,
            })
    }

    fn set_num_threads(&mut self, _threads: i32) -> DlrResult<()> {
        Err(DlrError::unsupported("SetNumThreads", Backend::Hexagon))
    }

    fn use_cpu_affinity(&mut self, _enabled: bool) -> DlrResult<()> {
        Err(DlrError::unsupported("UseCPUAffinity", Backend::Hexagon))
    }

    fn weight_names(&self) -> DlrResult<Vec<String>> {
        Err(DlrError::unsupported("GetWeightNames", Backend::Hexagon))
    }

    fn weight_name(&self, _index: usize) -> DlrResult<&str> {
        Err(DlrError::unsupported("GetWeightName", Backend::Hexagon))
    }

    fn input_index(&self, name: &str) -> DlrResult<usize> {
        self.input_names
            .iter()
            .position(|n| n == name)
            .ok_or_else(|| DlrError::InputNotFound(name.to_string()))
    }
}

impl Drop for HexagonModel {
    fn drop(&mut self) {
        if let Some(session) = self.session.take() {
            if session.graph_id != 0 {
                self.backend.model_close(session.graph_id);
            }
        }
        self.log_buf = None;
        info!("HexagonModel was deleted");
    }
}
