//! Hexagon adapter tests.
//!
//! A mock backend stands in for the compiled model shared object so the
//! whole lifecycle (init, schema discovery, set input, exec, output, close)
//! can be exercised without DSP hardware.

use dlr_backends::hexagon::{
    BackendBuffer, HexagonArtifact, HexagonBackend, HexagonModel, HexagonSession, InitFailure,
    TensorSpec,
};
use dlr_kernel::{Backend, DeviceContext, DlrError, Model};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

#[derive(Default)]
struct MockState {
    input: Vec<u8>,
    output: Vec<u8>,
    closed: Vec<i32>,
    getlog_calls: usize,
    getlog_graph_ids: Vec<i32>,
    exec_calls: usize,
    debug_level: Option<i32>,
}

struct MockHexagon {
    inputs: Vec<TensorSpec>,
    outputs: Vec<TensorSpec>,
    init_status: i32,
    init_graph_id: i32,
    exec_status: i32,
    log: &'static str,
    state: Arc<Mutex<MockState>>,
}

impl MockHexagon {
    fn new(state: Arc<Mutex<MockState>>) -> Self {
        Self {
            inputs: vec![spec("input", &[1, 2, 2, 1], 4)],
            outputs: vec![spec("scores", &[1, 4], 4), spec("label", &[1], 1)],
            init_status: 0,
            init_graph_id: 0,
            exec_status: 0,
            log: "hexagon_nn: graph prepared",
            state,
        }
    }
}

fn spec(name: &str, shape: &[i64], bytes: usize) -> TensorSpec {
    TensorSpec {
        name: name.to_string(),
        dim: shape.len(),
        shape: shape.to_vec(),
        bytes,
        size: shape.iter().product::<i64>() as usize,
    }
}

impl HexagonBackend for MockHexagon {
    fn model_init(&self, debug_level: i32) -> Result<HexagonSession, InitFailure> {
        let mut state = self.state.lock().unwrap();
        state.debug_level = Some(debug_level);
        if self.init_status != 0 {
            return Err(InitFailure {
                graph_id: self.init_graph_id,
                code: self.init_status,
            });
        }
        state.input = vec![0u8; self.inputs.iter().map(|s| s.bytes).max().unwrap_or(0)];
        state.output = vec![0u8; self.outputs.iter().map(|s| s.bytes).max().unwrap_or(0)];
        Ok(HexagonSession {
            graph_id: 7,
            input: BackendBuffer::from_raw(state.input.as_mut_ptr()),
            output: BackendBuffer::from_raw(state.output.as_mut_ptr()),
        })
    }

    fn model_exec(&self, session: &HexagonSession) -> Result<(), i32> {
        let mut state = self.state.lock().unwrap();
        state.exec_calls += 1;
        if self.exec_status != 0 {
            return Err(self.exec_status);
        }
        let n = state.input.len().min(state.output.len());
        for i in 0..n {
            unsafe {
                let v = *session.input.as_ptr().add(i);
                *session.output.as_ptr().add(i) = v.wrapping_add(1);
            }
        }
        Ok(())
    }

    fn model_close(&self, graph_id: i32) {
        self.state.lock().unwrap().closed.push(graph_id);
    }

    fn nn_getlog(&self, graph_id: i32, buf: &mut [u8]) -> Result<(), i32> {
        let mut state = self.state.lock().unwrap();
        state.getlog_calls += 1;
        state.getlog_graph_ids.push(graph_id);
        let bytes = self.log.as_bytes();
        buf[..bytes.len()].copy_from_slice(bytes);
        buf[bytes.len()] = 0;
        Ok(())
    }

    fn input_spec(&self, id: i32) -> dlr_kernel::DlrResult<Option<TensorSpec>> {
        Ok(self.inputs.get(id as usize).cloned())
    }

    fn output_spec(&self, id: i32) -> dlr_kernel::DlrResult<Option<TensorSpec>> {
        Ok(self.outputs.get(id as usize).cloned())
    }
}

fn artifact() -> HexagonArtifact {
    HexagonArtifact {
        dir: PathBuf::from("/models/mobilenet"),
        model_file: PathBuf::from("/models/mobilenet/mobilenet_hexagon_model.so"),
        skeleton_file: None,
    }
}

fn build(backend: MockHexagon) -> HexagonModel {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    HexagonModel::with_backend(artifact(), Box::new(backend), DeviceContext::cpu(), 1)
        .expect("mock backend must initialize")
}

fn new_model() -> (HexagonModel, Arc<Mutex<MockState>>) {
    let state = Arc::new(Mutex::new(MockState::default()));
    (build(MockHexagon::new(state.clone())), state)
}

#[test]
fn test_construction_discovers_specs() {
    let (model, state) = new_model();

    assert_eq!(model.backend(), Backend::Hexagon);
    assert_eq!(model.num_inputs(), 1);
    assert_eq!(model.num_outputs(), 2);
    assert_eq!(model.input_name(0).unwrap(), "input");
    assert_eq!(model.input_shape(0).unwrap(), vec![1, 2, 2, 1]);
    assert_eq!(model.input_size(0).unwrap(), 4);
    assert_eq!(model.input_dim(0).unwrap(), 4);
    assert_eq!(model.output_shape(0).unwrap(), vec![1, 4]);
    assert_eq!(model.output_size(1).unwrap(), 1);
    assert_eq!(model.output_dim(1).unwrap(), 1);
    assert_eq!(model.output_specs()[1].name, "label");

    let state = state.lock().unwrap();
    assert_eq!(state.debug_level, Some(1));
    assert_eq!(state.getlog_calls, 1);
    assert_eq!(state.getlog_graph_ids, vec![7]);
}

#[test]
fn test_set_input_then_get_input_round_trips() {
    let (mut model, _) = new_model();
    let data = [9u8, 8, 7, 6];

    model.set_input("input", &[1, 2, 2, 1], &data).unwrap();

    let mut out = [0u8; 4];
    model.get_input("input", &mut out).unwrap();
    assert_eq!(out, data);
}

#[test]
fn test_run_and_get_output() {
    let (mut model, state) = new_model();
    model.set_input("input", &[1, 2, 2, 1], &[1, 2, 3, 4]).unwrap();
    model.run().unwrap();

    let mut scores = [0u8; 4];
    model.get_output(0, &mut scores).unwrap();
    assert_eq!(scores, [2, 3, 4, 5]);

    let mut label = [0u8; 1];
    model.get_output(1, &mut label).unwrap();
    assert_eq!(label, [2]);
    assert_eq!(state.lock().unwrap().exec_calls, 1);
}

#[test]
fn test_rank_mismatch_rejected_without_copy() {
    let (mut model, _) = new_model();

    let err = model.set_input("input", &[1, 4], &[1, 1, 1, 1]).unwrap_err();
    assert!(matches!(err, DlrError::DimMismatch { expected: 4, actual: 2 }));
    assert!(err.is_fatal());

    let mut out = [0xffu8; 4];
    model.get_input("input", &mut out).unwrap();
    assert_eq!(out, [0, 0, 0, 0]);
}

#[test]
fn test_extent_mismatch_rejected_without_copy() {
    let (mut model, _) = new_model();

    let err = model.set_input("input", &[1, 2, 1, 2], &[5, 5, 5, 5]).unwrap_err();
    assert!(matches!(err, DlrError::ShapeMismatch { axis: 2, .. }));

    let mut out = [0xffu8; 4];
    model.get_input("input", &mut out).unwrap();
    assert_eq!(out, [0, 0, 0, 0]);
}

#[test]
fn test_unknown_input_name() {
    let (mut model, _) = new_model();
    let err = model.set_input("image", &[1, 2, 2, 1], &[0; 4]).unwrap_err();
    assert!(matches!(err, DlrError::InputNotFound(ref n) if n == "image"));
}

#[test]
fn test_short_buffers_rejected() {
    let (mut model, _) = new_model();

    let err = model.set_input("input", &[1, 2, 2, 1], &[0; 3]).unwrap_err();
    assert!(matches!(err, DlrError::BufferTooSmall { needed: 4, actual: 3 }));

    let mut out = [0u8; 2];
    let err = model.get_output(0, &mut out).unwrap_err();
    assert!(matches!(err, DlrError::BufferTooSmall { needed: 4, actual: 2 }));
}

#[test]
fn test_output_index_out_of_range() {
    let (model, _) = new_model();
    let mut out = [0u8; 16];
    let err = model.get_output(2, &mut out).unwrap_err();
    assert!(matches!(
        err,
        DlrError::IndexOutOfRange { kind: "Output", index: 2, count: 2 }
    ));
    assert!(model.output_shape(5).is_err());
    assert!(model.input_name(1).is_err());
}

#[test]
fn test_unsupported_operations() {
    let (mut model, _) = new_model();

    let checks = [
        model.input_type(0).map(|_| ()).unwrap_err(),
        model.output_type(0).map(|_| ()).unwrap_err(),
        model.weight_names().map(|_| ()).unwrap_err(),
        model.weight_name(0).map(|_| ()).unwrap_err(),
        model.set_num_threads(2).unwrap_err(),
        model.use_cpu_affinity(true).unwrap_err(),
    ];
    for err in checks {
        assert!(matches!(err, DlrError::Unsupported { backend: Backend::Hexagon, .. }));
        assert!(err.is_fatal());
    }
    assert_eq!(
        model.set_num_threads(4).unwrap_err().to_string(),
        "SetNumThreads is not supported by Hexagon backend"
    );
}

#[test]
fn test_init_failure_drains_log_and_skips_close() {
    let state = Arc::new(Mutex::new(MockState::default()));
    let mut backend = MockHexagon::new(state.clone());
    backend.init_status = 5;

    let report = HexagonModel::with_backend(artifact(), Box::new(backend), DeviceContext::cpu(), 0)
        .err()
        .expect("init failure must fail construction");
    assert!(matches!(
        report.current_context(),
        DlrError::BackendStatus { call: "dlr_hexagon_model_init", code: 5 }
    ));

    let state = state.lock().unwrap();
    assert_eq!(state.getlog_calls, 1);
    assert_eq!(state.getlog_graph_ids, vec![0]);
    assert!(state.closed.is_empty());
}

#[test]
fn test_init_failure_drains_log_of_partial_graph() {
    let state = Arc::new(Mutex::new(MockState::default()));
    let mut backend = MockHexagon::new(state.clone());
    backend.init_status = -3;
    backend.init_graph_id = 11;

    let report = HexagonModel::with_backend(artifact(), Box::new(backend), DeviceContext::cpu(), 0)
        .err()
        .expect("init failure must fail construction");
    assert!(matches!(
        report.current_context(),
        DlrError::BackendStatus { code: -3, .. }
    ));
    assert_eq!(state.lock().unwrap().getlog_graph_ids, vec![11]);
}

#[test]
fn test_exec_failure() {
    let state = Arc::new(Mutex::new(MockState::default()));
    let mut backend = MockHexagon::new(state);
    backend.exec_status = -1;
    let mut model = build(backend);

    let err = model.run().unwrap_err();
    assert!(matches!(
        err,
        DlrError::BackendStatus { call: "dlr_hexagon_model_exec", code: -1 }
    ));
}

#[test]
fn test_drop_closes_session_once() {
    let (model, state) = new_model();
    drop(model);
    assert_eq!(state.lock().unwrap().closed, vec![7]);
}

#[test]
fn test_no_specs_is_valid() {
    let state = Arc::new(Mutex::new(MockState::default()));
    let mut backend = MockHexagon::new(state);
    backend.inputs.clear();
    backend.outputs.clear();
    let model = build(backend);
    assert_eq!(model.num_inputs(), 0);
    assert_eq!(model.num_outputs(), 0);
}

fn touch(dir: &Path, name: &str) {
    std::fs::write(dir.join(name), b"").unwrap();
}

#[test]
fn test_load_without_model_file_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    touch(dir.path(), "labels.txt");

    let report = HexagonModel::load(dir.path(), DeviceContext::cpu(), 0)
        .err()
        .expect("missing model must fail");
    assert!(matches!(report.current_context(), DlrError::ArtifactNotFound { .. }));
    assert!(report.current_context().is_fatal());
}

#[test]
fn test_load_with_two_model_files_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    touch(dir.path(), "a_hexagon_model.so");
    touch(dir.path(), "b_hexagon_model.so");

    let report = HexagonModel::load(dir.path(), DeviceContext::cpu(), 0)
        .err()
        .expect("ambiguous model must fail");
    assert!(matches!(report.current_context(), DlrError::AmbiguousArtifact { .. }));
}
