//! Runtime-loaded bindings to a compiled `*_hexagon_model.so`.

use libloading::Library;
use std::ffi::CStr;
use std::os::raw::{c_char, c_int};
use std::path::Path;

use super::backend::{BackendBuffer, HexagonBackend, HexagonSession, InitFailure, TensorSpec};
use crate::dylib::{find_symbol, open_library};
use dlr_kernel::{DlrError, DlrResult};

type ModelInitFn = unsafe extern "C" fn(*mut c_int, *mut *mut u8, *mut *mut u8, c_int) -> c_int;
type ModelExecFn = unsafe extern "C" fn(c_int, *mut u8, *mut u8) -> c_int;
type ModelCloseFn = unsafe extern "C" fn(c_int);
type NnGetLogFn = unsafe extern "C" fn(c_int, *mut u8, u32) -> c_int;
type TensorSpecFn = unsafe extern "C" fn(
    c_int,
    *mut *mut c_char,
    *mut c_int,
    *mut *mut c_int,
    *mut c_int,
    *mut c_int,
) -> c_int;

/// Symbol names exported by every compiled Hexagon model.
pub const MODEL_INIT: &str = "dlr_hexagon_model_init";
pub const MODEL_EXEC: &str = "dlr_hexagon_model_exec";
pub const MODEL_CLOSE: &str = "dlr_hexagon_model_close";
pub const NN_GETLOG: &str = "dlr_hexagon_nn_getlog";
pub const INPUT_SPEC: &str = "dlr_hexagon_input_spec";
pub const OUTPUT_SPEC: &str = "dlr_hexagon_output_spec";

/// [`HexagonBackend`] backed by a dynamically opened model shared object.
pub struct DynamicHexagonBackend {
    model_init: ModelInitFn,
    model_exec: ModelExecFn,
    model_close: ModelCloseFn,
    nn_getlog: NnGetLogFn,
    input_spec: TensorSpecFn,
    output_spec: TensorSpecFn,
    // Keeps the function pointers above valid; dropped last.
    _library: Library,
}

impl DynamicHexagonBackend {
    /// Open `model_file` and resolve all six entry points.
    pub fn open(model_file: impl AsRef<Path>) -> DlrResult<Self> {
        let library = open_library(model_file.as_ref())?;

        unsafe {
            Ok(Self {
                model_init: find_symbol(&library, MODEL_INIT)?,
                model_exec: find_symbol(&library, MODEL_EXEC)?,
                model_close: find_symbol(&library, MODEL_CLOSE)?,
                nn_getlog: find_symbol(&library, NN_GETLOG)?,
                input_spec: find_symbol(&library, INPUT_SPEC)?,
                output_spec: find_symbol(&library, OUTPUT_SPEC)?,
                _library: library,
            })
        }
    }
}

/// Copy a spec out of backend memory. Nothing borrowed from the backend is kept.
unsafe fn read_spec(
    name: *const c_char,
    dim: c_int,
    shape: *const c_int,
    length: c_int,
    bytes: c_int,
) -> DlrResult<TensorSpec> {
    let invalid = |what: &str| DlrError::Precondition(format!("tensor spec has {}", what));

    if name.is_null() {
        return Err(invalid("a null name"));
    }
    let dim = usize::try_from(dim).map_err(|_| invalid("a negative rank"))?;
    let bytes = usize::try_from(bytes).map_err(|_| invalid("a negative byte size"))?;
    let size = usize::try_from(length).map_err(|_| invalid("a negative element count"))?;
    if dim > 0 && shape.is_null() {
        return Err(invalid("a null shape"));
    }

    let name = unsafe { CStr::from_ptr(name) }.to_string_lossy().into_owned();
    let shape = if dim == 0 {
        Vec::new()
    } else {
        unsafe { std::slice::from_raw_parts(shape, dim) }
            .iter()
            .map(|&d| i64::from(d))
            .collect()
    };

    Ok(TensorSpec {
        name,
        dim,
        shape,
        bytes,
        size,
    })
}

fn query_spec(f: TensorSpecFn, id: i32) -> DlrResult<Option<TensorSpec>> {
    let mut name: *mut c_char = std::ptr::null_mut();
    let mut dim: c_int = 0;
    let mut shape: *mut c_int = std::ptr::null_mut();
    let mut length: c_int = 0;
    let mut bytes: c_int = 0;

    let err = unsafe { f(id, &mut name, &mut dim, &mut shape, &mut length, &mut bytes) };
    if err != 0 {
        return Ok(None);
    }
    unsafe { read_spec(name, dim, shape, length, bytes) }.map(Some)
}

impl HexagonBackend for DynamicHexagonBackend {
    fn model_init(&self, debug_level: i32) -> Result<HexagonSession, InitFailure> {
        let mut graph_id: c_int = 0;
        let mut input: *mut u8 = std::ptr::null_mut();
        let mut output: *mut u8 = std::ptr::null_mut();

        let err = unsafe { (self.model_init)(&mut graph_id, &mut input, &mut output, debug_level) };
        if err != 0 {
            return Err(InitFailure {
                graph_id,
                code: err,
            });
        }
        Ok(HexagonSession {
            graph_id,
            input: BackendBuffer::from_raw(input),
            output: BackendBuffer::from_raw(output),
        })
    }

    fn model_exec(&self, session: &HexagonSession) -> Result<(), i32> {
        let err = unsafe {
            (self.model_exec)(
                session.graph_id,
                session.input.as_ptr(),
                session.output.as_ptr(),
            )
        };
        if err != 0 { Err(err) } else { Ok(()) }
    }

    fn model_close(&self, graph_id: i32) {
        unsafe { (self.model_close)(graph_id) }
    }

    fn nn_getlog(&self, graph_id: i32, buf: &mut [u8]) -> Result<(), i32> {
        let len = u32::try_from(buf.len()).unwrap_or(u32::MAX);
        let err = unsafe { (self.nn_getlog)(graph_id, buf.as_mut_ptr(), len) };
        if err != 0 { Err(err) } else { Ok(()) }
    }

    fn input_spec(&self, id: i32) -> DlrResult<Option<TensorSpec>> {
        query_spec(self.input_spec, id)
    }

    fn output_spec(&self, id: i32) -> DlrResult<Option<TensorSpec>> {
        query_spec(self.output_spec, id)
    }
}
