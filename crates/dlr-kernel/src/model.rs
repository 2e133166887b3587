//! The uniform model contract implemented by every backend adapter.

use crate::context::{Backend, DeviceContext};
use crate::error::{DlrError, DlrResult};

/// A loaded model, regardless of the engine behind it.
///
/// Calls follow `set_input` → `run` → `get_output`, once per inference.
/// Mutating calls take `&mut self`; an instance is never shared between
/// threads without external synchronization.
///
/// Operations a backend cannot offer return [`DlrError::Unsupported`]
/// rather than silently doing nothing.
pub trait Model: Send {
    /// Engine behind this model.
    fn backend(&self) -> Backend;

    /// Device the model was created for.
    fn device(&self) -> &DeviceContext;

    fn num_inputs(&self) -> usize;

    fn num_outputs(&self) -> usize;

    /// Number of weight tensors exposed by the backend.
    fn num_weights(&self) -> usize {
        0
    }

    fn input_name(&self, index: usize) -> DlrResult<&str>;

    fn input_type(&self, index: usize) -> DlrResult<&str>;

    /// Declared or current input shape. `-1` marks an unknown extent.
    fn input_shape(&self, index: usize) -> DlrResult<Vec<i64>>;

    /// Element count of the input.
    fn input_size(&self, index: usize) -> DlrResult<i64>;

    fn input_dim(&self, index: usize) -> DlrResult<usize>;

    /// Copy `input` into the model. `shape.len()` is the tensor rank.
    fn set_input(&mut self, name: &str, shape: &[i64], input: &[u8]) -> DlrResult<()>;

    /// Copy the current input back out.
    fn get_input(&self, name: &str, out: &mut [u8]) -> DlrResult<()>;

    /// Output shape. `-1` marks an unknown extent.
    fn output_shape(&self, index: usize) -> DlrResult<Vec<i64>>;

    fn output_size(&self, index: usize) -> DlrResult<i64>;

    fn output_dim(&self, index: usize) -> DlrResult<usize>;

    fn output_type(&self, index: usize) -> DlrResult<&str>;

    fn get_output(&self, index: usize, out: &mut [u8]) -> DlrResult<()>;

    /// Run inference on the current input. Blocks until the backend returns.
    fn run(&mut self) -> DlrResult<()>;

    fn set_num_threads(&mut self, threads: i32) -> DlrResult<()>;

    fn use_cpu_affinity(&mut self, enabled: bool) -> DlrResult<()>;

    fn weight_names(&self) -> DlrResult<Vec<String>>;

    fn weight_name(&self, index: usize) -> DlrResult<&str>;

    /// Index of the input called `name`. Linear scan; input counts are small
    /// and index order is the declared order.
    fn input_index(&self, name: &str) -> DlrResult<usize> {
        (0..self.num_inputs())
            .find(|&i| self.input_name(i).is_ok_and(|n| n == name))
            .ok_or_else(|| DlrError::InputNotFound(name.to_string()))
    }

    /// [`set_input`](Model::set_input) for float32 data.
    fn set_input_f32(&mut self, name: &str, shape: &[i64], input: &[f32]) -> DlrResult<()> {
        let bytes: Vec<u8> = input.iter().flat_map(|v| v.to_ne_bytes()).collect();
        self.set_input(name, shape, &bytes)
    }

    /// [`get_output`](Model::get_output) for float32 data.
    fn get_output_f32(&self, index: usize) -> DlrResult<Vec<f32>> {
        let size = self.output_size(index)?;
        let len = usize::try_from(size).map_err(|_| {
            DlrError::Precondition(format!("output {index} has unknown size {size}"))
        })?;
        let mut bytes = vec![0u8; len * std::mem::size_of::<f32>()];
        self.get_output(index, &mut bytes)?;
        Ok(f32_from_ne_bytes(&bytes))
    }
}

/// Decode a native-endian float32 buffer.
pub fn f32_from_ne_bytes(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(std::mem::size_of::<f32>())
        .map(|c| f32::from_ne_bytes([c[0], c[1], c[2], c[3]]))
        .collect()
}
