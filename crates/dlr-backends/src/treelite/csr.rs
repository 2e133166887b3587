//! Compressed sparse row input for the tree-ensemble predictor.

use dlr_kernel::{DlrError, DlrResult};

/// CSR matrix. Absent entries are missing values to the predictor.
#[derive(Debug, Clone, PartialEq)]
pub struct CsrMatrix {
    data: Vec<f32>,
    col_ind: Vec<u32>,
    row_ptr: Vec<usize>,
    num_row: usize,
    num_col: usize,
}

impl CsrMatrix {
    /// Build from a row-major dense `num_row x dense_cols` matrix, treating
    /// `NaN` as missing. `num_col` is the declared width of the matrix and
    /// may exceed `dense_cols`; trailing columns are missing.
    pub fn from_dense(
        values: &[f32],
        num_row: usize,
        dense_cols: usize,
        num_col: usize,
    ) -> DlrResult<Self> {
        if dense_cols > num_col {
            return Err(DlrError::ShapeMismatch {
                axis: 1,
                detail: format!("{} columns exceed declared width {}", dense_cols, num_col),
            });
        }
        let needed = num_row.checked_mul(dense_cols).ok_or_else(|| DlrError::ShapeMismatch {
            axis: 0,
            detail: format!("{} x {} elements overflow", num_row, dense_cols),
        })?;
        if values.len() < needed {
            return Err(DlrError::BufferTooSmall {
                needed: needed.saturating_mul(std::mem::size_of::<f32>()),
                actual: values.len() * std::mem::size_of::<f32>(),
            });
        }

        // With zero columns the value buffer does not bound the row count.
        let mut row_ptr: Vec<usize> = Vec::new();
        num_row
            .checked_add(1)
            .and_then(|n| row_ptr.try_reserve_exact(n).ok())
            .ok_or_else(|| DlrError::ShapeMismatch {
                axis: 0,
                detail: format!("cannot index {} rows", num_row),
            })?;
        row_ptr.push(0);

        let mut data = Vec::new();
        let mut col_ind = Vec::new();

        if dense_cols > 0 {
            for row in values[..needed].chunks_exact(dense_cols) {
                for (j, &v) in row.iter().enumerate() {
                    if !v.is_nan() {
                        data.push(v);
                        col_ind.push(j as u32);
                    }
                }
                row_ptr.push(data.len());
            }
        } else {
            row_ptr.resize(num_row + 1, 0);
        }

        let csr = Self {
            data,
            col_ind,
            row_ptr,
            num_row,
            num_col,
        };
        csr.check_invariants()?;
        Ok(csr)
    }

    fn check_invariants(&self) -> DlrResult<()> {
        let last = self.row_ptr.last().copied().unwrap_or(0);
        if self.data.len() != self.col_ind.len()
            || self.data.len() != last
            || self.row_ptr.len() != self.num_row + 1
        {
            return Err(DlrError::Precondition(format!(
                "malformed CSR matrix: {} values, {} column indices, {} row pointers for {} rows",
                self.data.len(),
                self.col_ind.len(),
                self.row_ptr.len(),
                self.num_row
            )));
        }
        Ok(())
    }

    pub fn data(&self) -> &[f32] {
        &self.data
    }

    pub fn col_ind(&self) -> &[u32] {
        &self.col_ind
    }

    pub fn row_ptr(&self) -> &[usize] {
        &self.row_ptr
    }

    pub fn num_row(&self) -> usize {
        self.num_row
    }

    pub fn num_col(&self) -> usize {
        self.num_col
    }

    /// Present values and their columns for row `i`, or `None` past the
    /// last row.
    pub fn row(&self, i: usize) -> Option<(&[f32], &[u32])> {
        let start = *self.row_ptr.get(i)?;
        let end = *self.row_ptr.get(i.checked_add(1)?)?;
        Some((self.data.get(start..end)?, self.col_ind.get(start..end)?))
    }
}
