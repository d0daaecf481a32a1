//! Minimal dense and sparse `f32` matrices.
//!
//! [`DenseMatrix`] is a row-major flat buffer (one allocation, rows are
//! contiguous slices), the layout scoring wants. [`SparseMatrix`] is CSR,
//! the layout for identity and side-feature blocks.

use crate::error::{RecError, Result};
use crate::simd;
use serde::{Deserialize, Serialize};

/// Row-major dense matrix.
///
/// Deserialization goes through [`DenseMatrix::from_vec`], so a buffer whose
/// length disagrees with the declared shape is rejected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawDense")]
pub struct DenseMatrix {
    n_rows: usize,
    n_cols: usize,
    data: Vec<f32>,
}

/// Unchecked wire form of [`DenseMatrix`].
#[derive(Deserialize)]
struct RawDense {
    n_rows: usize,
    n_cols: usize,
    data: Vec<f32>,
}

impl TryFrom<RawDense> for DenseMatrix {
    type Error = RecError;

    fn try_from(raw: RawDense) -> Result<Self> {
        Self::from_vec(raw.n_rows, raw.n_cols, raw.data)
    }
}

impl DenseMatrix {
    /// All-zero matrix.
    pub fn zeros(n_rows: usize, n_cols: usize) -> Self {
        Self {
            n_rows,
            n_cols,
            data: vec![0.0; n_rows * n_cols],
        }
    }

    /// Wrap a flat row-major buffer.
    pub fn from_vec(n_rows: usize, n_cols: usize, data: Vec<f32>) -> Result<Self> {
        if data.len() != n_rows * n_cols {
            return Err(RecError::shape("dense buffer length", n_rows * n_cols, data.len()));
        }
        Ok(Self {
            n_rows,
            n_cols,
            data,
        })
    }

    /// Build from equally sized rows.
    pub fn from_rows<R: AsRef<[f32]>>(rows: &[R]) -> Result<Self> {
        let n_cols = rows.first().map_or(0, |r| r.as_ref().len());
        let mut data = Vec::with_capacity(rows.len() * n_cols);
        for row in rows {
            let row = row.as_ref();
            if row.len() != n_cols {
                return Err(RecError::shape("dense row width", n_cols, row.len()));
            }
            data.extend_from_slice(row);
        }
        Ok(Self {
            n_rows: rows.len(),
            n_cols,
            data,
        })
    }

    #[inline]
    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    #[inline]
    pub fn n_cols(&self) -> usize {
        self.n_cols
    }

    #[inline]
    pub fn row(&self, i: usize) -> &[f32] {
        &self.data[i * self.n_cols..(i + 1) * self.n_cols]
    }

    #[inline]
    pub fn row_mut(&mut self, i: usize) -> &mut [f32] {
        &mut self.data[i * self.n_cols..(i + 1) * self.n_cols]
    }

    pub fn rows(&self) -> impl Iterator<Item = &[f32]> + '_ {
        (0..self.n_rows).map(move |i| self.row(i))
    }

    /// L2 norm of every row.
    pub fn row_norms(&self) -> Vec<f32> {
        self.rows().map(simd::norm).collect()
    }
}

/// Compressed sparse row matrix.
#[derive(Debug, Clone, PartialEq)]
pub struct SparseMatrix {
    n_rows: usize,
    n_cols: usize,
    indptr: Vec<usize>,
    indices: Vec<u32>,
    data: Vec<f32>,
}

impl SparseMatrix {
    /// Matrix with no stored entries.
    pub fn empty(n_rows: usize, n_cols: usize) -> Self {
        Self {
            n_rows,
            n_cols,
            indptr: vec![0; n_rows + 1],
            indices: Vec::new(),
            data: Vec::new(),
        }
    }

    /// `n x n` identity.
    pub fn identity(n: usize) -> Self {
        Self {
            n_rows: n,
            n_cols: n,
            indptr: (0..=n).collect(),
            indices: (0..n as u32).collect(),
            data: vec![1.0; n],
        }
    }

    /// Build from per-row `(col, value)` lists. Columns are sorted within
    /// each row; duplicate columns are summed.
    pub fn from_rows(n_cols: usize, rows: Vec<Vec<(u32, f32)>>) -> Result<Self> {
        let n_rows = rows.len();
        let mut indptr = Vec::with_capacity(n_rows + 1);
        let mut indices = Vec::new();
        let mut data = Vec::new();
        indptr.push(0);

        for mut row in rows {
            row.sort_by_key(|&(c, _)| c);
            for (col, value) in row {
                if col as usize >= n_cols {
                    return Err(RecError::InvalidParameter(format!(
                        "column {col} out of bounds for width {n_cols}"
                    )));
                }
                let row_start = *indptr.last().unwrap_or(&0);
                if indices.len() > row_start && indices.last() == Some(&col) {
                    if let Some(last) = data.last_mut() {
                        *last += value;
                    }
                } else {
                    indices.push(col);
                    data.push(value);
                }
            }
            indptr.push(indices.len());
        }

        Ok(Self {
            n_rows,
            n_cols,
            indptr,
            indices,
            data,
        })
    }

    /// Build from coordinate triples. Duplicate coordinates are summed.
    pub fn from_triples(
        shape: (usize, usize),
        rows: &[u32],
        cols: &[u32],
        values: &[f32],
    ) -> Result<Self> {
        if cols.len() != rows.len() {
            return Err(RecError::shape("triple column count", rows.len(), cols.len()));
        }
        if values.len() != rows.len() {
            return Err(RecError::shape("triple value count", rows.len(), values.len()));
        }
        let (n_rows, n_cols) = shape;
        let mut per_row: Vec<Vec<(u32, f32)>> = vec![Vec::new(); n_rows];
        for ((&r, &c), &v) in rows.iter().zip(cols).zip(values) {
            let slot = per_row.get_mut(r as usize).ok_or_else(|| {
                RecError::InvalidParameter(format!("row {r} out of bounds for height {n_rows}"))
            })?;
            slot.push((c, v));
        }
        Self::from_rows(n_cols, per_row)
    }

    /// Horizontally concatenate `other` to the right of `self`.
    pub fn hstack(&self, other: &SparseMatrix) -> Result<Self> {
        if other.n_rows != self.n_rows {
            return Err(RecError::shape("hstack row count", self.n_rows, other.n_rows));
        }
        let offset = self.n_cols as u32;
        let mut indptr = Vec::with_capacity(self.n_rows + 1);
        let mut indices = Vec::with_capacity(self.nnz() + other.nnz());
        let mut data = Vec::with_capacity(self.nnz() + other.nnz());
        indptr.push(0);
        for i in 0..self.n_rows {
            let (li, lv) = self.row(i);
            let (ri, rv) = other.row(i);
            indices.extend_from_slice(li);
            data.extend_from_slice(lv);
            indices.extend(ri.iter().map(|c| c + offset));
            data.extend_from_slice(rv);
            indptr.push(indices.len());
        }
        Ok(Self {
            n_rows: self.n_rows,
            n_cols: self.n_cols + other.n_cols,
            indptr,
            indices,
            data,
        })
    }

    #[inline]
    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    #[inline]
    pub fn n_cols(&self) -> usize {
        self.n_cols
    }

    #[inline]
    pub fn nnz(&self) -> usize {
        self.indices.len()
    }

    /// Column indices and values of row `i`.
    #[inline]
    pub fn row(&self, i: usize) -> (&[u32], &[f32]) {
        let (start, end) = (self.indptr[i], self.indptr[i + 1]);
        (&self.indices[start..end], &self.data[start..end])
    }

    /// `self * v` for a dense column vector `v`.
    pub fn mul_vec(&self, v: &[f32]) -> Result<Vec<f32>> {
        if v.len() != self.n_cols {
            return Err(RecError::shape("sparse-vector product width", self.n_cols, v.len()));
        }
        Ok((0..self.n_rows)
            .map(|i| {
                let (cols, vals) = self.row(i);
                cols.iter().zip(vals).map(|(&c, &x)| x * v[c as usize]).sum()
            })
            .collect())
    }

    /// `self * table` for a dense `n_cols x d` table.
    pub fn mul_dense(&self, table: &DenseMatrix) -> Result<DenseMatrix> {
        if table.n_rows() != self.n_cols {
            return Err(RecError::shape("sparse-dense product height", self.n_cols, table.n_rows()));
        }
        let mut out = DenseMatrix::zeros(self.n_rows, table.n_cols());
        for i in 0..self.n_rows {
            let (cols, vals) = self.row(i);
            let out_row = out.row_mut(i);
            for (&c, &x) in cols.iter().zip(vals) {
                simd::axpy(out_row, x, table.row(c as usize));
            }
        }
        Ok(out)
    }

    /// Dense copy, mostly for inspection in tests.
    pub fn to_dense(&self) -> DenseMatrix {
        let mut out = DenseMatrix::zeros(self.n_rows, self.n_cols);
        for i in 0..self.n_rows {
            let (cols, vals) = self.row(i);
            let row = out.row_mut(i);
            for (&c, &x) in cols.iter().zip(vals) {
                row[c as usize] = x;
            }
        }
        out
    }
}
