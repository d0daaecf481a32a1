//! Sparse snapshot export of the interaction store.

use crate::error::Result;
use crate::matrix::SparseMatrix;
use std::collections::HashMap;

/// Physical ordering of exported triples.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SparseOrder {
    /// Grouped by row (user), then column: CSR-friendly.
    #[default]
    RowMajor,
    /// Grouped by column (item), then row: CSC-friendly.
    ColumnMajor,
}

/// Optional user / item subsets for export.
///
/// A selected axis is remapped to the selection's index order: the record for
/// `selected_users[i]` lands on row `i`. Records outside a selection are
/// skipped. If an id appears more than once, its first position wins.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExportSelection<'a> {
    pub users: Option<&'a [u32]>,
    pub items: Option<&'a [u32]>,
}

impl<'a> ExportSelection<'a> {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn new(users: Option<&'a [u32]>, items: Option<&'a [u32]>) -> Self {
        Self { users, items }
    }
}

/// Maps a raw id to its exported position along one axis.
pub(crate) enum AxisMap {
    Identity,
    Selected(HashMap<u32, u32>),
}

impl AxisMap {
    pub(crate) fn new(selection: Option<&[u32]>) -> Self {
        match selection {
            None => AxisMap::Identity,
            Some(ids) => {
                let mut positions = HashMap::with_capacity(ids.len());
                for (pos, &id) in ids.iter().enumerate() {
                    positions.entry(id).or_insert(pos as u32);
                }
                AxisMap::Selected(positions)
            }
        }
    }

    #[inline]
    pub(crate) fn position(&self, id: u32) -> Option<u32> {
        match self {
            AxisMap::Identity => Some(id),
            AxisMap::Selected(positions) => positions.get(&id).copied(),
        }
    }
}

/// Coordinate-format snapshot: parallel `rows`, `cols`, `values` plus shape.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SparseTriples {
    pub rows: Vec<u32>,
    pub cols: Vec<u32>,
    pub values: Vec<f32>,
    pub shape: (usize, usize),
}

impl SparseTriples {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            rows: Vec::with_capacity(capacity),
            cols: Vec::with_capacity(capacity),
            values: Vec::with_capacity(capacity),
            shape: (0, 0),
        }
    }

    pub(crate) fn push(&mut self, row: u32, col: u32, value: f32) {
        self.rows.push(row);
        self.cols.push(col);
        self.values.push(value);
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (u32, u32, f32)> + '_ {
        self.rows
            .iter()
            .zip(&self.cols)
            .zip(&self.values)
            .map(|((&r, &c), &v)| (r, c, v))
    }

    /// Reorder triples in place.
    pub(crate) fn sort(&mut self, order: SparseOrder) {
        let mut perm: Vec<usize> = (0..self.len()).collect();
        match order {
            SparseOrder::RowMajor => perm.sort_unstable_by_key(|&i| (self.rows[i], self.cols[i])),
            SparseOrder::ColumnMajor => perm.sort_unstable_by_key(|&i| (self.cols[i], self.rows[i])),
        }
        self.rows = perm.iter().map(|&i| self.rows[i]).collect();
        self.cols = perm.iter().map(|&i| self.cols[i]).collect();
        self.values = perm.iter().map(|&i| self.values[i]).collect();
    }

    /// Compress into a CSR matrix of the export shape.
    pub fn to_csr(&self) -> Result<SparseMatrix> {
        SparseMatrix::from_triples(self.shape, &self.rows, &self.cols, &self.values)
    }
}
