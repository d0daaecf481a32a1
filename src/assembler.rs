//! Identity-plus-features matrix assembly.
//!
//! A factorization model learns one latent vector per input column. Giving
//! every id its own one-hot column (the identity block) lets the model learn
//! a per-id bias and embedding; side features, when present, are appended to
//! the right so their effects are learned alongside.
//!
//! ```text
//!                 universe_size         feature_width
//!        +-----------------------------+-------------+
//! row i  | 0 .. 1 at requested[i] .. 0 | features[i] |
//!        +-----------------------------+-------------+
//! ```

use crate::error::{RecError, Result};
use crate::matrix::SparseMatrix;

/// Builds identity-augmented input matrices. Stateless.
#[derive(Debug, Clone, Copy, Default)]
pub struct VectorAssembler;

impl VectorAssembler {
    /// Assemble the input matrix for `requested_ids` (or every id in
    /// `0..universe_size` when `None`).
    ///
    /// The result has shape `(rows, universe_size + feature_width)` where
    /// `rows` is the number of requested ids. Fails with
    /// [`RecError::ShapeMismatch`] if the feature block's row count differs
    /// from `rows`, and with [`RecError::InvalidParameter`] if a requested id
    /// is outside the universe.
    pub fn build(
        universe_size: usize,
        requested_ids: Option<&[u32]>,
        feature_block: Option<&SparseMatrix>,
    ) -> Result<SparseMatrix> {
        let identity = match requested_ids {
            None => SparseMatrix::identity(universe_size),
            Some(ids) => {
                let rows = ids
                    .iter()
                    .map(|&id| {
                        if (id as usize) < universe_size {
                            Ok(vec![(id, 1.0)])
                        } else {
                            Err(RecError::InvalidParameter(format!(
                                "id {id} outside universe of {universe_size}"
                            )))
                        }
                    })
                    .collect::<Result<Vec<_>>>()?;
                SparseMatrix::from_rows(universe_size, rows)?
            }
        };

        match feature_block {
            None => Ok(identity),
            Some(features) => {
                if features.n_rows() != identity.n_rows() {
                    return Err(RecError::shape(
                        "feature block rows",
                        identity.n_rows(),
                        features.n_rows(),
                    ));
                }
                identity.hstack(features)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_universe_is_identity() {
        let m = VectorAssembler::build(4, None, None).unwrap();
        assert_eq!((m.n_rows(), m.n_cols()), (4, 4));
        for i in 0..4 {
            assert_eq!(m.row(i), (&[i as u32][..], &[1.0f32][..]));
        }
    }

    #[test]
    fn requested_ids_select_one_hot_rows() {
        let m = VectorAssembler::build(5, Some(&[3, 0]), None).unwrap();
        assert_eq!((m.n_rows(), m.n_cols()), (2, 5));
        assert_eq!(m.row(0).0, &[3]);
        assert_eq!(m.row(1).0, &[0]);
    }

    #[test]
    fn feature_block_is_appended() {
        let features = SparseMatrix::from_rows(2, vec![vec![(1, 0.5)], vec![]]).unwrap();
        let m = VectorAssembler::build(3, Some(&[2, 1]), Some(&features)).unwrap();
        assert_eq!((m.n_rows(), m.n_cols()), (2, 5));
        assert_eq!(m.row(0), (&[2u32, 4][..], &[1.0f32, 0.5][..]));
        assert_eq!(m.row(1), (&[1u32][..], &[1.0f32][..]));
    }

    #[test]
    fn feature_row_mismatch_is_shape_error() {
        let features = SparseMatrix::empty(3, 2);
        let err = VectorAssembler::build(4, Some(&[0, 1]), Some(&features)).unwrap_err();
        assert!(err.is_shape_mismatch());

        let err = VectorAssembler::build(4, None, Some(&features)).unwrap_err();
        assert!(err.is_shape_mismatch());
    }

    #[test]
    fn out_of_universe_id_rejected() {
        let err = VectorAssembler::build(2, Some(&[2]), None).unwrap_err();
        assert!(matches!(err, RecError::InvalidParameter(_)));
    }
}
