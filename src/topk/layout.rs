//! Folded-bias vector layouts.
//!
//! Personalized scoring wants `user_bias + item_bias + <u, i>`. Packing the
//! biases into the vectors turns that into one dot product:
//!
//! ```text
//! query      [ user_bias, 1,         u_1 .. u_d ]
//! candidate  [ 1,         item_bias, i_1 .. i_d ]
//! ```
//!
//! Item-to-item similarity drops the constant column: `[item_bias, i_1 .. i_d]`
//! on both sides.

use crate::embeddings::Representations;
use crate::error::{RecError, Result};
use crate::matrix::DenseMatrix;

fn fold(reps: &Representations, head: impl Fn(f32) -> Vec<f32>) -> Result<DenseMatrix> {
    if reps.biases.len() != reps.embeddings.n_rows() {
        return Err(RecError::shape(
            "bias count vs embedding rows",
            reps.embeddings.n_rows(),
            reps.biases.len(),
        ));
    }
    let head_len = head(0.0).len();
    let width = head_len + reps.dimension();
    let mut out = DenseMatrix::zeros(reps.len(), width);
    for (i, &bias) in reps.biases.iter().enumerate() {
        let row = out.row_mut(i);
        row[..head_len].copy_from_slice(&head(bias));
        row[head_len..].copy_from_slice(reps.embeddings.row(i));
    }
    Ok(out)
}

/// User rows as `[bias, 1, embedding..]`; width `d + 2`.
pub fn personalized_queries(users: &Representations) -> Result<DenseMatrix> {
    fold(users, |bias| vec![bias, 1.0])
}

/// Item rows as `[1, bias, embedding..]`; width `d + 2`.
pub fn personalized_candidates(items: &Representations) -> Result<DenseMatrix> {
    fold(items, |bias| vec![1.0, bias])
}

/// Item rows as `[bias, embedding..]`; width `d + 1`.
pub fn similarity_vectors(items: &Representations) -> Result<DenseMatrix> {
    fold(items, |bias| vec![bias])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simd;

    fn reps(biases: Vec<f32>, rows: &[Vec<f32>]) -> Representations {
        Representations::new(biases, DenseMatrix::from_rows(rows).unwrap()).unwrap()
    }

    #[test]
    fn dot_product_recovers_biased_score() {
        let users = reps(vec![0.5], &[vec![1.0, 2.0]]);
        let items = reps(vec![0.25, -1.0], &[vec![3.0, 4.0], vec![0.0, 1.0]]);

        let q = personalized_queries(&users).unwrap();
        let c = personalized_candidates(&items).unwrap();
        assert_eq!(q.n_cols(), 4);
        assert_eq!(c.n_cols(), 4);
        assert_eq!(q.row(0), &[0.5, 1.0, 1.0, 2.0]);
        assert_eq!(c.row(1), &[1.0, -1.0, 0.0, 1.0]);

        // 0.5 + 0.25 + (3 + 8)
        assert_eq!(simd::dot(q.row(0), c.row(0)), 11.75);
        // 0.5 - 1 + 2
        assert_eq!(simd::dot(q.row(0), c.row(1)), 1.5);
    }

    #[test]
    fn similarity_layout_prepends_bias() {
        let items = reps(vec![2.0], &[vec![1.0, -1.0]]);
        let v = similarity_vectors(&items).unwrap();
        assert_eq!((v.n_rows(), v.n_cols()), (1, 3));
        assert_eq!(v.row(0), &[2.0, 1.0, -1.0]);
    }

    #[test]
    fn inconsistent_representations_rejected() {
        let broken = Representations {
            biases: vec![0.0, 1.0],
            embeddings: DenseMatrix::zeros(1, 3),
        };
        assert!(personalized_queries(&broken).unwrap_err().is_shape_mismatch());
    }

    #[test]
    fn empty_side_has_zero_rows() {
        let none = reps(vec![], &[] as &[Vec<f32>]);
        let v = personalized_candidates(&none).unwrap();
        assert_eq!(v.n_rows(), 0);
    }
}
