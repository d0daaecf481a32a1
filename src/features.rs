//! Side-feature blocks for users and items.
//!
//! A [`FeatureStore`] hands the assembler an optional sparse block with one
//! row per requested id. Returning `None` is valid and means identity-only
//! input vectors.

use crate::error::{RecError, Result};
use crate::matrix::SparseMatrix;
use std::collections::HashMap;

/// Source of per-id sparse side features.
pub trait FeatureStore {
    /// Feature rows for `user_ids` (or ids `0..num_users` when `None`).
    fn user_features(&self, user_ids: Option<&[u32]>, num_users: usize) -> Option<SparseMatrix>;

    /// Feature rows for `item_ids` (or ids `0..num_items` when `None`).
    fn item_features(&self, item_ids: Option<&[u32]>, num_items: usize) -> Option<SparseMatrix>;
}

/// No side features at all.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoFeatures;

impl FeatureStore for NoFeatures {
    fn user_features(&self, _user_ids: Option<&[u32]>, _num_users: usize) -> Option<SparseMatrix> {
        None
    }

    fn item_features(&self, _item_ids: Option<&[u32]>, _num_items: usize) -> Option<SparseMatrix> {
        None
    }
}

/// Fixed-width sparse feature rows for one id space.
#[derive(Debug, Clone, Default)]
struct FeatureTable {
    width: usize,
    rows: HashMap<u32, Vec<(u32, f32)>>,
}

impl FeatureTable {
    fn set(&mut self, id: u32, features: Vec<(u32, f32)>) -> Result<()> {
        if let Some(&(col, _)) = features.iter().find(|(c, _)| *c as usize >= self.width) {
            return Err(RecError::InvalidParameter(format!(
                "feature column {col} out of bounds for width {}",
                self.width
            )));
        }
        self.rows.insert(id, features);
        Ok(())
    }

    /// `None` when no feature columns are configured.
    fn block(&self, ids: Option<&[u32]>, universe: usize) -> Option<SparseMatrix> {
        if self.width == 0 {
            return None;
        }
        let row_for = |id: u32| self.rows.get(&id).cloned().unwrap_or_default();
        let rows: Vec<_> = match ids {
            Some(ids) => ids.iter().map(|&id| row_for(id)).collect(),
            None => (0..universe as u32).map(row_for).collect(),
        };
        // Columns were bounds-checked in `set`.
        SparseMatrix::from_rows(self.width, rows).ok()
    }
}

/// In-memory feature store. Ids without features get empty rows.
///
/// ```rust
/// use decayrank::features::{FeatureStore, InMemoryFeatureStore};
///
/// let mut store = InMemoryFeatureStore::new(0, 3);
/// store.set_item_features(1, vec![(2, 1.0)]).unwrap();
/// let block = store.item_features(Some(&[0, 1]), 2).unwrap();
/// assert_eq!((block.n_rows(), block.n_cols()), (2, 3));
/// assert!(store.user_features(None, 4).is_none());
/// ```
#[derive(Debug, Clone, Default)]
pub struct InMemoryFeatureStore {
    users: FeatureTable,
    items: FeatureTable,
}

impl InMemoryFeatureStore {
    /// A width of zero disables features on that side.
    pub fn new(user_feature_width: usize, item_feature_width: usize) -> Self {
        Self {
            users: FeatureTable {
                width: user_feature_width,
                rows: HashMap::new(),
            },
            items: FeatureTable {
                width: item_feature_width,
                rows: HashMap::new(),
            },
        }
    }

    pub fn set_user_features(&mut self, user: u32, features: Vec<(u32, f32)>) -> Result<()> {
        self.users.set(user, features)
    }

    pub fn set_item_features(&mut self, item: u32, features: Vec<(u32, f32)>) -> Result<()> {
        self.items.set(item, features)
    }

    pub fn user_feature_width(&self) -> usize {
        self.users.width
    }

    pub fn item_feature_width(&self) -> usize {
        self.items.width
    }
}

impl FeatureStore for InMemoryFeatureStore {
    fn user_features(&self, user_ids: Option<&[u32]>, num_users: usize) -> Option<SparseMatrix> {
        self.users.block(user_ids, num_users)
    }

    fn item_features(&self, item_ids: Option<&[u32]>, num_items: usize) -> Option<SparseMatrix> {
        self.items.block(item_ids, num_items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_features_is_always_none() {
        assert!(NoFeatures.user_features(None, 3).is_none());
        assert!(NoFeatures.item_features(Some(&[1]), 3).is_none());
    }

    #[test]
    fn rows_follow_requested_order() {
        let mut store = InMemoryFeatureStore::new(2, 0);
        store.set_user_features(4, vec![(1, 2.0)]).unwrap();
        store.set_user_features(0, vec![(0, 1.0)]).unwrap();

        let block = store.user_features(Some(&[4, 7, 0]), 8).unwrap();
        assert_eq!(block.n_rows(), 3);
        assert_eq!(block.row(0), (&[1u32][..], &[2.0f32][..]));
        assert!(block.row(1).0.is_empty());
        assert_eq!(block.row(2), (&[0u32][..], &[1.0f32][..]));

        let full = store.user_features(None, 5).unwrap();
        assert_eq!(full.n_rows(), 5);
        assert_eq!(full.row(4).0, &[1]);
    }

    #[test]
    fn out_of_width_feature_rejected() {
        let mut store = InMemoryFeatureStore::new(1, 1);
        assert!(store.set_item_features(0, vec![(1, 1.0)]).is_err());
    }
}
