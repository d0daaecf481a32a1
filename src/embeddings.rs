//! Learned representation providers.
//!
//! The factorization model is trained elsewhere. Retrieval only needs, for an
//! assembled input matrix, one bias and one embedding row per input row. That
//! capability is the [`EmbeddingsProvider`] trait; [`LinearEmbeddings`] is
//! the usual concrete form, where a representation is the feature row times a
//! per-column parameter table.

use crate::error::{RecError, Result};
use crate::matrix::{DenseMatrix, SparseMatrix};
use serde::{Deserialize, Serialize};

/// Per-row biases and embeddings for one side (users or items).
#[derive(Debug, Clone, PartialEq)]
pub struct Representations {
    pub biases: Vec<f32>,
    pub embeddings: DenseMatrix,
}

impl Representations {
    pub fn new(biases: Vec<f32>, embeddings: DenseMatrix) -> Result<Self> {
        if biases.len() != embeddings.n_rows() {
            return Err(RecError::shape(
                "bias count vs embedding rows",
                embeddings.n_rows(),
                biases.len(),
            ));
        }
        Ok(Self { biases, embeddings })
    }

    pub fn len(&self) -> usize {
        self.biases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.biases.is_empty()
    }

    pub fn dimension(&self) -> usize {
        self.embeddings.n_cols()
    }

    /// Check that the provider returned one row per requested input row.
    pub fn validate(&self, expected_rows: usize) -> Result<()> {
        if self.biases.len() != expected_rows {
            return Err(RecError::shape("representation rows", expected_rows, self.biases.len()));
        }
        if self.embeddings.n_rows() != expected_rows {
            return Err(RecError::shape(
                "embedding rows",
                expected_rows,
                self.embeddings.n_rows(),
            ));
        }
        Ok(())
    }
}

/// Injected source of trained user/item representations.
///
/// Implementations receive the assembled (identity + features) matrix and
/// return one row per input row. Values are not inspected; only shapes are.
pub trait EmbeddingsProvider {
    fn user_representations(&self, features: &SparseMatrix) -> Result<Representations>;

    fn item_representations(&self, features: &SparseMatrix) -> Result<Representations>;
}

impl<P: EmbeddingsProvider + ?Sized> EmbeddingsProvider for Box<P> {
    fn user_representations(&self, features: &SparseMatrix) -> Result<Representations> {
        (**self).user_representations(features)
    }

    fn item_representations(&self, features: &SparseMatrix) -> Result<Representations> {
        (**self).item_representations(features)
    }
}

/// Parameter tables for one side: a bias and an embedding per input column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterTable {
    pub biases: Vec<f32>,
    pub embeddings: DenseMatrix,
}

impl ParameterTable {
    pub fn new(biases: Vec<f32>, embeddings: DenseMatrix) -> Result<Self> {
        if biases.len() != embeddings.n_rows() {
            return Err(RecError::shape(
                "parameter bias count vs embedding rows",
                embeddings.n_rows(),
                biases.len(),
            ));
        }
        Ok(Self { biases, embeddings })
    }

    fn project(&self, features: &SparseMatrix) -> Result<Representations> {
        let biases = features.mul_vec(&self.biases)?;
        let embeddings = features.mul_dense(&self.embeddings)?;
        Representations::new(biases, embeddings)
    }
}

/// Linear (LightFM-style) representations: `features · table`.
///
/// Trained tables can be shipped as JSON:
///
/// ```rust
/// use decayrank::embeddings::LinearEmbeddings;
///
/// let json = r#"{
///   "user": {"biases": [0.0, 0.1], "embeddings": {"n_rows": 2, "n_cols": 1, "data": [1.0, 2.0]}},
///   "item": {"biases": [0.5], "embeddings": {"n_rows": 1, "n_cols": 1, "data": [3.0]}}
/// }"#;
/// let model = LinearEmbeddings::from_json_str(json).unwrap();
/// assert_eq!(model.dimension(), 1);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearEmbeddings {
    pub user: ParameterTable,
    pub item: ParameterTable,
}

impl LinearEmbeddings {
    pub fn new(user: ParameterTable, item: ParameterTable) -> Result<Self> {
        let model = Self { user, item };
        model.validate()?;
        Ok(model)
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let model: Self = serde_json::from_str(json)?;
        model.validate()?;
        Ok(model)
    }

    fn validate(&self) -> Result<()> {
        for table in [&self.user, &self.item] {
            if table.biases.len() != table.embeddings.n_rows() {
                return Err(RecError::shape(
                    "parameter bias count vs embedding rows",
                    table.embeddings.n_rows(),
                    table.biases.len(),
                ));
            }
        }
        if self.user.embeddings.n_cols() != self.item.embeddings.n_cols() {
            return Err(RecError::shape(
                "user vs item embedding dimension",
                self.user.embeddings.n_cols(),
                self.item.embeddings.n_cols(),
            ));
        }
        Ok(())
    }

    pub fn dimension(&self) -> usize {
        self.user.embeddings.n_cols()
    }
}

impl EmbeddingsProvider for LinearEmbeddings {
    fn user_representations(&self, features: &SparseMatrix) -> Result<Representations> {
        self.user.project(features)
    }

    fn item_representations(&self, features: &SparseMatrix) -> Result<Representations> {
        self.item.project(features)
    }
}
