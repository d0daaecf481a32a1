//! Exact top-k retrieval by dense inner product.
//!
//! # Algorithm
//!
//! For every query row, score every candidate row by dot product, then keep
//! the `k` best in a bounded min-heap:
//!
//! 1. Excluded candidates are scored [`SENTINEL_SCORE`] (the most negative
//!    finite `f32`) instead of being skipped, so they sort last.
//! 2. Selection orders by descending score; equal scores order by ascending
//!    candidate id, so results are deterministic.
//! 3. The ranked list is cut at the first entry scoring `<= SENTINEL_SCORE`.
//!    Legitimate finite scores always sit above the sentinel, so the cut both
//!    removes excluded ids and signals that fewer than `k` valid candidates
//!    remained.
//!
//! Bias terms are folded into the vectors (see [`layout`]) so a single dot
//! product yields `user_bias + item_bias + <user_emb, item_emb>`.
//!
//! # Complexity
//!
//! `O(n_q · n_c · d)` for scoring plus `O(n_c log k)` per query for
//! selection. Queries are scored in parallel.
//!
//! # Example
//!
//! ```rust
//! use decayrank::matrix::DenseMatrix;
//! use decayrank::topk::{Exclusion, TopKRetriever};
//! use std::collections::HashSet;
//!
//! let candidates = DenseMatrix::from_rows(&[vec![1.0, 0.0], vec![0.0, 1.0], vec![1.0, 1.0]]).unwrap();
//! let query = DenseMatrix::from_rows(&[vec![1.0, 0.5]]).unwrap();
//! let excluded: HashSet<u32> = [2].into_iter().collect();
//!
//! let results = TopKRetriever::new(2)
//!     .search(&query, &candidates, 10, Exclusion::Shared(&excluded))
//!     .unwrap();
//! assert_eq!(results[0], vec![(0, 1.0), (1, 0.5)]);
//! ```

pub mod layout;

use crate::error::{RecError, Result};
use crate::matrix::DenseMatrix;
use crate::simd;
use rayon::prelude::*;
use std::cmp::{Ordering, Reverse};
use std::collections::{BinaryHeap, HashSet};
use tracing::debug;

/// Score forced onto excluded candidates: `-3.4028235e38`.
pub const SENTINEL_SCORE: f32 = f32::MIN;

const NORM_EPSILON: f32 = 1e-10;

/// Candidate ids to keep out of results.
#[derive(Debug, Clone, Copy, Default)]
pub enum Exclusion<'a> {
    #[default]
    None,
    /// Same exclusion set for every query.
    Shared(&'a HashSet<u32>),
    /// One exclusion set per query row.
    PerQuery(&'a [HashSet<u32>]),
}

impl<'a> Exclusion<'a> {
    #[inline]
    fn for_query(&self, query: usize) -> Option<&'a HashSet<u32>> {
        match *self {
            Exclusion::None => None,
            Exclusion::Shared(set) => Some(set),
            Exclusion::PerQuery(sets) => sets.get(query),
        }
    }

    fn check(&self, n_queries: usize) -> Result<()> {
        match self {
            Exclusion::PerQuery(sets) if sets.len() != n_queries => {
                Err(RecError::shape("per-query exclusion sets", n_queries, sets.len()))
            }
            _ => Ok(()),
        }
    }
}

/// Candidate during selection. Greater means better: higher score, then
/// lower id.
#[derive(Clone, Copy, PartialEq)]
struct Ranked {
    id: u32,
    score: f32,
}

impl Eq for Ranked {}

impl Ord for Ranked {
    fn cmp(&self, other: &Self) -> Ordering {
        self.score
            .total_cmp(&other.score)
            .then_with(|| other.id.cmp(&self.id))
    }
}

impl PartialOrd for Ranked {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Keep the best `k` of `scored`, best first, cut at the sentinel.
fn select_top_k(scored: impl Iterator<Item = (u32, f32)>, k: usize) -> Vec<(u32, f32)> {
    if k == 0 {
        return Vec::new();
    }
    let mut heap: BinaryHeap<Reverse<Ranked>> = BinaryHeap::with_capacity(k + 1);
    for (id, score) in scored {
        let candidate = Ranked { id, score };
        if heap.len() < k {
            heap.push(Reverse(candidate));
        } else if heap.peek().is_some_and(|worst| candidate > worst.0) {
            heap.pop();
            heap.push(Reverse(candidate));
        }
    }

    // Ascending order of Reverse<_> is best-first.
    heap.into_sorted_vec()
        .into_iter()
        .map(|Reverse(r)| (r.id, r.score))
        .take_while(|&(_, score)| score > SENTINEL_SCORE)
        .collect()
}

/// Stateless exact top-k scorer for a fixed vector dimension.
#[derive(Debug, Clone, Copy)]
pub struct TopKRetriever {
    dimension: usize,
}

impl TopKRetriever {
    /// `dimension` is the expected column count of query and candidate
    /// matrices, bias columns included.
    pub fn new(dimension: usize) -> Self {
        Self { dimension }
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    fn check_shapes(&self, queries: &DenseMatrix, candidates: &DenseMatrix) -> Result<()> {
        if queries.n_cols() != self.dimension {
            return Err(RecError::shape("query dimension", self.dimension, queries.n_cols()));
        }
        if candidates.n_cols() != self.dimension {
            return Err(RecError::shape("candidate dimension", self.dimension, candidates.n_cols()));
        }
        Ok(())
    }

    /// Top-`k` candidates for every query row, as `(candidate_row, score)`.
    pub fn search(
        &self,
        queries: &DenseMatrix,
        candidates: &DenseMatrix,
        k: usize,
        exclusion: Exclusion<'_>,
    ) -> Result<Vec<Vec<(u32, f32)>>> {
        self.search_impl(queries, candidates, None, k, exclusion)
    }

    /// Like [`search`](Self::search), with each candidate's score divided by
    /// its norm (`candidate_norms[j]`). Near-zero norms leave the score as is.
    pub fn search_normalized(
        &self,
        queries: &DenseMatrix,
        candidates: &DenseMatrix,
        candidate_norms: &[f32],
        k: usize,
        exclusion: Exclusion<'_>,
    ) -> Result<Vec<Vec<(u32, f32)>>> {
        if candidate_norms.len() != candidates.n_rows() {
            return Err(RecError::shape(
                "candidate norms",
                candidates.n_rows(),
                candidate_norms.len(),
            ));
        }
        self.search_impl(queries, candidates, Some(candidate_norms), k, exclusion)
    }

    /// Similarity search where query row `i` is candidate `query_ids[i]`
    /// itself: that id is always excluded from its own results, on top of
    /// any caller exclusion.
    pub fn search_similar(
        &self,
        query_ids: &[u32],
        queries: &DenseMatrix,
        candidates: &DenseMatrix,
        candidate_norms: Option<&[f32]>,
        k: usize,
        exclusion: Exclusion<'_>,
    ) -> Result<Vec<Vec<(u32, f32)>>> {
        if query_ids.len() != queries.n_rows() {
            return Err(RecError::shape("similarity query ids", queries.n_rows(), query_ids.len()));
        }
        exclusion.check(queries.n_rows())?;

        let per_query: Vec<HashSet<u32>> = query_ids
            .iter()
            .enumerate()
            .map(|(i, &id)| {
                let mut set = exclusion.for_query(i).cloned().unwrap_or_default();
                set.insert(id);
                set
            })
            .collect();
        let exclusion = Exclusion::PerQuery(&per_query);

        match candidate_norms {
            Some(norms) => self.search_normalized(queries, candidates, norms, k, exclusion),
            None => self.search(queries, candidates, k, exclusion),
        }
    }

    fn search_impl(
        &self,
        queries: &DenseMatrix,
        candidates: &DenseMatrix,
        candidate_norms: Option<&[f32]>,
        k: usize,
        exclusion: Exclusion<'_>,
    ) -> Result<Vec<Vec<(u32, f32)>>> {
        self.check_shapes(queries, candidates)?;
        exclusion.check(queries.n_rows())?;
        debug!(
            queries = queries.n_rows(),
            candidates = candidates.n_rows(),
            k,
            "top-k search"
        );

        let results = (0..queries.n_rows())
            .into_par_iter()
            .map(|qi| {
                let query = queries.row(qi);
                let excluded = exclusion.for_query(qi);
                let scored = candidates.rows().enumerate().map(|(ci, candidate)| {
                    let id = ci as u32;
                    if excluded.is_some_and(|set| set.contains(&id)) {
                        return (id, SENTINEL_SCORE);
                    }
                    let mut score = simd::dot(query, candidate);
                    if let Some(norms) = candidate_norms {
                        if norms[ci] > NORM_EPSILON {
                            score /= norms[ci];
                        }
                    }
                    if score.is_nan() {
                        score = SENTINEL_SCORE;
                    }
                    (id, score)
                });
                select_top_k(scored, k)
            })
            .collect();
        Ok(results)
    }
}
