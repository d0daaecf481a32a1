//! decayrank: time-decayed interaction store and bias-augmented top-k retrieval.
//!
//! Two cores, plus the plumbing around a factorization recommender:
//!
//! - `interactions/`: per-(user, item) values with bounded accumulation,
//!   overwrite, lazy half-life decay, and sparse export
//! - `topk/`: exact inner-product top-k with sentinel exclusion and
//!   folded-bias vector layouts
//! - `assembler`: identity-plus-features input matrices
//! - `embeddings`, `features`: injected representation and side-feature sources
//! - `ingest`, `identifiers`, `recommender`: batch ingestion and the facade
//! - `metrics`: ranking quality at a cutoff
//!
//! # Critical Nuances
//!
//! ## Decay is read-time only
//!
//! Stored values never change with time. Every read scales by
//! `rate ^ (elapsed_seconds / 86400)`, where `rate = 1 - ln 2 / half_life`.
//! That is the first-order approximation of `2^(-1 / half_life)`: at a one-day
//! half-life it gives 0.307 per day rather than 0.5. Set
//! `StoreConfig::exact_half_life` for the exact form.
//!
//! ## Overwrite bypasses bounds
//!
//! Accumulating updates clip to `[min_value, max_value]`. Overwrites store
//! the raw value, so a store may legitimately hold values outside its bounds.
//!
//! ## Exclusion is a score, not a filter
//!
//! Excluded candidates score [`topk::SENTINEL_SCORE`] (`f32::MIN`) and the
//! ranked list is cut at the first score at or below it. Real scores are
//! finite and strictly above the sentinel, so a short list means fewer than
//! `k` eligible candidates existed.
//!
//! # Example
//!
//! ```rust
//! use decayrank::config::StoreConfig;
//! use decayrank::interactions::{ExportSelection, InteractionStore, SparseOrder};
//!
//! let mut store = InteractionStore::new(&StoreConfig::default()).unwrap();
//! store.add_interaction(0, 2, 0.0, 4.0, false);
//! store.add_interaction(1, 0, 0.0, -1.0, false);
//!
//! let triples = store.export(&ExportSelection::all(), SparseOrder::RowMajor);
//! assert_eq!(triples.shape, (2, 3));
//! assert_eq!(triples.iter().collect::<Vec<_>>(), vec![(0, 2, 4.0), (1, 0, -1.0)]);
//! ```

pub mod assembler;
pub mod clock;
pub mod config;
pub mod embeddings;
pub mod error;
pub mod features;
pub mod identifiers;
pub mod ingest;
pub mod interactions;
pub mod matrix;
pub mod metrics;
pub mod recommender;
pub mod simd;
pub mod topk;

// Re-exports
pub use config::{RecommenderConfig, RetrievalConfig, StoreConfig};
pub use error::{RecError, Result};
pub use interactions::InteractionStore;
pub use recommender::Recommender;
pub use topk::{Exclusion, TopKRetriever, SENTINEL_SCORE};
