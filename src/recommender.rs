//! End-to-end recommender facade.
//!
//! Wires the pieces together:
//!
//! ```text
//! ingest ──► Identifier ──► InteractionStore
//!                                 │ export
//!                                 ▼
//!                          TrainingBatch ──► (external trainer) ──► EmbeddingsProvider
//!                                                                         │
//! recommend / similar_items ◄── TopKRetriever ◄── layout ◄── VectorAssembler
//! ```
//!
//! Training happens outside this crate. A [`TrainingBatch`] carries the
//! decayed interaction triples plus the assembled identity-and-feature
//! matrices the trainer needs; once new parameters exist, install them with
//! [`Recommender::set_provider`].

use crate::assembler::VectorAssembler;
use crate::clock::{Clock, SystemClock};
use crate::config::RecommenderConfig;
use crate::embeddings::{EmbeddingsProvider, Representations};
use crate::error::Result;
use crate::features::FeatureStore;
use crate::identifiers::{ExternalId, Identifier};
use crate::ingest::{IngestStats, IngestTarget, InteractionBatch, RecordedIds};
use crate::interactions::{ExportSelection, InteractionStore, SparseOrder, SparseTriples};
use crate::matrix::SparseMatrix;
use crate::metrics::{self, MetricsSummary};
use crate::topk::{layout, Exclusion, TopKRetriever};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info};

/// Inputs for one round of model training.
#[derive(Debug, Clone)]
pub struct TrainingBatch {
    /// Decayed interactions, row-major. Rows follow `user_ids`, columns
    /// follow `item_ids`.
    pub interactions: SparseTriples,
    /// Identity-plus-features rows for `user_ids`.
    pub user_features: SparseMatrix,
    /// Identity-plus-features rows for `item_ids`.
    pub item_features: SparseMatrix,
    pub user_ids: Vec<u32>,
    pub item_ids: Vec<u32>,
}

/// Interaction store plus retrieval over injected representations.
pub struct Recommender<P, F> {
    config: RecommenderConfig,
    store: InteractionStore,
    users: Identifier,
    items: Identifier,
    recorded: RecordedIds,
    provider: P,
    features: F,
}

impl<P: EmbeddingsProvider, F: FeatureStore> Recommender<P, F> {
    pub fn new(config: RecommenderConfig, provider: P, features: F) -> Result<Self> {
        Self::with_clock(config, provider, features, Arc::new(SystemClock))
    }

    pub fn with_clock(
        config: RecommenderConfig,
        provider: P,
        features: F,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        let store = InteractionStore::with_clock(&config.store, clock)?;
        Ok(Self {
            config,
            store,
            users: Identifier::new(),
            items: Identifier::new(),
            recorded: RecordedIds::default(),
            provider,
            features,
        })
    }

    pub fn config(&self) -> &RecommenderConfig {
        &self.config
    }

    pub fn store(&self) -> &InteractionStore {
        &self.store
    }

    pub fn user_ids(&self) -> &Identifier {
        &self.users
    }

    pub fn item_ids(&self) -> &Identifier {
        &self.items
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Install freshly trained representations.
    pub fn set_provider(&mut self, provider: P) {
        self.provider = provider;
    }

    pub fn features_mut(&mut self) -> &mut F {
        &mut self.features
    }

    /// Apply a batch of interactions. Malformed records are skipped.
    pub fn ingest(&mut self, batch: InteractionBatch) -> IngestStats {
        IngestTarget {
            store: &mut self.store,
            users: &mut self.users,
            items: &mut self.items,
            recorded: &mut self.recorded,
        }
        .apply(batch, self.config.upsert)
    }

    fn user_input(&self, user_ids: Option<&[u32]>) -> Result<SparseMatrix> {
        let (num_users, _) = self.store.shape();
        let block = self.features.user_features(user_ids, num_users);
        VectorAssembler::build(num_users, user_ids, block.as_ref())
    }

    fn item_input(&self, item_ids: Option<&[u32]>) -> Result<SparseMatrix> {
        let (_, num_items) = self.store.shape();
        let block = self.features.item_features(item_ids, num_items);
        VectorAssembler::build(num_items, item_ids, block.as_ref())
    }

    /// Batch over ids touched since the previous call; `None` if nothing
    /// was ingested in between. Draining happens only on success.
    pub fn training_batch(&mut self) -> Result<Option<TrainingBatch>> {
        if self.recorded.is_empty() {
            return Ok(None);
        }
        let mut pending = self.recorded.clone();
        let (user_ids, item_ids) = pending.drain();

        let interactions = self.store.export(
            &ExportSelection::new(Some(&user_ids), Some(&item_ids)),
            SparseOrder::RowMajor,
        );
        let user_features = self.user_input(Some(&user_ids))?;
        let item_features = self.item_input(Some(&item_ids))?;
        self.recorded = pending;

        info!(
            users = user_ids.len(),
            items = item_ids.len(),
            nnz = interactions.len(),
            "assembled incremental training batch"
        );
        Ok(Some(TrainingBatch {
            interactions,
            user_features,
            item_features,
            user_ids,
            item_ids,
        }))
    }

    /// Batch over the whole store. Does not touch the recorded ids.
    pub fn full_training_batch(&self) -> Result<TrainingBatch> {
        let (num_users, num_items) = self.store.shape();
        let interactions = self.store.export(&ExportSelection::all(), SparseOrder::RowMajor);
        let user_features = self.user_input(None)?;
        let item_features = self.item_input(None)?;

        info!(
            users = num_users,
            items = num_items,
            nnz = interactions.len(),
            "assembled full training batch"
        );
        Ok(TrainingBatch {
            interactions,
            user_features,
            item_features,
            user_ids: (0..num_users as u32).collect(),
            item_ids: (0..num_items as u32).collect(),
        })
    }

    fn representations(
        &self,
        input: &SparseMatrix,
        side: fn(&P, &SparseMatrix) -> Result<Representations>,
    ) -> Result<Representations> {
        let reps = side(&self.provider, input)?;
        reps.validate(input.n_rows())?;
        Ok(reps)
    }

    fn to_external(&self, ranked: Vec<(u32, f32)>) -> Vec<ExternalId> {
        ranked
            .into_iter()
            .filter_map(|(id, _)| self.items.external(id).cloned())
            .collect()
    }

    /// Top-`k` items for one user. Unknown users get an empty list.
    pub fn recommend(&self, user: &ExternalId, k: usize) -> Result<Vec<ExternalId>> {
        let mut lists = self.recommend_batch(std::slice::from_ref(user), k)?;
        Ok(lists.pop().unwrap_or_default())
    }

    /// Top-`k` items for each user, in input order.
    pub fn recommend_batch(&self, users: &[ExternalId], k: usize) -> Result<Vec<Vec<ExternalId>>> {
        let mut known_positions = Vec::with_capacity(users.len());
        let mut known_ids = Vec::with_capacity(users.len());
        for (pos, user) in users.iter().enumerate() {
            match self.users.get(user) {
                Some(id) => {
                    known_positions.push(pos);
                    known_ids.push(id);
                }
                None => debug!(%user, "unknown user; no recommendations"),
            }
        }

        let mut out = vec![Vec::new(); users.len()];
        if known_ids.is_empty() {
            return Ok(out);
        }

        let user_reps =
            self.representations(&self.user_input(Some(&known_ids))?, P::user_representations)?;
        let item_reps = self.representations(&self.item_input(None)?, P::item_representations)?;
        let queries = layout::personalized_queries(&user_reps)?;
        let candidates = layout::personalized_candidates(&item_reps)?;

        let excluded: Vec<HashSet<u32>> = if self.config.retrieval.filter_interacted {
            known_ids
                .iter()
                .map(|&u| self.store.get_user_items(u, None).into_iter().collect())
                .collect()
        } else {
            Vec::new()
        };
        let exclusion = if excluded.is_empty() {
            Exclusion::None
        } else {
            Exclusion::PerQuery(&excluded)
        };

        let ranked = TopKRetriever::new(queries.n_cols()).search(&queries, &candidates, k, exclusion)?;
        debug!(users = known_ids.len(), k, "recommended");
        for (pos, list) in known_positions.into_iter().zip(ranked) {
            out[pos] = self.to_external(list);
        }
        Ok(out)
    }

    /// Top-`k` most similar items for each query item. An item never
    /// appears in its own list; unknown items get an empty list.
    pub fn similar_items(&self, items: &[ExternalId], k: usize) -> Result<Vec<Vec<ExternalId>>> {
        let mut known_positions = Vec::with_capacity(items.len());
        let mut known_ids = Vec::with_capacity(items.len());
        for (pos, item) in items.iter().enumerate() {
            match self.items.get(item) {
                Some(id) if (id as usize) < self.store.shape().1 => {
                    known_positions.push(pos);
                    known_ids.push(id);
                }
                _ => debug!(%item, "unknown item; no similar items"),
            }
        }

        let mut out = vec![Vec::new(); items.len()];
        if known_ids.is_empty() {
            return Ok(out);
        }

        let query_reps =
            self.representations(&self.item_input(Some(&known_ids))?, P::item_representations)?;
        let target_reps = self.representations(&self.item_input(None)?, P::item_representations)?;
        let queries = layout::similarity_vectors(&query_reps)?;
        let targets = layout::similarity_vectors(&target_reps)?;
        let norms = self
            .config
            .retrieval
            .normalize_similar
            .then(|| targets.row_norms());

        let ranked = TopKRetriever::new(queries.n_cols()).search_similar(
            &known_ids,
            &queries,
            &targets,
            norms.as_deref(),
            k,
            Exclusion::None,
        )?;
        for (pos, list) in known_positions.into_iter().zip(ranked) {
            out[pos] = self.to_external(list);
        }
        Ok(out)
    }

    /// Recommend for every test user and score against their held-out items.
    pub fn evaluate(
        &self,
        test: &[(ExternalId, Vec<ExternalId>)],
        k: usize,
    ) -> Result<MetricsSummary> {
        let users: Vec<ExternalId> = test.iter().map(|(u, _)| u.clone()).collect();
        let ranked = self.recommend_batch(&users, k)?;
        let truths: Vec<Vec<ExternalId>> = test.iter().map(|(_, t)| t.clone()).collect();
        let summary = metrics::compute_scores(&ranked, &truths, k);
        info!(
            queries = summary.n_queries,
            k,
            precision = summary.precision,
            recall = summary.recall,
            ndcg = summary.ndcg,
            "evaluated"
        );
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::embeddings::{LinearEmbeddings, ParameterTable};
    use crate::features::NoFeatures;
    use crate::ingest::Interaction;
    use crate::matrix::DenseMatrix;

    fn table(rows: &[Vec<f32>]) -> ParameterTable {
        ParameterTable::new(vec![0.0; rows.len()], DenseMatrix::from_rows(rows).unwrap()).unwrap()
    }

    /// Users u0, u1; items i0, i1, i2. u0 saw i0, u1 saw i1.
    fn fixture(config: RecommenderConfig) -> Recommender<LinearEmbeddings, NoFeatures> {
        let model = LinearEmbeddings::new(
            table(&[vec![1.0, 0.0], vec![0.0, 1.0]]),
            table(&[vec![1.0, 0.0], vec![0.5, 0.5], vec![0.0, 1.0]]),
        )
        .unwrap();
        let clock = Arc::new(ManualClock::new(0.0));
        let mut rec = Recommender::with_clock(config, model, NoFeatures, clock).unwrap();
        let stats = rec.ingest(
            vec![
                Interaction::new("u0", "i0", 0.0, 1.0),
                Interaction::new("u1", "i1", 0.0, 1.0),
                Interaction::new("u1", "i2", 0.0, -1.0),
            ]
            .into_iter()
            .collect(),
        );
        assert_eq!(stats.applied, 3);
        rec
    }

    fn ext(ids: &[&str]) -> Vec<ExternalId> {
        ids.iter().map(|&s| ExternalId::from(s)).collect()
    }

    #[test]
    fn recommend_filters_interacted_items() {
        let rec = fixture(RecommenderConfig::default());
        let got = rec.recommend(&"u0".into(), 3).unwrap();
        assert_eq!(got, ext(&["i1", "i2"]));
    }

    #[test]
    fn recommend_without_filter_ranks_everything() {
        let mut config = RecommenderConfig::default();
        config.retrieval.filter_interacted = false;
        let rec = fixture(config);
        assert_eq!(rec.recommend(&"u0".into(), 3).unwrap(), ext(&["i0", "i1", "i2"]));
        assert_eq!(rec.recommend(&"u0".into(), 1).unwrap(), ext(&["i0"]));
    }

    #[test]
    fn unknown_users_get_empty_lists() {
        let rec = fixture(RecommenderConfig::default());
        assert!(rec.recommend(&"nobody".into(), 3).unwrap().is_empty());

        let batch = rec
            .recommend_batch(&[ExternalId::from("nobody"), ExternalId::from("u1")], 3)
            .unwrap();
        assert!(batch[0].is_empty());
        assert_eq!(batch[1], ext(&["i0"]));
    }

    #[test]
    fn similar_items_exclude_query() {
        let rec = fixture(RecommenderConfig::default());
        let got = rec.similar_items(&ext(&["i0", "i2"]), 5).unwrap();
        assert_eq!(got[0], ext(&["i1", "i2"]));
        assert_eq!(got[1], ext(&["i1", "i0"]));
        assert!(rec.similar_items(&ext(&["zzz"]), 5).unwrap()[0].is_empty());
    }

    #[test]
    fn training_batch_drains_recorded_ids() {
        let mut rec = fixture(RecommenderConfig::default());
        let batch = rec.training_batch().unwrap().unwrap();
        assert_eq!(batch.user_ids, vec![0, 1]);
        assert_eq!(batch.item_ids, vec![0, 1, 2]);
        assert_eq!(batch.interactions.shape, (2, 3));
        assert_eq!(batch.interactions.len(), 3);
        assert_eq!((batch.user_features.n_rows(), batch.user_features.n_cols()), (2, 2));
        assert_eq!((batch.item_features.n_rows(), batch.item_features.n_cols()), (3, 3));
        assert!(rec.training_batch().unwrap().is_none());

        rec.ingest(vec![Interaction::new("u1", "i0", 1.0, 2.0)].into_iter().collect());
        let next = rec.training_batch().unwrap().unwrap();
        assert_eq!(next.user_ids, vec![1]);
        assert_eq!(next.item_ids, vec![0]);
        assert_eq!(next.interactions.iter().collect::<Vec<_>>(), vec![(0, 0, 2.0)]);
    }

    #[test]
    fn full_batch_spans_store() {
        let rec = fixture(RecommenderConfig::default());
        let batch = rec.full_training_batch().unwrap();
        assert_eq!(batch.interactions.shape, (2, 3));
        assert_eq!(batch.user_ids, vec![0, 1]);
        assert_eq!(batch.item_features.n_rows(), 3);
    }

    #[test]
    fn stale_provider_is_shape_error() {
        let mut rec = fixture(RecommenderConfig::default());
        rec.ingest(vec![Interaction::new("u2", "i3", 0.0, 1.0)].into_iter().collect());
        // Parameters still cover only 3 items.
        let err = rec.recommend(&"u0".into(), 3).unwrap_err();
        assert!(err.is_shape_mismatch());
    }

    #[test]
    fn evaluate_scores_held_out_items() {
        let rec = fixture(RecommenderConfig::default());
        // u1 saw i1 and i2, so only i0 is left to recommend.
        let summary = rec
            .evaluate(
                &[
                    ("u0".into(), ext(&["i1"])),
                    ("u1".into(), ext(&["i0"])),
                ],
                1,
            )
            .unwrap();
        assert_eq!(summary.n_queries, 2);
        assert_eq!(summary.hit_rate, 1.0);
        assert_eq!(summary.mrr, 1.0);
        assert_eq!(summary.tp, 2);
    }
}
