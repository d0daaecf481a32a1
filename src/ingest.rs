//! Batched interaction ingestion.
//!
//! A batch is applied record by record. A malformed record (non-finite
//! timestamp or rating) is skipped and logged; it never aborts the rest of
//! the batch.

use crate::error::{RecError, Result};
use crate::identifiers::{ExternalId, Identifier};
use crate::interactions::InteractionStore;
use std::collections::BTreeSet;
use std::time::Instant;
use tracing::{debug, warn};

/// One observed user-item event.
#[derive(Debug, Clone, PartialEq)]
pub struct Interaction {
    pub user: ExternalId,
    pub item: ExternalId,
    /// Seconds since the epoch.
    pub timestamp: f64,
    /// Delta (accumulate mode) or absolute value (overwrite mode).
    pub rating: f32,
}

impl Interaction {
    pub fn new(
        user: impl Into<ExternalId>,
        item: impl Into<ExternalId>,
        timestamp: f64,
        rating: f32,
    ) -> Self {
        Self {
            user: user.into(),
            item: item.into(),
            timestamp,
            rating,
        }
    }

    /// Reject records the store cannot hold meaningfully.
    pub fn validate(&self) -> Result<()> {
        if !self.timestamp.is_finite() {
            return Err(RecError::InvalidRecord(format!(
                "non-finite timestamp {} for ({}, {})",
                self.timestamp, self.user, self.item
            )));
        }
        if !self.rating.is_finite() {
            return Err(RecError::InvalidRecord(format!(
                "non-finite rating {} for ({}, {})",
                self.rating, self.user, self.item
            )));
        }
        Ok(())
    }
}

/// Ordered batch of interactions.
#[derive(Debug, Clone, Default)]
pub struct InteractionBatch {
    records: Vec<Interaction>,
}

impl InteractionBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            records: Vec::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, interaction: Interaction) {
        self.records.push(interaction);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Interaction> {
        self.records.iter()
    }
}

impl IntoIterator for InteractionBatch {
    type Item = Interaction;
    type IntoIter = std::vec::IntoIter<Interaction>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.into_iter()
    }
}

impl FromIterator<Interaction> for InteractionBatch {
    fn from_iter<T: IntoIterator<Item = Interaction>>(iter: T) -> Self {
        Self {
            records: iter.into_iter().collect(),
        }
    }
}

/// Outcome of applying a batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestStats {
    pub applied: usize,
    pub skipped: usize,
    /// Applied records whose user-item pair already had a record, whether
    /// accumulated into or overwritten.
    pub updated_existing: usize,
    /// Time spent applying the batch (microseconds).
    pub duration_us: u64,
}

impl IngestStats {
    pub fn merge(&mut self, other: &IngestStats) {
        self.applied += other.applied;
        self.skipped += other.skipped;
        self.updated_existing += other.updated_existing;
        self.duration_us += other.duration_us;
    }
}

/// Internal ids touched since the last drain.
#[derive(Debug, Clone, Default)]
pub struct RecordedIds {
    users: BTreeSet<u32>,
    items: BTreeSet<u32>,
}

impl RecordedIds {
    pub fn record(&mut self, user: u32, item: u32) {
        self.users.insert(user);
        self.items.insert(item);
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }

    /// Take the recorded `(users, items)`, ascending, and reset.
    pub fn drain(&mut self) -> (Vec<u32>, Vec<u32>) {
        let users = std::mem::take(&mut self.users).into_iter().collect();
        let items = std::mem::take(&mut self.items).into_iter().collect();
        (users, items)
    }
}

/// Everything a batch writes into.
pub(crate) struct IngestTarget<'a> {
    pub store: &'a mut InteractionStore,
    pub users: &'a mut Identifier,
    pub items: &'a mut Identifier,
    pub recorded: &'a mut RecordedIds,
}

impl IngestTarget<'_> {
    fn apply_one(&mut self, interaction: Interaction, overwrite: bool) -> Result<bool> {
        interaction.validate()?;
        let user = self.users.identify(interaction.user)?;
        let item = self.items.identify(interaction.item)?;
        let existed = self.store.record(user, item).is_some();
        self.store
            .add_interaction(user, item, interaction.timestamp, interaction.rating, overwrite);
        self.recorded.record(user, item);
        Ok(existed)
    }

    pub fn apply(&mut self, batch: InteractionBatch, overwrite: bool) -> IngestStats {
        let start = Instant::now();
        let mut stats = IngestStats::default();

        for interaction in batch {
            match self.apply_one(interaction, overwrite) {
                Ok(existed) => {
                    stats.applied += 1;
                    if existed {
                        stats.updated_existing += 1;
                    }
                }
                Err(err) => {
                    warn!(error = %err, "skipping interaction");
                    stats.skipped += 1;
                }
            }
        }

        stats.duration_us = start.elapsed().as_micros() as u64;
        debug!(
            applied = stats.applied,
            skipped = stats.skipped,
            updated_existing = stats.updated_existing,
            duration_us = stats.duration_us,
            "ingested batch"
        );
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StoreConfig;

    struct Fixture {
        store: InteractionStore,
        users: Identifier,
        items: Identifier,
        recorded: RecordedIds,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                store: InteractionStore::new(&StoreConfig::default()).unwrap(),
                users: Identifier::new(),
                items: Identifier::new(),
                recorded: RecordedIds::default(),
            }
        }

        fn apply(&mut self, batch: InteractionBatch, overwrite: bool) -> IngestStats {
            IngestTarget {
                store: &mut self.store,
                users: &mut self.users,
                items: &mut self.items,
                recorded: &mut self.recorded,
            }
            .apply(batch, overwrite)
        }
    }

    #[test]
    fn validation_rejects_non_finite() {
        assert!(Interaction::new(1, 2, 0.0, 1.0).validate().is_ok());
        let bad_ts = Interaction::new(1, 2, f64::NAN, 1.0).validate().unwrap_err();
        assert!(matches!(bad_ts, RecError::InvalidRecord(_)));
        let bad_rating = Interaction::new(1, 2, 0.0, f32::INFINITY).validate().unwrap_err();
        assert!(matches!(bad_rating, RecError::InvalidRecord(_)));
    }

    #[test]
    fn bad_records_are_skipped_not_fatal() {
        let mut fx = Fixture::new();
        let batch: InteractionBatch = vec![
            Interaction::new("u1", "a", 0.0, 1.0),
            Interaction::new("u1", "b", f64::INFINITY, 1.0),
            Interaction::new("u2", "a", 0.0, f32::NAN),
            Interaction::new("u2", "b", 0.0, 2.0),
        ]
        .into_iter()
        .collect();

        let stats = fx.apply(batch, false);
        assert_eq!((stats.applied, stats.skipped, stats.updated_existing), (2, 2, 0));
        assert_eq!(fx.store.len(), 2);
        // Skipped records never allocate ids.
        assert_eq!(fx.users.len(), 2);
        assert_eq!(fx.items.len(), 2);
    }

    #[test]
    fn repeated_pairs_count_as_updates() {
        let mut fx = Fixture::new();
        let batch: InteractionBatch = vec![
            Interaction::new(10, 20, 0.0, 1.0),
            Interaction::new(10, 20, 0.0, 2.0),
        ]
        .into_iter()
        .collect();
        let stats = fx.apply(batch, false);
        assert_eq!(stats.applied, 2);
        assert_eq!(stats.updated_existing, 1);
        assert_eq!(fx.store.get_rating(0, 0, 0.0), 3.0);
    }

    #[test]
    fn upsert_replaces_value() {
        let mut fx = Fixture::new();
        fx.apply(vec![Interaction::new(1, 1, 0.0, 4.0)].into_iter().collect(), false);
        fx.apply(vec![Interaction::new(1, 1, 0.0, 42.0)].into_iter().collect(), true);
        assert_eq!(fx.store.get_rating(0, 0, 0.0), 42.0);
    }

    #[test]
    fn recorded_ids_drain_sorted() {
        let mut fx = Fixture::new();
        let batch: InteractionBatch = vec![
            Interaction::new("c", "x", 0.0, 1.0),
            Interaction::new("a", "y", 0.0, 1.0),
            Interaction::new("c", "y", 0.0, 1.0),
        ]
        .into_iter()
        .collect();
        fx.apply(batch, false);

        let (users, items) = fx.recorded.drain();
        assert_eq!(users, vec![0, 1]);
        assert_eq!(items, vec![0, 1]);
        assert!(fx.recorded.is_empty());
        assert_eq!(fx.recorded.drain(), (vec![], vec![]));
    }

    #[test]
    fn stats_merge() {
        let mut total = IngestStats {
            applied: 1,
            skipped: 2,
            updated_existing: 0,
            duration_us: 5,
        };
        total.merge(&IngestStats {
            applied: 3,
            skipped: 0,
            updated_existing: 1,
            duration_us: 7,
        });
        assert_eq!(
            total,
            IngestStats {
                applied: 4,
                skipped: 2,
                updated_existing: 1,
                duration_us: 12
            }
        );
    }
}
