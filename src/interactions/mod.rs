//! Time-decayed user-item interaction store.
//!
//! # Model
//!
//! Each `(user, item)` pair owns one [`InteractionRecord`]: the last stored
//! value and the timestamp of its last update. Updates either accumulate
//! (the current *decayed* value plus a delta, clipped to
//! `[min_value, max_value]`) or overwrite (the raw value, unclipped).
//!
//! Decay is lazy. Nothing in storage changes with time; every read scales the
//! stored value by `rate ^ elapsed_days` against the injected [`Clock`].
//!
//! ```text
//! add_interaction ──► records[user][item] = (value, t_last)
//!                                │
//!      get_rating / export ◄─────┘  value * rate^((now - t_last) / 86400)
//! ```
//!
//! # Example
//!
//! ```rust
//! use decayrank::config::StoreConfig;
//! use decayrank::interactions::InteractionStore;
//!
//! let mut store = InteractionStore::new(&StoreConfig::default()).unwrap();
//! store.add_interaction(1, 1, 0.0, 3.0, false);
//! store.add_interaction(1, 1, 1.0, 20.0, false);
//! assert_eq!(store.get_rating(1, 1, 0.0), 10.0);
//! ```
//!
//! # Concurrency
//!
//! No internal synchronization. Mutation takes `&mut self`; wrap the store in
//! a lock if several threads ingest.

mod decay;
mod export;

pub use decay::{DecayRate, SECONDS_PER_DAY};
pub use export::{ExportSelection, SparseOrder, SparseTriples};

use crate::clock::{Clock, SystemClock};
use crate::config::StoreConfig;
use crate::error::Result;
use export::AxisMap;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::warn;

/// Stored state of one user-item pair.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InteractionRecord {
    /// Value as of `timestamp`, undecayed.
    pub value: f32,
    /// Seconds since the epoch of the last update.
    pub timestamp: f64,
}

/// Mutable user → item → record mapping with bounded accumulation and lazy decay.
#[derive(Debug, Clone)]
pub struct InteractionStore {
    records: HashMap<u32, HashMap<u32, InteractionRecord>>,
    item_ids: HashSet<u32>,
    min_value: f32,
    max_value: f32,
    decay: Option<DecayRate>,
    max_user: Option<u32>,
    max_item: Option<u32>,
    num_records: usize,
    clock: Arc<dyn Clock>,
}

impl InteractionStore {
    /// Create a store reading "now" from the system clock.
    pub fn new(config: &StoreConfig) -> Result<Self> {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Create a store with an injected clock.
    pub fn with_clock(config: &StoreConfig, clock: Arc<dyn Clock>) -> Result<Self> {
        config.validate()?;
        let decay = match config.decay_in_days {
            None => None,
            Some(days) if config.exact_half_life => Some(DecayRate::exact_half_life(days)?),
            Some(days) => Some(DecayRate::from_half_life(days)?),
        };
        Ok(Self {
            records: HashMap::new(),
            item_ids: HashSet::new(),
            min_value: config.min_value,
            max_value: config.max_value,
            decay,
            max_user: None,
            max_item: None,
            num_records: 0,
            clock,
        })
    }

    /// Current per-day decay factor, if decay is enabled.
    pub fn decay_rate(&self) -> Option<f64> {
        self.decay.map(DecayRate::get)
    }

    /// Replace the decay factor. `None` disables decay. Stored values are
    /// untouched; the new rate applies to every subsequent read.
    pub fn set_decay_rate(&mut self, rate: Option<f64>) -> Result<()> {
        self.decay = rate.map(DecayRate::new).transpose()?;
        Ok(())
    }

    pub fn bounds(&self) -> (f32, f32) {
        (self.min_value, self.max_value)
    }

    #[inline]
    fn decayed(&self, record: &InteractionRecord, now: f64) -> f32 {
        match self.decay {
            Some(rate) => rate.apply(record.value, record.timestamp, now),
            None => record.value,
        }
    }

    /// Record an interaction.
    ///
    /// With `overwrite`, `delta` is stored as-is (no accumulation, no
    /// clipping). Otherwise the current decayed value (or 0 when absent) plus
    /// `delta` is clipped to the configured bounds. Either way the record's
    /// timestamp becomes `timestamp` and `item` joins the observed item set.
    ///
    /// A non-finite `delta` or `timestamp` leaves the store untouched.
    pub fn add_interaction(&mut self, user: u32, item: u32, timestamp: f64, delta: f32, overwrite: bool) {
        if !delta.is_finite() || !timestamp.is_finite() {
            warn!(user, item, delta, timestamp, "ignoring non-finite interaction");
            return;
        }
        let value = if overwrite {
            delta
        } else {
            let current = self.rating(user, item).unwrap_or(0.0);
            (current + delta).clamp(self.min_value, self.max_value)
        };

        let previous = self
            .records
            .entry(user)
            .or_default()
            .insert(item, InteractionRecord { value, timestamp });
        if previous.is_none() {
            self.num_records += 1;
        }

        self.item_ids.insert(item);
        self.max_user = self.max_user.max(Some(user));
        self.max_item = self.max_item.max(Some(item));
    }

    /// Raw stored record, undecayed.
    pub fn record(&self, user: u32, item: u32) -> Option<&InteractionRecord> {
        self.records.get(&user)?.get(&item)
    }

    /// Decayed value of an existing record, `None` when the pair was never seen.
    pub fn rating(&self, user: u32, item: u32) -> Option<f32> {
        let record = self.record(user, item)?;
        Some(self.decayed(record, self.clock.now()))
    }

    /// Decayed value, or `default` when the pair was never seen.
    ///
    /// A stored value that happens to equal `default` is still a record and
    /// is still decayed.
    pub fn get_rating(&self, user: u32, item: u32, default: f32) -> f32 {
        self.rating(user, item).unwrap_or(default)
    }

    /// Items the user has a record for.
    ///
    /// Without a limit the order is unspecified. With `Some(n)` the `n` most
    /// recently updated items are returned, newest first (ties by ascending
    /// item id). The limit is measured against this user's own item count.
    pub fn get_user_items(&self, user: u32, recent_limit: Option<usize>) -> Vec<u32> {
        let Some(items) = self.records.get(&user) else {
            return Vec::new();
        };
        match recent_limit {
            None => items.keys().copied().collect(),
            Some(limit) => {
                let mut by_recency: Vec<(u32, f64)> =
                    items.iter().map(|(&item, r)| (item, r.timestamp)).collect();
                by_recency.sort_unstable_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
                by_recency.truncate(limit);
                by_recency.into_iter().map(|(item, _)| item).collect()
            }
        }
    }

    /// Every item id ever observed, ascending.
    pub fn get_all_item_ids(&self) -> Vec<u32> {
        let mut ids: Vec<u32> = self.item_ids.iter().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Every user id with at least one record, ascending.
    pub fn get_all_users(&self) -> Vec<u32> {
        let mut ids: Vec<u32> = self.records.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Observed items the user has no record for, ascending.
    pub fn get_non_interacted_items(&self, user: u32) -> Vec<u32> {
        let interacted = self.records.get(&user);
        self.get_all_item_ids()
            .into_iter()
            .filter(|item| interacted.is_none_or(|m| !m.contains_key(item)))
            .collect()
    }

    /// Observed items whose decayed rating for `user` is non-negative,
    /// ascending. Unrated items count as 0.0 and are included.
    pub fn get_non_negative_items(&self, user: u32) -> Vec<u32> {
        let now = self.clock.now();
        let interacted = self.records.get(&user);
        self.get_all_item_ids()
            .into_iter()
            .filter(|item| {
                let rating = interacted
                    .and_then(|m| m.get(item))
                    .map_or(0.0, |r| self.decayed(r, now));
                rating >= 0.0
            })
            .collect()
    }

    /// `(max user id + 1, max item id + 1)`, or `(0, 0)` when empty.
    pub fn shape(&self) -> (usize, usize) {
        (
            self.max_user.map_or(0, |u| u as usize + 1),
            self.max_item.map_or(0, |i| i as usize + 1),
        )
    }

    /// Number of stored records.
    pub fn len(&self) -> usize {
        self.num_records
    }

    pub fn is_empty(&self) -> bool {
        self.num_records == 0
    }

    pub fn user_count(&self) -> usize {
        self.records.len()
    }

    /// Snapshot every record as decayed coordinate triples.
    ///
    /// Decay is evaluated once against a single "now" for the whole pass.
    /// Unselected axes keep raw ids and span `max id + 1`; selected axes are
    /// remapped to selection order and span the selection length.
    pub fn export(&self, selection: &ExportSelection<'_>, order: SparseOrder) -> SparseTriples {
        let now = self.clock.now();
        let user_map = AxisMap::new(selection.users);
        let item_map = AxisMap::new(selection.items);
        let (n_users, n_items) = self.shape();

        let mut triples = SparseTriples::with_capacity(self.num_records);
        for (&user, items) in &self.records {
            let Some(row) = user_map.position(user) else {
                continue;
            };
            for (&item, record) in items {
                if let Some(col) = item_map.position(item) {
                    triples.push(row, col, self.decayed(record, now));
                }
            }
        }

        triples.shape = (
            selection.users.map_or(n_users, <[u32]>::len),
            selection.items.map_or(n_items, <[u32]>::len),
        );
        triples.sort(order);
        triples
    }
}
