//! External id ↔ dense internal id mapping.
//!
//! The store, assembler and retriever all work on dense `u32` ids so that
//! identity blocks and candidate matrices stay compact. Callers speak in
//! their own ids (integers or strings); an [`Identifier`] hands out the next
//! dense id on first sight and remembers the mapping both ways.

use crate::error::{RecError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Caller-facing user or item id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ExternalId {
    Int(i64),
    Str(String),
}

impl fmt::Display for ExternalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExternalId::Int(v) => write!(f, "{v}"),
            ExternalId::Str(s) => f.write_str(s),
        }
    }
}

impl From<i64> for ExternalId {
    fn from(v: i64) -> Self {
        ExternalId::Int(v)
    }
}

impl From<i32> for ExternalId {
    fn from(v: i32) -> Self {
        ExternalId::Int(v.into())
    }
}

impl From<u32> for ExternalId {
    fn from(v: u32) -> Self {
        ExternalId::Int(v.into())
    }
}

impl From<&str> for ExternalId {
    fn from(s: &str) -> Self {
        ExternalId::Str(s.to_owned())
    }
}

impl From<String> for ExternalId {
    fn from(s: String) -> Self {
        ExternalId::Str(s)
    }
}

/// Dense id allocator for one id space (users or items).
///
/// ```rust
/// use decayrank::identifiers::{ExternalId, Identifier};
///
/// let mut users = Identifier::new();
/// assert_eq!(users.identify("alice".into()).unwrap(), 0);
/// assert_eq!(users.identify(42.into()).unwrap(), 1);
/// assert_eq!(users.identify("alice".into()).unwrap(), 0);
/// assert_eq!(users.external(1), Some(&ExternalId::Int(42)));
/// ```
#[derive(Debug, Clone, Default)]
pub struct Identifier {
    internal: HashMap<ExternalId, u32>,
    external: Vec<ExternalId>,
}

impl Identifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Internal id for `id`, allocating the next one if unseen.
    pub fn identify(&mut self, id: ExternalId) -> Result<u32> {
        if let Some(&internal) = self.internal.get(&id) {
            return Ok(internal);
        }
        let next = u32::try_from(self.external.len())
            .map_err(|_| RecError::InvalidParameter("id space exhausted".into()))?;
        self.external.push(id.clone());
        self.internal.insert(id, next);
        Ok(next)
    }

    /// Internal id for `id` without allocating.
    pub fn get(&self, id: &ExternalId) -> Option<u32> {
        self.internal.get(id).copied()
    }

    /// External id behind an internal id.
    pub fn external(&self, internal: u32) -> Option<&ExternalId> {
        self.external.get(internal as usize)
    }

    pub fn len(&self) -> usize {
        self.external.len()
    }

    pub fn is_empty(&self) -> bool {
        self.external.is_empty()
    }
}
