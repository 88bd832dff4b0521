//! Per-run dimension key caches.
//!
//! A cache maps a natural key to the surrogate key of the one dimension row
//! created for it during the current run. It is built empty at the start of
//! a run and dropped at the end; nothing persists across runs.

use std::{collections::HashMap, future::Future, hash::Hash};

use crate::dimension::{CostTuple, DisasterTuple, Place, SummaryTuple, SurrogateKey, Table};

/// Natural key → surrogate key for one dimension.
#[derive(Debug)]
pub struct DimensionCache<K> {
  dimension: Table,
  keys:      HashMap<K, SurrogateKey>,
}

impl<K> DimensionCache<K>
where
  K: Eq + Hash + Clone,
{
  pub fn new(dimension: Table) -> Self {
    Self {
      dimension,
      keys: HashMap::new(),
    }
  }

  pub fn dimension(&self) -> Table { self.dimension }

  /// The surrogate key for `key`, without creating anything.
  pub fn lookup(&self, key: &K) -> Option<SurrogateKey> {
    self.keys.get(key).copied()
  }

  /// Return the surrogate key for `key`, running `create` (a single insert
  /// returning the new key) only when the key has not been seen in this run.
  ///
  /// A failed `create` records nothing, so the same key may be attempted
  /// again.
  pub async fn get_or_create<F, Fut, E>(
    &mut self,
    key: &K,
    create: F,
  ) -> Result<SurrogateKey, E>
  where
    F: FnOnce(K) -> Fut,
    Fut: Future<Output = Result<SurrogateKey, E>>,
  {
    if let Some(existing) = self.lookup(key) {
      return Ok(existing);
    }
    let created = create(key.clone()).await?;
    self.keys.insert(key.clone(), created);
    Ok(created)
  }

  /// Number of dimension rows created through this cache.
  pub fn len(&self) -> usize { self.keys.len() }

  pub fn is_empty(&self) -> bool { self.keys.is_empty() }
}

/// The caches for every lazily populated dimension.
#[derive(Debug)]
pub struct DimensionCaches {
  pub location: DimensionCache<Place>,
  pub disaster: DimensionCache<DisasterTuple>,
  pub cost:     DimensionCache<CostTuple>,
  pub summary:  DimensionCache<SummaryTuple>,
}

impl Default for DimensionCaches {
  fn default() -> Self {
    Self {
      location: DimensionCache::new(Table::Location),
      disaster: DimensionCache::new(Table::Disaster),
      cost:     DimensionCache::new(Table::Cost),
      summary:  DimensionCache::new(Table::Summary),
    }
  }
}
