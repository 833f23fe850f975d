// crates/metric-gate-core/src/cache.rs
// ============================================================================
// Module: LRU Cache
// Description: Small least-recently-used cache for adapter response reuse.
// Purpose: Bound memory while keeping hot contract responses close.
// Dependencies: std
// ============================================================================

//! ## Overview
//! A minimal insertion-bounded LRU: `get` refreshes recency, `insert` evicts
//! the least-recently-used entry at capacity. The wrapper keeps the API to
//! `get`/`insert` so the policy can evolve (TTL, metrics) without touching
//! callers.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::VecDeque;

// ============================================================================
// SECTION: Cache
// ============================================================================

/// Simple LRU cache.
///
/// # Invariants
/// - `order` holds exactly the keys present in `entries`, most recently used
///   at the back.
/// - The entry count never exceeds `capacity`.
#[derive(Debug)]
pub struct Cache<K, V> {
    /// Maximum number of retained entries.
    capacity: usize,
    /// Stored entries keyed for lookup.
    entries: BTreeMap<K, V>,
    /// Recency order; least recently used at the front.
    order: VecDeque<K>,
}

impl<K: Ord + Clone, V: Clone> Cache<K, V> {
    /// Creates a cache retaining at most `capacity` entries.
    ///
    /// A zero capacity is promoted to one so the cache stays usable.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            entries: BTreeMap::new(),
            order: VecDeque::new(),
        }
    }

    /// Returns the value for `key`, refreshing its recency.
    pub fn get(&mut self, key: &K) -> Option<V> {
        let value = self.entries.get(key).cloned()?;
        self.touch(key);
        Some(value)
    }

    /// Inserts or updates `key`, evicting the LRU entry at capacity.
    pub fn insert(&mut self, key: K, value: V) {
        if self.entries.contains_key(&key) {
            self.entries.insert(key.clone(), value);
            self.touch(&key);
            return;
        }
        if self.entries.len() >= self.capacity {
            if let Some(evicted) = self.order.pop_front() {
                self.entries.remove(&evicted);
            }
        }
        self.order.push_back(key.clone());
        self.entries.insert(key, value);
    }

    /// Number of retained entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true when the cache holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Moves `key` to the most-recently-used position.
    fn touch(&mut self, key: &K) {
        if let Some(position) = self.order.iter().position(|existing| existing == key) {
            self.order.remove(position);
        }
        self.order.push_back(key.clone());
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
