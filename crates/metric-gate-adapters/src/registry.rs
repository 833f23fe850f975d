// crates/metric-gate-adapters/src/registry.rs
// ============================================================================
// Module: Adapter Registry
// Description: Registry of source adapters keyed by logical source id.
// Purpose: Route contract calls by source id with duplicate rejection.
// Dependencies: metric-gate-adapters
// ============================================================================

//! ## Overview
//! The adapter registry maps logical source ids to live adapter instances.
//! It is populated once at startup from configuration and read-only
//! afterwards; adapters are shared behind [`Arc`] so concurrent requests can
//! hold them across await points.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::AdapterError;
use crate::SourceAdapter;

// ============================================================================
// SECTION: Registry
// ============================================================================

/// Source adapter registry.
///
/// # Invariants
/// - Source ids are unique within the registry.
/// - The registry is not mutated after application startup.
#[derive(Default)]
pub struct AdapterRegistry {
    /// Adapter instances keyed by logical source id.
    adapters: BTreeMap<String, Arc<dyn SourceAdapter>>,
}

impl AdapterRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an adapter under a logical source id.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError::Protocol`] when the source id is already
    /// registered.
    pub fn register(
        &mut self,
        source_id: impl Into<String>,
        adapter: Arc<dyn SourceAdapter>,
    ) -> Result<(), AdapterError> {
        let source_id = source_id.into();
        if self.adapters.contains_key(&source_id) {
            return Err(AdapterError::Protocol {
                message: format!("source already registered: {source_id}"),
            });
        }
        self.adapters.insert(source_id, adapter);
        Ok(())
    }

    /// Returns the adapter registered under `source_id`, when present.
    #[must_use]
    pub fn get(&self, source_id: &str) -> Option<Arc<dyn SourceAdapter>> {
        self.adapters.get(source_id).cloned()
    }

    /// Returns all registered source ids in sorted order.
    #[must_use]
    pub fn source_ids(&self) -> Vec<String> {
        self.adapters.keys().cloned().collect()
    }

    /// Returns true when no adapters are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.adapters.is_empty()
    }

    /// Logs registered adapters and the functionality they enable.
    pub fn log_status(&self) {
        if self.adapters.is_empty() {
            tracing::warn!(
                "no external source connections configured; only raw mode is available \
                 (set DOMAIN_MCP_CONFIG to enable source-driven mode)"
            );
        } else {
            let source_ids = self.source_ids().join(", ");
            tracing::info!(sources = %source_ids, "external source connections configured");
        }
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests;
