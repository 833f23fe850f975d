// crates/metric-gate-plugins/src/lib.rs
// ============================================================================
// Module: Metric Gate Plugins
// Description: Dataset-type plugin contract and registry.
// Purpose: Translate raw dataset JSON or label-value bundles into canonical
//          metric observations.
// Dependencies: metric-gate-contract, metric-gate-core, async-trait,
//               serde_json, time
// ============================================================================

//! ## Overview
//! A plugin is bound to a `dataset_type` identifier and converts raw dataset
//! JSON or pre-aggregated label values into [`MetricPoint`] observations. The
//! registry is populated with the built-in set at startup and may be filtered
//! by configuration; it is read-only under load. Plugins never raise for a
//! single bad value: per-value problems are logged and skipped so one bad
//! sample cannot poison an extraction run.
//! Invariants:
//! - When label values are non-empty, plugins prefer that path and only fall
//!   back to dataset parsing when labels yield no points.
//! - Every emitted metric value is finite.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod boot_time;
pub mod es_logs;

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::PoisonError;
use std::sync::RwLock;

use async_trait::async_trait;
use metric_gate_contract::ExportedLabelValues;
use metric_gate_core::MetricPoint;
use serde_json::Value;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use boot_time::BootTimePlugin;
pub use es_logs::ElasticsearchLogsPlugin;

// ============================================================================
// SECTION: Plugin Contract
// ============================================================================

/// Glossary entry describing one canonical metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GlossaryEntry {
    /// Human-readable metric description.
    pub description: &'static str,
    /// Unit of measurement.
    pub unit: &'static str,
}

/// Dataset-type plugin contract.
///
/// A plugin declares a unique `id`, a `glossary` mapping metric ids to
/// descriptions, and a `kpis` list of primary metric ids. The `extract`
/// operation converts raw dataset JSON and/or label-value bundles into
/// canonical metric points.
#[async_trait]
pub trait Plugin: Send + Sync {
    /// Unique plugin identifier (the `dataset_type`).
    fn id(&self) -> &'static str;

    /// Glossary of canonical metric ids this plugin can emit.
    fn glossary(&self) -> BTreeMap<&'static str, GlossaryEntry>;

    /// Primary metric ids for this dataset type.
    fn kpis(&self) -> &'static [&'static str];

    /// Extracts canonical metric points.
    ///
    /// When `label_values` is non-empty that path is preferred; dataset JSON
    /// parsing is only attempted when labels yield no points. Filters apply
    /// client-side where the backend could not filter server-side.
    async fn extract(
        &self,
        json_body: &Value,
        refs: &BTreeMap<String, String>,
        label_values: Option<&[ExportedLabelValues]>,
        os_filter: Option<&str>,
        run_type_filter: Option<&str>,
    ) -> Vec<MetricPoint>;
}

// ============================================================================
// SECTION: Registry
// ============================================================================

/// Outcome of applying the enabled-plugin configuration filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginFilterOutcome {
    /// Plugin ids kept in the registry, sorted.
    pub kept: Vec<String>,
    /// Plugin ids removed by the filter, sorted.
    pub disabled: Vec<String>,
}

/// Registry mapping `plugin_id` to plugin implementations.
///
/// # Invariants
/// - Registration is idempotent on id: the latest registration wins.
/// - Writes happen only at startup and at explicit reset.
pub struct PluginRegistry {
    /// Registered plugins keyed by id.
    plugins: RwLock<BTreeMap<String, Arc<dyn Plugin>>>,
}

impl PluginRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            plugins: RwLock::new(BTreeMap::new()),
        }
    }

    /// Creates a registry with the built-in example plugins registered.
    #[must_use]
    pub fn with_builtin_plugins() -> Self {
        let registry = Self::new();
        registry.register(Arc::new(BootTimePlugin));
        registry.register(Arc::new(ElasticsearchLogsPlugin));
        registry
    }

    /// Registers a plugin under its id, replacing any previous registration.
    pub fn register(&self, plugin: Arc<dyn Plugin>) {
        let kpis = plugin.kpis().join(", ");
        tracing::info!(plugin_id = plugin.id(), kpis = %kpis, "plugin.registered");
        self.plugins
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(plugin.id().to_string(), plugin);
    }

    /// Returns the plugin registered under `plugin_id`, when present.
    #[must_use]
    pub fn get(&self, plugin_id: &str) -> Option<Arc<dyn Plugin>> {
        self.plugins.read().unwrap_or_else(PoisonError::into_inner).get(plugin_id).cloned()
    }

    /// Returns all registered plugin ids, sorted.
    #[must_use]
    pub fn plugin_ids(&self) -> Vec<String> {
        self.plugins.read().unwrap_or_else(PoisonError::into_inner).keys().cloned().collect()
    }

    /// Returns all registered plugins.
    #[must_use]
    pub fn all(&self) -> Vec<Arc<dyn Plugin>> {
        self.plugins.read().unwrap_or_else(PoisonError::into_inner).values().cloned().collect()
    }

    /// Clears the registry and re-registers the built-in set.
    ///
    /// Used for test isolation and per-instance initialization.
    pub fn reset(&self) {
        self.plugins.write().unwrap_or_else(PoisonError::into_inner).clear();
        self.register(Arc::new(BootTimePlugin));
        self.register(Arc::new(ElasticsearchLogsPlugin));
    }

    /// Applies configuration-based enable/disable filtering in place.
    ///
    /// An empty map applies no filtering. A non-empty map keeps only plugins
    /// explicitly enabled; everything else is removed from the registry.
    pub fn apply_enabled(&self, enabled: &BTreeMap<String, bool>) -> PluginFilterOutcome {
        if enabled.is_empty() {
            return PluginFilterOutcome {
                kept: self.plugin_ids(),
                disabled: Vec::new(),
            };
        }
        let keep: Vec<&String> = enabled.iter().filter(|(_, on)| **on).map(|(id, _)| id).collect();
        let mut disabled = Vec::new();
        {
            let mut plugins = self.plugins.write().unwrap_or_else(PoisonError::into_inner);
            let registered: Vec<String> = plugins.keys().cloned().collect();
            for plugin_id in registered {
                if !keep.iter().any(|kept_id| **kept_id == plugin_id) {
                    plugins.remove(&plugin_id);
                    disabled.push(plugin_id);
                }
            }
        }
        disabled.sort();
        let kept = self.plugin_ids();
        tracing::info!(kept = ?kept, disabled = ?disabled, "plugin.filter_applied");
        PluginFilterOutcome {
            kept,
            disabled,
        }
    }

    /// Logs diagnostic information about each registered plugin.
    pub fn log_discovery_debug(&self) {
        let plugins = self.plugins.read().unwrap_or_else(PoisonError::into_inner);
        if plugins.is_empty() {
            tracing::warn!(
                "no plugins registered; no dataset types are available for analysis"
            );
            return;
        }
        for (plugin_id, plugin) in plugins.iter() {
            tracing::info!(
                plugin_id = %plugin_id,
                kpi_count = plugin.kpis().len(),
                type_name = std::any::type_name_of_val(plugin.as_ref()),
                "plugin.discovery"
            );
        }
    }
}

impl Default for PluginRegistry {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
