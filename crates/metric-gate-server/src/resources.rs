// crates/metric-gate-server/src/resources.rs
// ============================================================================
// Module: Resources Registry
// Description: Static JSON domain-knowledge documents served over MCP.
// Purpose: Load glossary and example documents at startup and serve them by
//          `domain://` URI.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! At startup the registry loads every `*.json` file under the `glossary/`
//! and `examples/` subdirectories of the resources root. Each file becomes a
//! resource with URI `domain://<category>/<stem>`; name and description come
//! from the document itself when present, else they are derived from the
//! filename. The registry is read-only after loading.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::path::Path;

use serde::Serialize;
use serde_json::Value;

// ============================================================================
// SECTION: Resource Shapes
// ============================================================================

/// Categories scanned under the resources root.
const RESOURCE_CATEGORIES: [(&str, &str); 2] =
    [("glossary", "Domain Glossary"), ("examples", "Query Examples")];

/// One loaded resource with metadata and parsed content.
#[derive(Debug, Clone, PartialEq)]
pub struct Resource {
    /// Resource URI (e.g. `domain://glossary/boot-time`).
    pub uri: String,
    /// Human-readable name.
    pub name: String,
    /// Short description of the contents.
    pub description: String,
    /// Content MIME type.
    pub mime_type: String,
    /// Parsed JSON content.
    pub content: Value,
}

/// Resource metadata entry for `resources/list`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResourceMetadata {
    /// Resource URI.
    pub uri: String,
    /// Human-readable name.
    pub name: String,
    /// Short description.
    pub description: String,
    /// Content MIME type.
    #[serde(rename = "mimeType")]
    pub mime_type: String,
}

/// One content entry of a `resources/read` response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResourceContent {
    /// Resource URI.
    pub uri: String,
    /// Content MIME type.
    #[serde(rename = "mimeType")]
    pub mime_type: String,
    /// Re-serialized JSON text.
    pub text: String,
}

/// Response shape of `resources/read`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResourceContents {
    /// Content entries (one per resource).
    pub contents: Vec<ResourceContent>,
}

// ============================================================================
// SECTION: Registry
// ============================================================================

/// Registry for MCP resources loaded from JSON files.
///
/// # Invariants
/// - The registry is populated once at load and read-only afterwards.
#[derive(Debug, Default)]
pub struct ResourceRegistry {
    /// Loaded resources keyed by URI.
    resources: BTreeMap<String, Resource>,
}

impl ResourceRegistry {
    /// Creates an empty registry (used when no resources root exists).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads every JSON resource under the given root directory.
    #[must_use]
    pub fn load(root: &Path) -> Self {
        let mut registry = Self::new();
        if !root.exists() {
            tracing::warn!(root = %root.display(), "resources.root_not_found");
            return registry;
        }
        for (category, category_label) in RESOURCE_CATEGORIES {
            let directory = root.join(category);
            if !directory.exists() {
                continue;
            }
            let Ok(entries) = std::fs::read_dir(&directory) else {
                tracing::warn!(directory = %directory.display(), "resources.dir_unreadable");
                continue;
            };
            for entry in entries.flatten() {
                let path = entry.path();
                if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
                    continue;
                }
                registry.load_file(&path, category, category_label);
            }
        }
        tracing::info!(count = registry.resources.len(), "resources.loaded");
        registry
    }

    /// Loads a single resource file, skipping unreadable or invalid ones.
    fn load_file(&mut self, path: &Path, category: &str, category_label: &str) {
        let Ok(raw) = std::fs::read_to_string(path) else {
            tracing::error!(path = %path.display(), "resources.file_unreadable");
            return;
        };
        let content: Value = match serde_json::from_str(&raw) {
            Ok(content) => content,
            Err(err) => {
                tracing::error!(path = %path.display(), error = %err, "resources.invalid_json");
                return;
            }
        };
        let stem = path.file_stem().and_then(|stem| stem.to_str()).unwrap_or_default();
        let uri = format!("domain://{category}/{stem}");
        let name = content
            .get("name")
            .and_then(Value::as_str)
            .map_or_else(|| title_case(stem), ToString::to_string);
        let description = content.get("description").and_then(Value::as_str).map_or_else(
            || format!("{category_label}: {}", title_case(stem)),
            ToString::to_string,
        );
        tracing::debug!(uri = %uri, "resources.loaded_file");
        self.resources.insert(
            uri.clone(),
            Resource {
                uri,
                name,
                description,
                mime_type: "application/json".to_string(),
                content,
            },
        );
    }

    /// Lists all resources (metadata only), sorted by URI.
    #[must_use]
    pub fn list_resources(&self) -> Vec<ResourceMetadata> {
        self.resources
            .values()
            .map(|resource| ResourceMetadata {
                uri: resource.uri.clone(),
                name: resource.name.clone(),
                description: resource.description.clone(),
                mime_type: resource.mime_type.clone(),
            })
            .collect()
    }

    /// Reads a resource by URI in MCP `resources/read` shape.
    ///
    /// Returns `None` for unknown URIs.
    #[must_use]
    pub fn read_resource(&self, uri: &str) -> Option<ResourceContents> {
        let resource = self.resources.get(uri)?;
        let text = serde_json::to_string_pretty(&resource.content)
            .unwrap_or_else(|_| resource.content.to_string());
        Some(ResourceContents {
            contents: vec![ResourceContent {
                uri: resource.uri.clone(),
                mime_type: resource.mime_type.clone(),
                text,
            }],
        })
    }

    /// Returns the parsed content of a resource for internal use.
    #[must_use]
    pub fn resource_content(&self, uri: &str) -> Option<&Value> {
        self.resources.get(uri).map(|resource| &resource.content)
    }

    /// Number of loaded resources.
    #[must_use]
    pub fn len(&self) -> usize {
        self.resources.len()
    }

    /// Returns true when no resources are loaded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }
}

/// Title-cases a kebab-case filename stem (`boot-time` to `Boot Time`).
fn title_case(stem: &str) -> String {
    stem.split(['-', '_'])
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            chars.next().map_or_else(String::new, |first| {
                first.to_uppercase().collect::<String>() + chars.as_str()
            })
        })
        .collect::<Vec<_>>()
        .join(" ")
}

// ============================================================================
// SECTION: Tests
// ============================================================================
