//! Agency Special-Case Adapters
//!
//! Declarative overrides for agencies whose files do not fit the generic
//! pipeline as-is. An adapter can:
//! - pick a different sheet
//! - point at a manually saved HTML page instead of the folder contents
//! - turn on composite `ID: Name` splitting
//! - drop placeholder records after normalization
//!
//! The generic header, mapping and normalization steps always run. Extra
//! adapters can be declared in the manifest's `adapters` map.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::warn;

use crate::manifest::AgencyEntry;
use crate::normalize::{CompositeIdRule, NormalizedRecord};
use crate::schema::CanonicalField;
use crate::source::SheetSelector;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdapterConfig {
    /// Sheet name or `*`.
    pub sheet: Option<String>,
    /// File inside the agency folder read as the only source.
    pub html_source: Option<String>,
    /// Enables composite ID splitting. An empty prefix accepts any ID.
    pub composite_id_prefix: Option<String>,
    /// Use case names that are placeholders, compared case-insensitively.
    pub placeholder_names: Vec<String>,
}

impl AdapterConfig {
    pub fn sheet_selector(&self) -> SheetSelector {
        self.sheet
            .as_deref()
            .map(SheetSelector::parse)
            .unwrap_or_default()
    }

    pub fn composite_rule(&self) -> Option<CompositeIdRule> {
        self.composite_id_prefix.as_deref().map(|prefix| {
            if prefix.is_empty() {
                CompositeIdRule::default()
            } else {
                CompositeIdRule::with_prefix(prefix)
            }
        })
    }

    /// Drop placeholder records. Returns how many were removed.
    pub fn post_process(&self, records: &mut Vec<NormalizedRecord>) -> usize {
        if self.placeholder_names.is_empty() {
            return 0;
        }
        let before = records.len();
        records.retain(|r| {
            let name = r.get(CanonicalField::UseCaseName).trim();
            !self
                .placeholder_names
                .iter()
                .any(|p| p.trim().eq_ignore_ascii_case(name))
        });
        before - records.len()
    }
}

/// Adapters keyed by name (normally the agency slug).
#[derive(Debug, Clone, Default)]
pub struct AdapterRegistry {
    adapters: BTreeMap<String, AdapterConfig>,
}

impl AdapterRegistry {
    pub fn builtin() -> Self {
        let mut registry = Self::default();
        registry.register(
            "department-of-justice",
            AdapterConfig {
                sheet: Some("Reportable AI Use Cases".to_string()),
                ..AdapterConfig::default()
            },
        );
        registry.register(
            "department-of-agriculture",
            AdapterConfig {
                composite_id_prefix: Some("USDA-".to_string()),
                ..AdapterConfig::default()
            },
        );
        // The inventory is only published as a rendered web page.
        registry.register(
            "tennessee-valley-authority",
            AdapterConfig {
                html_source: Some("tva-page.html".to_string()),
                ..AdapterConfig::default()
            },
        );
        registry.register(
            "national-science-foundation",
            AdapterConfig {
                placeholder_names: vec!["NSF".to_string()],
                ..AdapterConfig::default()
            },
        );
        registry
    }

    pub fn register(&mut self, name: &str, adapter: AdapterConfig) {
        self.adapters.insert(name.to_string(), adapter);
    }

    /// Manifest-declared adapters replace built-ins of the same name.
    pub fn with_overrides(mut self, extra: &BTreeMap<String, AdapterConfig>) -> Self {
        for (name, adapter) in extra {
            self.register(name, adapter.clone());
        }
        self
    }

    pub fn get(&self, name: &str) -> Option<&AdapterConfig> {
        self.adapters.get(name)
    }

    /// Effective adapter for an agency, with the entry's own `sheet` applied
    /// on top.
    pub fn resolve(&self, entry: &AgencyEntry) -> AdapterConfig {
        let key = entry.adapter_key();
        let mut adapter = match self.get(key) {
            Some(a) => a.clone(),
            None => {
                if entry.adapter.is_some() {
                    warn!(agency = %entry.id, adapter = key, "unknown adapter, using generic pipeline");
                }
                AdapterConfig::default()
            }
        };
        if let Some(sheet) = &entry.sheet {
            adapter.sheet = Some(sheet.clone());
        }
        adapter
    }
}
