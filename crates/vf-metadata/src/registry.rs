//! Metadata type registry.
//!
//! The registry maps a lowercase logical key (`staticresource`, `apexpage`)
//! to the canonical type name used in `package.xml` and, optionally, the
//! folder that holds components of that type in a retrieved project.

use std::sync::OnceLock;

use serde::{Deserialize, Serialize};

use crate::error::{Error, ErrorKind, Result};

/// Registry shipped with the crate.
const BUILTIN_REGISTRY: &str = include_str!("../data/metadata.json");

static BUILTIN: OnceLock<MetadataTypeRegistry> = OnceLock::new();

/// A single registry entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistryEntry {
    /// Canonical type name, e.g. `StaticResource`.
    pub xml_type: String,
    /// Folder alias, e.g. `staticresources`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub folder: Option<String>,
}

/// Immutable, ordered metadata type registry.
///
/// Entries keep their declaration order so folder-alias scans are
/// deterministic when two entries share an alias.
#[derive(Debug, Clone, Default)]
pub struct MetadataTypeRegistry {
    entries: Vec<(String, RegistryEntry)>,
}

impl MetadataTypeRegistry {
    /// Parse a registry from a JSON object of `key -> { xmlType, folder? }`.
    ///
    /// Keys are lowercased. A key declared twice is an error.
    pub fn from_json(json: &str) -> Result<Self> {
        let document: serde_json::Map<String, serde_json::Value> = serde_json::from_str(json)?;

        let mut entries: Vec<(String, RegistryEntry)> = Vec::with_capacity(document.len());
        for (key, value) in document {
            let entry: RegistryEntry = serde_json::from_value(value).map_err(|e| {
                Error::with_source(
                    ErrorKind::Registry(format!("entry '{}' is malformed", key)),
                    e,
                )
            })?;

            if entry.xml_type.trim().is_empty() {
                return Err(Error::new(ErrorKind::Registry(format!(
                    "entry '{}' has an empty xmlType",
                    key
                ))));
            }

            let key = key.to_lowercase();
            if entries.iter().any(|(existing, _)| *existing == key) {
                return Err(Error::new(ErrorKind::Registry(format!(
                    "duplicate key '{}'",
                    key
                ))));
            }
            entries.push((key, entry));
        }

        Ok(Self { entries })
    }

    /// Build a registry from already-constructed entries, in order.
    pub fn from_entries<I, K>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, RegistryEntry)>,
        K: Into<String>,
    {
        Self {
            entries: entries
                .into_iter()
                .map(|(k, v)| (k.into().to_lowercase(), v))
                .collect(),
        }
    }

    /// The registry embedded in this crate, loaded once per process.
    pub fn builtin() -> &'static Self {
        BUILTIN.get_or_init(|| {
            Self::from_json(BUILTIN_REGISTRY).expect("embedded metadata registry is valid")
        })
    }

    /// Look up an entry by its logical key (case-insensitive).
    pub fn get(&self, key: &str) -> Option<&RegistryEntry> {
        let key = key.to_lowercase();
        self.entries
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, entry)| entry)
    }

    /// Iterate entries in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &RegistryEntry)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the registry has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_registry_loads() {
        let registry = MetadataTypeRegistry::builtin();
        assert!(!registry.is_empty());

        let entry = registry.get("staticresource").unwrap();
        assert_eq!(entry.xml_type, "StaticResource");
        assert_eq!(entry.folder.as_deref(), Some("staticresources"));
    }

    #[test]
    fn test_lookup_is_case_insensitive() {
        let registry = MetadataTypeRegistry::builtin();
        assert_eq!(registry.get("ApexPage").unwrap().xml_type, "ApexPage");
    }

    #[test]
    fn test_declaration_order_preserved() {
        let registry = MetadataTypeRegistry::from_json(
            r#"{
                "zeta": { "xmlType": "Zeta", "folder": "z" },
                "alpha": { "xmlType": "Alpha" },
                "Mid": { "xmlType": "Mid", "folder": "m" }
            }"#,
        )
        .unwrap();

        let keys: Vec<&str> = registry.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["zeta", "alpha", "mid"]);
        assert!(registry.get("alpha").unwrap().folder.is_none());
    }

    #[test]
    fn test_rejects_duplicate_keys_after_lowercasing() {
        let err = MetadataTypeRegistry::from_json(
            r#"{ "Page": { "xmlType": "ApexPage" }, "page": { "xmlType": "ApexPage" } }"#,
        )
        .unwrap_err();
        assert!(matches!(err.kind, ErrorKind::Registry(_)));
    }

    #[test]
    fn test_rejects_missing_xml_type() {
        let err =
            MetadataTypeRegistry::from_json(r#"{ "page": { "folder": "pages" } }"#).unwrap_err();
        assert!(err.to_string().contains("page"));
    }
}
