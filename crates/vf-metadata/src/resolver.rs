//! Resolution of logical resource keys to canonical metadata type names.
//!
//! A key may be a registry key (`staticresource`), a canonical type name
//! (`StaticResource`), a folder alias (`staticresources`) or one of a few
//! irregular plurals (`documents`). Resolution tries each
//! [`ResolutionStrategy`] in [`ResolutionStrategy::ORDER`]; the first match
//! wins.

use tracing::debug;

use crate::error::{Error, ErrorKind, Result};
use crate::registry::MetadataTypeRegistry;

/// Plural forms that do not match any folder alias directly.
const IRREGULAR_PLURALS: &[(&str, &str)] = &[
    ("documents", "document"),
    ("emails", "email"),
    ("reports", "report"),
    ("dashboards", "dashboard"),
];

/// A single way of turning a key into a canonical type name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionStrategy {
    /// Registry key or canonical type name.
    Direct,
    /// Folder alias, scanned in registry declaration order.
    FolderAlias,
    /// Irregular plural mapped to its singular, then resolved directly or by folder.
    IrregularPlural,
}

impl ResolutionStrategy {
    /// The order strategies are tried in.
    pub const ORDER: [ResolutionStrategy; 3] = [
        ResolutionStrategy::Direct,
        ResolutionStrategy::FolderAlias,
        ResolutionStrategy::IrregularPlural,
    ];

    /// Apply this strategy to an already-lowercased key.
    pub fn apply<'r>(&self, registry: &'r MetadataTypeRegistry, key: &str) -> Option<&'r str> {
        match self {
            ResolutionStrategy::Direct => direct(registry, key),
            ResolutionStrategy::FolderAlias => folder_alias(registry, key),
            ResolutionStrategy::IrregularPlural => {
                let singular = IRREGULAR_PLURALS
                    .iter()
                    .find(|(plural, _)| *plural == key)
                    .map(|(_, singular)| *singular)?;
                direct(registry, singular).or_else(|| folder_alias(registry, singular))
            }
        }
    }
}

fn direct<'r>(registry: &'r MetadataTypeRegistry, key: &str) -> Option<&'r str> {
    if let Some(entry) = registry.get(key) {
        return Some(entry.xml_type.as_str());
    }
    registry
        .iter()
        .find(|(_, entry)| entry.xml_type.eq_ignore_ascii_case(key))
        .map(|(_, entry)| entry.xml_type.as_str())
}

fn folder_alias<'r>(registry: &'r MetadataTypeRegistry, key: &str) -> Option<&'r str> {
    registry
        .iter()
        .find(|(_, entry)| {
            entry
                .folder
                .as_deref()
                .is_some_and(|folder| folder.eq_ignore_ascii_case(key))
        })
        .map(|(_, entry)| entry.xml_type.as_str())
}

/// Resolves logical keys against a registry.
#[derive(Debug, Clone, Copy)]
pub struct MetadataTypeResolver<'r> {
    registry: &'r MetadataTypeRegistry,
}

impl<'r> MetadataTypeResolver<'r> {
    /// Create a resolver over the given registry.
    pub fn new(registry: &'r MetadataTypeRegistry) -> Self {
        Self { registry }
    }

    /// The registry this resolver reads from.
    pub fn registry(&self) -> &'r MetadataTypeRegistry {
        self.registry
    }

    /// Resolve a key to its canonical type name.
    ///
    /// Returns [`ErrorKind::UnknownMetadataType`] when no strategy matches.
    pub fn resolve(&self, key: &str) -> Result<&'r str> {
        let lowered = key.trim().to_lowercase();

        for strategy in ResolutionStrategy::ORDER {
            if let Some(xml_type) = strategy.apply(self.registry, &lowered) {
                debug!(key, xml_type, ?strategy, "Resolved metadata type");
                return Ok(xml_type);
            }
        }

        Err(Error::new(ErrorKind::UnknownMetadataType(key.to_string())))
    }
}

impl MetadataTypeResolver<'static> {
    /// Resolver over the built-in registry.
    pub fn builtin() -> Self {
        Self::new(MetadataTypeRegistry::builtin())
    }
}
