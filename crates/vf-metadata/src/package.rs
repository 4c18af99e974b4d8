//! Package manifests and `package.xml` generation.

use std::fmt;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::Result;
use crate::resolver::MetadataTypeResolver;
use crate::xml;

/// Namespace declared on the `<Package>` root element.
pub const METADATA_NAMESPACE: &str = "http://soap.sforce.com/2006/04/metadata";

/// File name of the package descriptor.
pub const PACKAGE_XML: &str = "package.xml";

/// File name of the destructive-changes descriptor.
pub const DESTRUCTIVE_CHANGES_XML: &str = "destructiveChanges.xml";

/// Type members in a package manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageTypeMembers {
    /// Logical key or type name, resolved when the descriptor is built.
    pub name: String,
    /// Member identifiers, unique and in insertion order.
    pub members: Vec<String>,
}

/// What to deploy, retrieve or delete: metadata type → members.
///
/// Types and members keep insertion order so the generated descriptor is
/// identical for identical input. Deserializes from a JSON object such as
/// `{"staticresource": ["Logo"], "apexpage": ["*"]}` in document order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PackageManifest {
    pub types: Vec<PackageTypeMembers>,
}

impl PackageManifest {
    /// Create an empty manifest.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a metadata type with its members.
    ///
    /// Adding a type that is already present merges the member lists.
    pub fn add_type(mut self, name: impl Into<String>, members: Vec<String>) -> Self {
        let name = name.into();
        for member in members {
            self.insert(name.clone(), member);
        }
        if !self.types.iter().any(|t| t.name == name) {
            self.types.push(PackageTypeMembers {
                name,
                members: Vec::new(),
            });
        }
        self
    }

    /// Insert one member, ignoring duplicates.
    pub fn insert(&mut self, name: impl Into<String>, member: impl Into<String>) {
        let name = name.into();
        let member = member.into();

        match self.types.iter_mut().find(|t| t.name == name) {
            Some(existing) => {
                if !existing.members.contains(&member) {
                    existing.members.push(member);
                }
            }
            None => self.types.push(PackageTypeMembers {
                name,
                members: vec![member],
            }),
        }
    }

    /// Returns true if the manifest has no types.
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Number of types.
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// Type keys in insertion order.
    pub fn type_names(&self) -> impl Iterator<Item = &str> {
        self.types.iter().map(|t| t.name.as_str())
    }
}

impl Serialize for PackageManifest {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.types.len()))?;
        for t in &self.types {
            map.serialize_entry(&t.name, &t.members)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for PackageManifest {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        struct ManifestVisitor;

        impl<'de> Visitor<'de> for ManifestVisitor {
            type Value = PackageManifest;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of metadata type to member names")
            }

            fn visit_map<A: MapAccess<'de>>(
                self,
                mut access: A,
            ) -> std::result::Result<Self::Value, A::Error> {
                let mut manifest = PackageManifest::new();
                while let Some((name, members)) = access.next_entry::<String, Vec<String>>()? {
                    manifest = manifest.add_type(name, members);
                }
                Ok(manifest)
            }
        }

        deserializer.deserialize_map(ManifestVisitor)
    }
}

/// Renders manifests into `package.xml` text.
#[derive(Debug, Clone, Copy)]
pub struct PackageDescriptorBuilder<'r> {
    resolver: MetadataTypeResolver<'r>,
}

impl<'r> PackageDescriptorBuilder<'r> {
    /// Create a builder that resolves type names with `resolver`.
    pub fn new(resolver: MetadataTypeResolver<'r>) -> Self {
        Self { resolver }
    }

    /// Build descriptor text for `manifest` at `api_version`.
    ///
    /// `None` produces an envelope holding only the version, which is what
    /// a destructive deploy pairs with its `destructiveChanges.xml`. Any
    /// type key that does not resolve fails the whole build.
    pub fn build(&self, manifest: Option<&PackageManifest>, api_version: &str) -> Result<String> {
        let mut body = String::new();

        if let Some(manifest) = manifest {
            for type_members in &manifest.types {
                let xml_type = self.resolver.resolve(&type_members.name)?;

                body.push_str("    <types>\n");
                for member in &type_members.members {
                    body.push_str(&format!(
                        "        <members>{}</members>\n",
                        xml::escape(member)
                    ));
                }
                body.push_str(&format!("        <name>{}</name>\n", xml::escape(xml_type)));
                body.push_str("    </types>\n");
            }
        }

        Ok(format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<Package xmlns="{namespace}">
{body}    <version>{version}</version>
</Package>
"#,
            namespace = METADATA_NAMESPACE,
            body = body,
            version = xml::escape(api_version),
        ))
    }
}

impl PackageDescriptorBuilder<'static> {
    /// Builder over the built-in registry.
    pub fn builtin() -> Self {
        Self::new(MetadataTypeResolver::builtin())
    }
}

/// Build a descriptor with the built-in registry.
pub fn build_package_xml(manifest: Option<&PackageManifest>, api_version: &str) -> Result<String> {
    PackageDescriptorBuilder::builtin().build(manifest, api_version)
}
