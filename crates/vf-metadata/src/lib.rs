//! # forcepack-vf-metadata
//!
//! Metadata type registry, key resolution and descriptor generation for
//! Visualforce projects.
//!
//! ## Features
//!
//! - **Registry** - Embedded `key -> { xmlType, folder }` table, loaded once
//! - **Resolution** - Registry key, folder alias and irregular plural lookups
//! - **Descriptors** - Deterministic `package.xml` / `destructiveChanges.xml`
//! - **Side-files** - `-meta.xml` bodies for static resources and pages
//!
//! ## Example
//!
//! ```rust
//! use forcepack_vf_metadata::{build_package_xml, PackageManifest};
//!
//! let manifest = PackageManifest::new()
//!     .add_type("staticresources", vec!["Logo".to_string()])
//!     .add_type("apexpage", vec!["*".to_string()]);
//!
//! let xml = build_package_xml(Some(&manifest), "62.0").unwrap();
//! assert!(xml.contains("<name>StaticResource</name>"));
//! assert!(xml.contains("<name>ApexPage</name>"));
//! ```

mod error;
pub mod meta;
mod package;
mod registry;
mod resolver;
pub mod xml;

pub use error::{Error, ErrorKind, Result};
pub use package::{
    build_package_xml, PackageDescriptorBuilder, PackageManifest, PackageTypeMembers,
    DESTRUCTIVE_CHANGES_XML, METADATA_NAMESPACE, PACKAGE_XML,
};
pub use registry::{MetadataTypeRegistry, RegistryEntry};
pub use resolver::{MetadataTypeResolver, ResolutionStrategy};

/// Default Metadata API version.
pub const DEFAULT_API_VERSION: &str = "62.0";
