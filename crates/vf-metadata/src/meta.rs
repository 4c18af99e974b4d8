//! Companion `-meta.xml` side-files for built components.

use crate::package::METADATA_NAMESPACE;
use crate::xml;

/// Extension of a static resource archive.
pub const STATIC_RESOURCE_EXTENSION: &str = "resource";

/// Extension of a Visualforce page.
pub const PAGE_EXTENSION: &str = "page";

/// Suffix appended to a component file name to name its side-file.
pub const META_SUFFIX: &str = "-meta.xml";

/// Side-file name for a component file, e.g. `Logo.resource-meta.xml`.
pub fn meta_file_name(component_file: &str) -> String {
    format!("{}{}", component_file, META_SUFFIX)
}

/// Side-file body for a zipped static resource.
pub fn static_resource_meta() -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<StaticResource xmlns="{namespace}">
    <cacheControl>Public</cacheControl>
    <contentType>application/zip</contentType>
</StaticResource>
"#,
        namespace = METADATA_NAMESPACE
    )
}

/// Side-file body for a Visualforce page; the label is the page name.
pub fn page_meta(page_name: &str, api_version: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<ApexPage xmlns="{namespace}">
    <apiVersion>{version}</apiVersion>
    <availableInTouch>false</availableInTouch>
    <confirmationTokenRequired>false</confirmationTokenRequired>
    <label>{label}</label>
</ApexPage>
"#,
        namespace = METADATA_NAMESPACE,
        version = xml::escape(api_version),
        label = xml::escape(page_name),
    )
}
