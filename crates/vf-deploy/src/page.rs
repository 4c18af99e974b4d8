//! Turning HTML sources into Visualforce pages.

use std::fs;
use std::path::{Path, PathBuf};

use forcepack_vf_metadata::meta::{meta_file_name, page_meta, PAGE_EXTENSION};
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::config::{PathConfig, TagReplacement};
use crate::error::Result;

/// Files written by a page build.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageBuildReport {
    /// Generated `.page` files.
    pub pages: Vec<PathBuf>,
    /// Generated `.page-meta.xml` files.
    pub meta_files: Vec<PathBuf>,
    /// Non-HTML files copied as-is.
    pub copied: Vec<PathBuf>,
}

/// Builds the pages folder of the output tree.
pub trait PageBuilder: Send + Sync {
    fn build_pages(&self, paths: &PathConfig, api_version: &str) -> Result<PageBuildReport>;
}

/// Converts `<name>.html` into `<name>.page` plus its meta file and copies
/// everything else, keeping relative paths.
#[derive(Debug, Clone, Default)]
pub struct HtmlPageBuilder {
    replacements: Vec<TagReplacement>,
}

impl HtmlPageBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Literal substitutions applied, in order, to every HTML source.
    pub fn with_replacements(mut self, replacements: Vec<TagReplacement>) -> Self {
        self.replacements = replacements;
        self
    }

    fn apply_replacements(&self, source: &str) -> String {
        self.replacements
            .iter()
            .filter(|r| !r.from.is_empty())
            .fold(source.to_string(), |text, r| text.replace(&r.from, &r.to))
    }

    fn write_page(
        &self,
        source: &Path,
        stem: &str,
        dest_dir: &Path,
        api_version: &str,
        report: &mut PageBuildReport,
    ) -> Result<()> {
        let html = fs::read_to_string(source)?;
        let file_name = format!("{stem}.{PAGE_EXTENSION}");

        let page_path = dest_dir.join(&file_name);
        fs::write(&page_path, self.apply_replacements(&html))?;

        let meta_path = dest_dir.join(meta_file_name(&file_name));
        fs::write(&meta_path, page_meta(stem, api_version))?;

        debug!(page = %page_path.display(), "Built page");
        report.pages.push(page_path);
        report.meta_files.push(meta_path);
        Ok(())
    }
}

impl PageBuilder for HtmlPageBuilder {
    fn build_pages(&self, paths: &PathConfig, api_version: &str) -> Result<PageBuildReport> {
        let source_root = paths.input_pages();
        let dest_root = paths.output_pages();
        let mut report = PageBuildReport::default();

        if !source_root.is_dir() {
            debug!(path = %source_root.display(), "No pages folder, nothing to build");
            return Ok(report);
        }

        fs::create_dir_all(&dest_root)?;

        for entry in WalkDir::new(&source_root).sort_by_file_name() {
            let entry = entry?;
            if !entry.file_type().is_file() {
                continue;
            }

            let path = entry.path();
            let is_html = path
                .extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case("html"));

            if is_html {
                let stem = path
                    .file_stem()
                    .map(|s| s.to_string_lossy().into_owned())
                    .unwrap_or_default();
                self.write_page(path, &stem, &dest_root, api_version, &mut report)?;
            } else {
                let relative = path.strip_prefix(&source_root).unwrap_or(path);
                let dest = dest_root.join(relative);
                if let Some(parent) = dest.parent() {
                    fs::create_dir_all(parent)?;
                }
                fs::copy(path, &dest)?;
                report.copied.push(dest);
            }
        }

        info!(
            pages = report.pages.len(),
            copied = report.copied.len(),
            "Pages built"
        );
        Ok(report)
    }
}
