//! Sequential extraction of retrieved archives.
//!
//! Archives are extracted strictly one after another. After each successful
//! extraction the chain waits a short settle interval so file handles from
//! the previous archive are released before the next one is opened. A
//! failed archive is logged and recorded, and the chain moves on.

use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio::time::sleep;
use tracing::{debug, error, info, instrument, warn};
use zip::ZipArchive;

use crate::error::Result;

/// Pause inserted after each successful extraction.
pub const DEFAULT_SETTLE_INTERVAL: Duration = Duration::from_millis(100);

const S_IFMT: u32 = 0o170000;
const S_IFLNK: u32 = 0o120000;

/// Keep only names ending in `suffix`.
///
/// Used to drop `-meta.xml` companions from a retrieved folder listing.
pub fn filter_extension<S: AsRef<str>>(names: &[S], suffix: &str) -> Vec<String> {
    names
        .iter()
        .map(AsRef::as_ref)
        .filter(|name| name.ends_with(suffix))
        .map(String::from)
        .collect()
}

/// Directory name an archive is extracted into: the text before the first `.`.
pub fn destination_name(archive_name: &str) -> &str {
    archive_name.split('.').next().unwrap_or(archive_name)
}

/// An archive to extract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveRef {
    /// File name, e.g. `Logo.resource`.
    pub name: String,
    /// Full path to the archive.
    pub path: PathBuf,
}

impl ArchiveRef {
    /// Reference `name` inside `dir`.
    pub fn in_dir(dir: &Path, name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            path: dir.join(&name),
            name,
        }
    }
}

/// What one extraction produced.
#[derive(Debug, Clone, Default)]
pub struct ExtractedArchive {
    pub name: String,
    pub destination: PathBuf,
    pub files: usize,
    /// Entries not written: symbolic links and paths escaping the destination.
    pub skipped_entries: Vec<String>,
}

/// An archive that could not be extracted.
#[derive(Debug, Clone)]
pub struct ExtractionFailure {
    pub name: String,
    pub message: String,
}

/// Outcome of [`ExtractionChain::extract_sequentially`].
#[derive(Debug, Clone, Default)]
pub struct ExtractionReport {
    pub extracted: Vec<ExtractedArchive>,
    pub failures: Vec<ExtractionFailure>,
}

impl ExtractionReport {
    /// Returns true if every archive was extracted.
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Extracts archives one at a time.
#[derive(Debug, Clone)]
pub struct ExtractionChain {
    settle_interval: Duration,
    staging_dir: Option<PathBuf>,
}

impl Default for ExtractionChain {
    fn default() -> Self {
        Self {
            settle_interval: DEFAULT_SETTLE_INTERVAL,
            staging_dir: None,
        }
    }
}

impl ExtractionChain {
    /// Create a chain with the default settle interval.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the pause after each successful extraction.
    pub fn with_settle_interval(mut self, interval: Duration) -> Self {
        self.settle_interval = interval;
        self
    }

    /// Directory to remove once the whole chain has run.
    pub fn with_staging_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.staging_dir = Some(dir.into());
        self
    }

    /// Extract `archives` in order into `output_root/<destination_name>`.
    ///
    /// `on_done` runs once after the last archive has been processed and the
    /// staging directory has been cleared.
    #[instrument(skip(self, archives, on_done), fields(count = archives.len()))]
    pub async fn extract_sequentially<F>(
        &self,
        archives: &[ArchiveRef],
        output_root: &Path,
        on_done: F,
    ) -> ExtractionReport
    where
        F: FnOnce(),
    {
        let mut report = ExtractionReport::default();

        for archive in archives {
            let destination = output_root.join(destination_name(&archive.name));
            let path = archive.path.clone();
            let target = destination.clone();

            let outcome = tokio::task::spawn_blocking(move || extract_archive(&path, &target))
                .await
                .map_err(crate::Error::from)
                .and_then(|r| r);

            match outcome {
                Ok(mut extracted) => {
                    extracted.name = archive.name.clone();
                    info!(
                        archive = %archive.name,
                        files = extracted.files,
                        "Finished extracting {}",
                        destination_name(&archive.name)
                    );
                    report.extracted.push(extracted);
                    sleep(self.settle_interval).await;
                }
                Err(err) => {
                    error!(archive = %archive.name, error = %err, "Error decompressing archive");
                    report.failures.push(ExtractionFailure {
                        name: archive.name.clone(),
                        message: err.to_string(),
                    });
                }
            }
        }

        info!(
            extracted = report.extracted.len(),
            failed = report.failures.len(),
            "All retrieved archives were processed"
        );

        if let Some(staging) = &self.staging_dir {
            clear_dir(staging);
        }

        on_done();
        report
    }
}

/// Remove a directory tree, tolerating its absence.
pub fn clear_dir(dir: &Path) {
    match fs::remove_dir_all(dir) {
        Ok(()) => debug!(path = %dir.display(), "Cleared directory"),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => warn!(path = %dir.display(), error = %e, "Failed to clear directory"),
    }
}

fn is_symlink(mode: Option<u32>) -> bool {
    mode.is_some_and(|m| m & S_IFMT == S_IFLNK)
}

/// Extract one archive into `destination`.
///
/// Symbolic-link entries and entries whose path would leave `destination`
/// are skipped.
pub fn extract_archive(archive_path: &Path, destination: &Path) -> Result<ExtractedArchive> {
    let mut archive = ZipArchive::new(File::open(archive_path)?)?;
    fs::create_dir_all(destination)?;

    let mut extracted = ExtractedArchive {
        name: archive_path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default(),
        destination: destination.to_path_buf(),
        ..Default::default()
    };

    for i in 0..archive.len() {
        let mut entry = archive.by_index(i)?;

        if is_symlink(entry.unix_mode()) {
            debug!(entry = entry.name(), "Skipping symbolic link");
            extracted.skipped_entries.push(entry.name().to_string());
            continue;
        }

        let Some(relative) = entry.enclosed_name() else {
            warn!(entry = entry.name(), "Skipping entry with unsafe path");
            extracted.skipped_entries.push(entry.name().to_string());
            continue;
        };
        let outpath = destination.join(relative);

        if entry.is_dir() {
            fs::create_dir_all(&outpath)?;
            continue;
        }

        if let Some(parent) = outpath.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut outfile = File::create(&outpath)?;
        io::copy(&mut entry, &mut outfile)?;
        extracted.files += 1;
    }

    Ok(extracted)
}
