//! Static resource compression.
//!
//! Every non-empty folder under the input root becomes one
//! `<name>.resource` archive plus a `<name>.resource-meta.xml` side-file.
//! Jobs run concurrently on the blocking pool and report to a per-call
//! [`FanIn`] barrier; the completion callback runs once every launched job
//! has finished, whether it succeeded or failed.

use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use forcepack_vf_metadata::meta::{meta_file_name, static_resource_meta, STATIC_RESOURCE_EXTENSION};
use tokio::task::JoinSet;
use tracing::{debug, info, instrument, warn};
use walkdir::WalkDir;
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

use crate::error::{Error, ErrorKind, Result};
use crate::fan_in::{CompletionGuard, FanIn};

/// Lifecycle of one archive job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    Pending,
    Running,
    Done,
    Failed,
}

/// One folder to compress.
#[derive(Debug, Clone)]
pub struct ArchiveJob {
    /// Folder name, which is also the resource name.
    pub resource_name: String,
    /// Folder being compressed.
    pub source_path: PathBuf,
    /// Archive written by the job.
    pub dest_path: PathBuf,
    pub status: JobStatus,
}

/// Why a folder produced no archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// No files, and every subdirectory is empty.
    Empty,
    /// A plain file sitting directly in the input root.
    NotAFolder,
}

/// Result of scanning an input root.
#[derive(Debug, Clone, Default)]
pub struct Discovery {
    /// Eligible folders, in file-name order.
    pub jobs: Vec<ArchiveJob>,
    /// Entries that were passed over, with the reason.
    pub skipped: Vec<(String, SkipReason)>,
}

/// A job that reached a terminal state without producing an archive.
#[derive(Debug, Clone)]
pub struct JobFailure {
    pub resource_name: String,
    pub message: String,
}

/// Outcome of [`CompressionOrchestrator::compress_all`].
#[derive(Debug, Clone, Default)]
pub struct CompressionReport {
    /// Every launched job with its terminal status.
    pub jobs: Vec<ArchiveJob>,
    /// Archives written.
    pub archives: Vec<PathBuf>,
    /// Side-files written.
    pub meta_files: Vec<PathBuf>,
    pub failures: Vec<JobFailure>,
    pub skipped: Vec<(String, SkipReason)>,
}

impl CompressionReport {
    /// Returns true if every launched job succeeded.
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Returns true for hidden housekeeping entries such as `.DS_Store`.
pub fn is_housekeeping(name: &str) -> bool {
    name.starts_with('.')
}

fn visible_entries(dir: &Path) -> io::Result<Vec<fs::DirEntry>> {
    let mut entries = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if !is_housekeeping(&entry.file_name().to_string_lossy()) {
            entries.push(entry);
        }
    }
    entries.sort_by_key(|e| e.file_name());
    Ok(entries)
}

/// A folder is eligible if it holds a file or a non-empty subdirectory.
pub fn has_content(folder: &Path) -> Result<bool> {
    for entry in visible_entries(folder)? {
        let file_type = entry.file_type()?;
        if file_type.is_dir() {
            if !visible_entries(&entry.path())?.is_empty() {
                return Ok(true);
            }
        } else {
            return Ok(true);
        }
    }
    Ok(false)
}

/// Compresses resource folders into archives.
#[derive(Debug, Clone)]
pub struct CompressionOrchestrator {
    extension: String,
    write_meta: bool,
}

impl Default for CompressionOrchestrator {
    fn default() -> Self {
        Self {
            extension: STATIC_RESOURCE_EXTENSION.to_string(),
            write_meta: true,
        }
    }
}

impl CompressionOrchestrator {
    /// Create an orchestrator producing `.resource` archives with side-files.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the archive extension (without the dot).
    pub fn with_extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = extension.into();
        self
    }

    /// Enable or disable the `-meta.xml` side-file.
    pub fn with_meta_files(mut self, enabled: bool) -> Self {
        self.write_meta = enabled;
        self
    }

    /// Scan `input_root` for eligible folders.
    ///
    /// Housekeeping entries are ignored entirely. A missing input root
    /// yields an empty discovery.
    pub fn discover(&self, input_root: &Path, dest_root: &Path) -> Result<Discovery> {
        let mut discovery = Discovery::default();

        if !input_root.exists() {
            warn!(
                path = %input_root.display(),
                "Static resource folder was not created, the static resource build will be skipped"
            );
            return Ok(discovery);
        }
        if !input_root.is_dir() {
            return Err(Error::new(ErrorKind::NotADirectory(input_root.to_path_buf())));
        }

        for entry in visible_entries(input_root)? {
            let name = entry.file_name().to_string_lossy().to_string();
            let path = entry.path();

            if !entry.file_type()?.is_dir() {
                warn!(name = %name, "Ignoring file in static resource root; only folders are compressed");
                discovery.skipped.push((name, SkipReason::NotAFolder));
                continue;
            }

            if !has_content(&path)? {
                info!(name = %name, "Static resource folder is empty, skipping");
                discovery.skipped.push((name, SkipReason::Empty));
                continue;
            }

            let dest_path = dest_root.join(format!("{}.{}", name, self.extension));
            discovery.jobs.push(ArchiveJob {
                resource_name: name,
                source_path: path,
                dest_path,
                status: JobStatus::Pending,
            });
        }

        Ok(discovery)
    }

    /// Compress every eligible folder under `input_root` into `dest_root`.
    ///
    /// `on_all_complete` runs exactly once, after every launched job has
    /// reached a terminal state. It runs immediately when no folder is
    /// eligible. Individual job failures are reported, not returned.
    #[instrument(skip(self, on_all_complete), fields(input = %input_root.display()))]
    pub async fn compress_all<F>(
        &self,
        input_root: &Path,
        dest_root: &Path,
        on_all_complete: F,
    ) -> Result<CompressionReport>
    where
        F: FnOnce() + Send + 'static,
    {
        let discovery = self.discover(input_root, dest_root)?;
        let expected = discovery.jobs.len();
        let barrier = FanIn::new(expected, on_all_complete);

        let mut report = CompressionReport {
            skipped: discovery.skipped,
            ..Default::default()
        };

        if expected == 0 {
            barrier.release_if_idle();
            return Ok(report);
        }

        fs::create_dir_all(dest_root)?;
        info!(count = expected, "Compressing static resources");

        let launched: Vec<String> = discovery
            .jobs
            .iter()
            .map(|j| j.resource_name.clone())
            .collect();

        let mut set = JoinSet::new();
        for job in discovery.jobs {
            let barrier = Arc::clone(&barrier);
            let write_meta = self.write_meta;
            set.spawn_blocking(move || run_job(job, write_meta, barrier));
        }

        while let Some(joined) = set.join_next().await {
            match joined {
                Ok((job, Ok(meta_path))) => {
                    report.archives.push(job.dest_path.clone());
                    if let Some(meta_path) = meta_path {
                        report.meta_files.push(meta_path);
                    }
                    report.jobs.push(job);
                }
                Ok((job, Err(err))) => {
                    warn!(resource = %job.resource_name, error = %err, "Static resource compression failed");
                    report.failures.push(JobFailure {
                        resource_name: job.resource_name.clone(),
                        message: err.to_string(),
                    });
                    report.jobs.push(job);
                }
                Err(err) => {
                    warn!(error = %err, "Compression job did not finish normally");
                }
            }
        }

        // A job that panicked returned nothing; its guard still signalled the barrier.
        for name in launched {
            if !report.jobs.iter().any(|j| j.resource_name == name) {
                report.failures.push(JobFailure {
                    resource_name: name.clone(),
                    message: "compression job panicked".to_string(),
                });
                report.jobs.push(ArchiveJob {
                    dest_path: dest_root.join(format!("{}.{}", name, self.extension)),
                    source_path: input_root.join(&name),
                    resource_name: name,
                    status: JobStatus::Failed,
                });
            }
        }

        report.archives.sort();
        report.meta_files.sort();
        report.jobs.sort_by(|a, b| a.resource_name.cmp(&b.resource_name));

        info!(
            archives = report.archives.len(),
            failures = report.failures.len(),
            skipped = report.skipped.len(),
            "Static resource build complete"
        );

        Ok(report)
    }
}

fn run_job(
    mut job: ArchiveJob,
    write_meta: bool,
    barrier: Arc<FanIn>,
) -> (ArchiveJob, Result<Option<PathBuf>>) {
    let _guard = CompletionGuard::new(barrier);
    job.status = JobStatus::Running;
    debug!(resource = %job.resource_name, "Compression job started");

    let result = compress_folder(&job.source_path, &job.dest_path).and_then(|_| {
        if !write_meta {
            return Ok(None);
        }
        let file_name = job
            .dest_path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        let meta_path = job.dest_path.with_file_name(meta_file_name(&file_name));
        fs::write(&meta_path, static_resource_meta())?;
        Ok(Some(meta_path))
    });

    job.status = if result.is_ok() {
        JobStatus::Done
    } else {
        JobStatus::Failed
    };
    (job, result)
}

/// Zip the contents of `source` (not the folder itself) into `dest`.
///
/// Entries are added in file-name order; housekeeping entries are left out.
pub fn compress_folder(source: &Path, dest: &Path) -> Result<()> {
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent)?;
    }

    let file = File::create(dest)?;
    let mut zip = ZipWriter::new(file);
    let options =
        SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);

    for entry in WalkDir::new(source)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !is_housekeeping(&e.file_name().to_string_lossy()))
    {
        let entry = entry?;
        if entry.depth() == 0 {
            continue;
        }

        let relative = entry.path().strip_prefix(source)?;
        let name = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");

        if entry.file_type().is_dir() {
            zip.add_directory(format!("{}/", name), options)?;
        } else {
            zip.start_file(name, options)?;
            let mut input = File::open(entry.path())?;
            io::copy(&mut input, &mut zip)?;
        }
    }

    zip.finish()?;
    Ok(())
}
