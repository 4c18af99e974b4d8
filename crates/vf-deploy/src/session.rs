//! Sessions tie configuration, the runner and the archive stages together.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use forcepack_vf_archive::{
    filter_extension, ArchiveRef, CompressionOrchestrator, CompressionReport, ExtractionChain,
    ExtractionReport, DEFAULT_SETTLE_INTERVAL,
};
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use crate::config::{
    BuildConfig, DeploymentConfig, OperationMode, PathConfig, ResolvedConfig, SessionOptions,
};
use crate::error::{Error, ErrorKind, Result};
use crate::page::{HtmlPageBuilder, PageBuildReport, PageBuilder};
use crate::process::{AntLauncher, ToolConfig, ToolLauncher, ToolOutput};
use crate::runner::DeploymentProcessRunner;
use crate::staging::Staging;

/// Folder the org uses for Visualforce pages in a retrieved tree.
const RETRIEVED_PAGES: &str = "pages";

/// Folder the org uses for static resources in a retrieved tree.
const RETRIEVED_STATIC_RESOURCES: &str = "staticresources";

/// Lifecycle of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionState {
    Idle,
    Configured,
    Executing,
    Completed,
    Failed,
}

impl SessionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionState::Idle => "idle",
            SessionState::Configured => "configured",
            SessionState::Executing => "executing",
            SessionState::Completed => "completed",
            SessionState::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionState::Completed | SessionState::Failed)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a retrieve brought back.
#[derive(Debug, Clone, Default)]
pub struct RetrieveReport {
    pub output: ToolOutput,
    /// Page files copied into the output pages folder.
    pub pages: Vec<PathBuf>,
    pub extraction: ExtractionReport,
}

/// Result of a completed session.
#[derive(Debug, Clone)]
pub enum SessionOutcome {
    /// The input folders were missing and have been created; nothing was built.
    InputStructureCreated { created: Vec<PathBuf> },
    Built {
        pages: PageBuildReport,
        resources: CompressionReport,
    },
    Deployed(ToolOutput),
    Destroyed(ToolOutput),
    Retrieved(RetrieveReport),
}

/// A single build, deploy, retrieve or destroy.
///
/// `configure` moves an idle session to configured; `execute` (or
/// `destroy`) runs it to completed or failed. A session runs once.
pub struct DeploymentSession<L = AntLauncher> {
    mode: OperationMode,
    state: SessionState,
    config: Option<ResolvedConfig>,
    runner: DeploymentProcessRunner<L>,
    page_builder: Option<Box<dyn PageBuilder>>,
    settle_interval: Duration,
    base_dir: Option<PathBuf>,
    cancel: CancellationToken,
}

impl<L> fmt::Debug for DeploymentSession<L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeploymentSession")
            .field("mode", &self.mode)
            .field("state", &self.state)
            .field("config", &self.config)
            .field("settle_interval", &self.settle_interval)
            .field("base_dir", &self.base_dir)
            .finish_non_exhaustive()
    }
}

impl DeploymentSession<AntLauncher> {
    /// A session running the real tool, located from the environment.
    pub fn new(mode: OperationMode) -> Self {
        Self::with_runner(
            mode,
            DeploymentProcessRunner::new(ToolConfig::from_env(), Staging::default()),
        )
    }
}

impl<L: ToolLauncher> DeploymentSession<L> {
    pub fn with_runner(mode: OperationMode, runner: DeploymentProcessRunner<L>) -> Self {
        Self {
            mode,
            state: SessionState::Idle,
            config: None,
            runner,
            page_builder: None,
            settle_interval: DEFAULT_SETTLE_INTERVAL,
            base_dir: None,
            cancel: CancellationToken::new(),
        }
    }

    /// Replace the HTML page builder.
    pub fn with_page_builder(mut self, builder: impl PageBuilder + 'static) -> Self {
        self.page_builder = Some(Box::new(builder));
        self
    }

    /// Pause between extracted archives on retrieve.
    pub fn with_settle_interval(mut self, interval: Duration) -> Self {
        self.settle_interval = interval;
        self
    }

    /// Resolve relative project paths against `dir` instead of the working directory.
    pub fn with_base_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.base_dir = Some(dir.into());
        self
    }

    /// Cancelling the token stops a running tool and fails the session.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn mode(&self) -> OperationMode {
        self.mode
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn config(&self) -> Option<&ResolvedConfig> {
        self.config.as_ref()
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn runner(&self) -> &DeploymentProcessRunner<L> {
        &self.runner
    }

    fn expect_state(&self, expected: SessionState) -> Result<()> {
        if self.state == expected {
            Ok(())
        } else {
            Err(Error::new(ErrorKind::InvalidState {
                expected: expected.as_str(),
                actual: self.state.as_str(),
            }))
        }
    }

    /// Merge `options` over the defaults and validate them.
    ///
    /// Validation failures leave the session failed.
    pub fn configure(&mut self, options: impl Into<SessionOptions>) -> Result<&ResolvedConfig> {
        self.expect_state(SessionState::Idle)?;
        let options = options.into();

        match ResolvedConfig::resolve(self.mode, &options, self.runner.staging().root()) {
            Ok(resolved) => {
                let resolved = match &self.base_dir {
                    Some(base) => resolved.rooted_at(base),
                    None => resolved,
                };
                debug!(config = ?resolved, "Session configured");
                self.state = SessionState::Configured;
                Ok(&*self.config.insert(resolved))
            }
            Err(err) => {
                error!(mode = %self.mode, error = %err, "Invalid session options");
                self.state = SessionState::Failed;
                Err(err)
            }
        }
    }

    /// Run the configured operation.
    #[instrument(skip(self), fields(mode = %self.mode))]
    pub async fn execute(&mut self) -> Result<SessionOutcome> {
        let mode = self.mode;
        self.run_as(mode).await
    }

    /// Delete the configured manifest's components from the org.
    ///
    /// Available on deploy and destroy sessions.
    #[instrument(skip(self), fields(mode = %self.mode))]
    pub async fn destroy(&mut self) -> Result<SessionOutcome> {
        if !matches!(self.mode, OperationMode::Deploy | OperationMode::Destroy) {
            return Err(Error::new(ErrorKind::InvalidMode(self.mode.to_string())));
        }
        self.run_as(OperationMode::Destroy).await
    }

    async fn run_as(&mut self, mode: OperationMode) -> Result<SessionOutcome> {
        self.expect_state(SessionState::Configured)?;
        let config = self
            .config
            .clone()
            .ok_or_else(|| Error::new(ErrorKind::Config("session has no configuration".to_string())))?;

        self.state = SessionState::Executing;

        let result = match (&config, mode) {
            (ResolvedConfig::Build(config), OperationMode::Build) => self.run_build(config).await,
            (ResolvedConfig::Org(config), OperationMode::Deploy) => self
                .runner
                .run(config, mode, &self.cancel)
                .await
                .map(|outcome| SessionOutcome::Deployed(outcome.output)),
            (ResolvedConfig::Org(config), OperationMode::Destroy) => self
                .runner
                .run(config, mode, &self.cancel)
                .await
                .map(|outcome| SessionOutcome::Destroyed(outcome.output)),
            (ResolvedConfig::Org(config), OperationMode::Retrieve) => {
                self.run_retrieve(config).await
            }
            _ => Err(Error::new(ErrorKind::InvalidMode(mode.to_string()))),
        };

        match &result {
            Ok(_) => {
                info!(mode = %mode, "Session completed");
                self.state = SessionState::Completed;
            }
            Err(err) => {
                error!(mode = %mode, error = %err, "Session failed");
                self.state = SessionState::Failed;
            }
        }
        result
    }

    async fn run_build(&self, config: &BuildConfig) -> Result<SessionOutcome> {
        let paths = &config.paths;

        let missing: Vec<PathBuf> = [paths.input_pages(), paths.input_static_resources()]
            .into_iter()
            .filter(|dir| !dir.is_dir())
            .collect();
        if !missing.is_empty() {
            for dir in &missing {
                fs::create_dir_all(dir)?;
            }
            info!(
                input = %paths.input_path.display(),
                "The input structure was missing and has been created; add pages and static resources and build again"
            );
            return Ok(SessionOutcome::InputStructureCreated { created: missing });
        }

        let pages = match &self.page_builder {
            Some(builder) => builder.build_pages(paths, &config.api_version)?,
            None => HtmlPageBuilder::new()
                .with_replacements(config.tag_replacements.clone())
                .build_pages(paths, &config.api_version)?,
        };

        let (done_tx, done_rx) = oneshot::channel();
        let resources = CompressionOrchestrator::new()
            .compress_all(
                &paths.input_static_resources(),
                &paths.output_static_resources(),
                move || {
                    let _ = done_tx.send(());
                },
            )
            .await?;
        done_rx.await.map_err(|_| {
            Error::new(ErrorKind::Archive(
                "compression finished without signalling completion".to_string(),
            ))
        })?;

        Ok(SessionOutcome::Built { pages, resources })
    }

    async fn run_retrieve(&self, config: &DeploymentConfig) -> Result<SessionOutcome> {
        let outcome = self
            .runner
            .run(config, OperationMode::Retrieve, &self.cancel)
            .await?;

        let mut report = RetrieveReport {
            output: outcome.output,
            ..Default::default()
        };

        let staging = self.runner.staging();

        if !config.unzip {
            if config.retrieve_target.starts_with(staging.root()) {
                staging.clear_build_file();
            } else {
                staging.clear();
            }
            info!(
                target_dir = %config.retrieve_target.display(),
                "unzip is disabled, leaving the retrieved archive in place"
            );
            return Ok(SessionOutcome::Retrieved(report));
        }

        let (pages, archives) = collect_retrieved(&config.retrieve_target, &config.paths)
            .inspect_err(|_| staging.clear())?;
        report.pages = pages;

        if archives.is_empty() {
            info!("No static resources were retrieved from the org");
            staging.clear();
            return Ok(SessionOutcome::Retrieved(report));
        }

        let (done_tx, done_rx) = oneshot::channel();
        report.extraction = ExtractionChain::new()
            .with_settle_interval(self.settle_interval)
            .with_staging_dir(staging.root())
            .extract_sequentially(&archives, &config.paths.input_static_resources(), move || {
                let _ = done_tx.send(());
            })
            .await;
        done_rx.await.map_err(|_| {
            Error::new(ErrorKind::Archive(
                "extraction finished without signalling completion".to_string(),
            ))
        })?;

        if !report.extraction.is_success() {
            warn!(
                failed = report.extraction.failures.len(),
                "Some static resources could not be extracted"
            );
        }

        Ok(SessionOutcome::Retrieved(report))
    }
}

/// Copy retrieved pages into the output tree and list the retrieved static
/// resource archives.
fn collect_retrieved(
    retrieved: &Path,
    paths: &PathConfig,
) -> Result<(Vec<PathBuf>, Vec<ArchiveRef>)> {
    let pages = copy_retrieved_pages(&retrieved.join(RETRIEVED_PAGES), &paths.output_pages())?;

    let resource_dir = retrieved.join(RETRIEVED_STATIC_RESOURCES);
    let names = list_file_names(&resource_dir)?;
    let archives = filter_extension(&names, ".resource")
        .into_iter()
        .map(|name| ArchiveRef::in_dir(&resource_dir, name))
        .collect();
    Ok((pages, archives))
}

/// Names of the regular files directly inside `dir`, sorted. Empty if `dir` is missing.
fn list_file_names(dir: &Path) -> Result<Vec<String>> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }
    let mut names = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if entry.file_type()?.is_file() {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
    }
    names.sort();
    Ok(names)
}

/// Copy every retrieved page file (and its meta file) into `dest`.
fn copy_retrieved_pages(source: &Path, dest: &Path) -> Result<Vec<PathBuf>> {
    let names = list_file_names(source)?;
    if names.is_empty() {
        return Ok(Vec::new());
    }

    fs::create_dir_all(dest)?;
    let mut copied = Vec::with_capacity(names.len());
    for name in names {
        let target = dest.join(&name);
        fs::copy(source.join(&name), &target)?;
        copied.push(target);
    }
    debug!(count = copied.len(), dest = %dest.display(), "Copied retrieved pages");
    Ok(copied)
}
