//! Launching the deployment tool.

use std::fmt;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::error::{Error, ErrorKind, Result};

/// Tracing target for lines printed by the deployment tool.
pub const TOOL_LOG_TARGET: &str = "forcepack::tool";

/// Where the deployment tool lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolConfig {
    /// Program to run, `ant` unless overridden.
    pub program: String,
    /// Folder with the Migration Tool jar, passed as `-lib`.
    pub lib_dir: PathBuf,
    /// Working directory, passed as `-Dbasedir`.
    pub working_dir: PathBuf,
}

impl Default for ToolConfig {
    fn default() -> Self {
        let lib_dir = dirs::home_dir()
            .map(|home| home.join(".forcepack").join("lib"))
            .unwrap_or_else(|| PathBuf::from("lib"));
        Self {
            program: "ant".to_string(),
            lib_dir,
            working_dir: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
        }
    }
}

impl ToolConfig {
    /// Defaults overridden by `FORCEPACK_ANT` and `FORCEPACK_ANT_LIB`.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(program) = std::env::var("FORCEPACK_ANT") {
            if !program.is_empty() {
                config.program = program;
            }
        }
        if let Ok(lib) = std::env::var("FORCEPACK_ANT_LIB") {
            if !lib.is_empty() {
                config.lib_dir = PathBuf::from(lib);
            }
        }
        config
    }

    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    pub fn with_lib_dir(mut self, lib_dir: impl Into<PathBuf>) -> Self {
        self.lib_dir = lib_dir.into();
        self
    }

    pub fn with_working_dir(mut self, working_dir: impl Into<PathBuf>) -> Self {
        self.working_dir = working_dir.into();
        self
    }

    /// Command line for running `verb` from `build_file`.
    pub fn invocation(&self, build_file: &Path, verb: &str) -> ToolInvocation {
        ToolInvocation {
            program: self.program.clone(),
            args: vec![
                "-buildfile".to_string(),
                build_file.to_string_lossy().into_owned(),
                "-lib".to_string(),
                self.lib_dir.to_string_lossy().into_owned(),
                format!("-Dbasedir={}", self.working_dir.to_string_lossy()),
                verb.to_string(),
            ],
            env: Vec::new(),
            working_dir: self.working_dir.clone(),
        }
    }
}

/// A single tool run.
#[derive(Clone)]
pub struct ToolInvocation {
    pub program: String,
    pub args: Vec<String>,
    /// Extra environment variables. Values are never logged.
    pub env: Vec<(String, String)>,
    pub working_dir: PathBuf,
}

impl fmt::Debug for ToolInvocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToolInvocation")
            .field("program", &self.program)
            .field("args", &self.args)
            .field(
                "env",
                &self.env.iter().map(|(k, _)| k.as_str()).collect::<Vec<_>>(),
            )
            .field("working_dir", &self.working_dir)
            .finish()
    }
}

impl ToolInvocation {
    pub fn with_env(mut self, vars: Vec<(String, String)>) -> Self {
        self.env.extend(vars);
        self
    }

    /// The trailing Ant target.
    pub fn verb(&self) -> Option<&str> {
        self.args.last().map(String::as_str)
    }
}

/// Exit status and captured output of a finished tool run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolOutput {
    /// Exit code, `None` if the process was killed by a signal.
    pub status: Option<i32>,
    pub stdout: Vec<String>,
    pub stderr: Vec<String>,
}

impl ToolOutput {
    pub fn success(&self) -> bool {
        self.status == Some(0)
    }

    /// Stdout followed by stderr.
    pub fn combined(&self) -> String {
        self.stdout
            .iter()
            .chain(self.stderr.iter())
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Turn a non-zero exit into a `ToolFailed` error.
    pub fn into_result(self) -> Result<Self> {
        if self.success() {
            Ok(self)
        } else {
            Err(Error::new(ErrorKind::ToolFailed {
                code: self.status,
                output: self.combined(),
            }))
        }
    }
}

/// Something that can run the deployment tool.
///
/// Implementations stream output as it arrives and resolve once the
/// process has exited. Cancelling `cancel` must stop the process and
/// resolve to a `Cancelled` error.
pub trait ToolLauncher: Send + Sync {
    fn launch(
        &self,
        invocation: &ToolInvocation,
        cancel: &CancellationToken,
    ) -> impl Future<Output = Result<ToolOutput>> + Send;
}

/// Runs the tool as a child process.
#[derive(Debug, Clone, Copy, Default)]
pub struct AntLauncher;

impl ToolLauncher for AntLauncher {
    #[instrument(skip(self, invocation, cancel), fields(program = %invocation.program, verb = ?invocation.verb()))]
    async fn launch(
        &self,
        invocation: &ToolInvocation,
        cancel: &CancellationToken,
    ) -> Result<ToolOutput> {
        let mut cmd = Command::new(&invocation.program);
        cmd.args(&invocation.args)
            .current_dir(&invocation.working_dir)
            .envs(invocation.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        debug!(args = ?invocation.args, "Spawning deployment tool");

        let mut child = cmd.spawn().map_err(|e| {
            Error::with_source(ErrorKind::Spawn(invocation.program.clone()), e)
        })?;

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();

        let stdout_task = tokio::spawn(async move {
            let mut lines = Vec::new();
            if let Some(stdout) = stdout {
                let mut reader = BufReader::new(stdout).lines();
                while let Ok(Some(line)) = reader.next_line().await {
                    info!(target: TOOL_LOG_TARGET, "{}", line);
                    lines.push(line);
                }
            }
            lines
        });

        let stderr_task = tokio::spawn(async move {
            let mut lines = Vec::new();
            if let Some(stderr) = stderr {
                let mut reader = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = reader.next_line().await {
                    warn!(target: TOOL_LOG_TARGET, "{}", line);
                    lines.push(line);
                }
            }
            lines
        });

        let status = tokio::select! {
            () = cancel.cancelled() => {
                warn!("Deployment tool cancelled");
                child.kill().await.ok();
                stdout_task.abort();
                stderr_task.abort();
                return Err(Error::new(ErrorKind::Cancelled));
            }
            status = child.wait() => status?,
        };

        let output = ToolOutput {
            status: status.code(),
            stdout: stdout_task.await.unwrap_or_default(),
            stderr: stderr_task.await.unwrap_or_default(),
        };

        debug!(status = ?output.status, "Deployment tool exited");
        Ok(output)
    }
}
