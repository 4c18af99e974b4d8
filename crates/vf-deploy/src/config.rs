//! Session options and their resolved configuration.
//!
//! Options arrive as loosely-filled JSON objects (camelCase, every field
//! optional) and are merged over defaults: a non-empty string wins, an empty
//! string or a missing field falls back to the default.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use forcepack_vf_metadata::{PackageManifest, DEFAULT_API_VERSION};
use serde::{Deserialize, Serialize};

use crate::error::{Error, ErrorKind, Result};

/// Default Salesforce login endpoint.
pub const DEFAULT_SERVER_URL: &str = "https://login.salesforce.com";

/// Default org alias used for target-scoped environment lookups.
pub const DEFAULT_TARGET: &str = "default";

pub const DEFAULT_POLL_WAIT_MILLIS: u64 = 10_000;
pub const DEFAULT_MAX_POLL: u32 = 20;

pub const DEFAULT_INPUT_PATH: &str = "input/";
pub const DEFAULT_OUTPUT_PATH: &str = "output/";
pub const DEFAULT_STATIC_RESOURCE_FOLDER: &str = "staticresources/";
pub const DEFAULT_PAGES_FOLDER: &str = "pages/";

/// What a session does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationMode {
    /// Build pages and static resource archives locally.
    Build,
    /// Deploy the output folder to an org.
    Deploy,
    /// Retrieve components from an org into the project.
    Retrieve,
    /// Delete components from an org.
    Destroy,
}

impl OperationMode {
    /// The Ant target this mode invokes, if it uses the tool at all.
    pub fn verb(&self) -> Option<&'static str> {
        match self {
            OperationMode::Build => None,
            OperationMode::Deploy | OperationMode::Destroy => Some("deploy"),
            OperationMode::Retrieve => Some("retrieve"),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OperationMode::Build => "build",
            OperationMode::Deploy => "deploy",
            OperationMode::Retrieve => "retrieve",
            OperationMode::Destroy => "destroy",
        }
    }
}

impl fmt::Display for OperationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OperationMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "build" => Ok(OperationMode::Build),
            "deploy" => Ok(OperationMode::Deploy),
            "retrieve" => Ok(OperationMode::Retrieve),
            "destroy" => Ok(OperationMode::Destroy),
            other => Err(Error::new(ErrorKind::Config(format!(
                "unknown operation mode: {other}"
            )))),
        }
    }
}

/// Returns the value if it is present and not blank.
fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.trim().is_empty())
}

fn pick(value: &Option<String>, default: &str) -> String {
    non_empty(value).unwrap_or(default).to_string()
}

/// HTTP proxy used by the deployment tool.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProxyConfig {
    pub host: String,
    pub port: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

impl fmt::Debug for ProxyConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProxyConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

/// Literal text substitution applied when HTML becomes a Visualforce page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagReplacement {
    pub from: String,
    pub to: String,
}

impl TagReplacement {
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
        }
    }
}

/// Project folder options shared by every mode.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PathOptions {
    #[serde(default)]
    pub input_path: Option<String>,
    #[serde(default)]
    pub output_path: Option<String>,
    #[serde(default)]
    pub static_resource_folder: Option<String>,
    #[serde(default)]
    pub pages_folder: Option<String>,
}

/// Resolved project folders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathConfig {
    pub input_path: PathBuf,
    pub output_path: PathBuf,
    pub static_resource_folder: String,
    pub pages_folder: String,
}

impl Default for PathConfig {
    fn default() -> Self {
        PathConfig::from_options(&PathOptions::default())
    }
}

impl PathConfig {
    pub fn from_options(options: &PathOptions) -> Self {
        Self {
            input_path: PathBuf::from(pick(&options.input_path, DEFAULT_INPUT_PATH)),
            output_path: PathBuf::from(pick(&options.output_path, DEFAULT_OUTPUT_PATH)),
            static_resource_folder: pick(
                &options.static_resource_folder,
                DEFAULT_STATIC_RESOURCE_FOLDER,
            ),
            pages_folder: pick(&options.pages_folder, DEFAULT_PAGES_FOLDER),
        }
    }

    /// Re-root relative input and output paths under `base`.
    pub fn rooted_at(mut self, base: &Path) -> Self {
        if self.input_path.is_relative() {
            self.input_path = base.join(&self.input_path);
        }
        if self.output_path.is_relative() {
            self.output_path = base.join(&self.output_path);
        }
        self
    }

    pub fn input_pages(&self) -> PathBuf {
        self.input_path.join(&self.pages_folder)
    }

    pub fn input_static_resources(&self) -> PathBuf {
        self.input_path.join(&self.static_resource_folder)
    }

    pub fn output_pages(&self) -> PathBuf {
        self.output_path.join(&self.pages_folder)
    }

    pub fn output_static_resources(&self) -> PathBuf {
        self.output_path.join(&self.static_resource_folder)
    }
}

/// Org connection options shared by deploy, retrieve and destroy.
#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrgOptions {
    #[serde(default)]
    pub target: Option<String>,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub pass: Option<String>,
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default, rename = "serverurl", alias = "serverUrl")]
    pub server_url: Option<String>,
    #[serde(default)]
    pub api_version: Option<String>,
    #[serde(default)]
    pub proxy_config: Option<ProxyConfig>,
    #[serde(default)]
    pub poll_wait_millis: Option<u64>,
    #[serde(default)]
    pub max_poll: Option<u32>,
    #[serde(default)]
    pub use_env: Option<bool>,
}

impl fmt::Debug for OrgOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OrgOptions")
            .field("target", &self.target)
            .field("user", &self.user)
            .field("pass", &self.pass.as_ref().map(|_| "[REDACTED]"))
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .field("server_url", &self.server_url)
            .field("api_version", &self.api_version)
            .field("proxy_config", &self.proxy_config)
            .field("poll_wait_millis", &self.poll_wait_millis)
            .field("max_poll", &self.max_poll)
            .field("use_env", &self.use_env)
            .finish()
    }
}

impl OrgOptions {
    /// Fill blank credential fields from the process environment.
    ///
    /// Looks up `SF_<TARGET>_USERNAME` before `SF_USERNAME` (likewise for
    /// `PASSWORD`, `TOKEN` and `SERVER_URL`). Explicit values are kept.
    pub fn merge_env(&mut self) {
        self.merge_env_with(|name| std::env::var(name).ok());
    }

    /// [`merge_env`](Self::merge_env) with a custom variable lookup.
    pub fn merge_env_with(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let scope = env_scope(non_empty(&self.target).unwrap_or(DEFAULT_TARGET));
        let find = |suffix: &str| {
            lookup(&format!("SF_{scope}_{suffix}"))
                .or_else(|| lookup(&format!("SF_{suffix}")))
                .filter(|v| !v.is_empty())
        };

        if non_empty(&self.user).is_none() {
            if let Some(user) = find("USERNAME") {
                self.user = Some(user);
            }
        }
        if non_empty(&self.pass).is_none() {
            if let Some(pass) = find("PASSWORD") {
                self.pass = Some(pass);
            }
        }
        if non_empty(&self.token).is_none() {
            if let Some(token) = find("TOKEN") {
                self.token = Some(token);
            }
        }
        if non_empty(&self.server_url).is_none() {
            if let Some(url) = find("SERVER_URL") {
                self.server_url = Some(url);
            }
        }
    }
}

/// Upper-cases a target alias into an environment variable segment.
fn env_scope(target: &str) -> String {
    target
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_uppercase()
            } else {
                '_'
            }
        })
        .collect()
}

/// Options for a build session.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildOptions {
    #[serde(flatten)]
    pub paths: PathOptions,
    #[serde(default)]
    pub api_version: Option<String>,
    #[serde(default)]
    pub tag_replacements: Vec<TagReplacement>,
}

/// Options for a deploy or destroy session.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeployOptions {
    #[serde(flatten)]
    pub org: OrgOptions,
    #[serde(flatten)]
    pub paths: PathOptions,
    #[serde(default)]
    pub pkg: Option<PackageManifest>,
    #[serde(default)]
    pub check_only: Option<bool>,
    #[serde(default)]
    pub run_all_tests: Option<bool>,
    #[serde(default)]
    pub rollback_on_error: Option<bool>,
    #[serde(default)]
    pub tests: Vec<String>,
}

/// Options for a retrieve session.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetrieveOptions {
    #[serde(flatten)]
    pub org: OrgOptions,
    #[serde(flatten)]
    pub paths: PathOptions,
    #[serde(default)]
    pub pkg: Option<PackageManifest>,
    #[serde(default)]
    pub retrieve_target: Option<String>,
    #[serde(default)]
    pub unzip: Option<bool>,
    #[serde(default)]
    pub existing_package: Option<bool>,
}

/// Options handed to a session, one variant per option shape.
#[derive(Debug, Clone)]
pub enum SessionOptions {
    Build(BuildOptions),
    Deploy(DeployOptions),
    Retrieve(RetrieveOptions),
}

impl SessionOptions {
    /// Parse the JSON option object for the given mode.
    pub fn from_json(mode: OperationMode, json: &str) -> Result<Self> {
        let json = if json.trim().is_empty() { "{}" } else { json };
        Ok(match mode {
            OperationMode::Build => SessionOptions::Build(serde_json::from_str(json)?),
            OperationMode::Deploy | OperationMode::Destroy => {
                SessionOptions::Deploy(serde_json::from_str(json)?)
            }
            OperationMode::Retrieve => SessionOptions::Retrieve(serde_json::from_str(json)?),
        })
    }

    /// Default options for a mode.
    pub fn default_for(mode: OperationMode) -> Self {
        match mode {
            OperationMode::Build => SessionOptions::Build(BuildOptions::default()),
            OperationMode::Deploy | OperationMode::Destroy => {
                SessionOptions::Deploy(DeployOptions::default())
            }
            OperationMode::Retrieve => SessionOptions::Retrieve(RetrieveOptions::default()),
        }
    }

    /// Org options, if this shape talks to an org.
    pub fn org_mut(&mut self) -> Option<&mut OrgOptions> {
        match self {
            SessionOptions::Build(_) => None,
            SessionOptions::Deploy(options) => Some(&mut options.org),
            SessionOptions::Retrieve(options) => Some(&mut options.org),
        }
    }

    pub fn paths(&self) -> &PathOptions {
        match self {
            SessionOptions::Build(options) => &options.paths,
            SessionOptions::Deploy(options) => &options.paths,
            SessionOptions::Retrieve(options) => &options.paths,
        }
    }

    fn accepts(&self, mode: OperationMode) -> bool {
        matches!(
            (self, mode),
            (SessionOptions::Build(_), OperationMode::Build)
                | (SessionOptions::Deploy(_), OperationMode::Deploy)
                | (SessionOptions::Deploy(_), OperationMode::Destroy)
                | (SessionOptions::Retrieve(_), OperationMode::Retrieve)
        )
    }
}

impl From<BuildOptions> for SessionOptions {
    fn from(options: BuildOptions) -> Self {
        SessionOptions::Build(options)
    }
}

impl From<DeployOptions> for SessionOptions {
    fn from(options: DeployOptions) -> Self {
        SessionOptions::Deploy(options)
    }
}

impl From<RetrieveOptions> for SessionOptions {
    fn from(options: RetrieveOptions) -> Self {
        SessionOptions::Retrieve(options)
    }
}

/// Resolved build settings.
#[derive(Debug, Clone)]
pub struct BuildConfig {
    pub paths: PathConfig,
    pub api_version: String,
    pub tag_replacements: Vec<TagReplacement>,
}

impl BuildConfig {
    pub fn from_options(options: &BuildOptions) -> Self {
        Self {
            paths: PathConfig::from_options(&options.paths),
            api_version: pick(&options.api_version, DEFAULT_API_VERSION),
            tag_replacements: options.tag_replacements.clone(),
        }
    }
}

/// Fully resolved settings for one deploy, retrieve or destroy run.
///
/// Field names mirror the build-file attributes the runner renders.
#[derive(Clone)]
pub struct DeploymentConfig {
    pub mode: OperationMode,
    pub target: String,
    pub user: String,
    pub pass: String,
    pub token: Option<String>,
    pub server_url: String,
    pub api_version: String,
    /// Folder the descriptors are written to and deployed from.
    pub root: PathBuf,
    pub poll_wait_millis: u64,
    pub max_poll: u32,
    pub check_only: bool,
    pub run_all_tests: bool,
    pub rollback_on_error: bool,
    pub tests: Vec<String>,
    pub use_env: bool,
    pub proxy: Option<ProxyConfig>,
    pub retrieve_target: PathBuf,
    pub unzip: bool,
    pub existing_package: bool,
    /// Where an existing `package.xml` is read from on retrieve.
    pub existing_package_path: PathBuf,
    pub pkg: Option<PackageManifest>,
    pub paths: PathConfig,
}

impl fmt::Debug for DeploymentConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeploymentConfig")
            .field("mode", &self.mode)
            .field("target", &self.target)
            .field("user", &self.user)
            .field("pass", &"[REDACTED]")
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .field("server_url", &self.server_url)
            .field("api_version", &self.api_version)
            .field("root", &self.root)
            .field("poll_wait_millis", &self.poll_wait_millis)
            .field("max_poll", &self.max_poll)
            .field("check_only", &self.check_only)
            .field("run_all_tests", &self.run_all_tests)
            .field("rollback_on_error", &self.rollback_on_error)
            .field("tests", &self.tests)
            .field("use_env", &self.use_env)
            .field("proxy", &self.proxy)
            .field("retrieve_target", &self.retrieve_target)
            .field("unzip", &self.unzip)
            .field("existing_package", &self.existing_package)
            .field("pkg", &self.pkg.as_ref().map(|p| p.len()))
            .finish()
    }
}

impl DeploymentConfig {
    fn from_org(mode: OperationMode, org: &OrgOptions, paths: PathConfig, root: PathBuf) -> Self {
        Self {
            mode,
            target: pick(&org.target, DEFAULT_TARGET),
            user: pick(&org.user, ""),
            pass: pick(&org.pass, ""),
            token: non_empty(&org.token).map(str::to_string),
            server_url: pick(&org.server_url, DEFAULT_SERVER_URL),
            api_version: pick(&org.api_version, DEFAULT_API_VERSION),
            retrieve_target: root.clone(),
            existing_package_path: paths.output_path.clone(),
            root,
            poll_wait_millis: org.poll_wait_millis.unwrap_or(DEFAULT_POLL_WAIT_MILLIS),
            max_poll: org.max_poll.unwrap_or(DEFAULT_MAX_POLL),
            check_only: false,
            run_all_tests: false,
            rollback_on_error: true,
            tests: Vec::new(),
            use_env: org.use_env.unwrap_or(false),
            proxy: org.proxy_config.clone().filter(|p| !p.host.trim().is_empty()),
            unzip: true,
            existing_package: false,
            pkg: None,
            paths,
        }
    }

    /// Resolve deploy or destroy options. Descriptors go to the output folder.
    pub fn for_deploy(mode: OperationMode, options: &DeployOptions) -> Result<Self> {
        let paths = PathConfig::from_options(&options.paths);
        let root = paths.output_path.clone();
        let mut config = Self::from_org(mode, &options.org, paths, root);
        config.pkg = Some(require_pkg(&options.pkg)?);
        config.check_only = options.check_only.unwrap_or(false);
        config.run_all_tests = options.run_all_tests.unwrap_or(false);
        config.rollback_on_error = options.rollback_on_error.unwrap_or(true);
        config.tests = options
            .tests
            .iter()
            .filter(|t| !t.trim().is_empty())
            .cloned()
            .collect();
        Ok(config)
    }

    /// Resolve retrieve options. Descriptors go to the staging directory.
    pub fn for_retrieve(options: &RetrieveOptions, staging_root: &Path) -> Result<Self> {
        let paths = PathConfig::from_options(&options.paths);
        let root = staging_root.to_path_buf();
        let mut config = Self::from_org(OperationMode::Retrieve, &options.org, paths, root);
        config.pkg = Some(require_pkg(&options.pkg)?);
        config.unzip = options.unzip.unwrap_or(true);
        if let Some(target) = non_empty(&options.retrieve_target) {
            config.retrieve_target = PathBuf::from(target);
        } else if !config.unzip {
            // Nothing post-processes the archive, so it has to outlive staging.
            config.retrieve_target = config.paths.output_path.clone();
        }
        config.existing_package = options.existing_package.unwrap_or(false);
        Ok(config)
    }
}

fn require_pkg(pkg: &Option<PackageManifest>) -> Result<PackageManifest> {
    match pkg {
        Some(pkg) if !pkg.is_empty() => Ok(pkg.clone()),
        _ => Err(Error::new(ErrorKind::MissingPackage)),
    }
}

/// A session's options resolved against the defaults.
#[derive(Debug, Clone)]
pub enum ResolvedConfig {
    Build(BuildConfig),
    Org(DeploymentConfig),
}

impl ResolvedConfig {
    /// Merge options for `mode` over the defaults and validate them.
    pub fn resolve(mode: OperationMode, options: &SessionOptions, staging_root: &Path) -> Result<Self> {
        if !options.accepts(mode) {
            return Err(Error::new(ErrorKind::Config(format!(
                "options do not match {mode} mode"
            ))));
        }

        match options {
            SessionOptions::Build(options) => {
                Ok(ResolvedConfig::Build(BuildConfig::from_options(options)))
            }
            SessionOptions::Deploy(options) => Ok(ResolvedConfig::Org(
                DeploymentConfig::for_deploy(mode, options)?,
            )),
            SessionOptions::Retrieve(options) => Ok(ResolvedConfig::Org(
                DeploymentConfig::for_retrieve(options, staging_root)?,
            )),
        }
    }

    pub fn paths(&self) -> &PathConfig {
        match self {
            ResolvedConfig::Build(config) => &config.paths,
            ResolvedConfig::Org(config) => &config.paths,
        }
    }

    /// Re-root every relative project path under `base`.
    pub fn rooted_at(self, base: &Path) -> Self {
        match self {
            ResolvedConfig::Build(mut config) => {
                config.paths = config.paths.rooted_at(base);
                ResolvedConfig::Build(config)
            }
            ResolvedConfig::Org(mut config) => {
                config.paths = config.paths.rooted_at(base);
                config.existing_package_path = config.paths.output_path.clone();
                if config.mode != OperationMode::Retrieve {
                    config.root = config.paths.output_path.clone();
                }
                if config.retrieve_target.is_relative() {
                    config.retrieve_target = base.join(&config.retrieve_target);
                }
                ResolvedConfig::Org(config)
            }
        }
    }
}
