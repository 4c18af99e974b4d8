//! # forcepack-vf-deploy
//!
//! Build, deploy, retrieve and destroy sessions for Visualforce projects.
//!
//! Deploy, retrieve and destroy drive the Salesforce Ant Migration Tool:
//! a build file and the package descriptors are rendered into a staging
//! directory, `ant` is run, and its output is streamed to `tracing` under
//! the `forcepack::tool` target.
//!
//! ## Example
//!
//! ```rust,ignore
//! use forcepack_vf_deploy::{DeploymentSession, DeployOptions, OperationMode};
//! use forcepack_vf_metadata::PackageManifest;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), forcepack_vf_deploy::Error> {
//!     let mut options = DeployOptions {
//!         pkg: Some(PackageManifest::new().add_type("pages", vec!["Home".into()])),
//!         ..Default::default()
//!     };
//!     options.org.merge_env();
//!
//!     let mut session = DeploymentSession::new(OperationMode::Deploy);
//!     session.configure(options)?;
//!     session.execute().await?;
//!     Ok(())
//! }
//! ```

mod config;
mod credentials;
mod error;
mod page;
mod process;
mod runner;
mod session;
mod staging;
mod template;

pub use config::{
    BuildConfig, BuildOptions, DeployOptions, DeploymentConfig, OperationMode, OrgOptions,
    PathConfig, PathOptions, ProxyConfig, ResolvedConfig, RetrieveOptions, SessionOptions,
    TagReplacement, DEFAULT_MAX_POLL, DEFAULT_POLL_WAIT_MILLIS, DEFAULT_SERVER_URL,
    DEFAULT_TARGET,
};
pub use credentials::{DeployCredentials, ENV_PASSWORD, ENV_USERNAME};
pub use error::{CredentialField, Error, ErrorKind, Result};
pub use page::{HtmlPageBuilder, PageBuildReport, PageBuilder};
pub use process::{
    AntLauncher, ToolConfig, ToolInvocation, ToolLauncher, ToolOutput, TOOL_LOG_TARGET,
};
pub use runner::{DeploymentProcessRunner, Descriptors, RunOutcome};
pub use session::{DeploymentSession, RetrieveReport, SessionOutcome, SessionState};
pub use staging::Staging;
pub use template::BuildFileTemplate;

// Re-export the cancellation token type sessions accept.
pub use tokio_util::sync::CancellationToken;
