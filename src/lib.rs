//! # forcepack
//!
//! Build, deploy and retrieve Visualforce metadata packages.
//!
//! ## Security
//!
//! - Passwords, security tokens and proxy passwords are redacted in Debug output
//! - Tracing skips credential parameters
//! - With `useEnv`, credentials reach the tool through its environment
//!   instead of the rendered build file
//!
//! ## Crates
//!
//! - **forcepack-vf-metadata** - Metadata type registry, name resolution, `package.xml`
//! - **forcepack-vf-archive** - Static resource compression and sequential extraction
//! - **forcepack-vf-deploy** - Sessions driving the Ant Migration Tool
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use forcepack::deploy::{BuildOptions, DeploymentSession, OperationMode};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut session = DeploymentSession::new(OperationMode::Build);
//!     session.configure(BuildOptions::default())?;
//!     let outcome = session.execute().await?;
//!     println!("{outcome:?}");
//!     Ok(())
//! }
//! ```

#[cfg(feature = "archive")]
pub use forcepack_vf_archive as archive;
#[cfg(feature = "deploy")]
pub use forcepack_vf_deploy as deploy;
#[cfg(feature = "metadata")]
pub use forcepack_vf_metadata as metadata;

#[cfg(feature = "metadata")]
pub use forcepack_vf_metadata::{build_package_xml, MetadataTypeResolver, PackageManifest};

#[cfg(feature = "deploy")]
pub use forcepack_vf_deploy::{DeploymentSession, OperationMode, SessionOutcome};
