//! One deploy, retrieve or destroy run of the deployment tool.

use std::fs;
use std::path::PathBuf;

use forcepack_vf_metadata::{PackageDescriptorBuilder, DESTRUCTIVE_CHANGES_XML, PACKAGE_XML};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, instrument, warn};

use crate::config::{DeploymentConfig, OperationMode};
use crate::credentials::DeployCredentials;
use crate::error::{Error, ErrorKind, Result};
use crate::process::{AntLauncher, ToolConfig, ToolLauncher, ToolOutput};
use crate::staging::Staging;
use crate::template::BuildFileTemplate;

/// Descriptor text for one run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Descriptors {
    /// `package.xml`, absent when retrieving with an existing package.
    pub package: Option<String>,
    /// `destructiveChanges.xml`, destroy only.
    pub destructive_changes: Option<String>,
}

/// Result of a successful run.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub mode: OperationMode,
    pub output: ToolOutput,
    /// Folder the descriptors were written to.
    pub root: PathBuf,
}

/// Renders the build file and descriptors, then drives the tool.
#[derive(Debug)]
pub struct DeploymentProcessRunner<L = AntLauncher> {
    launcher: L,
    tool: ToolConfig,
    staging: Staging,
    descriptors: PackageDescriptorBuilder<'static>,
}

impl DeploymentProcessRunner<AntLauncher> {
    pub fn new(tool: ToolConfig, staging: Staging) -> Self {
        Self::with_launcher(AntLauncher, tool, staging)
    }
}

impl<L: ToolLauncher> DeploymentProcessRunner<L> {
    pub fn with_launcher(launcher: L, tool: ToolConfig, staging: Staging) -> Self {
        Self {
            launcher,
            tool,
            staging,
            descriptors: PackageDescriptorBuilder::builtin(),
        }
    }

    /// Resolve type names with a custom descriptor builder.
    pub fn with_descriptor_builder(mut self, descriptors: PackageDescriptorBuilder<'static>) -> Self {
        self.descriptors = descriptors;
        self
    }

    pub fn staging(&self) -> &Staging {
        &self.staging
    }

    pub fn launcher(&self) -> &L {
        &self.launcher
    }

    pub fn tool(&self) -> &ToolConfig {
        &self.tool
    }

    /// Build the descriptor text `mode` needs.
    ///
    /// Destroy pairs an empty `package.xml` with a `destructiveChanges.xml`
    /// listing the manifest.
    pub fn build_descriptors(
        &self,
        config: &DeploymentConfig,
        mode: OperationMode,
    ) -> Result<Descriptors> {
        let pkg = config
            .pkg
            .as_ref()
            .ok_or_else(|| Error::new(ErrorKind::MissingPackage))?;

        match mode {
            OperationMode::Deploy => Ok(Descriptors {
                package: Some(self.descriptors.build(Some(pkg), &config.api_version)?),
                destructive_changes: None,
            }),
            OperationMode::Destroy => Ok(Descriptors {
                package: Some(self.descriptors.build(None, &config.api_version)?),
                destructive_changes: Some(self.descriptors.build(Some(pkg), &config.api_version)?),
            }),
            OperationMode::Retrieve if config.existing_package => Ok(Descriptors::default()),
            OperationMode::Retrieve => Ok(Descriptors {
                package: Some(self.descriptors.build(Some(pkg), &config.api_version)?),
                destructive_changes: None,
            }),
            OperationMode::Build => Err(Error::new(ErrorKind::InvalidMode(mode.to_string()))),
        }
    }

    /// Run the tool for `mode`.
    ///
    /// Credentials and descriptors are validated before anything touches
    /// the filesystem. The staging directory is removed afterwards unless a
    /// retrieve succeeded; its contents are then the caller's to process.
    #[instrument(skip(self, config, cancel), fields(mode = %mode, target = %config.target))]
    pub async fn run(
        &self,
        config: &DeploymentConfig,
        mode: OperationMode,
        cancel: &CancellationToken,
    ) -> Result<RunOutcome> {
        let creds = DeployCredentials::from_config(config)?;
        let descriptors = self.build_descriptors(config, mode)?;
        let template = BuildFileTemplate::select(mode, config.proxy.is_some())?;
        let build_xml = template.render(config, &creds, &config.root.join(PACKAGE_XML))?;

        if let Err(err) = self.stage(config, mode, &build_xml, &descriptors) {
            self.staging.clear();
            return Err(err);
        }

        let mut invocation = self
            .tool
            .invocation(&self.staging.build_file(), template.verb());
        if config.use_env {
            invocation = invocation.with_env(creds.env_vars());
        }

        info!(verb = template.verb(), "Running deployment tool");

        let result = self
            .launcher
            .launch(&invocation, cancel)
            .await
            .and_then(ToolOutput::into_result);

        match result {
            Ok(output) => {
                if mode != OperationMode::Retrieve {
                    self.staging.clear();
                }
                info!("Deployment tool finished");
                Ok(RunOutcome {
                    mode,
                    output,
                    root: config.root.clone(),
                })
            }
            Err(err) => {
                error!(error = %err, "Deployment tool run failed");
                self.staging.clear();
                Err(err)
            }
        }
    }

    fn stage(
        &self,
        config: &DeploymentConfig,
        mode: OperationMode,
        build_xml: &str,
        descriptors: &Descriptors,
    ) -> Result<()> {
        self.staging.reset()?;
        fs::write(self.staging.build_file(), build_xml)?;
        fs::create_dir_all(&config.root)?;

        if let Some(package) = &descriptors.package {
            fs::write(config.root.join(PACKAGE_XML), package)?;
        }
        if let Some(destructive) = &descriptors.destructive_changes {
            fs::write(config.root.join(DESTRUCTIVE_CHANGES_XML), destructive)?;
        }

        if mode == OperationMode::Retrieve && config.existing_package {
            let existing = config.existing_package_path.join(PACKAGE_XML);
            if existing.is_file() {
                fs::copy(&existing, config.root.join(PACKAGE_XML))?;
            } else {
                warn!(
                    path = %existing.display(),
                    "existingPackage is set but no package.xml was found, retrieving without it"
                );
            }
        }

        Ok(())
    }
}
