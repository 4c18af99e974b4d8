//! Ant build files for the Salesforce Migration Tool.
//!
//! One variant per operation, each with and without an HTTP proxy.

use std::path::Path;

use forcepack_vf_metadata::xml;

use crate::config::{DeploymentConfig, OperationMode, ProxyConfig};
use crate::credentials::{DeployCredentials, ENV_PASSWORD, ENV_USERNAME};
use crate::error::{Error, ErrorKind, Result};

/// Build file variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildFileTemplate {
    Deploy,
    DeployProxy,
    Retrieve,
    RetrieveProxy,
}

impl BuildFileTemplate {
    /// Pick the variant for a mode. Build mode has no build file.
    pub fn select(mode: OperationMode, proxy: bool) -> Result<Self> {
        match (mode, proxy) {
            (OperationMode::Deploy | OperationMode::Destroy, false) => Ok(Self::Deploy),
            (OperationMode::Deploy | OperationMode::Destroy, true) => Ok(Self::DeployProxy),
            (OperationMode::Retrieve, false) => Ok(Self::Retrieve),
            (OperationMode::Retrieve, true) => Ok(Self::RetrieveProxy),
            (OperationMode::Build, _) => Err(Error::new(ErrorKind::InvalidMode(
                mode.to_string(),
            ))),
        }
    }

    /// The Ant target the build file defines.
    pub fn verb(&self) -> &'static str {
        match self {
            Self::Deploy | Self::DeployProxy => "deploy",
            Self::Retrieve | Self::RetrieveProxy => "retrieve",
        }
    }

    pub fn uses_proxy(&self) -> bool {
        matches!(self, Self::DeployProxy | Self::RetrieveProxy)
    }

    /// Render the build file.
    ///
    /// `unpackaged` is the descriptor the retrieve target reads.
    pub fn render(
        &self,
        config: &DeploymentConfig,
        creds: &DeployCredentials,
        unpackaged: &Path,
    ) -> Result<String> {
        let proxy = if self.uses_proxy() {
            let proxy = config.proxy.as_ref().ok_or_else(|| {
                Error::new(ErrorKind::Config("proxyConfig is not defined".to_string()))
            })?;
            render_proxy(proxy)
        } else {
            String::new()
        };

        let (username, password) = if config.use_env {
            (
                format!("${{env.{ENV_USERNAME}}}"),
                format!("${{env.{ENV_PASSWORD}}}"),
            )
        } else {
            (xml::escape(creds.username()), xml::escape(creds.password()))
        };

        let task = match self {
            Self::Deploy | Self::DeployProxy => render_deploy_task(config, &username, &password),
            Self::Retrieve | Self::RetrieveProxy => {
                render_retrieve_task(config, &username, &password, unpackaged)
            }
        };

        Ok(format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<project name="forcepack" default="{verb}" basedir="." xmlns:sf="antlib:com.salesforce">
    <property environment="env"/>
    <target name="{verb}">
{proxy}{task}    </target>
</project>
"#,
            verb = self.verb(),
            proxy = proxy,
            task = task,
        ))
    }
}

fn render_proxy(proxy: &ProxyConfig) -> String {
    let mut attrs = format!(
        r#"proxyhost="{host}" proxyport="{port}""#,
        host = xml::escape(&proxy.host),
        port = proxy.port,
    );
    if let Some(user) = proxy.username.as_deref().filter(|u| !u.is_empty()) {
        attrs.push_str(&format!(r#" proxyuser="{}""#, xml::escape(user)));
    }
    if let Some(pass) = proxy.password.as_deref().filter(|p| !p.is_empty()) {
        attrs.push_str(&format!(r#" proxypassword="{}""#, xml::escape(pass)));
    }
    format!("        <setproxy {attrs}/>\n")
}

fn render_deploy_task(config: &DeploymentConfig, username: &str, password: &str) -> String {
    let test_level = if config.tests.is_empty() {
        String::new()
    } else {
        "\n            testLevel=\"RunSpecifiedTests\"".to_string()
    };

    let run_tests = config
        .tests
        .iter()
        .map(|t| format!("            <runTest>{}</runTest>\n", xml::escape(t)))
        .collect::<String>();

    format!(
        r#"        <sf:deploy username="{username}" password="{password}"
            serverurl="{server_url}"
            deployRoot="{root}"
            pollWaitMillis="{poll_wait}"
            maxPoll="{max_poll}"
            checkOnly="{check_only}"
            runAllTests="{run_all_tests}"
            rollbackOnError="{rollback_on_error}"{test_level}>
{run_tests}        </sf:deploy>
"#,
        server_url = xml::escape(&config.server_url),
        root = xml::escape(&config.root.to_string_lossy()),
        poll_wait = config.poll_wait_millis,
        max_poll = config.max_poll,
        check_only = config.check_only,
        run_all_tests = config.run_all_tests,
        rollback_on_error = config.rollback_on_error,
    )
}

fn render_retrieve_task(
    config: &DeploymentConfig,
    username: &str,
    password: &str,
    unpackaged: &Path,
) -> String {
    format!(
        r#"        <sf:retrieve username="{username}" password="{password}"
            serverurl="{server_url}"
            retrieveTarget="{retrieve_target}"
            unpackaged="{unpackaged}"
            apiVersion="{api_version}"
            pollWaitMillis="{poll_wait}"
            maxPoll="{max_poll}"
            unzip="{unzip}"/>
"#,
        server_url = xml::escape(&config.server_url),
        retrieve_target = xml::escape(&config.retrieve_target.to_string_lossy()),
        unpackaged = xml::escape(&unpackaged.to_string_lossy()),
        api_version = xml::escape(&config.api_version),
        poll_wait = config.poll_wait_millis,
        max_poll = config.max_poll,
        unzip = config.unzip,
    )
}
