#![allow(dead_code)]

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use forcepack::deploy::{
    CancellationToken, DeploymentProcessRunner, DeploymentSession, Error, ErrorKind,
    OperationMode, OrgOptions, Staging, ToolConfig, ToolInvocation, ToolLauncher, ToolOutput,
};
use forcepack::PackageManifest;

/// A retrieved component tree the fake tool writes on retrieve.
#[derive(Clone, Default)]
pub struct RetrievedTree {
    pub pages: Vec<(String, String)>,
    /// Archive name and its `(entry, content)` pairs.
    pub resources: Vec<(String, Vec<(String, String)>)>,
    /// Names written as files that are not zip archives.
    pub corrupt: Vec<String>,
}

#[derive(Clone, Default)]
pub struct FakeAnt {
    pub spawns: Arc<AtomicUsize>,
    pub invocations: Arc<Mutex<Vec<ToolInvocation>>>,
    pub build_files: Arc<Mutex<Vec<String>>>,
    /// `package.xml` as staged when the tool started.
    pub packages: Arc<Mutex<Vec<Option<String>>>>,
    pub exit_code: i32,
    pub hang_until_cancelled: bool,
    pub tree: Option<RetrievedTree>,
}

impl FakeAnt {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(exit_code: i32) -> Self {
        Self {
            exit_code,
            ..Default::default()
        }
    }

    pub fn hanging() -> Self {
        Self {
            hang_until_cancelled: true,
            ..Default::default()
        }
    }

    pub fn retrieving(tree: RetrievedTree) -> Self {
        Self {
            tree: Some(tree),
            ..Default::default()
        }
    }

    pub fn spawn_count(&self) -> usize {
        self.spawns.load(Ordering::SeqCst)
    }

    pub fn last_build_file(&self) -> String {
        self.build_files
            .lock()
            .unwrap()
            .last()
            .cloned()
            .unwrap_or_default()
    }

    pub fn last_package(&self) -> Option<String> {
        self.packages.lock().unwrap().last().cloned().flatten()
    }

    pub fn last_invocation(&self) -> ToolInvocation {
        self.invocations
            .lock()
            .unwrap()
            .last()
            .cloned()
            .expect("tool was never launched")
    }
}

impl ToolLauncher for FakeAnt {
    async fn launch(
        &self,
        invocation: &ToolInvocation,
        cancel: &CancellationToken,
    ) -> Result<ToolOutput, Error> {
        self.spawns.fetch_add(1, Ordering::SeqCst);
        let build_file = fs::read_to_string(&invocation.args[1]).unwrap_or_default();
        self.build_files.lock().unwrap().push(build_file.clone());
        self.invocations.lock().unwrap().push(invocation.clone());
        let package = attribute(&build_file, "unpackaged")
            .and_then(|path| fs::read_to_string(path).ok());
        self.packages.lock().unwrap().push(package);

        if self.hang_until_cancelled {
            cancel.cancelled().await;
            return Err(Error::new(ErrorKind::Cancelled));
        }

        if invocation.verb() == Some("retrieve") {
            if let (Some(tree), Some(target)) =
                (&self.tree, attribute(&build_file, "retrieveTarget"))
            {
                write_tree(Path::new(&target), tree);
            }
        }

        Ok(ToolOutput {
            status: Some(self.exit_code),
            stdout: vec!["BUILD FINISHED".to_string()],
            stderr: vec![],
        })
    }
}

/// Value of the first `name="..."` attribute in `xml`.
pub fn attribute(xml: &str, name: &str) -> Option<String> {
    let needle = format!("{name}=\"");
    let start = xml.find(&needle)? + needle.len();
    let end = xml[start..].find('"')?;
    Some(xml[start..start + end].to_string())
}

fn write_tree(root: &Path, tree: &RetrievedTree) {
    let pages = root.join("pages");
    fs::create_dir_all(&pages).unwrap();
    for (name, content) in &tree.pages {
        fs::write(pages.join(name), content).unwrap();
    }

    let resources = root.join("staticresources");
    fs::create_dir_all(&resources).unwrap();
    for (name, entries) in &tree.resources {
        write_zip(&resources.join(name), entries);
        fs::write(
            resources.join(format!("{name}-meta.xml")),
            "<StaticResource/>",
        )
        .unwrap();
    }
    for name in &tree.corrupt {
        fs::write(resources.join(name), "not a zip").unwrap();
    }
}

pub fn write_zip(path: &Path, entries: &[(String, String)]) {
    let file = fs::File::create(path).unwrap();
    let mut zip = zip::ZipWriter::new(file);
    for (name, content) in entries {
        zip.start_file(name.as_str(), zip::write::SimpleFileOptions::default())
            .unwrap();
        zip.write_all(content.as_bytes()).unwrap();
    }
    zip.finish().unwrap();
}

pub fn session(dir: &Path, mode: OperationMode, fake: FakeAnt) -> DeploymentSession<FakeAnt> {
    let runner = DeploymentProcessRunner::with_launcher(
        fake,
        ToolConfig::default()
            .with_lib_dir(dir.join("lib"))
            .with_working_dir(dir),
        Staging::new(dir.join("tmp")),
    );
    DeploymentSession::with_runner(mode, runner)
        .with_base_dir(dir)
        .with_settle_interval(Duration::from_millis(1))
}

pub fn staging_dir(dir: &Path) -> PathBuf {
    dir.join("tmp")
}

pub fn org() -> OrgOptions {
    OrgOptions {
        user: Some("dev@example.com".to_string()),
        pass: Some("p".to_string()),
        token: Some("t".to_string()),
        ..Default::default()
    }
}

pub fn apex_classes() -> PackageManifest {
    PackageManifest::new().add_type("ApexClass", vec!["Foo".to_string(), "Bar".to_string()])
}

pub fn s(value: &str) -> String {
    value.to_string()
}
