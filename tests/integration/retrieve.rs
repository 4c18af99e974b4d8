//! Retrieve sessions: the fake tool writes a retrieved tree, the session
//! copies pages and unpacks static resources.

use std::fs;
use std::path::Path;

use super::common::{attribute, org, s, session, staging_dir, FakeAnt, RetrievedTree};
use forcepack::deploy::{OperationMode, RetrieveOptions, SessionOutcome, SessionState};
use forcepack::PackageManifest;
use tempfile::TempDir;

fn retrieve_pkg() -> PackageManifest {
    PackageManifest::new()
        .add_type("pages", vec![s("Home")])
        .add_type("staticresources", vec![s("A"), s("B"), s("C")])
}

fn tree() -> RetrievedTree {
    RetrievedTree {
        pages: vec![
            (s("Home.page"), s("<apex:page/>")),
            (s("Home.page-meta.xml"), s("<ApexPage/>")),
        ],
        resources: ["A", "B", "C"]
            .iter()
            .map(|name| {
                (
                    format!("{name}.resource"),
                    vec![(format!("{}.txt", name.to_lowercase()), name.to_string())],
                )
            })
            .collect(),
        corrupt: Vec::new(),
    }
}

#[tokio::test]
async fn test_retrieve_extracts_in_order() {
    let dir = TempDir::new().unwrap();
    let fake = FakeAnt::retrieving(tree());
    let mut session = session(dir.path(), OperationMode::Retrieve, fake.clone());
    session
        .configure(RetrieveOptions {
            org: org(),
            pkg: Some(retrieve_pkg()),
            ..Default::default()
        })
        .unwrap();

    let SessionOutcome::Retrieved(report) = session.execute().await.unwrap() else {
        panic!("expected a retrieve outcome");
    };

    let order: Vec<&str> = report
        .extraction
        .extracted
        .iter()
        .map(|e| e.name.as_str())
        .collect();
    assert_eq!(order, vec!["A.resource", "B.resource", "C.resource"]);

    let resources = dir.path().join("input/staticresources");
    assert_eq!(fs::read_to_string(resources.join("A/a.txt")).unwrap(), "A");
    assert_eq!(fs::read_to_string(resources.join("C/c.txt")).unwrap(), "C");

    assert!(dir.path().join("output/pages/Home.page").is_file());
    assert!(dir.path().join("output/pages/Home.page-meta.xml").is_file());

    let unpackaged = attribute(&fake.last_build_file(), "unpackaged").unwrap();
    assert!(unpackaged.ends_with("package.xml"));

    assert!(!staging_dir(dir.path()).exists());
    assert_eq!(session.state(), SessionState::Completed);
}

#[tokio::test]
async fn test_retrieve_skips_corrupt_archive_and_continues() {
    let dir = TempDir::new().unwrap();
    let mut tree = tree();
    tree.resources.remove(1);
    tree.corrupt.push(s("B.resource"));

    let mut session = session(dir.path(), OperationMode::Retrieve, FakeAnt::retrieving(tree));
    session
        .configure(RetrieveOptions {
            org: org(),
            pkg: Some(retrieve_pkg()),
            ..Default::default()
        })
        .unwrap();

    let SessionOutcome::Retrieved(report) = session.execute().await.unwrap() else {
        panic!("expected a retrieve outcome");
    };

    assert_eq!(report.extraction.extracted.len(), 2);
    assert_eq!(report.extraction.failures.len(), 1);
    assert_eq!(report.extraction.failures[0].name, "B.resource");

    let resources = dir.path().join("input/staticresources");
    assert!(resources.join("A/a.txt").is_file());
    assert!(resources.join("C/c.txt").is_file());
    assert!(!staging_dir(dir.path()).exists());
    assert_eq!(session.state(), SessionState::Completed);
}

#[tokio::test]
async fn test_retrieve_with_nothing_to_extract() {
    let dir = TempDir::new().unwrap();
    let tree = RetrievedTree {
        pages: vec![(s("Home.page"), s("<apex:page/>"))],
        ..Default::default()
    };
    let mut session = session(dir.path(), OperationMode::Retrieve, FakeAnt::retrieving(tree));
    session
        .configure(RetrieveOptions {
            org: org(),
            pkg: Some(retrieve_pkg()),
            ..Default::default()
        })
        .unwrap();

    let SessionOutcome::Retrieved(report) = session.execute().await.unwrap() else {
        panic!("expected a retrieve outcome");
    };
    assert_eq!(report.pages.len(), 1);
    assert!(report.extraction.extracted.is_empty());
    assert!(!staging_dir(dir.path()).exists());
}

#[tokio::test]
async fn test_retrieve_with_existing_package() {
    let dir = TempDir::new().unwrap();
    fs::create_dir_all(dir.path().join("output")).unwrap();
    fs::write(dir.path().join("output/package.xml"), "<Package/>").unwrap();

    let fake = FakeAnt::new();
    let mut session = session(dir.path(), OperationMode::Retrieve, fake.clone());
    session
        .configure(RetrieveOptions {
            org: org(),
            pkg: Some(retrieve_pkg()),
            existing_package: Some(true),
            unzip: Some(false),
            ..Default::default()
        })
        .unwrap();

    session.execute().await.unwrap();

    let build_file = fake.last_build_file();
    assert_eq!(fake.last_package().as_deref(), Some("<Package/>"));
    assert_eq!(attribute(&build_file, "unzip").as_deref(), Some("false"));
    let target = attribute(&build_file, "retrieveTarget").unwrap();
    assert!(Path::new(&target).starts_with(dir.path().join("output")));
    assert!(!staging_dir(dir.path()).exists());
}
