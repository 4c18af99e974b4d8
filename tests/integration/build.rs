//! Build sessions: pages and static resources from the input tree.

use std::fs;

use super::common::{session, FakeAnt};
use forcepack::archive::SkipReason;
use forcepack::deploy::{OperationMode, SessionOptions, SessionOutcome, SessionState};
use tempfile::TempDir;

// ============================================================================
// Static resources
// ============================================================================

#[tokio::test]
async fn test_build_logo_and_empty_folder() {
    let dir = TempDir::new().unwrap();
    let resources = dir.path().join("input/staticresources");
    fs::create_dir_all(resources.join("Logo")).unwrap();
    fs::write(resources.join("Logo/logo.png"), "png-bytes").unwrap();
    fs::create_dir_all(resources.join("Empty")).unwrap();
    fs::create_dir_all(dir.path().join("input/pages")).unwrap();

    let mut session = session(dir.path(), OperationMode::Build, FakeAnt::new());
    session
        .configure(SessionOptions::default_for(OperationMode::Build))
        .unwrap();

    let SessionOutcome::Built { resources: report, .. } = session.execute().await.unwrap() else {
        panic!("expected a build outcome");
    };

    let out = dir.path().join("output/staticresources");
    assert!(out.join("Logo.resource").is_file());
    assert!(out.join("Logo.resource-meta.xml").is_file());
    assert!(!out.join("Empty.resource").exists());
    assert_eq!(report.archives.len(), 1);
    assert!(report
        .skipped
        .iter()
        .any(|(name, reason)| name == "Empty" && *reason == SkipReason::Empty));
    assert_eq!(session.state(), SessionState::Completed);
}

#[tokio::test]
async fn test_build_skips_folder_with_only_housekeeping_files() {
    let dir = TempDir::new().unwrap();
    let resources = dir.path().join("input/staticresources");
    fs::create_dir_all(resources.join("Junk")).unwrap();
    fs::write(resources.join("Junk/.DS_Store"), "").unwrap();
    fs::create_dir_all(resources.join("Css")).unwrap();
    fs::write(resources.join("Css/site.css"), "body{}").unwrap();
    fs::write(resources.join("Css/.DS_Store"), "").unwrap();
    fs::create_dir_all(dir.path().join("input/pages")).unwrap();

    let mut session = session(dir.path(), OperationMode::Build, FakeAnt::new());
    session
        .configure(SessionOptions::default_for(OperationMode::Build))
        .unwrap();
    session.execute().await.unwrap();

    let out = dir.path().join("output/staticresources");
    assert!(out.join("Css.resource").is_file());
    assert!(!out.join("Junk.resource").exists());

    let archive = fs::File::open(out.join("Css.resource")).unwrap();
    let zip = zip::ZipArchive::new(archive).unwrap();
    let names: Vec<&str> = zip.file_names().collect();
    assert_eq!(names, vec!["site.css"]);
}

#[tokio::test]
async fn test_build_compresses_many_folders() {
    let dir = TempDir::new().unwrap();
    let resources = dir.path().join("input/staticresources");
    for i in 0..10 {
        let folder = resources.join(format!("Bundle{i}"));
        fs::create_dir_all(folder.join("js")).unwrap();
        fs::write(folder.join("js/app.js"), format!("console.log({i})")).unwrap();
    }
    fs::create_dir_all(dir.path().join("input/pages")).unwrap();

    let mut session = session(dir.path(), OperationMode::Build, FakeAnt::new());
    session
        .configure(SessionOptions::default_for(OperationMode::Build))
        .unwrap();

    let SessionOutcome::Built { resources: report, .. } = session.execute().await.unwrap() else {
        panic!("expected a build outcome");
    };
    assert_eq!(report.archives.len(), 10);
    assert!(report.is_success());
}

// ============================================================================
// Pages and options
// ============================================================================

#[tokio::test]
async fn test_build_from_json_options() {
    let dir = TempDir::new().unwrap();
    let src = dir.path().join("src");
    fs::create_dir_all(src.join("views")).unwrap();
    fs::write(src.join("views/Landing.html"), "<html><p>hi</p></html>").unwrap();
    fs::create_dir_all(src.join("assets/Fonts")).unwrap();
    fs::write(src.join("assets/Fonts/font.woff"), "woff").unwrap();

    let json = serde_json::json!({
        "inputPath": "src/",
        "outputPath": "dist/",
        "pagesFolder": "views/",
        "staticResourceFolder": "assets/",
        "apiVersion": "58.0",
        "tagReplacements": [
            {"from": "<html>", "to": "<apex:page>"},
            {"from": "</html>", "to": "</apex:page>"}
        ]
    })
    .to_string();

    let mut session = session(dir.path(), OperationMode::Build, FakeAnt::new());
    session
        .configure(SessionOptions::from_json(OperationMode::Build, &json).unwrap())
        .unwrap();
    session.execute().await.unwrap();

    let dist = dir.path().join("dist");
    assert_eq!(
        fs::read_to_string(dist.join("views/Landing.page")).unwrap(),
        "<apex:page><p>hi</p></apex:page>"
    );
    assert!(fs::read_to_string(dist.join("views/Landing.page-meta.xml"))
        .unwrap()
        .contains("<apiVersion>58.0</apiVersion>"));
    assert!(dist.join("assets/Fonts.resource").is_file());
}

#[tokio::test]
async fn test_build_creates_input_structure_when_missing() {
    let dir = TempDir::new().unwrap();
    let fake = FakeAnt::new();
    let mut session = session(dir.path(), OperationMode::Build, fake.clone());
    session
        .configure(SessionOptions::default_for(OperationMode::Build))
        .unwrap();

    let outcome = session.execute().await.unwrap();
    assert!(matches!(
        outcome,
        SessionOutcome::InputStructureCreated { .. }
    ));
    assert!(dir.path().join("input/pages").is_dir());
    assert!(dir.path().join("input/staticresources").is_dir());
    assert!(!dir.path().join("output").exists());
    assert_eq!(fake.spawn_count(), 0);
}
