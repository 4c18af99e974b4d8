//! Deploy and destroy sessions against the fake tool.

use std::fs;
use std::time::Duration;

use super::common::{apex_classes, attribute, org, s, session, staging_dir, FakeAnt};
use forcepack::deploy::{
    DeployOptions, ErrorKind, OperationMode, ProxyConfig, SessionOptions, SessionOutcome,
    SessionState,
};
use tempfile::TempDir;

// ============================================================================
// Deploy
// ============================================================================

#[tokio::test]
async fn test_deploy_from_json_options() {
    let dir = TempDir::new().unwrap();
    let fake = FakeAnt::new();
    let json = serde_json::json!({
        "user": "dev@example.com",
        "pass": "secret",
        "token": "TOKEN",
        "serverurl": "https://test.salesforce.com",
        "checkOnly": true,
        "pollWaitMillis": 5000,
        "pkg": {
            "pages": ["Home", "About"],
            "staticresources": ["Logo"]
        }
    })
    .to_string();

    let mut session = session(dir.path(), OperationMode::Deploy, fake.clone());
    session
        .configure(SessionOptions::from_json(OperationMode::Deploy, &json).unwrap())
        .unwrap();
    let outcome = session.execute().await.unwrap();
    assert!(matches!(outcome, SessionOutcome::Deployed(_)));

    let build_file = fake.last_build_file();
    assert_eq!(attribute(&build_file, "password").as_deref(), Some("secretTOKEN"));
    assert_eq!(
        attribute(&build_file, "serverurl").as_deref(),
        Some("https://test.salesforce.com")
    );
    assert_eq!(attribute(&build_file, "checkOnly").as_deref(), Some("true"));
    assert_eq!(attribute(&build_file, "pollWaitMillis").as_deref(), Some("5000"));
    assert_eq!(attribute(&build_file, "maxPoll").as_deref(), Some("20"));

    let package = fs::read_to_string(dir.path().join("output/package.xml")).unwrap();
    assert!(package.contains("<name>ApexPage</name>"));
    assert!(package.contains("<name>StaticResource</name>"));
    assert!(package.find("ApexPage").unwrap() < package.find("StaticResource").unwrap());

    let invocation = fake.last_invocation();
    assert_eq!(invocation.args[0], "-buildfile");
    assert_eq!(invocation.args[2], "-lib");
    assert_eq!(invocation.verb(), Some("deploy"));

    assert!(!staging_dir(dir.path()).exists());
    assert_eq!(session.state(), SessionState::Completed);
}

#[tokio::test]
async fn test_deploy_descriptor_is_deterministic() {
    let mut descriptors = Vec::new();
    for _ in 0..2 {
        let dir = TempDir::new().unwrap();
        let mut session = session(dir.path(), OperationMode::Deploy, FakeAnt::new());
        session
            .configure(DeployOptions {
                org: org(),
                pkg: Some(apex_classes()),
                ..Default::default()
            })
            .unwrap();
        session.execute().await.unwrap();
        descriptors.push(fs::read(dir.path().join("output/package.xml")).unwrap());
    }
    assert_eq!(descriptors[0], descriptors[1]);
}

#[tokio::test]
async fn test_deploy_with_empty_user_never_spawns() {
    let dir = TempDir::new().unwrap();
    let fake = FakeAnt::new();
    let mut org = org();
    org.user = Some(s(""));

    let mut session = session(dir.path(), OperationMode::Deploy, fake.clone());
    session
        .configure(DeployOptions {
            org,
            pkg: Some(apex_classes()),
            ..Default::default()
        })
        .unwrap();

    let err = session.execute().await.unwrap_err();
    assert!(matches!(err.kind, ErrorKind::MissingCredential(_)));
    assert!(err.to_string().contains("username"));
    assert_eq!(fake.spawn_count(), 0);
    assert_eq!(session.state(), SessionState::Failed);
}

#[tokio::test]
async fn test_deploy_with_unknown_type_never_spawns() {
    let dir = TempDir::new().unwrap();
    let fake = FakeAnt::new();
    let mut session = session(dir.path(), OperationMode::Deploy, fake.clone());
    session
        .configure(DeployOptions {
            org: org(),
            pkg: Some(forcepack::PackageManifest::new().add_type("gadgets", vec![s("G")])),
            ..Default::default()
        })
        .unwrap();

    let err = session.execute().await.unwrap_err();
    assert!(err.to_string().contains("gadgets"));
    assert_eq!(fake.spawn_count(), 0);
}

#[tokio::test]
async fn test_deploy_tool_failure_cleans_staging() {
    let dir = TempDir::new().unwrap();
    let mut session = session(dir.path(), OperationMode::Deploy, FakeAnt::failing(1));
    session
        .configure(DeployOptions {
            org: org(),
            pkg: Some(apex_classes()),
            ..Default::default()
        })
        .unwrap();

    let err = session.execute().await.unwrap_err();
    assert!(matches!(err.kind, ErrorKind::ToolFailed { code: Some(1), .. }));
    assert!(err.tool_output().unwrap().contains("BUILD FINISHED"));
    assert!(!staging_dir(dir.path()).exists());
    assert_eq!(session.state(), SessionState::Failed);
}

#[tokio::test]
async fn test_deploy_cancellation_cleans_staging() {
    let dir = TempDir::new().unwrap();
    let fake = FakeAnt::hanging();
    let mut session = session(dir.path(), OperationMode::Deploy, fake.clone());
    session
        .configure(DeployOptions {
            org: org(),
            pkg: Some(apex_classes()),
            ..Default::default()
        })
        .unwrap();

    let cancel = session.cancellation_token();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        cancel.cancel();
    });

    let err = session.execute().await.unwrap_err();
    assert!(matches!(err.kind, ErrorKind::Cancelled));
    assert_eq!(fake.spawn_count(), 1);
    assert!(!staging_dir(dir.path()).exists());
    assert_eq!(session.state(), SessionState::Failed);
}

#[tokio::test]
async fn test_deploy_through_proxy_with_tests() {
    let dir = TempDir::new().unwrap();
    let fake = FakeAnt::new();
    let mut org = org();
    org.proxy_config = Some(ProxyConfig {
        host: s("proxy.corp"),
        port: 8080,
        username: None,
        password: None,
    });

    let mut session = session(dir.path(), OperationMode::Deploy, fake.clone());
    session
        .configure(DeployOptions {
            org,
            pkg: Some(apex_classes()),
            tests: vec![s("FooTest")],
            ..Default::default()
        })
        .unwrap();
    session.execute().await.unwrap();

    let build_file = fake.last_build_file();
    assert_eq!(attribute(&build_file, "proxyhost").as_deref(), Some("proxy.corp"));
    assert_eq!(attribute(&build_file, "proxyport").as_deref(), Some("8080"));
    assert!(build_file.contains("<runTest>FooTest</runTest>"));
}

// ============================================================================
// Destroy
// ============================================================================

#[tokio::test]
async fn test_destroy_session() {
    let dir = TempDir::new().unwrap();
    let fake = FakeAnt::new();
    let mut session = session(dir.path(), OperationMode::Destroy, fake.clone());
    session
        .configure(DeployOptions {
            org: org(),
            pkg: Some(apex_classes()),
            ..Default::default()
        })
        .unwrap();

    let outcome = session.execute().await.unwrap();
    assert!(matches!(outcome, SessionOutcome::Destroyed(_)));

    let package = fs::read_to_string(dir.path().join("output/package.xml")).unwrap();
    assert!(!package.contains("<types>"));
    let destructive =
        fs::read_to_string(dir.path().join("output/destructiveChanges.xml")).unwrap();
    assert!(destructive.contains("<members>Foo</members>"));
    assert!(destructive.contains("<name>ApexClass</name>"));
    assert_eq!(fake.last_invocation().verb(), Some("deploy"));
}
