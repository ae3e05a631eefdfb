//! Console dispatch flows: parsing, failure isolation, batch execution,
//! and shared-state effects.

use std::path::PathBuf;
use std::sync::Arc;

use labhost_cli::console::{Console, LoopAction};
use labhost_core::{HostConfig, HostEntry, HostError};

fn test_console(cache: &tempfile::TempDir) -> Arc<Console> {
    let mut config = HostConfig::default();
    config.build.cache_dir = Some(cache.path().to_path_buf());
    config.hosts = vec![HostEntry {
        hostname: "lab-host-01".to_string(),
        cluster_ids: vec!["cluster-a".to_string()],
    }];
    Arc::new(Console::new(config).expect("console construction"))
}

fn artifact_dir(cache: &tempfile::TempDir) -> PathBuf {
    let dir = cache.path().join("artifacts");
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join("system.img"), b"system").unwrap();
    std::fs::write(dir.join("boot.img"), b"boot").unwrap();
    dir
}

#[tokio::test]
async fn test_exit_and_unknown_verbs() {
    let cache = tempfile::tempdir().unwrap();
    let console = test_console(&cache);

    assert_eq!(console.execute_line("exit").await, LoopAction::Exit);
    // unknown verbs are reported, not fatal
    assert_eq!(
        console.execute_line("frobnicate --fast").await,
        LoopAction::Continue
    );
    // empty lines are ignored
    assert_eq!(console.execute_line("   ").await, LoopAction::Continue);
}

#[tokio::test]
async fn test_malformed_flags_do_not_kill_the_loop() {
    let cache = tempfile::tempdir().unwrap();
    let console = test_console(&cache);

    let err = console.dispatch("build --update=start").await.unwrap_err();
    assert!(matches!(err, HostError::Argument(_)));
    // the loop continues afterwards
    assert_eq!(console.execute_line("info").await, LoopAction::Continue);
}

#[tokio::test]
async fn test_set_serial_updates_state() {
    let cache = tempfile::tempdir().unwrap();
    let console = test_console(&cache);

    console
        .dispatch("device --set_serial=SER1,SER2")
        .await
        .unwrap();
    assert_eq!(
        console.state().serials(),
        vec!["SER1".to_string(), "SER2".to_string()]
    );

    // replaced wholesale on the next set
    console.dispatch("device --set_serial=SER9").await.unwrap();
    assert_eq!(console.state().serials(), vec!["SER9".to_string()]);
}

#[tokio::test]
async fn test_local_fetch_merges_into_state() {
    let cache = tempfile::tempdir().unwrap();
    let console = test_console(&cache);
    let dir = artifact_dir(&cache);

    console
        .dispatch(&format!("fetch --type=local_fs --path={}", dir.display()))
        .await
        .unwrap();

    assert!(console.state().device_image("system.img").is_some());
    assert!(console.state().device_image("boot.img").is_some());

    // a second fetch touches only the keys it reports
    let other = cache.path().join("other");
    std::fs::create_dir_all(&other).unwrap();
    std::fs::write(other.join("vendor.img"), b"vendor").unwrap();
    console
        .dispatch(&format!("fetch --type=local_fs --path={}", other.display()))
        .await
        .unwrap();
    assert!(console.state().device_image("system.img").is_some());
    assert!(console.state().device_image("vendor.img").is_some());
}

#[tokio::test]
async fn test_batch_isolates_the_failing_line() {
    let cache = tempfile::tempdir().unwrap();
    let console = test_console(&cache);
    let dir = artifact_dir(&cache);

    let lines = vec![
        "device --set_serial=SER1".to_string(),
        "build --update=stop".to_string(), // missing required flags
        format!("fetch --type=local_fs --path={}", dir.display()),
    ];
    let results = console.execute_batch(&lines).await;
    assert_eq!(results.len(), 3);

    let by_line = |needle: &str| {
        results
            .iter()
            .find(|(line, _)| line.contains(needle))
            .expect("result tagged with its line")
    };
    assert!(by_line("set_serial").1.is_ok());
    assert!(matches!(
        by_line("build").1,
        Err(HostError::Argument(_))
    ));
    assert!(by_line("fetch").1.is_ok());

    // both healthy lines took effect
    assert_eq!(console.state().serials(), vec!["SER1".to_string()]);
    assert!(console.state().device_image("system.img").is_some());
}

#[tokio::test]
async fn test_gsispl_rejects_malformed_version_without_touching_state() {
    let cache = tempfile::tempdir().unwrap();
    let console = test_console(&cache);
    let dir = artifact_dir(&cache);

    console
        .dispatch(&format!("fetch --type=local_fs --path={}", dir.display()))
        .await
        .unwrap();
    let before = console.state().device_image("system.img").unwrap();

    let err = console
        .dispatch("gsispl --version=2020-13-40")
        .await
        .unwrap_err();
    assert!(matches!(err, HostError::Argument(_)));
    assert_eq!(console.state().device_image("system.img").unwrap(), before);
}

#[tokio::test]
async fn test_lease_host_resolution_errors() {
    let cache = tempfile::tempdir().unwrap();
    let console = test_console(&cache);

    let err = console.dispatch("lease --host=9").await.unwrap_err();
    assert!(matches!(err, HostError::NotFound(_)));

    // two hosts and no --host is ambiguous
    let mut config = HostConfig::default();
    config.build.cache_dir = Some(cache.path().to_path_buf());
    config.hosts = vec![
        HostEntry {
            hostname: "lab-host-01".to_string(),
            cluster_ids: vec![],
        },
        HostEntry {
            hostname: "lab-host-02".to_string(),
            cluster_ids: vec![],
        },
    ];
    let console = Arc::new(Console::new(config).unwrap());
    let err = console.dispatch("lease").await.unwrap_err();
    assert!(matches!(err, HostError::Argument(_)));
}

#[tokio::test]
async fn test_copy_resolves_suite_dir_token() {
    let cache = tempfile::tempdir().unwrap();
    let console = test_console(&cache);

    let suite_dir = cache.path().join("suite");
    std::fs::create_dir_all(&suite_dir).unwrap();
    std::fs::write(suite_dir.join("vts-tradefed"), b"#!/bin/sh").unwrap();
    console
        .dispatch(&format!(
            "fetch --type=local_fs --path={}",
            suite_dir.display()
        ))
        .await
        .unwrap();

    let src = cache.path().join("extra.config");
    std::fs::write(&src, b"key=value").unwrap();
    console
        .dispatch(&format!("copy {} {{suite_dir}}", src.display()))
        .await
        .unwrap();
    assert!(suite_dir.join("extra.config").is_file());

    // unrecognized placeholder tokens are reported
    let err = console
        .dispatch(&format!("copy {} {{elsewhere}}", src.display()))
        .await
        .unwrap_err();
    assert!(matches!(err, HostError::Argument(_)));
}

#[tokio::test]
async fn test_test_command_requires_fetched_suite() {
    let cache = tempfile::tempdir().unwrap();
    let console = test_console(&cache);

    let err = console.dispatch("test plan -m module").await.unwrap_err();
    assert!(matches!(err, HostError::NotFound(_)));

    let err = console
        .dispatch("test --test_exec_mode=remote plan")
        .await
        .unwrap_err();
    assert!(matches!(err, HostError::Argument(_)));
}

#[tokio::test]
async fn test_device_stop_without_session() {
    let cache = tempfile::tempdir().unwrap();
    let console = test_console(&cache);

    let err = console.dispatch("device --update=stop").await.unwrap_err();
    assert!(matches!(err, HostError::NotFound(_)));
}
