//! Scripted command source flows: loading, default-serial synthesis, and
//! replay through the dispatcher.

use std::sync::Arc;

use labhost_cli::console::Console;
use labhost_cli::script::{run_script, SERIAL_ENV};
use labhost_core::{HostConfig, HostEntry, HostError};

fn test_console(cache: &tempfile::TempDir) -> Arc<Console> {
    let mut config = HostConfig::default();
    config.build.cache_dir = Some(cache.path().to_path_buf());
    config.hosts = vec![HostEntry {
        hostname: "lab-host-01".to_string(),
        cluster_ids: vec![],
    }];
    Arc::new(Console::new(config).expect("console construction"))
}

#[tokio::test]
async fn test_wrong_extension_is_usage_error() {
    let cache = tempfile::tempdir().unwrap();
    let console = test_console(&cache);

    let path = cache.path().join("commands.py");
    std::fs::write(&path, "commands = []").unwrap();

    let err = run_script(&console, &path).await.unwrap_err();
    assert!(matches!(err, HostError::Argument(_)));
}

#[tokio::test]
async fn test_replay_executes_lines_in_order() {
    let cache = tempfile::tempdir().unwrap();
    let console = test_console(&cache);

    let artifacts = cache.path().join("artifacts");
    std::fs::create_dir_all(&artifacts).unwrap();
    std::fs::write(artifacts.join("system.img"), b"system").unwrap();

    let path = cache.path().join("commands.toml");
    std::fs::write(
        &path,
        format!(
            r#"
commands = [
    "device --set_serial=SER1",
    "fetch --type=local_fs --path={}",
]
"#,
            artifacts.display()
        ),
    )
    .unwrap();

    run_script(&console, &path).await.unwrap();
    assert_eq!(console.state().serials(), vec!["SER1".to_string()]);
    assert!(console.state().device_image("system.img").is_some());
}

#[tokio::test]
async fn test_batch_entries_run_concurrently_and_to_completion() {
    let cache = tempfile::tempdir().unwrap();
    let console = test_console(&cache);

    let artifacts = cache.path().join("artifacts");
    std::fs::create_dir_all(&artifacts).unwrap();
    std::fs::write(artifacts.join("boot.img"), b"boot").unwrap();

    let path = cache.path().join("commands.toml");
    std::fs::write(
        &path,
        format!(
            r#"
commands = [
    ["device --set_serial=SER1", "fetch --type=local_fs --path={}"],
]
"#,
            artifacts.display()
        ),
    )
    .unwrap();

    run_script(&console, &path).await.unwrap();
    assert_eq!(console.state().serials(), vec!["SER1".to_string()]);
    assert!(console.state().device_image("boot.img").is_some());
}

#[tokio::test]
async fn test_failing_script_line_does_not_stop_replay() {
    let cache = tempfile::tempdir().unwrap();
    let console = test_console(&cache);

    let path = cache.path().join("commands.toml");
    std::fs::write(
        &path,
        r#"
commands = [
    "build --update=stop",
    "device --set_serial=SER7",
]
"#,
    )
    .unwrap();

    run_script(&console, &path).await.unwrap();
    // the malformed first line was reported; the second still ran
    assert_eq!(console.state().serials(), vec!["SER7".to_string()]);
}

#[tokio::test]
async fn test_env_serial_is_applied_before_replay() {
    let cache = tempfile::tempdir().unwrap();
    let console = test_console(&cache);

    let path = cache.path().join("commands.toml");
    std::fs::write(&path, "commands = []").unwrap();

    std::env::set_var(SERIAL_ENV, "ENVSER1");
    let result = run_script(&console, &path).await;
    std::env::remove_var(SERIAL_ENV);
    result.unwrap();

    assert_eq!(console.state().serials(), vec!["ENVSER1".to_string()]);
}
