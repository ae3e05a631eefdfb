//! End-to-end flows against mocked scheduler, task, and build servers.

use std::sync::Arc;

use labhost_cli::console::Console;
use labhost_core::{HostConfig, HostEntry, HostError};
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

struct Backends {
    scheduler: MockServer,
    tasks: MockServer,
    partner: MockServer,
}

async fn backends() -> Backends {
    Backends {
        scheduler: MockServer::start().await,
        tasks: MockServer::start().await,
        partner: MockServer::start().await,
    }
}

fn console_for(backends: &Backends, cache: &tempfile::TempDir) -> Arc<Console> {
    let mut config = HostConfig::default();
    config.scheduler.url = backends.scheduler.uri();
    config.tasks.url = backends.tasks.uri();
    config.build.partner_url = backends.partner.uri();
    config.build.cache_dir = Some(cache.path().to_path_buf());
    config.hosts = vec![HostEntry {
        hostname: "lab-host-01".to_string(),
        cluster_ids: vec!["cluster-a".to_string()],
    }];
    Arc::new(Console::new(config).expect("console construction"))
}

#[tokio::test]
async fn test_build_update_single_uploads_successful_builds() {
    let backends = backends().await;
    let cache = tempfile::tempdir().unwrap();

    Mock::given(method("GET"))
        .and(path("/builds/v1/list"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "builds": [
                {"build_id": "101", "successful": true},
                {"build_id": "100", "successful": false}
            ]
        })))
        .mount(&backends.partner)
        .await;
    Mock::given(method("POST"))
        .and(path("/build_info/v1/set"))
        .and(body_partial_json(serde_json::json!({
            "manifest_branch": "main",
            "build_id": "101",
            "build_target": "sailfish",
            "build_type": "userdebug",
            "artifact_type": "device"
        })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&backends.scheduler)
        .await;

    let console = console_for(&backends, &cache);
    console
        .dispatch("build --update=single --branch=main --target=sailfish-userdebug")
        .await
        .unwrap();
}

#[tokio::test]
async fn test_build_session_start_stop_restart() {
    let backends = backends().await;
    let cache = tempfile::tempdir().unwrap();

    Mock::given(method("GET"))
        .and(path("/builds/v1/list"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "builds": []
        })))
        .mount(&backends.partner)
        .await;

    let console = console_for(&backends, &cache);
    console
        .dispatch("build --update=start --id=1 --interval=60 --branch=main --target=t")
        .await
        .unwrap();

    // a second start on a running id is rejected
    let err = console
        .dispatch("build --update=start --id=1 --interval=60 --branch=main --target=t")
        .await
        .unwrap_err();
    assert!(matches!(err, HostError::AlreadyRunning(_)));

    // a stopped id can be restarted right away
    console
        .dispatch("build --update=stop --id=1 --branch=main --target=t")
        .await
        .unwrap();
    console
        .dispatch("build --update=start --id=1 --interval=60 --branch=main --target=t")
        .await
        .unwrap();
}

#[tokio::test]
async fn test_lease_prints_tasks_from_the_task_server() {
    let backends = backends().await;
    let cache = tempfile::tempdir().unwrap();

    Mock::given(method("POST"))
        .and(path("/tasks/v1/lease"))
        .and(body_partial_json(serde_json::json!({
            "hostname": "lab-host-01"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "tasks": [{
                "request_id": "r1",
                "command_id": "c1",
                "task_id": "t1",
                "device_serials": ["SER1"],
                "command_line": "vts -m kernel"
            }]
        })))
        .expect(1)
        .mount(&backends.tasks)
        .await;

    let console = console_for(&backends, &cache);
    console.dispatch("lease").await.unwrap();
}

#[tokio::test]
async fn test_request_submits_to_the_task_server() {
    let backends = backends().await;
    let cache = tempfile::tempdir().unwrap();

    Mock::given(method("POST"))
        .and(path("/requests/v1/new"))
        .and(body_partial_json(serde_json::json!({
            "cluster": "cluster-a",
            "run_target": "sailfish",
            "user": "tester",
            "command_line": "vts -m kernel"
        })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&backends.tasks)
        .await;

    let console = console_for(&backends, &cache);
    console
        .dispatch("request --cluster=cluster-a --run-target=sailfish --user=tester vts -m kernel")
        .await
        .unwrap();
}

#[tokio::test]
async fn test_device_update_single_against_task_server() {
    let backends = backends().await;
    let cache = tempfile::tempdir().unwrap();

    Mock::given(method("GET"))
        .and(path("/devices/v1/list"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "devices": [{"device_serial": "SER1", "state": "Available"}]
        })))
        .mount(&backends.tasks)
        .await;
    Mock::given(method("POST"))
        .and(path("/host_events/v1/submit"))
        .and(body_partial_json(serde_json::json!({
            "host_events": [{"hostname": "lab-host-01", "cluster": "cluster-a"}]
        })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&backends.tasks)
        .await;

    let console = console_for(&backends, &cache);
    console
        .dispatch("device --update=single --server_type=tfc")
        .await
        .unwrap();
}

#[tokio::test]
async fn test_transport_failure_surfaces_for_single_shot() {
    let backends = backends().await;
    let cache = tempfile::tempdir().unwrap();

    Mock::given(method("GET"))
        .and(path("/builds/v1/list"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&backends.partner)
        .await;

    let console = console_for(&backends, &cache);
    let err = console
        .dispatch("build --update=single --branch=main --target=t")
        .await
        .unwrap_err();
    assert!(matches!(err, HostError::Transport(_)));
}

#[tokio::test]
async fn test_pab_fetch_merges_artifact_into_state() {
    let backends = backends().await;
    let cache = tempfile::tempdir().unwrap();

    Mock::given(method("GET"))
        .and(path("/builds/v1/list"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "builds": [{"build_id": "321", "successful": true}]
        })))
        .mount(&backends.partner)
        .await;
    Mock::given(method("GET"))
        .and(path("/artifacts/v1/543365459/main/sailfish-userdebug/321/system.img"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"image".to_vec()))
        .mount(&backends.partner)
        .await;

    let console = console_for(&backends, &cache);
    console
        .dispatch(
            "fetch --type=pab --branch=main --target=sailfish-userdebug --artifact_name=system.img",
        )
        .await
        .unwrap();

    assert!(console.state().device_image("system.img").is_some());
    let snapshot = console.state().snapshot();
    assert_eq!(snapshot.fetch_info.build_id.as_deref(), Some("321"));
    assert_eq!(snapshot.fetch_info.branch.as_deref(), Some("main"));
}
