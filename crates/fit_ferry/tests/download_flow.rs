use fit_ferry::download::{self, WORKOUT_LIST_FILE};
use secrecy::SecretString;
use sports_tracker_client::http_client::ReqwestSportsTrackerClient;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client(server: &MockServer) -> ReqwestSportsTrackerClient {
    ReqwestSportsTrackerClient::new(&server.uri(), "alice", SecretString::new("hunter2".into()))
}

async fn mount_login(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/apiserver/v1/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "userKey": "tok-1",
            "realName": "Alice"
        })))
        .mount(server)
        .await;
}

async fn mount_export(server: &MockServer, workout_key: &str, body: &[u8]) {
    Mock::given(method("GET"))
        .and(path(format!(
            "/apiserver/v1/workout/exportFit/{workout_key}"
        )))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(body.to_vec()))
        .mount(server)
        .await;
}

fn record(key: &str, start_time: i64, activity_id: i64) -> serde_json::Value {
    serde_json::json!({
        "workoutKey": key,
        "startTime": start_time,
        "activityId": activity_id
    })
}

#[tokio::test]
async fn fresh_run_logs_in_lists_caches_and_downloads() {
    let server = MockServer::start().await;
    mount_login(&server).await;

    let payload = serde_json::json!([
        record("k1", 1_577_934_245_000, 1),
        record("k2", 1_577_934_246_000, 2),
    ]);
    Mock::given(method("GET"))
        .and(path("/apiserver/v1/workouts"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({ "payload": payload })),
        )
        .expect(1)
        .mount(&server)
        .await;
    mount_export(&server, "k1", b"fit-1").await;
    mount_export(&server, "k2", b"fit-2").await;

    let dir = tempfile::tempdir().unwrap();
    let report = download::run(&client(&server), dir.path()).await.expect("run");
    assert_eq!(report.total, 2);
    assert_eq!(report.downloaded, 2);
    assert_eq!(report.failed, 0);

    // Raw payload cached verbatim.
    let cached = std::fs::read_to_string(dir.path().join(WORKOUT_LIST_FILE)).unwrap();
    let cached: serde_json::Value = serde_json::from_str(&cached).unwrap();
    assert_eq!(cached, payload);

    // Exactly N output files, each a .fit with the exported bytes.
    let fit_files: Vec<_> = std::fs::read_dir(dir.path())
        .unwrap()
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.extension().is_some_and(|ext| ext == "fit"))
        .collect();
    assert_eq!(fit_files.len(), 2);
}

#[tokio::test]
async fn existing_cache_skips_list_fetch() {
    let server = MockServer::start().await;
    mount_login(&server).await;
    // The list endpoint must never be hit when a cache file is present.
    Mock::given(method("GET"))
        .and(path("/apiserver/v1/workouts"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;
    mount_export(&server, "k1", b"fit-1").await;

    let dir = tempfile::tempdir().unwrap();
    let payload = serde_json::json!([record("k1", 1_577_934_245_000, 1)]);
    std::fs::write(
        dir.path().join(WORKOUT_LIST_FILE),
        serde_json::to_string(&payload).unwrap(),
    )
    .unwrap();

    let report = download::run(&client(&server), dir.path()).await.expect("run");
    assert_eq!(report.downloaded, 1);
}

#[tokio::test]
async fn cached_record_with_unknown_activity_uses_workout_key() {
    let server = MockServer::start().await;
    mount_login(&server).await;
    mount_export(&server, "k1", b"a").await;
    mount_export(&server, "k2", b"b").await;
    mount_export(&server, "oddkey", b"c").await;

    let dir = tempfile::tempdir().unwrap();
    let payload = serde_json::json!([
        record("k1", 1_577_934_245_000, 0),
        record("k2", 1_577_934_246_000, 1),
        record("oddkey", 1_577_934_247_000, 999),
    ]);
    std::fs::write(
        dir.path().join(WORKOUT_LIST_FILE),
        serde_json::to_string(&payload).unwrap(),
    )
    .unwrap();

    let report = download::run(&client(&server), dir.path()).await.expect("run");
    assert_eq!(report.downloaded, 3);

    let names: Vec<String> = std::fs::read_dir(dir.path())
        .unwrap()
        .filter_map(|e| e.ok())
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .filter(|n| n.ends_with(".fit"))
        .collect();
    assert_eq!(names.len(), 3);
    assert!(names.iter().any(|n| n.ends_with("-Walking.fit")));
    assert!(names.iter().any(|n| n.ends_with("-Running.fit")));
    assert!(
        names.iter().any(|n| n.ends_with("-oddkey.fit")),
        "unknown activity id should fall back to the workout key: {names:?}"
    );
}

#[tokio::test]
async fn login_failure_aborts_without_cache_or_files() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/apiserver/v1/login"))
        .respond_with(ResponseTemplate::new(403).set_body_string("forbidden"))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let result = download::run(&client(&server), dir.path()).await;
    assert!(result.is_err());

    assert!(!dir.path().join(WORKOUT_LIST_FILE).exists());
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn failed_export_skips_item_and_continues() {
    let server = MockServer::start().await;
    mount_login(&server).await;
    Mock::given(method("GET"))
        .and(path("/apiserver/v1/workout/exportFit/bad"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    mount_export(&server, "good", b"fit").await;

    let dir = tempfile::tempdir().unwrap();
    let payload = serde_json::json!([
        record("bad", 1_577_934_245_000, 1),
        record("good", 1_577_934_246_000, 1),
    ]);
    std::fs::write(
        dir.path().join(WORKOUT_LIST_FILE),
        serde_json::to_string(&payload).unwrap(),
    )
    .unwrap();

    let report = download::run(&client(&server), dir.path()).await.expect("run");
    assert_eq!(report.total, 2);
    assert_eq!(report.downloaded, 1);
    assert_eq!(report.failed, 1);
}
