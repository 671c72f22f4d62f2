//! HTTP surface tests: requests go through the full router with a local
//! snapshot backend rooted in a temp dir.

use std::path::PathBuf;

use axum::body::Body;
use axum::Router;
use http::{Method, Request, StatusCode};
use serde_json::Value;
use tower::ServiceExt;

use ephemeral_daemon::http_server;
use ephemeral_daemon::{BackendConfig, ServiceConfig, ServiceState};

const REPO: &str = "unstable.cvmfs.example.org";
const BOUNDARY: &str = "ephemeral-test-boundary";

struct TestApp {
    _dir: tempfile::TempDir,
    root: PathBuf,
    app: Router,
}

fn setup() -> TestApp {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().to_path_buf();
    std::fs::create_dir(root.join(REPO)).unwrap();

    let config = ServiceConfig {
        storage_root: root.clone(),
        backend: BackendConfig::Local,
        ..Default::default()
    };
    let state = ServiceState::from_config(&config).unwrap();
    TestApp {
        _dir: dir,
        root,
        app: http_server::router(state),
    }
}

fn multipart_body(filename: &str, content: &[u8]) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"file\"; filename=\"{filename}\"\r\n\
             Content-Type: application/octet-stream\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(content);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
    body
}

impl TestApp {
    async fn send(&self, request: Request<Body>) -> (StatusCode, Vec<u8>) {
        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, body.to_vec())
    }

    async fn json(&self, method: Method, uri: &str) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap();
        let (status, body) = self.send(request).await;
        (status, serde_json::from_slice(&body).unwrap())
    }

    async fn upload(&self, query: &str, filename: &str, content: &[u8]) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(Method::POST)
            .uri(format!("/repos/{REPO}?{query}"))
            .header(
                "content-type",
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(multipart_body(filename, content)))
            .unwrap();
        let (status, body) = self.send(request).await;
        (status, serde_json::from_slice(&body).unwrap())
    }
}

#[tokio::test]
async fn test_upload_list_download_delete() {
    let app = setup();

    let (status, body) = app.upload("ttl_s=600", "build.log", b"hello").await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["filename"], "build.log");
    assert!(body["expires_at"].as_f64().unwrap() > 0.0);
    assert!(app.root.join(REPO).join("build.log").is_file());

    let (status, body) = app.json(Method::GET, &format!("/repos/{REPO}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["files"], serde_json::json!(["build.log"]));

    let request = Request::builder()
        .uri(format!("/repos/{REPO}/build.log"))
        .body(Body::empty())
        .unwrap();
    let (status, content) = app.send(request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(content, b"hello");

    let (status, body) = app
        .json(Method::DELETE, &format!("/repos/{REPO}/build.log"))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["target_name"], "build.log");
    assert!(!app.root.join(REPO).join("build.log").exists());

    let (status, _) = app
        .json(Method::DELETE, &format!("/repos/{REPO}/build.log"))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_upload_conflict_and_overwrite() {
    let app = setup();

    let (status, _) = app.upload("", "a.bin", b"one").await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app.upload("", "a.bin", b"two").await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["detail"].as_str().unwrap().contains("a.bin"));
    assert_eq!(
        std::fs::read(app.root.join(REPO).join("a.bin")).unwrap(),
        b"one"
    );

    let (status, _) = app.upload("overwrite=true", "a.bin", b"two").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        std::fs::read(app.root.join(REPO).join("a.bin")).unwrap(),
        b"two"
    );
}

#[tokio::test]
async fn test_reserved_name_is_rejected() {
    let app = setup();

    let (status, body) = app.upload("", "ttl.json", b"{}").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["detail"].is_string());

    let (status, _) = app
        .json(Method::GET, &format!("/repos/{REPO}/ttl.json"))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .json(Method::DELETE, &format!("/repos/{REPO}/ttl.json"))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_unknown_repository_and_artifact() {
    let app = setup();

    let (status, body) = app
        .json(Method::GET, "/repos/missing.cvmfs.example.org")
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["detail"].is_string());

    let (status, _) = app
        .json(Method::GET, &format!("/repos/{REPO}/nothing-here"))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app
        .json(Method::POST, &format!("/repos/{REPO}/nothing-here/ttl?ttl_s=60"))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_upload_without_file_part() {
    let app = setup();

    let body = format!(
        "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"other\"\r\n\r\nx\r\n--{BOUNDARY}--\r\n"
    );
    let request = Request::builder()
        .method(Method::POST)
        .uri(format!("/repos/{REPO}"))
        .header(
            "content-type",
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap();
    let (status, _) = app.send(request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_update_ttl() {
    let app = setup();
    let (_, uploaded) = app.upload("ttl_s=60", "a.bin", b"x").await;

    let (status, body) = app
        .json(Method::POST, &format!("/repos/{REPO}/a.bin/ttl?ttl_s=86400"))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ttl_s"], 86400);
    let before = uploaded["expires_at"].as_f64().unwrap();
    let after = body["expires_at"].as_f64().unwrap();
    assert!(after > before + 80_000.0);
}

#[tokio::test]
async fn test_out_of_range_ttl_is_a_bad_request() {
    let app = setup();

    let (status, body) = app.upload("ttl_s=10000000000000", "far.bin", b"x").await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
    assert!(!app.root.join(REPO).join("far.bin").exists());

    app.upload("ttl_s=60", "a.bin", b"x").await;
    let (status, _) = app
        .json(
            Method::POST,
            &format!("/repos/{REPO}/a.bin/ttl?ttl_s=10000000000000"),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_clean_sweeps_expired_artifacts() {
    let app = setup();

    let (status, body) = app
        .json(Method::POST, &format!("/repos/{REPO}/clean"))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "No TTL file found. Skipping clean up.");
    assert!(body.get("cleaned").is_none());

    app.upload("ttl_s=-10", "old.bin", b"x").await;
    app.upload("ttl_s=3600", "new.bin", b"y").await;

    let (status, body) = app
        .json(Method::POST, &format!("/repos/{REPO}/clean"))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["cleaned"], 1);
    assert_eq!(body["errors"], 0);
    assert_eq!(
        body["message"],
        format!("Cleaned up 1 expired files in repo: {REPO}. Errors: 0")
    );
    assert!(!app.root.join(REPO).join("old.bin").exists());
    assert!(app.root.join(REPO).join("new.bin").exists());
}

#[tokio::test]
async fn test_maintenance_endpoints() {
    let app = setup();
    app.upload("ttl_s=-10", "old.bin", b"x").await;

    let (status, body) = app.json(Method::POST, "/housekeeping").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Housekeeping completed");
    assert_eq!(body["cleaned"], 1);
    assert_eq!(body["failed"], serde_json::json!([]));

    let (status, body) = app.json(Method::POST, "/gc").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Garbage collection completed");

    let (status, body) = app.json(Method::POST, "/resign").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "cvmfs_server resign completed successfully");

    let (status, body) = app
        .json(Method::POST, &format!("/repos/{REPO}/notify"))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body["message"],
        format!("Notified clients about changes in repo {REPO}")
    );
}

#[tokio::test]
async fn test_status_endpoints() {
    let app = setup();

    let (status, body) = app.json(Method::GET, "/_status/livez").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");

    let (status, body) = app.json(Method::GET, "/_status/version").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "cvmfs-ephemeral-daemon");
}
