use std::net::{IpAddr, Ipv4Addr};
use std::sync::{Arc, Mutex};

use axum::body::{to_bytes, Body};
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use super::*;
use crate::db::query::SelectOptions;
use crate::db::videos::VideoRecord;
use crate::error::{Result, VidshareError};
use crate::recording::SessionState;
use crate::store::SqliteStore;

struct FakeCamera {
    state: Mutex<SessionState>,
    stops: Mutex<Vec<bool>>,
}

impl FakeCamera {
    fn new() -> Self {
        Self {
            state: Mutex::new(SessionState::Idle),
            stops: Mutex::new(Vec::new()),
        }
    }
}

impl CameraControl for FakeCamera {
    fn state(&self) -> SessionState {
        *self.state.lock().unwrap()
    }

    fn start(&self) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if *state == SessionState::Recording {
            return Err(VidshareError::AlreadyRecording);
        }
        *state = SessionState::Recording;
        Ok(())
    }

    fn stop(&self, ignore_video: bool) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if *state == SessionState::Idle {
            return Err(VidshareError::NotRecording);
        }
        *state = SessionState::Idle;
        self.stops.lock().unwrap().push(ignore_video);
        Ok(())
    }
}

struct FailingStore;

impl MetadataStore for FailingStore {
    fn fetch(&self, _options: &SelectOptions) -> Result<Vec<VideoRecord>> {
        Err(VidshareError::Other("database is locked".to_string()))
    }
    fn get(&self, _path: &str) -> Result<Option<VideoRecord>> {
        Ok(None)
    }
    fn insert(&self, _videos: &[VideoRecord]) -> Result<usize> {
        Ok(0)
    }
    fn set_thumbnail(&self, _path: &str, _tp: &str, _tu: &str) -> Result<bool> {
        Ok(false)
    }
    fn delete(&self, _paths: &[String]) -> Result<usize> {
        Ok(0)
    }
}

fn video(i: i64) -> VideoRecord {
    let path = format!("/videos/clip {:02}.mp4", i);
    VideoRecord {
        name: format!("clip {:02}.mp4", i),
        url: format!("file://{}", path),
        path,
        ctime: Some(1_000 + i),
        mtime: 2_000 + i,
        size: 100 * i,
        thumbnail_path: Some(format!("/thumbs/clip-{:02}.jpg", i)),
        thumbnail_url: Some(format!("file:///thumbs/clip-{:02}.jpg", i)),
    }
}

struct Harness {
    store: Arc<SqliteStore>,
    camera: Arc<FakeCamera>,
    network: Arc<NetworkState>,
}

impl Harness {
    fn new(rows: i64) -> Self {
        let store = Arc::new(SqliteStore::in_memory().unwrap());
        let videos: Vec<VideoRecord> = (1..=rows).map(video).collect();
        store.insert(&videos).unwrap();

        let network = Arc::new(NetworkState::new(Some(IpAddr::V4(Ipv4Addr::new(192, 168, 4, 20)))));
        network.set_port(Some(8089));

        Self {
            store,
            camera: Arc::new(FakeCamera::new()),
            network,
        }
    }

    fn state(&self) -> AppState {
        AppState {
            store: self.store.clone(),
            camera: self.camera.clone(),
            network: self.network.clone(),
        }
    }

    fn app(&self) -> Router {
        router(self.state())
    }
}

async fn send(app: Router, method: Method, uri: &str) -> (StatusCode, Vec<u8>) {
    let request = Request::builder().method(method).uri(uri).body(Body::empty()).unwrap();
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, bytes.to_vec())
}

async fn get_json(app: Router, uri: &str) -> (StatusCode, Value) {
    let (status, body) = send(app, Method::GET, uri).await;
    (status, serde_json::from_slice(&body).unwrap())
}

#[tokio::test]
async fn test_index_lists_routes() {
    let harness = Harness::new(0);
    let (status, body) = get_json(harness.app(), "/").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["title"], "Information");
    assert_eq!(body["message"], "Success access webserver!");
    assert_eq!(body["data"][0]["path"], "/get_files");
    assert_eq!(body["data"][0]["queries"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn test_get_files_defaults_on_garbage_paging() {
    let harness = Harness::new(25);
    let (status, body) = get_json(harness.app(), "/get_files?offset=abc&limit=xyz").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Success get files");
    let files = body["data"].as_array().unwrap();
    assert_eq!(files.len(), 20);
    // Default sort is newest ctime first
    assert_eq!(files[0]["name"], "clip 25.mp4");
}

#[tokio::test]
async fn test_get_files_sort_and_paging() {
    let harness = Harness::new(5);
    let (_, body) = get_json(harness.app(), "/get_files?sortBy=name:asc&offset=1&limit=2").await;

    let names: Vec<&str> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|f| f["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["clip 02.mp4", "clip 03.mp4"]);
}

#[tokio::test]
async fn test_get_files_links() {
    let harness = Harness::new(1);
    let (_, body) = get_json(harness.app(), "/get_files").await;

    let file = &body["data"][0];
    assert_eq!(
        file["url"],
        "http://192.168.4.20:8089/get_file?path=%2Fvideos%2Fclip%2001.mp4"
    );
    assert_eq!(
        file["img_url"],
        "http://192.168.4.20:8089/get_file?path=%2Fthumbs%2Fclip-01.jpg"
    );
}

#[tokio::test]
async fn test_get_files_links_empty_without_address() {
    let harness = Harness::new(1);
    harness.network.set_port(None);
    let (_, body) = get_json(harness.app(), "/get_files").await;

    assert_eq!(body["data"][0]["url"], "");
    assert_eq!(body["data"][0]["img_url"], "");
}

#[tokio::test]
async fn test_get_files_store_failure_is_ok_status() {
    let harness = Harness::new(0);
    let state = AppState {
        store: Arc::new(FailingStore),
        ..harness.state()
    };
    let (status, body) = get_json(router(state), "/get_files").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["title"], "Error");
    assert_eq!(body["data"], serde_json::json!([]));
}

#[tokio::test]
async fn test_get_file_requires_path() {
    let harness = Harness::new(0);
    let (status, body) = get_json(harness.app(), "/get_file").await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(
        body,
        serde_json::json!({"title": "Not Found", "message": "Resource not found"})
    );

    let (status, _) = get_json(harness.app(), "/get_file?path=").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_get_file_rejects_directories_and_missing() {
    let harness = Harness::new(0);
    let dir = TempDir::new().unwrap();

    let uri = format!("/get_file?path={}", urlencoding::encode(&dir.path().to_string_lossy()));
    let (status, _) = get_json(harness.app(), &uri).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let missing = dir.path().join("gone.mp4");
    let uri = format!("/get_file?path={}", urlencoding::encode(&missing.to_string_lossy()));
    let (status, _) = get_json(harness.app(), &uri).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_get_file_streams_contents() {
    let harness = Harness::new(0);
    let dir = TempDir::new().unwrap();
    let file = dir.path().join("my clip.mp4");
    std::fs::write(&file, b"not really a video").unwrap();

    let uri = format!("/get_file?path={}", urlencoding::encode(&file.to_string_lossy()));
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    let response = harness.app().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["content-type"], "video/mp4");
    assert_eq!(response.headers()["content-length"], "18");
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&bytes[..], b"not really a video");
}

#[tokio::test]
async fn test_get_file_accepts_file_uri() {
    let harness = Harness::new(0);
    let dir = TempDir::new().unwrap();
    let file = dir.path().join("thumb.jpg");
    std::fs::write(&file, b"jpeg").unwrap();

    let file_uri = url::Url::from_file_path(&file).unwrap().to_string();
    let uri = format!("/get_file?path={}", urlencoding::encode(&file_uri));
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    let response = harness.app().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["content-type"], "image/jpeg");
}

#[tokio::test]
async fn test_start_camera_twice_fails() {
    let harness = Harness::new(0);

    let (status, body) = get_json(harness.app(), "/start_camera").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Recording has started.");

    let (status, body) = get_json(harness.app(), "/start_camera").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["title"], "Error");
    assert_eq!(body["message"], "Camera is already recording!");
}

#[tokio::test]
async fn test_stop_camera() {
    let harness = Harness::new(0);

    let (status, body) = get_json(harness.app(), "/stop_camera").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["message"], "Camera is not recording!");

    get_json(harness.app(), "/start_camera").await;
    let (status, body) = get_json(harness.app(), "/stop_camera?ignoreVideo").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Recording has stopped.");

    get_json(harness.app(), "/start_camera").await;
    get_json(harness.app(), "/stop_camera").await;

    assert_eq!(*harness.camera.stops.lock().unwrap(), vec![true, false]);
    assert_eq!(harness.camera.state(), SessionState::Idle);
}

#[tokio::test]
async fn test_unknown_path_and_any_method() {
    let harness = Harness::new(2);

    let (status, body) = get_json(harness.app(), "/nope").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Resource not found");

    let (status, body) = send(harness.app(), Method::POST, "/get_files").await;
    assert_eq!(status, StatusCode::OK);
    let body: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(body["data"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_web_server_lifecycle() {
    let harness = Harness::new(3);
    let server = WebServer::new(harness.state());
    assert!(!server.stop().await);

    let addr = server.start("127.0.0.1", 0).await.unwrap();
    assert_eq!(harness.network.snapshot().port, Some(addr.port()));
    assert_eq!(server.local_addr().await, Some(addr));

    let body: Value = reqwest::get(format!("http://{}/get_files", addr))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["data"].as_array().unwrap().len(), 3);

    // Starting again replaces the running server
    let second = server.start("127.0.0.1", 0).await.unwrap();
    assert_eq!(harness.network.snapshot().port, Some(second.port()));
    let response = reqwest::get(format!("http://{}/", second)).await.unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::OK);

    assert!(server.stop().await);
    assert_eq!(harness.network.snapshot().port, None);
    assert_eq!(server.local_addr().await, None);
    assert!(reqwest::get(format!("http://{}/", second)).await.is_err());
}
