// Route handlers

use axum::body::Body;
use axum::extract::{RawQuery, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use serde_json::json;
use tokio_util::io::ReaderStream;

use super::params::{list_options, query_flag, query_value};
use super::response::{ApiResponse, TITLE_ERROR};
use super::AppState;
use crate::db::videos::VideoRecord;
use crate::explorer::media::{content_type_for, path_from_uri};
use crate::network::NetworkInfo;

/// One entry of `/get_files`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileEntry {
    pub name: String,
    pub url: String,
    pub img_url: String,
}

/// Absolute `/get_file` link for a local path; empty while the LAN address
/// is unknown.
pub fn download_link(network: &NetworkInfo, path: &str) -> String {
    match network.base_url() {
        Some(base) => format!("{}/get_file?path={}", base, urlencoding::encode(path)),
        None => String::new(),
    }
}

fn file_entry(network: &NetworkInfo, video: &VideoRecord) -> FileEntry {
    FileEntry {
        name: video.name.clone(),
        url: download_link(network, &video.path),
        img_url: video
            .thumbnail_path
            .as_deref()
            .map(|p| download_link(network, p))
            .unwrap_or_default(),
    }
}

pub async fn index() -> ApiResponse {
    ApiResponse::information("Success access webserver!").with_data(json!([
        {
            "path": "/get_files",
            "queries": [
                { "query": "offset", "type": "number", "example": "offset=10" },
                { "query": "limit", "type": "number", "example": "limit=10" },
                { "query": "sortBy", "type": "string", "example": "sortBy=mtime:desc" },
            ],
            "description": "Use this path to get list of videos",
        }
    ]))
}

pub async fn get_files(State(state): State<AppState>, RawQuery(query): RawQuery) -> ApiResponse {
    let options = list_options(query.as_deref());
    let store = state.store.clone();

    let result = tokio::task::spawn_blocking(move || store.fetch(&options)).await;
    let videos = match result {
        Ok(Ok(videos)) => videos,
        Ok(Err(e)) => return list_error(e.to_string()),
        Err(e) => return list_error(e.to_string()),
    };

    let network = state.network.snapshot();
    let entries: Vec<FileEntry> = videos.iter().map(|v| file_entry(&network, v)).collect();

    ApiResponse::information("Success get files").with_data(json!(entries))
}

/// Store failures still answer 200; clients read the title.
fn list_error(message: String) -> ApiResponse {
    log::error!("Failed to list videos: {}", message);
    ApiResponse::new(StatusCode::OK, TITLE_ERROR, message).with_data(json!([]))
}

pub async fn get_file(RawQuery(query): RawQuery) -> Response {
    let Some(raw) = query_value(query.as_deref(), "path").filter(|p| !p.is_empty()) else {
        return ApiResponse::not_found().into_response();
    };
    let Ok(path) = path_from_uri(&raw) else {
        return ApiResponse::not_found().into_response();
    };

    let metadata = match tokio::fs::metadata(&path).await {
        Ok(m) if m.is_file() => m,
        _ => return ApiResponse::not_found().into_response(),
    };
    let file = match tokio::fs::File::open(&path).await {
        Ok(f) => f,
        Err(e) => {
            log::warn!("Failed to open {}: {}", path.display(), e);
            return ApiResponse::not_found().into_response();
        }
    };

    log::debug!("Serving {} ({} bytes)", path.display(), metadata.len());
    let body = Body::from_stream(ReaderStream::new(file));

    (
        [
            (header::CONTENT_TYPE, content_type_for(&path).to_string()),
            (header::CONTENT_LENGTH, metadata.len().to_string()),
        ],
        body,
    )
        .into_response()
}

pub async fn start_camera(State(state): State<AppState>) -> ApiResponse {
    match state.camera.start() {
        Ok(()) => ApiResponse::information("Recording has started."),
        Err(e) => ApiResponse::error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    }
}

pub async fn stop_camera(State(state): State<AppState>, RawQuery(query): RawQuery) -> ApiResponse {
    let ignore_video = query_flag(query.as_deref(), "ignoreVideo");
    match state.camera.stop(ignore_video) {
        Ok(()) => ApiResponse::information("Recording has stopped."),
        Err(e) => ApiResponse::error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    }
}

pub async fn not_found() -> ApiResponse {
    ApiResponse::not_found()
}
