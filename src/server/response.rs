// JSON response bodies: `{title, message, data?}`

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::Value;

pub const TITLE_INFORMATION: &str = "Information";
pub const TITLE_ERROR: &str = "Error";
pub const TITLE_NOT_FOUND: &str = "Not Found";

#[derive(Debug, Clone, Serialize)]
pub struct ApiResponse {
    pub title: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(skip)]
    pub status: StatusCode,
}

impl ApiResponse {
    pub fn new(status: StatusCode, title: &str, message: impl Into<String>) -> Self {
        Self {
            title: title.to_string(),
            message: message.into(),
            data: None,
            status,
        }
    }

    pub fn information(message: impl Into<String>) -> Self {
        Self::new(StatusCode::OK, TITLE_INFORMATION, message)
    }

    pub fn error(status: StatusCode, message: impl Into<String>) -> Self {
        Self::new(status, TITLE_ERROR, message)
    }

    pub fn not_found() -> Self {
        Self::new(StatusCode::NOT_FOUND, TITLE_NOT_FOUND, "Resource not found")
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }
}

impl IntoResponse for ApiResponse {
    fn into_response(self) -> Response {
        (self.status, Json(self)).into_response()
    }
}
