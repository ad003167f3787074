// Vidshare Error Types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum VidshareError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Directory walk error: {0}")]
    Walk(#[from] walkdir::Error),

    #[error("Gateway error: {0}")]
    Gateway(#[from] reqwest::Error),

    #[error("Video not found: {0}")]
    VideoNotFound(String),

    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("FFmpeg error: {0}")]
    FFmpeg(String),

    #[error("Camera error: {0}")]
    Camera(String),

    #[error("Camera is already recording!")]
    AlreadyRecording,

    #[error("Camera is not recording!")]
    NotRecording,

    #[error("Settings error: {0}")]
    Settings(String),

    #[error("{0}")]
    Other(String),
}

impl From<anyhow::Error> for VidshareError {
    fn from(err: anyhow::Error) -> Self {
        VidshareError::Other(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, VidshareError>;
