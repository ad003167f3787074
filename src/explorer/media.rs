// File type and metadata helpers

use std::fs::Metadata;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use chrono::{DateTime, Utc};
use url::Url;

use crate::constants::{IMAGE_MIME_TYPES, VIDEO_MIME_TYPES};
use crate::db::videos::VideoRecord;
use crate::error::{Result, VidshareError};

/// MIME type derived from the file extension (case-insensitive).
pub fn mime_type_for(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_lowercase();
    VIDEO_MIME_TYPES
        .iter()
        .chain(IMAGE_MIME_TYPES.iter())
        .find(|(e, _)| *e == ext)
        .map(|(_, mime)| *mime)
}

pub fn is_video_file(path: &Path) -> bool {
    mime_type_for(path).is_some_and(|m| m.starts_with("video"))
}

/// Content type for serving a file over HTTP.
pub fn content_type_for(path: &Path) -> &'static str {
    mime_type_for(path).unwrap_or("application/octet-stream")
}

/// `file://` URL for an absolute path.
pub fn file_url(path: &Path) -> String {
    match Url::from_file_path(path) {
        Ok(url) => url.to_string(),
        Err(()) => format!("file://{}", path.display()),
    }
}

/// Accept either a plain filesystem path or a `file://` URI.
pub fn path_from_uri(value: &str) -> Result<PathBuf> {
    if !value.starts_with("file://") {
        return Ok(PathBuf::from(value));
    }
    Url::parse(value)
        .ok()
        .and_then(|u| u.to_file_path().ok())
        .ok_or_else(|| VidshareError::InvalidPath(value.to_string()))
}

pub fn system_time_millis(time: SystemTime) -> i64 {
    DateTime::<Utc>::from(time).timestamp_millis()
}

/// Build a record for a video file from its metadata. No thumbnail yet.
pub fn video_from_metadata(path: &Path, metadata: &Metadata) -> VideoRecord {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();

    VideoRecord {
        name,
        path: path.to_string_lossy().to_string(),
        url: file_url(path),
        ctime: metadata.created().ok().map(system_time_millis),
        mtime: metadata.modified().map(system_time_millis).unwrap_or(0),
        size: metadata.len() as i64,
        thumbnail_path: None,
        thumbnail_url: None,
    }
}

/// Stat a file and describe it as a video record.
pub fn stat_video(path: &Path) -> Result<VideoRecord> {
    let metadata = std::fs::metadata(path)?;
    if !metadata.is_file() {
        return Err(VidshareError::InvalidPath(path.display().to_string()));
    }
    Ok(video_from_metadata(path, &metadata))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mime_types() {
        assert_eq!(mime_type_for(Path::new("/a/clip.MP4")), Some("video/mp4"));
        assert_eq!(mime_type_for(Path::new("/a/thumb.jpg")), Some("image/jpeg"));
        assert_eq!(mime_type_for(Path::new("/a/notes.txt")), None);
        assert_eq!(mime_type_for(Path::new("/a/noext")), None);

        assert!(is_video_file(Path::new("rec.webm")));
        assert!(!is_video_file(Path::new("thumb.png")));
        assert_eq!(content_type_for(Path::new("x.bin")), "application/octet-stream");
    }

    #[test]
    fn test_file_url_and_back() {
        let url = file_url(Path::new("/videos/my clip.mp4"));
        assert_eq!(url, "file:///videos/my%20clip.mp4");
        assert_eq!(path_from_uri(&url).unwrap(), PathBuf::from("/videos/my clip.mp4"));
        assert_eq!(path_from_uri("/plain/path.mp4").unwrap(), PathBuf::from("/plain/path.mp4"));
    }

    #[test]
    fn test_stat_video() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clip.mp4");
        std::fs::write(&path, b"12345").unwrap();

        let video = stat_video(&path).unwrap();
        assert_eq!(video.name, "clip.mp4");
        assert_eq!(video.size, 5);
        assert!(video.mtime > 0);
        assert!(video.url.starts_with("file://"));
        assert!(video.thumbnail_path.is_none());

        assert!(stat_video(dir.path()).is_err());
        assert!(stat_video(&dir.path().join("missing.mp4")).is_err());
    }
}
