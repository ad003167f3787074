// Preview module
//
// Thumbnails for discovered and recorded videos. Generation sits behind a
// trait so the explorer can be exercised without ffmpeg.

pub mod thumb;

use std::path::{Path, PathBuf};

use anyhow::Result;

use crate::constants::THUMB_FORMAT;
use thumb::{generate_thumbnail, ThumbOptions};

pub trait ThumbnailGenerator: Send + Sync {
    /// Write a thumbnail for `source` and return its path.
    fn create_thumbnail(&self, source: &Path) -> Result<PathBuf>;
}

/// Thumbnail file name: `<stem>-<12 hex chars of blake3(path)>.jpg`.
/// The hash keeps same-named videos from different folders apart.
pub fn thumbnail_file_name(source: &Path) -> String {
    let stem = source
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "video".to_string());
    let hash = blake3::hash(source.to_string_lossy().as_bytes()).to_hex();
    format!("{}-{}.{}", stem, &hash.as_str()[..12], THUMB_FORMAT)
}

pub struct FfmpegThumbnailer {
    output_dir: PathBuf,
    options: ThumbOptions,
}

impl FfmpegThumbnailer {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            options: ThumbOptions::default(),
        }
    }

    pub fn with_options(mut self, options: ThumbOptions) -> Self {
        self.options = options;
        self
    }
}

impl ThumbnailGenerator for FfmpegThumbnailer {
    fn create_thumbnail(&self, source: &Path) -> Result<PathBuf> {
        let output = self.output_dir.join(thumbnail_file_name(source));
        generate_thumbnail(source, &output, &self.options)?;
        log::debug!("Thumbnail written: {}", output.display());
        Ok(output)
    }
}

/// Remove a thumbnail file. Failures are logged, never returned.
pub fn delete_thumbnail(path: &str) {
    match std::fs::remove_file(path) {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => log::warn!("Failed to delete thumbnail {}: {}", path, e),
    }
}
