// Thumbnail extraction
//
// Grabs one JPEG poster frame from a video with ffmpeg, scaled to fit the
// configured box. Written to a temp file and renamed into place.

use std::path::Path;
use std::process::Command;

use anyhow::{anyhow, Result};

use crate::constants::{THUMB_HEIGHT, THUMB_QUALITY, THUMB_SEEK_SECONDS, THUMB_WIDTH};

/// Options for thumbnail generation.
#[derive(Debug, Clone)]
pub struct ThumbOptions {
    pub max_width: u32,
    pub max_height: u32,
    pub seek_seconds: f64,
    /// 0-100, higher is better.
    pub quality: u32,
}

impl Default for ThumbOptions {
    fn default() -> Self {
        Self {
            max_width: THUMB_WIDTH,
            max_height: THUMB_HEIGHT,
            seek_seconds: THUMB_SEEK_SECONDS,
            quality: THUMB_QUALITY,
        }
    }
}

/// Generate a thumbnail from a video file.
///
/// Clips shorter than the seek offset yield no frame; those are retried from
/// the first frame.
pub fn generate_thumbnail(source_path: &Path, output_path: &Path, options: &ThumbOptions) -> Result<()> {
    if let Some(parent) = output_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let tmp_path = output_path.with_extension("tmp.jpg");

    let mut result = extract_frame(source_path, &tmp_path, options.seek_seconds, options);
    if options.seek_seconds > 0.0 && !is_non_empty(&tmp_path) {
        result = extract_frame(source_path, &tmp_path, 0.0, options);
    }

    if let Err(e) = result {
        let _ = std::fs::remove_file(&tmp_path);
        return Err(e);
    }

    if !is_non_empty(&tmp_path) {
        let _ = std::fs::remove_file(&tmp_path);
        return Err(anyhow!("Thumbnail file is empty or missing"));
    }

    // Atomic rename
    std::fs::rename(&tmp_path, output_path)?;
    Ok(())
}

fn extract_frame(source_path: &Path, tmp_path: &Path, seek_seconds: f64, options: &ThumbOptions) -> Result<()> {
    let scale_filter = format!(
        "scale=w={}:h={}:force_original_aspect_ratio=decrease",
        options.max_width, options.max_height
    );

    let mut cmd = Command::new(crate::tools::ffmpeg_path());
    cmd.args(["-y", "-loglevel", "error", "-ss", &format_duration(seek_seconds), "-i"])
        .arg(source_path)
        .args(["-frames:v", "1", "-vf", &scale_filter, "-q:v", &quality_scale(options.quality).to_string()])
        .arg(tmp_path);

    let output = cmd.output()?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(anyhow!("FFmpeg thumbnail generation failed: {}", stderr.trim()));
    }
    Ok(())
}

fn is_non_empty(path: &Path) -> bool {
    std::fs::metadata(path).map(|m| m.len() > 0).unwrap_or(false)
}

/// Map 0-100 quality onto ffmpeg's 1-31 scale, where 1 is best.
pub fn quality_scale(quality: u32) -> u32 {
    let quality = quality.min(100);
    ((100 - quality) as f32 / 100.0 * 30.0 + 1.0) as u32
}

/// Format seconds as HH:MM:SS.mmm for ffmpeg.
pub fn format_duration(seconds: f64) -> String {
    let total_ms = (seconds.max(0.0) * 1000.0).round() as u64;
    let hours = total_ms / 3_600_000;
    let minutes = (total_ms % 3_600_000) / 60_000;
    let secs = (total_ms % 60_000) / 1000;
    let ms = total_ms % 1000;
    format!("{:02}:{:02}:{:02}.{:03}", hours, minutes, secs, ms)
}
