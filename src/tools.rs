// ffmpeg lookup
//
// VIDSHARE_FFMPEG_PATH wins when it points at a file. Otherwise a copy
// shipped next to the binary (or in its bin/ folder) is used, and finally
// whatever `ffmpeg` resolves to on PATH.

use std::path::{Path, PathBuf};
use std::process::Command;

pub const FFMPEG_ENV: &str = "VIDSHARE_FFMPEG_PATH";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolSource {
    Env,
    Bundled,
    SearchPath,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolLocation {
    pub path: PathBuf,
    pub source: ToolSource,
}

fn executable_name(name: &str) -> String {
    if cfg!(windows) {
        format!("{}.exe", name)
    } else {
        name.to_string()
    }
}

/// Pick a tool location from an optional override and the binary's folder.
fn locate(name: &str, env_value: Option<&str>, exe_dir: Option<&Path>) -> ToolLocation {
    if let Some(value) = env_value {
        let path = PathBuf::from(value);
        if path.is_file() {
            return ToolLocation { path, source: ToolSource::Env };
        }
        log::warn!("{} points at missing file {}, ignoring", FFMPEG_ENV, value);
    }

    let file_name = executable_name(name);
    if let Some(dir) = exe_dir {
        for candidate in [dir.join(&file_name), dir.join("bin").join(&file_name)] {
            if candidate.is_file() {
                return ToolLocation {
                    path: candidate,
                    source: ToolSource::Bundled,
                };
            }
        }
    }

    ToolLocation {
        path: PathBuf::from(name),
        source: ToolSource::SearchPath,
    }
}

pub fn locate_ffmpeg() -> ToolLocation {
    let env_value = std::env::var(FFMPEG_ENV).ok();
    let exe_dir = std::env::current_exe()
        .ok()
        .and_then(|p| p.parent().map(Path::to_path_buf));
    locate("ffmpeg", env_value.as_deref(), exe_dir.as_deref())
}

pub fn ffmpeg_path() -> PathBuf {
    locate_ffmpeg().path
}

/// First line of `ffmpeg -version`, or None when it cannot be run.
pub fn ffmpeg_version() -> Option<String> {
    let output = Command::new(ffmpeg_path()).arg("-version").output().ok()?;
    if !output.status.success() {
        return None;
    }
    String::from_utf8_lossy(&output.stdout)
        .lines()
        .next()
        .map(|line| line.trim().to_string())
}

pub fn is_ffmpeg_available() -> bool {
    ffmpeg_version().is_some()
}
