// Runtime configuration
//
// Command line flags with VIDSHARE_* environment fallbacks. Unset paths fall
// back to per-user directories.

use std::net::IpAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Result;
use clap::Args;

use crate::constants::{
    APP_NAME, DEFAULT_CAMERA_DEVICE, DEFAULT_CAMERA_FORMAT, DEFAULT_HOST, DEFAULT_PORT,
    TASK_POLL_INTERVAL_MS,
};
use crate::db::{get_db_path, get_recordings_path, get_thumbs_path, init_data_folders};
use crate::explorer::StorageRoot;
use crate::recording::camera::FfmpegCameraConfig;

#[derive(Debug, Clone, Default, Args)]
pub struct ConfigArgs {
    /// Directory for the database, thumbnails and recordings
    #[arg(long, env = "VIDSHARE_DATA_DIR", global = true)]
    pub data_dir: Option<PathBuf>,

    /// Folder to index (repeatable; comma separated in the environment)
    #[arg(long = "root", env = "VIDSHARE_ROOTS", value_delimiter = ',', global = true)]
    pub roots: Vec<PathBuf>,

    /// Address to bind the HTTP server to
    #[arg(long, env = "VIDSHARE_HOST", global = true)]
    pub host: Option<String>,

    /// Port to bind the HTTP server to (0 picks a free port)
    #[arg(long, env = "VIDSHARE_PORT", global = true)]
    pub port: Option<u16>,

    /// LAN address used in download links instead of the detected one
    #[arg(long, env = "VIDSHARE_ADVERTISE_IP", global = true)]
    pub advertise_ip: Option<IpAddr>,

    /// ffmpeg input format for the camera
    #[arg(long, env = "VIDSHARE_CAMERA_FORMAT", global = true)]
    pub camera_format: Option<String>,

    /// Camera device passed to ffmpeg
    #[arg(long, env = "VIDSHARE_CAMERA_DEVICE", global = true)]
    pub camera_device: Option<String>,

    /// Background task poll interval in milliseconds
    #[arg(long, env = "VIDSHARE_TASK_INTERVAL_MS", global = true)]
    pub task_interval_ms: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub data_dir: PathBuf,
    /// Recordings folder first, then the indexed folders.
    pub roots: Vec<StorageRoot>,
    pub host: String,
    pub port: u16,
    pub advertise_ip: Option<IpAddr>,
    pub camera: FfmpegCameraConfig,
    pub task_interval: Duration,
}

impl ConfigArgs {
    pub fn resolve(self) -> Result<Config> {
        let data_dir = match self.data_dir {
            Some(dir) => dir,
            None => default_data_dir()?,
        };

        let mut roots = vec![StorageRoot::new("Recordings", get_recordings_path(&data_dir))];
        if self.roots.is_empty() {
            if let Some(videos) = default_video_dir() {
                roots.push(StorageRoot::new("Videos", videos));
            }
        } else {
            roots.extend(self.roots.into_iter().map(|path| {
                let label = root_label(&path);
                StorageRoot::new(label, path)
            }));
        }

        let camera = FfmpegCameraConfig {
            input_format: self.camera_format.unwrap_or_else(|| DEFAULT_CAMERA_FORMAT.to_string()),
            device: self.camera_device.unwrap_or_else(|| DEFAULT_CAMERA_DEVICE.to_string()),
            ..FfmpegCameraConfig::default()
        };

        Ok(Config {
            data_dir,
            roots,
            host: self.host.unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port: self.port.unwrap_or(DEFAULT_PORT),
            advertise_ip: self.advertise_ip,
            camera,
            task_interval: Duration::from_millis(self.task_interval_ms.unwrap_or(TASK_POLL_INTERVAL_MS)),
        })
    }
}

impl Config {
    pub fn db_path(&self) -> PathBuf {
        get_db_path(&self.data_dir)
    }

    pub fn thumbs_dir(&self) -> PathBuf {
        get_thumbs_path(&self.data_dir)
    }

    pub fn recordings_dir(&self) -> PathBuf {
        get_recordings_path(&self.data_dir)
    }

    /// Create the data directory layout if missing.
    pub fn ensure_directories(&self) -> Result<()> {
        init_data_folders(&self.data_dir).map_err(|e| {
            anyhow::anyhow!(
                "Cannot create data directory {}: {}. Check directory permissions.",
                self.data_dir.display(),
                e
            )
        })
    }
}

/// Per-user data directory, e.g. `~/.local/share/vidshare` on Linux.
pub fn default_data_dir() -> Result<PathBuf> {
    let dirs = directories::ProjectDirs::from("", "", APP_NAME)
        .ok_or_else(|| anyhow::anyhow!("Could not determine home directory"))?;
    Ok(dirs.data_dir().to_path_buf())
}

fn default_video_dir() -> Option<PathBuf> {
    directories::UserDirs::new().and_then(|dirs| dirs.video_dir().map(Path::to_path_buf))
}

fn root_label(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}
