// Camera backends
//
// A backend opens a stream for the requested constraints; the stream records
// into a file until the returned handle is finished. The ffmpeg backend
// captures from a local device (v4l2 by default) into WebM.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::time::{Duration, Instant};

use serde::Serialize;

use crate::constants::{DEFAULT_CAMERA_DEVICE, DEFAULT_CAMERA_FORMAT};
use crate::error::{Result, VidshareError};
use crate::settings::{AppSettings, CameraFacing};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CameraConstraints {
    pub width: u32,
    pub height: u32,
    pub aspect_ratio: (u32, u32),
    pub fps: u32,
    pub facing: CameraFacing,
    pub audio: bool,
}

impl CameraConstraints {
    pub fn from_settings(settings: &AppSettings) -> Self {
        let (width, height) = settings.camera_quality.dimensions();
        Self {
            width,
            height,
            aspect_ratio: settings.camera_quality.aspect_ratio(),
            fps: settings.camera_fps,
            facing: settings.camera_facing,
            audio: true,
        }
    }
}

pub trait CameraBackend: Send + Sync {
    fn open(&self, constraints: &CameraConstraints) -> Result<Box<dyn CameraStream>>;
}

pub trait CameraStream: Send {
    /// Start writing to `output`.
    fn record(&mut self, output: &Path) -> Result<Box<dyn ActiveRecording>>;
}

pub trait ActiveRecording: Send {
    /// Stop capturing and flush the file.
    fn finish(self: Box<Self>) -> Result<()>;
}

#[derive(Debug, Clone)]
pub struct FfmpegCameraConfig {
    /// ffmpeg input format, e.g. `v4l2`, `avfoundation`, `dshow`.
    pub input_format: String,
    pub device: String,
    /// Optional audio input, passed as a second `-f`/`-i` pair.
    pub audio_format: Option<String>,
    pub audio_device: Option<String>,
    pub stop_timeout: Duration,
}

impl Default for FfmpegCameraConfig {
    fn default() -> Self {
        Self {
            input_format: DEFAULT_CAMERA_FORMAT.to_string(),
            device: DEFAULT_CAMERA_DEVICE.to_string(),
            audio_format: None,
            audio_device: None,
            stop_timeout: Duration::from_secs(10),
        }
    }
}

pub struct FfmpegCamera {
    config: FfmpegCameraConfig,
}

impl FfmpegCamera {
    pub fn new(config: FfmpegCameraConfig) -> Self {
        Self { config }
    }
}

impl CameraBackend for FfmpegCamera {
    fn open(&self, constraints: &CameraConstraints) -> Result<Box<dyn CameraStream>> {
        if self.config.device.starts_with("/dev/") && !Path::new(&self.config.device).exists() {
            return Err(VidshareError::Camera(format!("Camera device {} not found", self.config.device)));
        }
        if !crate::tools::is_ffmpeg_available() {
            return Err(VidshareError::FFmpeg("ffmpeg not found".to_string()));
        }
        if constraints.facing == CameraFacing::User {
            log::debug!("Facing mode is not selectable for {}, using the configured device", self.config.device);
        }

        Ok(Box::new(FfmpegStream {
            config: self.config.clone(),
            constraints: constraints.clone(),
        }))
    }
}

struct FfmpegStream {
    config: FfmpegCameraConfig,
    constraints: CameraConstraints,
}

impl FfmpegStream {
    fn command(&self, output: &Path) -> Command {
        let mut cmd = Command::new(crate::tools::ffmpeg_path());
        cmd.args(["-y", "-loglevel", "error"])
            .args(["-f", &self.config.input_format])
            .args(["-framerate", &self.constraints.fps.to_string()])
            .args(["-video_size", &format!("{}x{}", self.constraints.width, self.constraints.height)])
            .args(["-i", &self.config.device]);

        if self.constraints.audio {
            if let (Some(format), Some(device)) = (&self.config.audio_format, &self.config.audio_device) {
                cmd.args(["-f", format.as_str(), "-i", device.as_str(), "-c:a", "libopus"]);
            }
        }

        cmd.args(["-c:v", "libvpx", "-deadline", "realtime", "-cpu-used", "8", "-b:v", "2M"])
            .args(["-f", "webm"])
            .arg(output);
        cmd
    }
}

impl CameraStream for FfmpegStream {
    fn record(&mut self, output: &Path) -> Result<Box<dyn ActiveRecording>> {
        let child = self
            .command(output)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| VidshareError::FFmpeg(format!("failed to start capture: {}", e)))?;

        log::info!("Recording {} to {}", self.config.device, output.display());
        Ok(Box::new(FfmpegRecording {
            child,
            output: output.to_path_buf(),
            stop_timeout: self.config.stop_timeout,
        }))
    }
}

struct FfmpegRecording {
    child: Child,
    output: PathBuf,
    stop_timeout: Duration,
}

impl ActiveRecording for FfmpegRecording {
    fn finish(mut self: Box<Self>) -> Result<()> {
        // `q` on stdin makes ffmpeg close the container cleanly
        if let Some(mut stdin) = self.child.stdin.take() {
            let _ = stdin.write_all(b"q");
        }

        let deadline = Instant::now() + self.stop_timeout;
        while self.child.try_wait()?.is_none() {
            if Instant::now() >= deadline {
                log::warn!("ffmpeg did not stop in time, killing it");
                let _ = self.child.kill();
                break;
            }
            std::thread::sleep(Duration::from_millis(50));
        }

        let output = self.child.wait_with_output()?;
        let written = std::fs::metadata(&self.output).map(|m| m.len() > 0).unwrap_or(false);
        if !written {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(VidshareError::FFmpeg(format!("recording produced no output: {}", stderr.trim())));
        }
        Ok(())
    }
}
