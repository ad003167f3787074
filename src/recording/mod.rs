// Recording session
//
// Two states: Idle and Recording (countdown included). A started session
// acquires the camera, waits out the countdown, pings the selected gateway,
// records until the duration elapses or stop() is called, then hands the file
// to the explorer.

pub mod camera;
pub mod gateway;

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;

use serde::Serialize;
use tokio::sync::{oneshot, watch};
use uuid::Uuid;

use crate::constants::{DEFAULT_RECORD_DURATION_SECS, RECORDING_EXTENSION};
use crate::db::videos::VideoRecord;
use crate::error::{Result, VidshareError};
use crate::explorer::media::stat_video;
use crate::explorer::Reconciler;
use crate::settings::AppSettings;
use camera::{CameraBackend, CameraConstraints};
use gateway::GatewayClient;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    Idle,
    Recording,
}

/// What the HTTP responder needs from a camera.
pub trait CameraControl: Send + Sync {
    fn state(&self) -> SessionState;
    /// Fails with `AlreadyRecording` unless idle. Must be called inside a tokio runtime.
    fn start(&self) -> Result<()>;
    /// Fails with `NotRecording` when idle. `ignore_video` discards the capture.
    fn stop(&self, ignore_video: bool) -> Result<()>;
}

#[derive(Debug, Clone)]
pub struct RecordingOptions {
    pub constraints: CameraConstraints,
    pub countdown: Duration,
    pub duration: Duration,
    pub gateway: Option<String>,
    pub output_dir: PathBuf,
}

impl RecordingOptions {
    pub fn from_settings(settings: &AppSettings, output_dir: impl Into<PathBuf>) -> Self {
        let duration = settings.selected_duration().unwrap_or(DEFAULT_RECORD_DURATION_SECS);
        Self {
            constraints: CameraConstraints::from_settings(settings),
            countdown: Duration::from_secs(settings.selected_countdown() as u64),
            duration: Duration::from_secs(duration as u64),
            gateway: settings.selected_gateway().map(str::to_string),
            output_dir: output_dir.into(),
        }
    }
}

struct SessionInner {
    backend: Arc<dyn CameraBackend>,
    gateway: Option<GatewayClient>,
    reconciler: Arc<Reconciler>,
    options: RwLock<RecordingOptions>,
    state: watch::Sender<SessionState>,
    stop_tx: Mutex<Option<oneshot::Sender<bool>>>,
    last_video: Mutex<Option<VideoRecord>>,
}

#[derive(Clone)]
pub struct RecordingSession {
    inner: Arc<SessionInner>,
}

impl RecordingSession {
    pub fn new(
        backend: Arc<dyn CameraBackend>,
        gateway: Option<GatewayClient>,
        reconciler: Arc<Reconciler>,
        options: RecordingOptions,
    ) -> Self {
        let (state, _) = watch::channel(SessionState::Idle);
        Self {
            inner: Arc::new(SessionInner {
                backend,
                gateway,
                reconciler,
                options: RwLock::new(options),
                state,
                stop_tx: Mutex::new(None),
                last_video: Mutex::new(None),
            }),
        }
    }

    /// Applies to the next recording.
    pub fn set_options(&self, options: RecordingOptions) {
        *self.inner.options.write().unwrap_or_else(|e| e.into_inner()) = options;
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.inner.state.subscribe()
    }

    /// Resolve once the session is idle again.
    pub async fn wait_until_idle(&self) {
        let mut rx = self.subscribe();
        let _ = rx.wait_for(|s| *s == SessionState::Idle).await;
    }

    /// The most recent video this session stored.
    pub fn last_video(&self) -> Option<VideoRecord> {
        self.inner.last_video.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

impl CameraControl for RecordingSession {
    fn state(&self) -> SessionState {
        *self.inner.state.borrow()
    }

    fn start(&self) -> Result<()> {
        let mut stop_slot = self.inner.stop_tx.lock().unwrap_or_else(|e| e.into_inner());
        if *self.inner.state.borrow() != SessionState::Idle {
            return Err(VidshareError::AlreadyRecording);
        }

        let (tx, rx) = oneshot::channel();
        *stop_slot = Some(tx);
        self.inner.state.send_replace(SessionState::Recording);

        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            match run_session(&inner, rx).await {
                Ok(Some(video)) => {
                    log::info!("Recording saved: {}", video.path);
                    *inner.last_video.lock().unwrap_or_else(|e| e.into_inner()) = Some(video);
                }
                Ok(None) => log::info!("Recording discarded"),
                Err(e) => log::error!("Recording failed: {}", e),
            }

            let mut stop_slot = inner.stop_tx.lock().unwrap_or_else(|e| e.into_inner());
            *stop_slot = None;
            inner.state.send_replace(SessionState::Idle);
        });

        Ok(())
    }

    fn stop(&self, ignore_video: bool) -> Result<()> {
        let mut stop_slot = self.inner.stop_tx.lock().unwrap_or_else(|e| e.into_inner());
        if *self.inner.state.borrow() == SessionState::Idle {
            return Err(VidshareError::NotRecording);
        }

        // Already stopping: the capture is being saved
        let tx = stop_slot.take().ok_or(VidshareError::NotRecording)?;
        let _ = tx.send(ignore_video);
        Ok(())
    }
}

/// Run blocking camera or filesystem work off the async runtime.
async fn blocking<T, F>(f: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| VidshareError::Camera(format!("background task failed: {}", e)))?
}

async fn run_session(inner: &Arc<SessionInner>, mut stop_rx: oneshot::Receiver<bool>) -> Result<Option<VideoRecord>> {
    let options = inner.options.read().unwrap_or_else(|e| e.into_inner()).clone();

    let backend = Arc::clone(&inner.backend);
    let constraints = options.constraints.clone();
    let mut stream = blocking(move || backend.open(&constraints)).await?;

    if !options.countdown.is_zero() {
        log::info!("Recording starts in {}s", options.countdown.as_secs());
        tokio::select! {
            _ = tokio::time::sleep(options.countdown) => {}
            _ = &mut stop_rx => {
                log::info!("Recording cancelled during countdown");
                return Ok(None);
            }
        }
    }

    if let (Some(client), Some(gateway)) = (inner.gateway.clone(), options.gateway.clone()) {
        tokio::spawn(async move {
            if let Err(e) = client.notify_recording(&gateway).await {
                log::warn!("Failed to notify gateway {}: {}", gateway, e);
            }
        });
    }

    std::fs::create_dir_all(&options.output_dir)?;
    let output = options
        .output_dir
        .join(format!("{}.{}", Uuid::new_v4(), RECORDING_EXTENSION));

    let target = output.clone();
    let (stream, recording) = blocking(move || {
        let recording = stream.record(&target)?;
        Ok((stream, recording))
    })
    .await?;

    let ignore_video = tokio::select! {
        _ = tokio::time::sleep(options.duration) => false,
        stop = &mut stop_rx => stop.unwrap_or(false),
    };

    blocking(move || recording.finish()).await?;
    drop(stream);

    if ignore_video {
        discard(&output);
        return Ok(None);
    }

    let reconciler = Arc::clone(&inner.reconciler);
    let video = blocking(move || {
        let video = stat_video(&output)?;
        reconciler.add_recorded(video)
    })
    .await?;

    Ok(Some(video))
}

fn discard(path: &Path) {
    if let Err(e) = std::fs::remove_file(path) {
        log::warn!("Failed to discard recording {}: {}", path.display(), e);
    }
}
