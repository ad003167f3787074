// Vidshare CLI binary

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::{Parser, Subcommand};

use vidshare_lib::config::{Config, ConfigArgs};
use vidshare_lib::constants::{NETWORK_REFRESH_SECS, SETTING_VIDEO_SCHEMA_VERSION};
use vidshare_lib::db::query::SelectOptions;
use vidshare_lib::explorer::Reconciler;
use vidshare_lib::jobs::TaskExecutor;
use vidshare_lib::network::{spawn_refresh, NetworkState};
use vidshare_lib::preview::FfmpegThumbnailer;
use vidshare_lib::recording::camera::FfmpegCamera;
use vidshare_lib::recording::gateway::GatewayClient;
use vidshare_lib::recording::{CameraControl, RecordingOptions, RecordingSession, SessionState};
use vidshare_lib::server::params::parse_sort;
use vidshare_lib::server::{AppState, WebServer};
use vidshare_lib::settings::AppSettings;
use vidshare_lib::store::{MetadataStore, SqliteStore};
use vidshare_lib::tools;

/// How long `scan` and `record` wait for queued thumbnails.
const THUMBNAIL_WAIT: Duration = Duration::from_secs(600);

#[derive(Parser)]
#[command(name = "vidshare")]
#[command(about = "Vidshare - index local videos and share them on the LAN", long_about = None)]
#[command(version)]
struct Cli {
    #[command(flatten)]
    config: ConfigArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Index the library and serve it over HTTP until interrupted
    Serve,

    /// Run one reconciliation pass and generate missing thumbnails
    Scan,

    /// List indexed videos
    List {
        /// Maximum videos to show
        #[arg(long, default_value = "50")]
        limit: i64,
        /// Videos to skip
        #[arg(long, default_value = "0")]
        offset: i64,
        /// Sort order, e.g. `mtime:desc` or `name:asc,ctime:desc`
        #[arg(long, default_value = "mtime:desc")]
        sort: String,
    },

    /// Delete a video file with its thumbnail and record
    Delete {
        /// Path of the video
        path: PathBuf,
    },

    /// Show or change persisted settings
    Settings {
        #[command(subcommand)]
        action: SettingsAction,
    },

    /// Record one video from the camera
    Record {
        /// Recording length in seconds (defaults to the selected duration)
        #[arg(long)]
        duration: Option<u64>,
        /// Countdown in seconds (defaults to the selected countdown)
        #[arg(long)]
        countdown: Option<u64>,
    },
}

#[derive(Subcommand)]
enum SettingsAction {
    /// Print the effective settings as JSON
    Show,
    /// Set one key from a JSON value, e.g. `app__cameraFps 24`
    Set { key: String, value: String },
}

/// Everything the subcommands share.
struct Services {
    config: Config,
    store: Arc<SqliteStore>,
    settings: AppSettings,
    reconciler: Arc<Reconciler>,
}

impl Services {
    fn open(config: Config) -> Result<Self> {
        config.ensure_directories()?;

        let store = Arc::new(SqliteStore::open(&config.db_path())?);
        let mut settings = AppSettings::load(store.as_ref());

        let version = store.schema_version()?;
        if settings.video_schema_version != Some(version) {
            log::info!("Recording video schema version {}", version);
            settings.set_video_schema_version(store.as_ref(), version)?;
        }

        let reconciler = Reconciler::new(
            store.clone(),
            Arc::new(FfmpegThumbnailer::new(config.thumbs_dir())),
            TaskExecutor::new(config.task_interval),
            config.roots.clone(),
        )
        .with_finished_callback(Box::new(|| log::info!("All storage roots explored")));

        Ok(Self {
            config,
            store,
            settings,
            reconciler: Arc::new(reconciler),
        })
    }

    fn recording_session(&self) -> RecordingSession {
        let gateway = match GatewayClient::new() {
            Ok(client) => Some(client),
            Err(e) => {
                log::warn!("Gateway notifications disabled: {}", e);
                None
            }
        };

        RecordingSession::new(
            Arc::new(FfmpegCamera::new(self.config.camera.clone())),
            gateway,
            self.reconciler.clone(),
            RecordingOptions::from_settings(&self.settings, self.config.recordings_dir()),
        )
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let config = cli.config.resolve()?;

    match cli.command {
        Commands::Serve => cmd_serve(config).await,
        Commands::Scan => cmd_scan(config).await,
        Commands::List { limit, offset, sort } => cmd_list(config, limit, offset, &sort),
        Commands::Delete { path } => cmd_delete(config, path),
        Commands::Settings { action } => cmd_settings(config, action),
        Commands::Record { duration, countdown } => cmd_record(config, duration, countdown).await,
    }
}

async fn cmd_serve(config: Config) -> Result<()> {
    let services = Services::open(config)?;

    let ffmpeg = tools::locate_ffmpeg();
    match tools::ffmpeg_version() {
        Some(version) => log::info!("Using {} ({:?}): {}", ffmpeg.path.display(), ffmpeg.source, version),
        None => log::warn!("ffmpeg not found at {}; thumbnails and recording will fail", ffmpeg.path.display()),
    }

    match services.reconciler.load_cached() {
        Ok(count) => log::info!("Loaded {} stored video(s)", count),
        Err(e) => log::warn!("Failed to load stored videos: {}", e),
    }

    let reconciler = services.reconciler.clone();
    tokio::task::spawn_blocking(move || {
        if let Err(e) = reconciler.explore() {
            log::error!("Exploration failed: {}", e);
        }
    });

    let network = Arc::new(NetworkState::new(services.config.advertise_ip));
    network.refresh();

    let session = Arc::new(services.recording_session());
    let state = AppState {
        store: services.store.clone(),
        camera: session.clone(),
        network: network.clone(),
    };

    let server = WebServer::new(state);
    let addr = server.start(&services.config.host, services.config.port).await?;
    let refresh = spawn_refresh(network.clone(), Duration::from_secs(NETWORK_REFRESH_SECS));

    match network.snapshot().base_url() {
        Some(url) => println!("Serving {} (bound to {})", url, addr),
        None => println!("Serving on {} (no LAN address detected)", addr),
    }
    println!("Press Ctrl+C to stop.");

    tokio::signal::ctrl_c().await?;
    log::info!("Shutting down");

    refresh.abort();
    if session.state() == SessionState::Recording {
        if let Err(e) = session.stop(false) {
            log::warn!("Failed to stop recording: {}", e);
        }
        session.wait_until_idle().await;
    }
    server.stop().await;

    Ok(())
}

async fn cmd_scan(config: Config) -> Result<()> {
    let services = Services::open(config)?;
    let reconciler = services.reconciler.clone();

    let report = tokio::task::spawn_blocking(move || -> Result<_> {
        let report = reconciler.explore()?;
        if report.thumbnails_queued > 0 {
            println!("Generating {} thumbnail(s)...", report.thumbnails_queued);
            if !reconciler.executor().wait_idle(THUMBNAIL_WAIT) {
                log::warn!("{} thumbnail task(s) still pending", reconciler.executor().pending());
            }
        }
        Ok(report)
    })
    .await??;

    println!("Scan complete:");
    println!("  Videos found:     {}", report.discovered);
    println!("  New:              {}", report.inserted);
    println!("  Refreshed:        {}", report.refreshed);
    println!("  Removed:          {}", report.removed);
    println!("  Thumbnails:       {}", report.thumbnails_queued);
    if report.roots_skipped > 0 {
        println!("  Roots skipped:    {}", report.roots_skipped);
    }
    if report.failed > 0 {
        println!("  Not stored:       {} (retried on the next scan)", report.failed);
    }

    Ok(())
}

fn cmd_list(config: Config, limit: i64, offset: i64, sort: &str) -> Result<()> {
    let services = Services::open(config)?;

    let options = SelectOptions {
        filter: None,
        order_by: parse_sort(sort),
        limit: Some(limit),
        offset: Some(offset),
    };
    let videos = services.store.fetch(&options)?;
    let total = services.store.count()?;

    println!("{} videos indexed", total);
    println!();

    if videos.is_empty() {
        println!("No videos found. Use 'vidshare scan' to index your folders.");
        return Ok(());
    }

    println!("{:>10}  {:>19}  {:>5}  {}", "Size", "Modified", "Thumb", "Path");
    println!("{}", "-".repeat(70));

    for video in videos {
        let modified = chrono::DateTime::from_timestamp_millis(video.mtime)
            .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|| "-".to_string());

        println!(
            "{:>10}  {:>19}  {:>5}  {}",
            format_size(video.size),
            modified,
            if video.has_thumbnail() { "yes" } else { "no" },
            video.path
        );
    }

    Ok(())
}

fn cmd_delete(config: Config, path: PathBuf) -> Result<()> {
    let services = Services::open(config)?;
    let path = path.canonicalize().unwrap_or(path);

    services.reconciler.load_cached()?;
    if services.reconciler.delete_video(&path.to_string_lossy())? {
        println!("Deleted {}", path.display());
    } else {
        println!("Nothing to delete at {}", path.display());
    }
    Ok(())
}

fn cmd_settings(config: Config, action: SettingsAction) -> Result<()> {
    let mut services = Services::open(config)?;

    match action {
        SettingsAction::Show => {
            println!("{}", serde_json::to_string_pretty(&services.settings)?);
        }
        SettingsAction::Set { key, value } => {
            if key == SETTING_VIDEO_SCHEMA_VERSION {
                anyhow::bail!("{} is managed automatically", key);
            }
            services.settings.apply_json(services.store.as_ref(), &key, &value)?;
            println!("Updated {}", key);
        }
    }
    Ok(())
}

async fn cmd_record(config: Config, duration: Option<u64>, countdown: Option<u64>) -> Result<()> {
    let services = Services::open(config)?;
    let session = services.recording_session();

    let mut options = RecordingOptions::from_settings(&services.settings, services.config.recordings_dir());
    if let Some(secs) = duration {
        options.duration = Duration::from_secs(secs);
    }
    if let Some(secs) = countdown {
        options.countdown = Duration::from_secs(secs);
    }
    let seconds = options.duration.as_secs();
    session.set_options(options);

    session.start()?;
    println!("Recording for {}s, press Ctrl+C to stop early.", seconds);

    tokio::select! {
        _ = session.wait_until_idle() => {}
        _ = tokio::signal::ctrl_c() => {
            if let Err(e) = session.stop(false) {
                log::warn!("Failed to stop recording: {}", e);
            }
            session.wait_until_idle().await;
        }
    }

    let Some(video) = session.last_video() else {
        anyhow::bail!("No video was recorded");
    };
    println!("Saved {}", video.path);

    let executor = services.reconciler.executor().clone();
    tokio::task::spawn_blocking(move || executor.wait_idle(THUMBNAIL_WAIT)).await?;

    Ok(())
}

fn format_size(bytes: i64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    let mut size = bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} {}", bytes, UNITS[0])
    } else {
        format!("{:.1} {}", size, UNITS[unit])
    }
}
