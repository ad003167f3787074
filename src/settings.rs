// User preferences
//
// Each key in the app_settings table holds a JSON-encoded value. Settings are
// read once at startup; setters write through immediately.

use std::fmt;
use std::str::FromStr;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_CAMERA_FPS, DEFAULT_GATEWAY, SETTING_CAMERA_FACING, SETTING_CAMERA_FPS,
    SETTING_CAMERA_QUALITY, SETTING_COUNTDOWNS, SETTING_DURATIONS, SETTING_GATEWAYS,
    SETTING_VIDEO_SCHEMA_VERSION,
};
use crate::error::{Result, VidshareError};

/// Raw key-value persistence for settings.
pub trait SettingsStore: Send + Sync {
    fn get_raw(&self, key: &str) -> Result<Option<String>>;
    fn set_raw(&self, key: &str, value: &str) -> Result<()>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayOption {
    pub gateway: String,
    pub selected: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DurationOption {
    pub duration: u32,
    pub selected: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountdownOption {
    pub countdown: u32,
    pub selected: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CameraQuality {
    SD,
    HD,
    FHD,
    #[serde(rename = "2K")]
    QHD,
    #[serde(rename = "4K")]
    UHD,
}

impl CameraQuality {
    pub const ALL: [CameraQuality; 5] = [
        CameraQuality::SD,
        CameraQuality::HD,
        CameraQuality::FHD,
        CameraQuality::QHD,
        CameraQuality::UHD,
    ];

    pub fn key(self) -> &'static str {
        match self {
            CameraQuality::SD => "SD",
            CameraQuality::HD => "HD",
            CameraQuality::FHD => "FHD",
            CameraQuality::QHD => "2K",
            CameraQuality::UHD => "4K",
        }
    }

    /// Frame size as (width, height).
    pub fn dimensions(self) -> (u32, u32) {
        match self {
            CameraQuality::SD => (640, 480),
            CameraQuality::HD => (1280, 720),
            CameraQuality::FHD => (1920, 1080),
            CameraQuality::QHD => (2560, 1440),
            CameraQuality::UHD => (3840, 2160),
        }
    }

    pub fn aspect_ratio(self) -> (u32, u32) {
        match self {
            CameraQuality::SD => (4, 3),
            _ => (16, 9),
        }
    }
}

impl fmt::Display for CameraQuality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for CameraQuality {
    type Err = VidshareError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|q| q.key().eq_ignore_ascii_case(s))
            .ok_or_else(|| VidshareError::Settings(format!("unknown camera quality: {}", s)))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CameraFacing {
    User,
    Environment,
}

fn default_gateways() -> Vec<GatewayOption> {
    vec![GatewayOption {
        gateway: DEFAULT_GATEWAY.to_string(),
        selected: true,
    }]
}

fn default_durations() -> Vec<DurationOption> {
    [(120, false), (90, false), (60, true), (30, false)]
        .into_iter()
        .map(|(duration, selected)| DurationOption { duration, selected })
        .collect()
}

fn default_countdowns() -> Vec<CountdownOption> {
    [(0, false), (3, true), (5, false), (10, false), (15, false)]
        .into_iter()
        .map(|(countdown, selected)| CountdownOption { countdown, selected })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppSettings {
    pub gateways: Vec<GatewayOption>,
    pub durations: Vec<DurationOption>,
    pub countdowns: Vec<CountdownOption>,
    pub camera_quality: CameraQuality,
    pub camera_fps: u32,
    pub camera_facing: CameraFacing,
    pub video_schema_version: Option<u32>,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            gateways: default_gateways(),
            durations: default_durations(),
            countdowns: default_countdowns(),
            camera_quality: CameraQuality::HD,
            camera_fps: DEFAULT_CAMERA_FPS,
            camera_facing: CameraFacing::Environment,
            video_schema_version: None,
        }
    }
}

/// Read and decode one key. Missing, unreadable or undecodable values yield None.
fn load_json<T: DeserializeOwned>(store: &dyn SettingsStore, key: &str) -> Option<T> {
    match store.get_raw(key) {
        Ok(Some(raw)) => match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                log::warn!("Setting {} holds invalid JSON ({}), using default", key, e);
                None
            }
        },
        Ok(None) => None,
        Err(e) => {
            log::warn!("Failed to read setting {}: {}", key, e);
            None
        }
    }
}

fn save_json<T: Serialize>(store: &dyn SettingsStore, key: &str, value: &T) -> Result<()> {
    store.set_raw(key, &serde_json::to_string(value)?)
}

impl AppSettings {
    pub fn load(store: &dyn SettingsStore) -> Self {
        let defaults = Self::default();
        Self {
            gateways: load_json(store, SETTING_GATEWAYS).unwrap_or(defaults.gateways),
            durations: load_json(store, SETTING_DURATIONS).unwrap_or(defaults.durations),
            countdowns: load_json(store, SETTING_COUNTDOWNS).unwrap_or(defaults.countdowns),
            camera_quality: load_json(store, SETTING_CAMERA_QUALITY).unwrap_or(defaults.camera_quality),
            camera_fps: load_json(store, SETTING_CAMERA_FPS).unwrap_or(defaults.camera_fps),
            camera_facing: load_json(store, SETTING_CAMERA_FACING).unwrap_or(defaults.camera_facing),
            video_schema_version: load_json(store, SETTING_VIDEO_SCHEMA_VERSION),
        }
    }

    pub fn selected_gateway(&self) -> Option<&str> {
        self.gateways
            .iter()
            .find(|g| g.selected)
            .map(|g| g.gateway.as_str())
    }

    pub fn selected_duration(&self) -> Option<u32> {
        self.durations.iter().find(|d| d.selected).map(|d| d.duration)
    }

    /// Countdown before recording; none selected means no countdown.
    pub fn selected_countdown(&self) -> u32 {
        self.countdowns
            .iter()
            .find(|c| c.selected)
            .map(|c| c.countdown)
            .unwrap_or(0)
    }

    pub fn set_gateways(&mut self, store: &dyn SettingsStore, gateways: Vec<GatewayOption>) -> Result<()> {
        save_json(store, SETTING_GATEWAYS, &gateways)?;
        self.gateways = gateways;
        Ok(())
    }

    pub fn set_durations(&mut self, store: &dyn SettingsStore, durations: Vec<DurationOption>) -> Result<()> {
        save_json(store, SETTING_DURATIONS, &durations)?;
        self.durations = durations;
        Ok(())
    }

    pub fn set_countdowns(&mut self, store: &dyn SettingsStore, countdowns: Vec<CountdownOption>) -> Result<()> {
        save_json(store, SETTING_COUNTDOWNS, &countdowns)?;
        self.countdowns = countdowns;
        Ok(())
    }

    pub fn set_camera_quality(&mut self, store: &dyn SettingsStore, quality: CameraQuality) -> Result<()> {
        save_json(store, SETTING_CAMERA_QUALITY, &quality)?;
        self.camera_quality = quality;
        Ok(())
    }

    pub fn set_camera_fps(&mut self, store: &dyn SettingsStore, fps: u32) -> Result<()> {
        save_json(store, SETTING_CAMERA_FPS, &fps)?;
        self.camera_fps = fps;
        Ok(())
    }

    pub fn set_camera_facing(&mut self, store: &dyn SettingsStore, facing: CameraFacing) -> Result<()> {
        save_json(store, SETTING_CAMERA_FACING, &facing)?;
        self.camera_facing = facing;
        Ok(())
    }

    pub fn set_video_schema_version(&mut self, store: &dyn SettingsStore, version: u32) -> Result<()> {
        save_json(store, SETTING_VIDEO_SCHEMA_VERSION, &version)?;
        self.video_schema_version = Some(version);
        Ok(())
    }

    /// Set one key from its JSON text, validating it against the key's type.
    pub fn apply_json(&mut self, store: &dyn SettingsStore, key: &str, json: &str) -> Result<()> {
        fn parse<T: DeserializeOwned>(key: &str, json: &str) -> Result<T> {
            serde_json::from_str(json)
                .map_err(|e| VidshareError::Settings(format!("invalid value for {}: {}", key, e)))
        }

        match key {
            SETTING_GATEWAYS => self.set_gateways(store, parse(key, json)?),
            SETTING_DURATIONS => self.set_durations(store, parse(key, json)?),
            SETTING_COUNTDOWNS => self.set_countdowns(store, parse(key, json)?),
            SETTING_CAMERA_QUALITY => self.set_camera_quality(store, parse(key, json)?),
            SETTING_CAMERA_FPS => self.set_camera_fps(store, parse(key, json)?),
            SETTING_CAMERA_FACING => self.set_camera_facing(store, parse(key, json)?),
            SETTING_VIDEO_SCHEMA_VERSION => self.set_video_schema_version(store, parse(key, json)?),
            other => Err(VidshareError::Settings(format!("unknown setting: {}", other))),
        }
    }
}
