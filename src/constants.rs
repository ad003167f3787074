// Vidshare Constants
// Values shared by the explorer, the HTTP responder and the recorder.

pub const APP_NAME: &str = "vidshare";

// Paths
pub const DB_FILENAME: &str = "vidshare.db";
pub const THUMBS_FOLDER: &str = "thumbs";
pub const RECORDINGS_FOLDER: &str = "recordings";

// Storage
pub const VIDEO_TABLE: &str = "video";
pub const INSERT_CHUNK_SIZE: usize = 250;
pub const DELETE_CHUNK_SIZE: usize = 500;

// Exploration
pub const HIDDEN_PREFIX: char = '.';
pub const RESERVED_DIR_NAMES: [&str; 1] = ["Android"];
pub const TASK_POLL_INTERVAL_MS: u64 = 250;

// HTTP responder
pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8089;
pub const DEFAULT_LIST_OFFSET: i64 = 0;
pub const DEFAULT_LIST_LIMIT: i64 = 20;
pub const DEFAULT_SORT_BY: &str = "ctime:desc";
pub const SORTABLE_COLUMNS: [&str; 3] = ["name", "ctime", "mtime"];
pub const NETWORK_REFRESH_SECS: u64 = 30;

// Thumbnail settings
pub const THUMB_FORMAT: &str = "jpg";
pub const THUMB_WIDTH: u32 = 1280;
pub const THUMB_HEIGHT: u32 = 720;
pub const THUMB_QUALITY: u32 = 100;
pub const THUMB_SEEK_SECONDS: f64 = 1.0;

// Recording
pub const RECORDING_EXTENSION: &str = "webm";
pub const DEFAULT_RECORD_DURATION_SECS: u32 = 30;
pub const DEFAULT_CAMERA_FORMAT: &str = "v4l2";
pub const DEFAULT_CAMERA_DEVICE: &str = "/dev/video0";
pub const GATEWAY_SETDATA_PATH: &str = "/setdata";

// Settings keys (values are JSON-encoded)
pub const SETTING_GATEWAYS: &str = "app__gateways";
pub const SETTING_DURATIONS: &str = "app__durations";
pub const SETTING_COUNTDOWNS: &str = "app__countdowns";
pub const SETTING_CAMERA_QUALITY: &str = "app__cameraQuality";
pub const SETTING_CAMERA_FPS: &str = "app__cameraFps";
pub const SETTING_CAMERA_FACING: &str = "app__cameraFacing";
pub const SETTING_VIDEO_SCHEMA_VERSION: &str = "app__videoSchemaVersion";

pub const DEFAULT_GATEWAY: &str = "http://192.168.4.6";
pub const DEFAULT_CAMERA_FPS: u32 = 30;

// Video extensions and their MIME types
pub const VIDEO_MIME_TYPES: [(&str, &str); 17] = [
    ("mp4", "video/mp4"),
    ("m4v", "video/x-m4v"),
    ("mov", "video/quicktime"),
    ("webm", "video/webm"),
    ("mkv", "video/x-matroska"),
    ("avi", "video/x-msvideo"),
    ("wmv", "video/x-ms-wmv"),
    ("flv", "video/x-flv"),
    ("3gp", "video/3gpp"),
    ("3g2", "video/3gpp2"),
    ("mpg", "video/mpeg"),
    ("mpeg", "video/mpeg"),
    ("ts", "video/mp2t"),
    ("mts", "video/mp2t"),
    ("m2ts", "video/mp2t"),
    ("ogv", "video/ogg"),
    ("dv", "video/x-dv"),
];

// Image extensions served by /get_file (thumbnails)
pub const IMAGE_MIME_TYPES: [(&str, &str); 4] = [
    ("jpg", "image/jpeg"),
    ("jpeg", "image/jpeg"),
    ("png", "image/png"),
    ("webp", "image/webp"),
];
