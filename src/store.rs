// Metadata store
//
// One SQLite connection behind a mutex; every caller goes through it, so
// writes are serialised.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use rusqlite::Connection;

use crate::db::{self, query::SelectOptions, settings as kv, videos, videos::VideoRecord};
use crate::error::Result;
use crate::settings::SettingsStore;

/// Persistence seam for video rows.
pub trait MetadataStore: Send + Sync {
    fn fetch(&self, options: &SelectOptions) -> Result<Vec<VideoRecord>>;
    fn get(&self, path: &str) -> Result<Option<VideoRecord>>;
    /// Upsert on path; thumbnails already stored are kept when the new row has none.
    fn insert(&self, videos: &[VideoRecord]) -> Result<usize>;
    fn set_thumbnail(&self, path: &str, thumbnail_path: &str, thumbnail_url: &str) -> Result<bool>;
    fn delete(&self, paths: &[String]) -> Result<usize>;
}

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn new(conn: Connection) -> Self {
        Self { conn: Mutex::new(conn) }
    }

    /// Open (and migrate) the database file.
    pub fn open(path: &Path) -> anyhow::Result<Self> {
        Ok(Self::new(db::open_db(path)?))
    }

    pub fn in_memory() -> anyhow::Result<Self> {
        Ok(Self::new(db::open_in_memory()?))
    }

    pub fn schema_version(&self) -> anyhow::Result<u32> {
        db::migrations::get_schema_version(&self.conn())
    }

    pub fn count(&self) -> Result<i64> {
        videos::count_videos(&self.conn())
    }

    pub fn list_settings(&self) -> Result<Vec<(String, String)>> {
        kv::list_settings(&self.conn())
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        // A panic while holding the lock leaves SQLite itself consistent
        self.conn.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl MetadataStore for SqliteStore {
    fn fetch(&self, options: &SelectOptions) -> Result<Vec<VideoRecord>> {
        videos::fetch_videos(&self.conn(), options)
    }

    fn get(&self, path: &str) -> Result<Option<VideoRecord>> {
        videos::get_video(&self.conn(), path)
    }

    fn insert(&self, records: &[VideoRecord]) -> Result<usize> {
        videos::insert_videos(&self.conn(), records)
    }

    fn set_thumbnail(&self, path: &str, thumbnail_path: &str, thumbnail_url: &str) -> Result<bool> {
        videos::update_thumbnail(&self.conn(), path, thumbnail_path, thumbnail_url)
    }

    fn delete(&self, paths: &[String]) -> Result<usize> {
        videos::delete_videos(&self.conn(), paths)
    }
}

impl SettingsStore for SqliteStore {
    fn get_raw(&self, key: &str) -> Result<Option<String>> {
        kv::get_setting(&self.conn(), key)
    }

    fn set_raw(&self, key: &str, value: &str) -> Result<()> {
        kv::set_setting(&self.conn(), key, value)
    }
}
