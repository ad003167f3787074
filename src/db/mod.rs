// Database module

pub mod migrations;
pub mod query;
pub mod settings;
pub mod videos;

use rusqlite::Connection;
use std::path::{Path, PathBuf};
use anyhow::Result;

use crate::constants::{DB_FILENAME, RECORDINGS_FOLDER, THUMBS_FOLDER};

/// Open or create a database at the given path
pub fn open_db(db_path: &Path) -> Result<Connection> {
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let conn = Connection::open(db_path)?;
    configure_connection(&conn)?;
    migrations::run_migrations(&conn)?;

    Ok(conn)
}

/// Open an in-memory database with all migrations applied
pub fn open_in_memory() -> Result<Connection> {
    let conn = Connection::open_in_memory()?;
    migrations::run_migrations(&conn)?;
    Ok(conn)
}

fn configure_connection(conn: &Connection) -> Result<()> {
    // WAL keeps readers from blocking the single writer
    conn.execute_batch("PRAGMA journal_mode = WAL;")?;
    conn.execute_batch("PRAGMA busy_timeout = 5000;")?;
    Ok(())
}

/// Get the database path for a data directory
pub fn get_db_path(data_dir: &Path) -> PathBuf {
    data_dir.join(DB_FILENAME)
}

/// Get the thumbnail folder for a data directory
pub fn get_thumbs_path(data_dir: &Path) -> PathBuf {
    data_dir.join(THUMBS_FOLDER)
}

/// Get the recordings folder for a data directory
pub fn get_recordings_path(data_dir: &Path) -> PathBuf {
    data_dir.join(RECORDINGS_FOLDER)
}

/// Initialize data folder structure
pub fn init_data_folders(data_dir: &Path) -> Result<()> {
    std::fs::create_dir_all(data_dir)?;
    std::fs::create_dir_all(get_thumbs_path(data_dir))?;
    std::fs::create_dir_all(get_recordings_path(data_dir))?;
    Ok(())
}
