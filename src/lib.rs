// Vidshare - Library Entry Point
//
// Indexes local video folders into SQLite, generates thumbnails in the
// background and serves the library to other devices on the LAN.

pub mod config;
pub mod constants;
pub mod error;
pub mod tools;
pub mod db;
pub mod store;
pub mod settings;
pub mod jobs;
pub mod preview;
pub mod explorer;
pub mod recording;
pub mod network;
pub mod server;

pub use error::{Result, VidshareError};
