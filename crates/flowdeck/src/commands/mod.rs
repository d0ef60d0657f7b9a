//! CLI command handlers.

pub mod check;
pub mod policy;
pub mod serve;

use std::path::PathBuf;

/// Default data directory (database, policy cache).
pub fn data_dir() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("flowdeck"))
        .unwrap_or_else(|| PathBuf::from(".flowdeck"))
}
