mod config;
pub mod database;

pub use config::Config;
pub use database::{Database, DayStats};

use std::path::PathBuf;

use crate::error::Result;

/// Resolves the on-disk data directory, creating it if needed.
///
/// Defaults to `~/.config/pomotrack/`; `POMOTRACK_ENV=dev` switches to
/// `~/.config/pomotrack-dev/` so development runs stay out of real data.
///
/// # Errors
/// Returns an error if the directory cannot be created.
pub fn data_dir() -> Result<PathBuf> {
    let base_dir = dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config");

    let env = std::env::var("POMOTRACK_ENV").unwrap_or_else(|_| "production".to_string());

    let dir = if env == "dev" {
        base_dir.join("pomotrack-dev")
    } else {
        base_dir.join("pomotrack")
    };

    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}
