pub mod config;
pub mod session;
pub mod stats;
pub mod task;

use pomotrack_core::{Config, Database, SessionDirectory};

/// Open the database and build a directory with the configured cadence
/// defaults. Returns the directory plus the owner to act as.
pub fn open_directory(
    owner: Option<String>,
) -> Result<(SessionDirectory, String), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    let owner = owner.unwrap_or(config.default_owner);
    let db = Database::open()?;
    Ok((SessionDirectory::new(db, config.cadence), owner))
}
