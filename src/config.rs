use std::path::PathBuf;

use anyhow::Context;

/// Runtime configuration, resolved once at startup in `AppState::init`.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_path: PathBuf,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_path = match std::env::var("DATABASE_PATH") {
            Ok(p) => PathBuf::from(p),
            Err(_) => default_database_path()?,
        };
        Ok(Self { database_path })
    }
}

/// OS-conventional per-user data location:
/// Linux `~/.local/share/user-management/users.db`,
/// macOS `~/Library/Application Support/user-management/users.db`.
fn default_database_path() -> anyhow::Result<PathBuf> {
    let data_dir = dirs::data_dir().context("no user data directory on this platform")?;
    Ok(data_dir.join("user-management").join("users.db"))
}
