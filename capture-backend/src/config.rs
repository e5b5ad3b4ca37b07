use crate::error::ConfigError;
use crate::notes::store::CollisionPolicy;
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable names - single source of truth
pub mod env_vars {
    pub const TELEGRAM_BOT_TOKEN: &str = "TELEGRAM_BOT_TOKEN";
    /// Older deployments used a bare API_TOKEN; still honoured as a fallback.
    pub const API_TOKEN: &str = "API_TOKEN";
    pub const NOTES_DIR: &str = "NOTES_DIR";
    pub const IMAGE_FETCH_TIMEOUT_SECS: &str = "IMAGE_FETCH_TIMEOUT_SECS";
    pub const NOTE_COLLISION_POLICY: &str = "NOTE_COLLISION_POLICY";
}

/// Default values
pub mod defaults {
    pub const NOTES_DIR: &str = "notes";
    pub const CACHE_DIR: &str = "Cache";
    pub const IMAGE_FETCH_TIMEOUT_SECS: u64 = 30;
    pub const IMAGE_EXTENSION: &str = "jpg";
}

#[derive(Clone, Debug)]
pub struct Config {
    pub bot_token: String,
    pub notes: NotesConfig,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let bot_token = env::var(env_vars::TELEGRAM_BOT_TOKEN)
            .or_else(|_| env::var(env_vars::API_TOKEN))
            .ok()
            .filter(|t| !t.trim().is_empty())
            .ok_or(ConfigError::Missing(env_vars::TELEGRAM_BOT_TOKEN))?;

        Ok(Self {
            bot_token,
            notes: NotesConfig::from_env()?,
        })
    }
}

/// Configuration for the notes vault (Obsidian-compatible markdown + image cache)
#[derive(Clone, Debug)]
pub struct NotesConfig {
    /// Directory for note markdown files (default: ./notes)
    pub notes_dir: PathBuf,
    /// Upper bound on a single attachment download
    pub fetch_timeout: Duration,
    /// What to do when a derived filename already exists
    pub collision_policy: CollisionPolicy,
}

impl Default for NotesConfig {
    fn default() -> Self {
        Self {
            notes_dir: PathBuf::from(defaults::NOTES_DIR),
            fetch_timeout: Duration::from_secs(defaults::IMAGE_FETCH_TIMEOUT_SECS),
            collision_policy: CollisionPolicy::default(),
        }
    }
}

impl NotesConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Ok(dir) = env::var(env_vars::NOTES_DIR) {
            if !dir.trim().is_empty() {
                config.notes_dir = PathBuf::from(dir);
            }
        }

        if let Ok(raw) = env::var(env_vars::IMAGE_FETCH_TIMEOUT_SECS) {
            let secs: u64 = raw.trim().parse().map_err(|_| ConfigError::Invalid {
                name: env_vars::IMAGE_FETCH_TIMEOUT_SECS,
                expected: "a whole number of seconds",
                value: raw.clone(),
            })?;
            config.fetch_timeout = Duration::from_secs(secs);
        }

        if let Ok(raw) = env::var(env_vars::NOTE_COLLISION_POLICY) {
            config.collision_policy =
                CollisionPolicy::from_str(&raw).ok_or_else(|| ConfigError::Invalid {
                    name: env_vars::NOTE_COLLISION_POLICY,
                    expected: "\"overwrite\" or \"suffix\"",
                    value: raw.clone(),
                })?;
        }

        Ok(config)
    }

    /// Get the content-addressed image cache directory
    pub fn cache_dir(&self) -> PathBuf {
        self.notes_dir.join(defaults::CACHE_DIR)
    }
}

/// Create the notes and cache directories.
/// This should be called at startup before any message is handled.
pub fn initialize_dirs(notes: &NotesConfig) -> std::io::Result<()> {
    std::fs::create_dir_all(&notes.notes_dir)?;
    std::fs::create_dir_all(notes.cache_dir())?;
    log::info!("Notes directory: {:?}", absolute(&notes.notes_dir));
    Ok(())
}

fn absolute(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
}
