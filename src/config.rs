use crate::app_dirs::AppDirs;
use crate::backend::GameBackend;
use crate::protocol::{Difficulty, GameSettings};
use crate::session::DEFAULT_TOTAL_TARGETS;
use crate::timer::DEFAULT_GAME_SECONDS;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

pub const DEFAULT_SERVER_URL: &str = "http://localhost:8080";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub server_url: String,
    pub difficulty: Difficulty,
    pub request_timeout_secs: u64,
    /// Prefills the score form.
    pub last_username: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_url: DEFAULT_SERVER_URL.to_string(),
            difficulty: Difficulty::default(),
            request_timeout_secs: 10,
            last_username: None,
        }
    }
}

pub trait ConfigStore {
    fn load(&self) -> Config;
    fn save(&self, cfg: &Config) -> std::io::Result<()>;
}

#[derive(Debug, Clone)]
pub struct FileConfigStore {
    path: PathBuf,
}

impl FileConfigStore {
    pub fn new() -> Self {
        Self {
            path: AppDirs::config_path(),
        }
    }

    pub fn with_path<P: AsRef<Path>>(p: P) -> Self {
        Self {
            path: p.as_ref().to_path_buf(),
        }
    }
}

impl Default for FileConfigStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigStore for FileConfigStore {
    fn load(&self) -> Config {
        if let Ok(bytes) = fs::read(&self.path) {
            match serde_json::from_slice::<Config>(&bytes) {
                Ok(cfg) => return cfg,
                Err(err) => warn!(path = %self.path.display(), %err, "ignoring unreadable config"),
            }
        }
        Config::default()
    }

    fn save(&self, cfg: &Config) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_vec_pretty(cfg).unwrap_or_default();
        fs::write(&self.path, data)
    }
}

/// Game duration and target count, asked of the server once before the timer
/// is built. Falls back to the defaults if the server cannot say.
pub fn resolve_game_settings(backend: &dyn GameBackend) -> GameSettings {
    match backend.fetch_settings() {
        Ok(settings) if settings.total_game_time_seconds > 0 => {
            info!(
                seconds = settings.total_game_time_seconds,
                targets = settings.players_per_session,
                "loaded game settings"
            );
            GameSettings {
                total_game_time_seconds: settings.total_game_time_seconds,
                players_per_session: if settings.players_per_session > 0 {
                    settings.players_per_session
                } else {
                    DEFAULT_TOTAL_TARGETS
                },
            }
        }
        Ok(_) => {
            warn!("server reported a zero game duration, using {DEFAULT_GAME_SECONDS}s");
            default_settings()
        }
        Err(err) => {
            warn!(%err, "failed to load game settings, using {DEFAULT_GAME_SECONDS}s");
            default_settings()
        }
    }
}

fn default_settings() -> GameSettings {
    GameSettings {
        total_game_time_seconds: DEFAULT_GAME_SECONDS,
        players_per_session: DEFAULT_TOTAL_TARGETS,
    }
}
