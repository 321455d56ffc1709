use directories::ProjectDirs;
use std::path::PathBuf;

/// Centralized application directory resolution
pub struct AppDirs;

impl AppDirs {
    pub fn config_path() -> PathBuf {
        if let Some(pd) = ProjectDirs::from("", "", "prodle") {
            pd.config_dir().join("config.json")
        } else {
            PathBuf::from("prodle_config.json")
        }
    }

    pub fn log_path() -> PathBuf {
        if let Ok(home) = std::env::var("HOME") {
            PathBuf::from(home)
                .join(".local")
                .join("state")
                .join("prodle")
                .join("prodle.log")
        } else if let Some(pd) = ProjectDirs::from("", "", "prodle") {
            pd.data_local_dir().join("prodle.log")
        } else {
            PathBuf::from("prodle.log")
        }
    }
}
