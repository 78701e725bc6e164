//! Configuration file loading.
//!
//! Two optional TOML files feed [`FileConfig`]: a per-user file at
//! `<config dir>/stagehand/config.toml` and a per-project `.stagehand.toml`
//! in the working directory. The project file wins. A missing or malformed
//! file contributes nothing.

use std::path::{Path, PathBuf};

use stagehand_types::config::FileConfig;

pub const PROJECT_CONFIG_FILE: &str = ".stagehand.toml";

/// `<config dir>/stagehand/config.toml`, when the platform has a config dir.
pub fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("stagehand").join("config.toml"))
}

/// Load one configuration file, falling back to an empty config.
pub async fn load_config_file(path: &Path) -> FileConfig {
    let content = match tokio::fs::read_to_string(path).await {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("No config file at {}, skipping", path.display());
            return FileConfig::default();
        }
        Err(err) => {
            tracing::warn!("Failed to read {}: {err}, ignoring it", path.display());
            return FileConfig::default();
        }
    };

    match toml::from_str::<FileConfig>(&content) {
        Ok(config) => config,
        Err(err) => {
            tracing::warn!("Failed to parse {}: {err}, ignoring it", path.display());
            FileConfig::default()
        }
    }
}

/// User config overlaid with the project config found in `working_dir`.
pub async fn load_layered_config(working_dir: &Path) -> FileConfig {
    let user = match user_config_path() {
        Some(path) => load_config_file(&path).await,
        None => FileConfig::default(),
    };
    let project = load_config_file(&working_dir.join(PROJECT_CONFIG_FILE)).await;
    user.merge(project)
}
