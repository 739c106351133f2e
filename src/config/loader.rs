use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::config::types::AppConfig;

/// Discover and load the app config.
///
/// Priority:
/// 1. `--config` flag (explicit path)
/// 2. `$ROW_PANEL_CONFIG` environment variable
/// 3. `$XDG_CONFIG_HOME/row-panel/config.toml`
/// 4. `~/.config/row-panel/config.toml`
///
/// When nothing is found the built-in defaults are used. An explicit path
/// that does not exist is an error; discovered paths are only used if they
/// are regular files.
pub fn load_config(explicit_path: Option<&Path>) -> Result<AppConfig> {
    let path = match explicit_path {
        Some(path) => Some(path.to_path_buf()),
        None => find_config(),
    };

    let Some(path) = path else {
        tracing::debug!("config: no file found, using defaults");
        return Ok(AppConfig::default());
    };

    tracing::debug!("config: loading {}", path.display());
    parse_config_file(&path)
}

/// Parse one config file.
pub fn parse_config_file(path: &Path) -> Result<AppConfig> {
    let contents =
        std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let config: AppConfig =
        toml::from_str(&contents).with_context(|| format!("parsing TOML from {}", path.display()))?;
    Ok(config)
}

fn find_config() -> Option<PathBuf> {
    // $ROW_PANEL_CONFIG
    if let Ok(path) = std::env::var("ROW_PANEL_CONFIG") {
        let p = expand_tilde(&path);
        if p.is_file() {
            return Some(p);
        }
    }

    // $XDG_CONFIG_HOME/row-panel/config.toml
    if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
        let p = PathBuf::from(xdg).join("row-panel/config.toml");
        if p.is_file() {
            return Some(p);
        }
    }

    // ~/.config/row-panel/config.toml
    if let Some(home) = home_dir() {
        let p = home.join(".config/row-panel/config.toml");
        if p.is_file() {
            return Some(p);
        }
    }

    None
}

fn home_dir() -> Option<PathBuf> {
    std::env::var("HOME").ok().map(PathBuf::from)
}

fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}
