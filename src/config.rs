//! Runner configuration loaded from TOML.

use directories::ProjectDirs;
use serde::Deserialize;
use std::path::{Path, PathBuf};

use cellgraph_core::SheetConfig;

/// Width of a printed cell, in characters.
pub const DEFAULT_COLUMN_WIDTH: usize = 30;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub sheet: SheetConfig,
    pub display: DisplayConfig,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    pub column_width: usize,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        DisplayConfig {
            column_width: DEFAULT_COLUMN_WIDTH,
        }
    }
}

/// `config.toml` in the platform config directory.
pub fn user_config_path() -> Option<PathBuf> {
    let proj = ProjectDirs::from("", "", "cellgraph")?;
    Some(proj.config_dir().join("config.toml"))
}

/// Load configuration from `explicit`, or from the user config file when
/// `search` is set. Problems are reported as warnings and fall back to the
/// defaults.
pub fn load_config(explicit: Option<&Path>, search: bool) -> (Config, Vec<String>) {
    let mut warnings = Vec::new();
    let path = match explicit {
        Some(path) => Some(path.to_path_buf()),
        None if search => user_config_path(),
        None => None,
    };

    let Some(path) = path else {
        return (Config::default(), warnings);
    };
    if !path.exists() {
        if explicit.is_some() {
            warnings.push(format!("Config file not found: {}", path.display()));
        }
        return (Config::default(), warnings);
    }

    let config = match std::fs::read_to_string(&path) {
        Ok(content) => match parse_config(&content) {
            Ok(config) => config,
            Err(err) => {
                warnings.push(format!("Failed to parse {}: {}", path.display(), err));
                Config::default()
            }
        },
        Err(err) => {
            warnings.push(format!("Failed to read {}: {}", path.display(), err));
            Config::default()
        }
    };
    (config, warnings)
}

pub fn parse_config(content: &str) -> Result<Config, toml::de::Error> {
    let mut config: Config = toml::from_str(content)?;
    if config.display.column_width == 0 {
        config.display.column_width = DEFAULT_COLUMN_WIDTH;
    }
    Ok(config)
}
