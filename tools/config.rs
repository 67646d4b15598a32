use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use common::DEFAULT_ALBUM_ARTIST;
use serde::{Deserialize, Serialize};

pub const CONFIG_ENV: &str = "ALBUM_ARTIST_CONFIG";
pub const DEFAULT_RELEASE_TYPE: &str = "album;compilation";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    pub album_artist: String,
    pub release_type: String,
    pub follow_links: bool,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            album_artist: DEFAULT_ALBUM_ARTIST.to_string(),
            release_type: DEFAULT_RELEASE_TYPE.to_string(),
            follow_links: false,
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Yaml(serde_yaml::Error),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(err) => write!(f, "config io error: {}", err),
            ConfigError::Yaml(err) => write!(f, "config yaml error: {}", err),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<std::io::Error> for ConfigError {
    fn from(err: std::io::Error) -> Self {
        ConfigError::Io(err)
    }
}

impl From<serde_yaml::Error> for ConfigError {
    fn from(err: serde_yaml::Error) -> Self {
        ConfigError::Yaml(err)
    }
}

pub fn default_config_path() -> PathBuf {
    match env::current_exe() {
        Ok(exe) => exe
            .parent()
            .map(|dir| dir.join("album_artist_scan.yaml"))
            .unwrap_or_else(|| PathBuf::from("album_artist_scan.yaml")),
        Err(_) => PathBuf::from("album_artist_scan.yaml"),
    }
}

/// Loads the config at `path`. A missing file is only an error when the path
/// was asked for explicitly; otherwise the defaults apply.
pub fn load_config(path: &Path, required: bool) -> Result<(ScanConfig, bool), ConfigError> {
    if !required && !path.exists() {
        return Ok((ScanConfig::default(), false));
    }
    let contents = fs::read_to_string(path)?;
    Ok((parse_config(&contents)?, true))
}

pub fn parse_config(contents: &str) -> Result<ScanConfig, ConfigError> {
    if contents.trim().is_empty() {
        return Ok(ScanConfig::default());
    }
    let mut config: ScanConfig = serde_yaml::from_str(contents)?;
    if config.album_artist.trim().is_empty() {
        config.album_artist = DEFAULT_ALBUM_ARTIST.to_string();
    }
    if config.release_type.trim().is_empty() {
        config.release_type = DEFAULT_RELEASE_TYPE.to_string();
    }
    Ok(config)
}
