use crate::reminders::{DEFAULT_LOOKBACK_MS, DEFAULT_SCAN_PERIOD_MS};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::PathBuf;

/// Environment variable that overrides the data directory.
pub const DATA_DIR_ENV: &str = "IDEABOARD_DIR";
pub const CONFIG_FILE_NAME: &str = "config.json";
pub const DEFAULT_CALENDAR_POLL_SECS: u64 = 60;

#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Serde(serde_json::Error),
    ProjectDir,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(err) => write!(f, "config i/o failed: {err}"),
            Self::Serde(err) => write!(f, "config is not valid JSON: {err}"),
            Self::ProjectDir => f.write_str("no home directory to place the config in"),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<std::io::Error> for ConfigError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serde(err)
    }
}

fn default_scan_period_ms() -> u64 {
    DEFAULT_SCAN_PERIOD_MS
}

fn default_lookback_ms() -> u64 {
    DEFAULT_LOOKBACK_MS
}

fn default_calendar_poll_secs() -> u64 {
    DEFAULT_CALENDAR_POLL_SECS
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AppConfig {
    #[serde(default)]
    pub data_dir: Option<PathBuf>,
    #[serde(default = "default_scan_period_ms")]
    pub scan_period_ms: u64,
    #[serde(default = "default_lookback_ms")]
    pub lookback_ms: u64,
    #[serde(default)]
    pub calendar_feed: Option<PathBuf>,
    #[serde(default = "default_calendar_poll_secs")]
    pub calendar_poll_secs: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: None,
            scan_period_ms: DEFAULT_SCAN_PERIOD_MS,
            lookback_ms: DEFAULT_LOOKBACK_MS,
            calendar_feed: None,
            calendar_poll_secs: DEFAULT_CALENDAR_POLL_SECS,
        }
    }
}

fn project_dirs() -> Result<ProjectDirs, ConfigError> {
    ProjectDirs::from("app", "ideaboard", "IdeaBoard").ok_or(ConfigError::ProjectDir)
}

/// Platform data directory used when neither config nor env name one.
pub fn default_data_dir() -> Result<PathBuf, ConfigError> {
    Ok(project_dirs()?.data_dir().to_path_buf())
}

pub fn to_pretty_json(config: &AppConfig) -> Result<String, ConfigError> {
    Ok(serde_json::to_string_pretty(config)?)
}

pub struct ConfigStore {
    config_path: PathBuf,
}

impl ConfigStore {
    pub fn new(config_path: PathBuf) -> Self {
        Self { config_path }
    }

    pub fn default_store() -> Result<Self, ConfigError> {
        let project_dirs = project_dirs()?;
        Ok(Self::new(project_dirs.config_dir().join(CONFIG_FILE_NAME)))
    }

    pub fn path(&self) -> &PathBuf {
        &self.config_path
    }

    pub fn load(&self) -> Result<AppConfig, ConfigError> {
        if !self.config_path.exists() {
            return Ok(AppConfig::default());
        }
        let raw = fs::read_to_string(&self.config_path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    pub fn save(&self, config: &AppConfig) -> Result<(), ConfigError> {
        if let Some(parent) = self.config_path.parent() {
            fs::create_dir_all(parent)?;
        }
        let data = to_pretty_json(config)?;
        fs::write(&self.config_path, data)?;
        Ok(())
    }
}
