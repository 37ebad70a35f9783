use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::session::SessionConfig;

pub const ENV_BASE_URL: &str = "TERMEXAM_BASE_URL";
pub const ENV_TOKEN: &str = "TERMEXAM_TOKEN";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(default = "default_autosave_debounce_ms")]
    pub autosave_debounce_ms: u64,
    #[serde(default = "default_redirect_delay_ms")]
    pub redirect_delay_ms: u64,
    #[serde(default = "default_low_time_secs")]
    pub low_time_secs: i64,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default = "default_log_dir")]
    pub log_dir: PathBuf,
}

fn default_autosave_debounce_ms() -> u64 {
    2000
}
fn default_redirect_delay_ms() -> u64 {
    2000
}
fn default_low_time_secs() -> i64 {
    300
}
fn default_request_timeout_secs() -> u64 {
    15
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_log_dir() -> PathBuf {
    ProjectDirs::from("", "", "termexam")
        .map(|dirs| dirs.data_local_dir().join("logs"))
        .unwrap_or_else(|| PathBuf::from("logs"))
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: None,
            token: None,
            autosave_debounce_ms: default_autosave_debounce_ms(),
            redirect_delay_ms: default_redirect_delay_ms(),
            low_time_secs: default_low_time_secs(),
            request_timeout_secs: default_request_timeout_secs(),
            log_level: default_log_level(),
            log_dir: default_log_dir(),
        }
    }
}

impl Config {
    /// Reads `path`, falling back to defaults when the file does not exist.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Config::default());
        }
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::parse(&content, path)
    }

    fn parse(content: &str, path: &Path) -> Result<Self, ConfigError> {
        if content.trim().is_empty() {
            return Ok(Config::default());
        }
        serde_yaml::from_str(content).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let io_err = |source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
        let content = serde_yaml::to_string(self).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })?;
        let tmp = path.with_extension("tmp");
        fs::write(&tmp, content).map_err(io_err)?;
        fs::rename(&tmp, path).map_err(io_err)
    }

    /// Applies `TERMEXAM_BASE_URL` / `TERMEXAM_TOKEN` from `lookup`.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup(ENV_BASE_URL).filter(|v| !v.is_empty()) {
            self.base_url = Some(url);
        }
        if let Some(token) = lookup(ENV_TOKEN).filter(|v| !v.is_empty()) {
            self.token = Some(token);
        }
    }

    pub fn apply_overrides(&mut self, base_url: Option<String>, token: Option<String>) {
        if base_url.is_some() {
            self.base_url = base_url;
        }
        if token.is_some() {
            self.token = token;
        }
    }

    pub fn require_base_url(&self) -> Result<&str, ConfigError> {
        self.base_url
            .as_deref()
            .filter(|u| !u.trim().is_empty())
            .ok_or(ConfigError::MissingBaseUrl)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }

    pub fn session(&self) -> SessionConfig {
        SessionConfig {
            autosave_debounce: Duration::from_millis(self.autosave_debounce_ms),
            redirect_delay: Duration::from_millis(self.redirect_delay_ms),
            low_time_secs: self.low_time_secs,
        }
    }

    pub fn default_path() -> PathBuf {
        ProjectDirs::from("", "", "termexam")
            .map(|dirs| dirs.config_dir().join("config.yaml"))
            .unwrap_or_else(|| PathBuf::from("termexam.yaml"))
    }
}
