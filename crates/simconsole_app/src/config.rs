use std::fs;
use std::path::Path;
use std::time::Duration;

use console_logging::{console_info, console_warn};
use serde::{Deserialize, Serialize};
use simconsole_engine::{ClientSettings, DeleteRoute};

pub const DEFAULT_CONFIG_FILE: &str = "./simconsole.ron";

/// On-disk settings. Every field is optional in the file; a `0` delay
/// disables that behavior.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigFile {
    pub base_url: String,
    pub connect_timeout_secs: u64,
    pub request_timeout_secs: u64,
    pub log_interval: u32,
    pub delete_route: String,
    pub stream_retry_secs: u64,
    pub state_poll_secs: u64,
}

impl Default for ConfigFile {
    fn default() -> Self {
        let settings = ClientSettings::default();
        Self {
            base_url: settings.base_url,
            connect_timeout_secs: settings.connect_timeout.as_secs(),
            request_timeout_secs: settings.request_timeout.as_secs(),
            log_interval: settings.log_interval,
            delete_route: settings.delete_route.to_string(),
            stream_retry_secs: settings.stream_retry.map_or(0, |d| d.as_secs()),
            state_poll_secs: settings.state_poll_interval.map_or(0, |d| d.as_secs()),
        }
    }
}

impl ConfigFile {
    pub fn into_settings(self) -> ClientSettings {
        let delete_route = self.delete_route.parse().unwrap_or_else(|err| {
            console_warn!("{}; using {}", err, DeleteRoute::default());
            DeleteRoute::default()
        });
        ClientSettings {
            base_url: self.base_url,
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
            request_timeout: Duration::from_secs(self.request_timeout_secs),
            log_interval: self.log_interval,
            delete_route,
            stream_retry: non_zero_secs(self.stream_retry_secs),
            state_poll_interval: non_zero_secs(self.state_poll_secs),
        }
    }
}

fn non_zero_secs(secs: u64) -> Option<Duration> {
    (secs > 0).then(|| Duration::from_secs(secs))
}

/// Reads the settings file. A missing file gives the defaults; an
/// unreadable or malformed one is reported and also gives the defaults.
pub fn load(path: &Path) -> ConfigFile {
    let content = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            return ConfigFile::default();
        }
        Err(err) => {
            console_warn!("Failed to read settings from {:?}: {}", path, err);
            return ConfigFile::default();
        }
    };

    match ron::from_str(&content) {
        Ok(config) => {
            console_info!("Loaded settings from {:?}", path);
            config
        }
        Err(err) => {
            console_warn!("Failed to parse settings from {:?}: {}", path, err);
            ConfigFile::default()
        }
    }
}
