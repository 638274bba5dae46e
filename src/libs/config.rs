use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use crate::libs::constants::*;
use crate::libs::error::{AnyResult, MulticloudError};

/**
 * Settings for the client. Every field has a default so a partial (or
 * missing) config file is fine.
 */
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub api_base_url: String,
    pub auth_token: Option<String>,
    pub request_timeout_secs: u64,
    pub notification_duration_ms: u64,
    pub progress_auto_dismiss_ms: u64,
    pub ticket_linger_ms: u64,
    pub max_upload_bytes: u64,
    pub upload_chunk_bytes: usize,
    pub auto_select_first_account: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            auth_token: None,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            notification_duration_ms: DEFAULT_NOTIFICATION_DURATION_MS,
            progress_auto_dismiss_ms: DEFAULT_PROGRESS_AUTO_DISMISS_MS,
            ticket_linger_ms: DEFAULT_TICKET_LINGER_MS,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            upload_chunk_bytes: DEFAULT_UPLOAD_CHUNK_BYTES,
            auto_select_first_account: true,
        }
    }
}

/**
 * Get the directory the config file lives in
 */
pub fn get_config_dir() -> AnyResult<PathBuf> {
    dirs::config_dir()
        .map(|dir| dir.join(CONFIG_DIR_NAME))
        .ok_or_else(|| MulticloudError::Config("Could not resolve the config directory".into()))
}

impl ClientConfig {
    /// Load from the user's config dir, then apply environment overrides.
    pub fn load() -> AnyResult<Self> {
        let path = get_config_dir()?.join(CONFIG_FILE_NAME);
        let mut config = Self::load_from(&path)?;
        config.apply_env();
        Ok(config)
    }

    pub fn load_from(path: &PathBuf) -> AnyResult<Self> {
        if !path.exists() {
            info!("No config file at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let raw = fs::read_to_string(path)?;
        Ok(toml::from_str(&raw)?)
    }

    pub fn save(&self) -> AnyResult<()> {
        self.save_to(&get_config_dir()?.join(CONFIG_FILE_NAME))
    }

    pub fn save_to(&self, path: &PathBuf) -> AnyResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, toml::to_string_pretty(self)?)?;
        Ok(())
    }

    fn apply_env(&mut self) {
        if let Ok(url) = std::env::var(ENV_API_URL) {
            if url.trim().is_empty() {
                warn!("{} is set but empty, ignoring it", ENV_API_URL);
            } else {
                self.api_base_url = url;
            }
        }
        if let Ok(token) = std::env::var(ENV_TOKEN) {
            self.auth_token = Some(token);
        }
    }

    /// OAuth endpoints hang off the backend root, not the `/api` prefix.
    pub fn backend_root(&self) -> String {
        let trimmed = self.api_base_url.trim_end_matches('/');
        trimmed.strip_suffix("/api").unwrap_or(trimmed).to_string()
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn notification_duration(&self) -> Duration {
        Duration::from_millis(self.notification_duration_ms)
    }

    pub fn progress_auto_dismiss(&self) -> Duration {
        Duration::from_millis(self.progress_auto_dismiss_ms)
    }

    pub fn ticket_linger(&self) -> Duration {
        Duration::from_millis(self.ticket_linger_ms)
    }
}
