use std::path::{Path, PathBuf};
use std::time::Duration;

use espresso_client::{ClientConfig, DEFAULT_BASE_URL, DEFAULT_REQUEST_TIMEOUT};
use figment::{
    Figment,
    providers::{Env, Format, Json, Serialized},
};
use serde::{Deserialize, Serialize};
use snafu::{ResultExt, Snafu};

use crate::store::StoreSettings;
use crate::typing::DEFAULT_TYPING_TICK;

pub const SETTINGS_DIRECTORY_NAME: &str = "espresso";
pub const SETTINGS_FILE_NAME: &str = "settings.json";
pub const ENV_PREFIX: &str = "ESPRESSO_";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendSettings {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for BackendSettings {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypingSettings {
    #[serde(default = "default_tick_ms")]
    pub tick_ms: u64,
}

impl Default for TypingSettings {
    fn default() -> Self {
        Self {
            tick_ms: default_tick_ms(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub backend: BackendSettings,
    #[serde(default)]
    pub typing: TypingSettings,
}

impl Settings {
    pub fn default_config_dir() -> PathBuf {
        dirs::config_dir()
            .map(|path| path.join(SETTINGS_DIRECTORY_NAME))
            .unwrap_or_else(|| PathBuf::from(".espresso"))
    }

    pub fn default_config_path() -> PathBuf {
        Self::default_config_dir().join(SETTINGS_FILE_NAME)
    }

    pub fn load() -> Result<Self, SettingsError> {
        Self::load_from(Self::default_config_path())
    }

    /// Layers defaults, the JSON file at `path` (if present) and `ESPRESSO_*`
    /// environment variables, later sources winning.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        if !path.exists() {
            tracing::info!("settings file not found at {:?}, using defaults", path);
        }

        let settings = Figment::from(Serialized::defaults(Settings::default()))
            .merge(Json::file(path))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract::<Settings>()
            .context(ExtractSnafu {
                stage: "extract-settings",
                path: path.to_path_buf(),
            })?;

        Ok(settings.normalized())
    }

    pub fn normalized(mut self) -> Self {
        let base_url = self.backend.base_url.trim();
        self.backend.base_url = if base_url.is_empty() {
            default_base_url()
        } else {
            base_url.to_string()
        };
        if self.backend.request_timeout_secs == 0 {
            self.backend.request_timeout_secs = default_request_timeout_secs();
        }
        if self.typing.tick_ms == 0 {
            self.typing.tick_ms = default_tick_ms();
        }

        self
    }

    pub fn client_config(&self) -> ClientConfig {
        ClientConfig::new(
            self.backend.base_url.clone(),
            Duration::from_secs(self.backend.request_timeout_secs),
        )
    }

    pub fn store_settings(&self) -> StoreSettings {
        StoreSettings {
            typing_tick: Duration::from_millis(self.typing.tick_ms),
        }
    }
}

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum SettingsError {
    #[snafu(display("failed to read settings from {path:?} on `{stage}`: {source}"))]
    Extract {
        stage: &'static str,
        path: PathBuf,
        source: figment::Error,
    },
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_request_timeout_secs() -> u64 {
    DEFAULT_REQUEST_TIMEOUT.as_secs()
}

fn default_tick_ms() -> u64 {
    DEFAULT_TYPING_TICK.as_millis() as u64
}
