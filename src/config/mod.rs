//! Configuration module
//!
//! `config.json` in the working directory, overridable through `TLINK__*`
//! environment variables (e.g. `TLINK__SYNC__INTERVAL_MS=5000`).

use anyhow::Context;
use serde::Deserialize;

use crate::tlink::TlinkAccount;

pub const CONFIG_FILE: &str = "config.json";
const ENV_PREFIX: &str = "TLINK";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default, rename = "clientId", alias = "clientid", alias = "client_id")]
    pub client_id: String,
    #[serde(default)]
    pub secret: String,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub sync: SyncConfig,
    #[serde(default)]
    pub address_space: AddressSpaceConfig,
    #[serde(default)]
    pub inspect: InspectConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SyncConfig {
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
            initial_delay_ms: default_initial_delay_ms(),
            interval_ms: default_interval_ms(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AddressSpaceConfig {
    #[serde(default = "default_folder_name")]
    pub folder_name: String,
    /// Devices reporting this name get their id appended
    #[serde(default = "default_generic_device_name")]
    pub generic_device_name: String,
}

impl Default for AddressSpaceConfig {
    fn default() -> Self {
        Self {
            folder_name: default_folder_name(),
            generic_device_name: default_generic_device_name(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct InspectConfig {
    #[serde(default = "default_inspect_enabled")]
    pub enabled: bool,
    #[serde(default = "default_inspect_bind")]
    pub bind: String,
}

impl Default for InspectConfig {
    fn default() -> Self {
        Self {
            enabled: default_inspect_enabled(),
            bind: default_inspect_bind(),
        }
    }
}

fn default_base_url() -> String {
    "https://app.dtuip.com".to_string()
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_page_size() -> u32 {
    100
}

fn default_initial_delay_ms() -> u64 {
    1000
}

fn default_interval_ms() -> u64 {
    10_000
}

fn default_folder_name() -> String {
    "拓普瑞".to_string()
}

fn default_generic_device_name() -> String {
    "4G压力表".to_string()
}

fn default_inspect_enabled() -> bool {
    true
}

fn default_inspect_bind() -> String {
    "127.0.0.1:8081".to_string()
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        Self::load_from(CONFIG_FILE)
    }

    pub fn load_from(path: &str) -> anyhow::Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::new(path, config::FileFormat::Json).required(true))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .with_context(|| format!("failed to read {}", path))?;

        Self::from_settings(settings)
    }

    fn from_settings(settings: config::Config) -> anyhow::Result<Self> {
        let config: Config = settings
            .try_deserialize()
            .context("invalid configuration")?;
        config.validate()?;
        Ok(config)
    }

    /// Credentials must all be present and non-empty
    pub fn validate(&self) -> anyhow::Result<()> {
        let required = [
            ("username", &self.username),
            ("password", &self.password),
            ("clientId", &self.client_id),
            ("secret", &self.secret),
        ];
        for (key, value) in required {
            if value.trim().is_empty() {
                anyhow::bail!("configuration key `{}` is missing or empty", key);
            }
        }

        if self.sync.page_size == 0 {
            anyhow::bail!("sync.page_size must be greater than 0");
        }
        if self.sync.interval_ms == 0 {
            anyhow::bail!("sync.interval_ms must be greater than 0");
        }
        Ok(())
    }

    pub fn account(&self) -> TlinkAccount {
        TlinkAccount {
            username: self.username.clone(),
            password: self.password.clone(),
            client_id: self.client_id.clone(),
            secret: self.secret.clone(),
        }
    }
}
