//! # Configuration Management Module
//!
//! This module handles all configuration aspects of the gateway, providing a
//! centralized configuration system with validation, defaults, and persistence.
//!
//! ## Configuration Structure
//!
//! The configuration is organized into logical sections:
//!
//! - [`SystemConfig`] - Active cloud profile and base feature flags
//! - [`UartConfig`] - Serial link settings (port, baud, read bounds)
//! - [`WatchdogConfig`] - Supervision interval
//! - [`CloudProfile`] - Per-profile topic routes (publish/subscribe tables)
//! - [`LoggingConfig`] - Log level and optional log file
//!
//! ## Configuration File Format
//!
//! ```toml
//! [system]
//! cloud = "mqtt"
//!
//! [system.base_function]
//! fota = true
//! ota_auto_confirm = true
//!
//! [uart]
//! port = "/dev/ttyUSB0"
//! baud_rate = 115200
//!
//! [cloud_profiles.mqtt.publish]
//! "0" = "dtu/uplink"
//!
//! [cloud_profiles.mqtt.subscribe]
//! "0" = "dtu/downlink"
//! ```
//!
//! All runtime access goes through [`Settings`], which serializes reads,
//! writes, and saves behind a single process-wide lock.

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;
use tokio::fs;

use crate::error::CoreError;

/// Project identity reported to the cloud alongside firmware versions.
pub const PROJECT_NAME: &str = env!("CARGO_PKG_NAME");
pub const PROJECT_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Base feature toggles nested under the system section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BaseFunction {
    /// Firmware OTA enabled: startup update check runs only when true.
    #[serde(default = "default_true")]
    pub fota: bool,
    /// When true every OTA plan from the cloud is confirmed; when false every
    /// plan is declined and logged. See `relay::ota`.
    #[serde(default = "default_true")]
    pub ota_auto_confirm: bool,
}

fn default_true() -> bool {
    true
}

impl Default for BaseFunction {
    fn default() -> Self {
        Self {
            fota: true,
            ota_auto_confirm: true,
        }
    }
}

/// Core system settings: which cloud profile is active and which base
/// features are enabled.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemConfig {
    /// Name of the active cloud profile; must match a `[cloud_profiles.*]` key.
    pub cloud: String,
    #[serde(default)]
    pub base_function: BaseFunction,
}

/// Serial link settings for the attached instrument.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UartConfig {
    pub port: String,
    #[serde(default = "default_baud")]
    pub baud_rate: u32,
    /// Upper bound for a single read, bytes.
    #[serde(default = "default_read_max")]
    pub read_max_bytes: usize,
    /// Read timeout, milliseconds. A timed-out read is not an error.
    #[serde(default = "default_read_timeout")]
    pub read_timeout_ms: u64,
}

fn default_baud() -> u32 {
    115200
}
fn default_read_max() -> usize {
    1024
}
fn default_read_timeout() -> u64 {
    100
}

/// Supervision settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchdogConfig {
    /// Scan interval in seconds. A task whose heartbeat is older than this is
    /// considered stale and restarted.
    #[serde(default = "default_watchdog_interval")]
    pub interval_secs: u64,
}

fn default_watchdog_interval() -> u64 {
    20
}

impl Default for WatchdogConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_watchdog_interval(),
        }
    }
}

/// Topic routes for one cloud profile. Keys are the short topic ids used on
/// the wire, values the human-meaningful topic names configured at the broker.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CloudProfile {
    #[serde(default)]
    pub publish: HashMap<String, String>,
    #[serde(default)]
    pub subscribe: HashMap<String, String>,
}

/// Logging and debugging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

/// Main configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub system: SystemConfig,
    pub uart: UartConfig,
    #[serde(default)]
    pub watchdog: WatchdogConfig,
    #[serde(default)]
    pub cloud_profiles: HashMap<String, CloudProfile>,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file and validate it.
    pub async fn load(path: &str) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .await
            .map_err(|e| anyhow!("cannot read config file {}: {}", path, e))?;
        let config: Config =
            toml::from_str(&raw).map_err(|e| anyhow!("invalid config file {}: {}", path, e))?;
        config.validate()?;
        Ok(config)
    }

    /// Write a starter configuration file. Refuses to overwrite.
    pub async fn create_default(path: &str) -> Result<()> {
        if fs::try_exists(path).await.unwrap_or(false) {
            return Err(anyhow!("config file {} already exists", path));
        }
        let rendered = toml::to_string_pretty(&Config::default())?;
        fs::write(path, rendered).await?;
        Ok(())
    }

    /// Validate cross-field constraints that serde cannot express.
    pub fn validate(&self) -> Result<()> {
        if self.uart.port.is_empty() {
            return Err(anyhow!("uart.port must not be empty"));
        }
        if self.uart.read_max_bytes == 0 {
            return Err(anyhow!("uart.read_max_bytes must be positive"));
        }
        if self.watchdog.interval_secs == 0 {
            return Err(anyhow!("watchdog.interval_secs must be positive"));
        }
        if !self.cloud_profiles.contains_key(&self.system.cloud) {
            return Err(anyhow!(
                "active cloud profile '{}' has no [cloud_profiles.{}] section",
                self.system.cloud,
                self.system.cloud
            ));
        }
        Ok(())
    }

    /// Topic routes for the active cloud profile.
    pub fn active_profile(&self) -> Result<&CloudProfile, CoreError> {
        self.cloud_profiles
            .get(&self.system.cloud)
            .ok_or_else(|| CoreError::Config(format!("cloud profile '{}' not configured", self.system.cloud)))
    }

    /// Resolve a broker-side subscribe topic name back to its short id.
    pub fn subscribe_topic_id(&self, topic: &str) -> Result<Option<String>, CoreError> {
        let profile = self.active_profile()?;
        Ok(profile
            .subscribe
            .iter()
            .find(|(_, name)| name.as_str() == topic)
            .map(|(id, _)| id.clone()))
    }
}

impl Default for Config {
    fn default() -> Self {
        let mut profiles = HashMap::new();
        let mut publish = HashMap::new();
        publish.insert("0".to_string(), "dtu/uplink".to_string());
        let mut subscribe = HashMap::new();
        subscribe.insert("0".to_string(), "dtu/downlink".to_string());
        profiles.insert("mqtt".to_string(), CloudProfile { publish, subscribe });
        Self {
            system: SystemConfig {
                cloud: "mqtt".to_string(),
                base_function: BaseFunction::default(),
            },
            uart: UartConfig {
                port: "/dev/ttyUSB0".to_string(),
                baud_rate: default_baud(),
                read_max_bytes: default_read_max(),
                read_timeout_ms: default_read_timeout(),
            },
            watchdog: WatchdogConfig::default(),
            cloud_profiles: profiles,
            logging: LoggingConfig::default(),
        }
    }
}

/// Process-scoped settings store.
///
/// Every read, mutation, and save goes through one mutex, matching the rule
/// that the configuration is a single shared structure. Components receive an
/// `Arc<Settings>` at wiring time instead of reaching for a global.
pub struct Settings {
    inner: Mutex<Config>,
    path: Option<PathBuf>,
}

impl Settings {
    pub fn new(config: Config) -> Self {
        Self {
            inner: Mutex::new(config),
            path: None,
        }
    }

    /// A settings store that can persist itself back to `path`.
    pub fn with_path(config: Config, path: impl Into<PathBuf>) -> Self {
        Self {
            inner: Mutex::new(config),
            path: Some(path.into()),
        }
    }

    /// Snapshot of the current configuration.
    pub fn get(&self) -> Config {
        self.inner.lock().expect("settings lock poisoned").clone()
    }

    /// Mutate one named option. Only a fixed set of options is writable and
    /// each enforces its value shape; everything else is rejected.
    pub fn set(&self, option: &str, value: serde_json::Value) -> bool {
        let mut cfg = self.inner.lock().expect("settings lock poisoned");
        match option {
            "fota" => match value.as_bool() {
                Some(v) => {
                    cfg.system.base_function.fota = v;
                    true
                }
                None => false,
            },
            "ota_auto_confirm" => match value.as_bool() {
                Some(v) => {
                    cfg.system.base_function.ota_auto_confirm = v;
                    true
                }
                None => false,
            },
            "cloud" => match value.as_str() {
                Some(v) => {
                    cfg.system.cloud = v.to_string();
                    true
                }
                None => false,
            },
            "uart" => match serde_json::from_value::<UartConfig>(value) {
                Ok(v) => {
                    cfg.uart = v;
                    true
                }
                Err(_) => false,
            },
            _ => false,
        }
    }

    /// Persist the current configuration to the backing file, if any.
    pub fn save(&self) -> Result<()> {
        let path = self
            .path
            .as_ref()
            .ok_or_else(|| anyhow!("settings store has no backing file"))?;
        let cfg = self.inner.lock().expect("settings lock poisoned");
        let rendered = toml::to_string_pretty(&*cfg)?;
        std::fs::write(path, rendered)?;
        Ok(())
    }
}
