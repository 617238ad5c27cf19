//! Configuration file handling for forgekit.
//!
//! Configuration is a single TOML file in the platform config directory,
//! organized into logical sections:
//! - Connection settings (printer address, identity, check code)
//! - Feature toggles (force-legacy API, manual LED control)
//! - Telemetry settings (poll cadence)

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{ConfigError, SettingsError, SettingsResult};

/// Connection settings for the supervised printer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionSettings {
    /// Printer IP address or hostname.
    pub ip: String,
    /// Printer serial number, as reported by discovery.
    pub serial_number: String,
    /// Display name.
    pub name: String,
    /// Reported model string (e.g. "Adventurer 5M Pro").
    pub model: String,
    /// Check code for the modern protocol handshake. Empty for
    /// legacy-only printers.
    pub check_code: String,
    /// Request timeout in milliseconds.
    pub timeout_ms: u64,
}

impl Default for ConnectionSettings {
    fn default() -> Self {
        Self {
            ip: String::new(),
            serial_number: String::new(),
            name: "FlashForge".to_string(),
            model: String::new(),
            check_code: String::new(),
            timeout_ms: 5000,
        }
    }
}

/// Feature toggles consulted by the printer layer.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct FeatureSettings {
    /// Treat the printer as legacy regardless of its detected model.
    pub force_legacy_api: bool,
    /// Route LED commands through the raw TCP bypass instead of the
    /// modern control channel (manual/custom LED control).
    pub custom_leds: bool,
}

/// Telemetry polling preferences. The core imposes no cadence; the
/// application shell drives polling from these values.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetrySettings {
    /// Poll interval in milliseconds.
    pub poll_interval_ms: u64,
}

impl Default for TelemetrySettings {
    fn default() -> Self {
        Self {
            poll_interval_ms: 2000,
        }
    }
}

/// Root configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    /// Printer connection settings.
    pub connection: ConnectionSettings,
    /// Feature toggles.
    pub features: FeatureSettings,
    /// Telemetry polling preferences.
    pub telemetry: TelemetrySettings,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load_from_file(path: &Path) -> SettingsResult<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| SettingsError::LoadError(format!("{}: {}", path.display(), e)))?;
        let config: Config = toml::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a TOML file, creating parent directories.
    pub fn save_to_file(&self, path: &Path) -> SettingsResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let raw = toml::to_string_pretty(self)?;
        std::fs::write(path, raw)
            .map_err(|e| SettingsError::SaveError(format!("{}: {}", path.display(), e)))?;
        Ok(())
    }

    /// Load from the default path, falling back to defaults when the
    /// file does not exist yet.
    pub fn load_or_default() -> SettingsResult<Self> {
        let path = Self::default_path()?;
        if path.exists() {
            Self::load_from_file(&path)
        } else {
            tracing::info!("No config file at {}, using defaults", path.display());
            Ok(Self::default())
        }
    }

    /// Platform-specific default config file location.
    pub fn default_path() -> SettingsResult<PathBuf> {
        let dir = dirs::config_dir()
            .ok_or_else(|| SettingsError::ConfigDirectory("no config directory".to_string()))?;
        Ok(dir.join("forgekit").join("config.toml"))
    }

    /// Validate the configuration.
    pub fn validate(&self) -> SettingsResult<()> {
        if self.connection.timeout_ms == 0 {
            return Err(ConfigError::ValueOutOfRange {
                key: "connection.timeout_ms".to_string(),
                value: "0".to_string(),
            }
            .into());
        }
        if self.telemetry.poll_interval_ms < 250 {
            return Err(ConfigError::ValueOutOfRange {
                key: "telemetry.poll_interval_ms".to_string(),
                value: self.telemetry.poll_interval_ms.to_string(),
            }
            .into());
        }
        if !self.connection.ip.is_empty() && self.connection.ip.chars().all(char::is_whitespace) {
            return Err(ConfigError::InvalidSetting {
                key: "connection.ip".to_string(),
                reason: "must not be blank".to_string(),
            }
            .into());
        }
        Ok(())
    }
}
