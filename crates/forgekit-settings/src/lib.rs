//! # forgekit Settings
//!
//! Configuration management for forgekit.
//! Provides the TOML-backed configuration file, validation, and
//! platform-specific config directory resolution.

pub mod config;
pub mod error;

pub use config::{Config, ConnectionSettings, FeatureSettings, TelemetrySettings};
pub use error::{ConfigError, SettingsError, SettingsResult};
