// Copyright 2025-Present rf-collect contributors
// SPDX-License-Identifier: Apache-2.0

use crate::collector::RfCollectorConfig;
use crate::constants::{DEFAULT_FORWARD_INTERVAL_SECS, DEFAULT_HOST, DEFAULT_PORT};
use crate::errors::ConfigError;
use crate::forwarder::HassConfig;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

const DEFAULT_HASS_TIMEOUT_SECS: u64 = 5;
const DEFAULT_REGISTRY_PATH: &str = "nodes.toml";

/// Configuration for the collector process
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Host to bind the UDP socket to
    pub host: String,
    /// UDP port rtl_433 syslogs to
    pub port: u16,
    /// Device registry file (.toml or .json)
    pub registry_path: PathBuf,
    /// Directory for the daily unknown-device files
    pub data_dir: PathBuf,
    /// Minimum seconds between forwards for one device
    pub forward_interval_secs: i64,
    /// Home Assistant base URL
    pub hass_url: String,
    /// Home Assistant long-lived access token
    pub hass_token: String,
    pub hass_timeout_secs: u64,
    /// Log level (e.g., trace, debug, info, warn, error)
    pub log_level: String,
    /// Optional directory for daily log files, in addition to stdout
    pub log_dir: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            registry_path: PathBuf::from(DEFAULT_REGISTRY_PATH),
            data_dir: default_data_dir(None),
            forward_interval_secs: DEFAULT_FORWARD_INTERVAL_SECS,
            hass_url: String::new(),
            hass_token: String::new(),
            hass_timeout_secs: DEFAULT_HASS_TIMEOUT_SECS,
            log_level: "info".to_string(),
            log_dir: None,
        }
    }
}

fn parse_var<F, T>(lookup: &F, key: &str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        Some(val) => val
            .trim()
            .parse::<T>()
            .map_err(|_| ConfigError::Invalid(format!("{} has invalid value '{}'", key, val))),
        None => Ok(default),
    }
}

fn default_data_dir(home: Option<String>) -> PathBuf {
    match home {
        Some(home) => PathBuf::from(home).join("data").join("rf"),
        None => PathBuf::from("data").join("rf"),
    }
}

impl ServerConfig {
    /// Create configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Create configuration from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let host = lookup("RF_COLLECT_HOST").unwrap_or(defaults.host);
        let port = parse_var(&lookup, "RF_COLLECT_PORT", defaults.port)?;
        let registry_path = lookup("RF_REGISTRY_PATH")
            .map(PathBuf::from)
            .unwrap_or(defaults.registry_path);
        let data_dir = lookup("RF_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| default_data_dir(lookup("HOME")));
        let forward_interval_secs = parse_var(
            &lookup,
            "RF_FORWARD_INTERVAL_SECS",
            defaults.forward_interval_secs,
        )?;
        let hass_url = lookup("HASS_URL").ok_or(ConfigError::Missing("HASS_URL"))?;
        let hass_token = lookup("HASS_TOKEN").ok_or(ConfigError::Missing("HASS_TOKEN"))?;
        let hass_timeout_secs =
            parse_var(&lookup, "HASS_TIMEOUT_SECS", defaults.hass_timeout_secs)?;
        let log_level = lookup("RF_LOG_LEVEL")
            .map(|val| val.to_lowercase())
            .unwrap_or(defaults.log_level);
        let log_dir = lookup("RF_LOG_DIR")
            .filter(|val| !val.trim().is_empty())
            .map(PathBuf::from);

        let config = Self {
            host,
            port,
            registry_path,
            data_dir,
            forward_interval_secs,
            hass_url,
            hass_token,
            hass_timeout_secs,
            log_level,
            log_dir,
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.port == 0 {
            return Err(ConfigError::Invalid(
                "RF_COLLECT_PORT must be greater than 0".to_string(),
            ));
        }

        if self.forward_interval_secs < 0 {
            return Err(ConfigError::Invalid(
                "RF_FORWARD_INTERVAL_SECS cannot be negative".to_string(),
            ));
        }

        if self.hass_url.trim().is_empty() {
            return Err(ConfigError::Invalid("HASS_URL cannot be empty".to_string()));
        }

        if self.hass_token.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "HASS_TOKEN cannot be empty".to_string(),
            ));
        }

        if self.hass_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "HASS_TIMEOUT_SECS must be greater than 0".to_string(),
            ));
        }

        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&self.log_level.as_str()) {
            return Err(ConfigError::Invalid(format!(
                "Invalid log level '{}'. Must be one of: trace, debug, info, warn, error",
                self.log_level
            )));
        }

        Ok(())
    }

    pub fn collector_config(&self) -> RfCollectorConfig {
        RfCollectorConfig {
            host: self.host.clone(),
            port: self.port,
            data_dir: self.data_dir.clone(),
            forward_interval_secs: self.forward_interval_secs,
        }
    }

    pub fn hass_config(&self) -> HassConfig {
        HassConfig {
            url: self.hass_url.clone(),
            token: self.hass_token.clone(),
            timeout: Duration::from_secs(self.hass_timeout_secs),
        }
    }
}
