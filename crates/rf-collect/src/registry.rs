// Copyright 2025-Present rf-collect contributors
// SPDX-License-Identifier: Apache-2.0

//! Known-device registry.
//!
//! The registry is loaded once at startup from a mapping keyed by the integer id the
//! sensor hardware broadcasts. Each device names the payload fields it reports and the
//! attributes to attach when forwarding them:
//!
//! ```toml
//! [8416]
//! name = "rdu_lne"
//! friendly_name_prefix = "Living Room"
//!
//! [[8416.sensors]]
//! data_name = "temperature_C"
//! attributes = { device_class = "temperature", unit_of_measurement = "°C" }
//! ```
//!
//! A device may instead carry a single `data_name` and no `sensors` list, which is
//! read as one sensor with default attributes.

use crate::constants::UNKNOWN_DEVICE_CLASS;
use crate::errors::RegistryError;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::path::Path;
use tracing::debug;

/// Maps one payload field to a forwarded measurement.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SensorSpec {
    pub data_name: String,
    #[serde(default)]
    pub attributes: Map<String, Value>,
}

impl SensorSpec {
    pub fn new(data_name: impl Into<String>) -> Self {
        Self {
            data_name: data_name.into(),
            attributes: Map::new(),
        }
    }

    pub fn with_attribute(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.attributes.insert(key.to_string(), value.into());
        self
    }

    pub fn device_class(&self) -> &str {
        self.attributes
            .get("device_class")
            .and_then(Value::as_str)
            .unwrap_or(UNKNOWN_DEVICE_CLASS)
    }
}

/// A typed measurement ready for the state sink.
#[derive(Debug, Clone, PartialEq)]
pub struct SensorReading {
    pub entity_id: String,
    pub state: Value,
    pub attributes: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DeviceRecord {
    pub id: u64,
    pub name: String,
    pub friendly_name_prefix: Option<String>,
    pub sensors: Vec<SensorSpec>,
    last_forward: Option<i64>,
}

impl DeviceRecord {
    pub fn new(id: u64, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            friendly_name_prefix: None,
            sensors: Vec::new(),
            last_forward: None,
        }
    }

    #[must_use]
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.friendly_name_prefix = Some(prefix.into());
        self
    }

    #[must_use]
    pub fn with_sensor(mut self, sensor: SensorSpec) -> Self {
        self.sensors.push(sensor);
        self
    }

    /// Whether a datagram received at `now` may be forwarded.
    ///
    /// A device that has never been forwarded is always due.
    pub fn forward_due(&self, now: i64, interval_secs: i64) -> bool {
        match self.last_forward {
            None => true,
            Some(last) => now - last > interval_secs,
        }
    }

    pub fn record_forward(&mut self, now: i64) {
        self.last_forward = Some(self.last_forward.map_or(now, |last| last.max(now)));
    }

    pub fn last_forward(&self) -> Option<i64> {
        self.last_forward
    }

    /// Builds the reading for `sensor` from `payload`, or `None` when the payload does
    /// not carry the sensor's field.
    pub fn reading(&self, sensor: &SensorSpec, payload: &Map<String, Value>) -> Option<SensorReading> {
        let state = payload.get(&sensor.data_name)?.clone();
        let device_class = sensor.device_class();

        let mut attributes = sensor.attributes.clone();
        if !attributes.contains_key("friendly_name") {
            let prefix = self.friendly_name_prefix.as_deref().unwrap_or(&self.name);
            attributes.insert(
                "friendly_name".to_string(),
                Value::String(format!("{} {}", prefix, title_case(device_class))),
            );
        }

        Some(SensorReading {
            entity_id: format!("sensor.rf_{}_{}", self.name, device_class),
            state,
            attributes,
        })
    }
}

/// Uppercases the first letter of every alphabetic run and lowercases the rest.
fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut prev_alpha = false;
    for c in s.chars() {
        if c.is_alphabetic() {
            if prev_alpha {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            prev_alpha = true;
        } else {
            out.push(c);
            prev_alpha = false;
        }
    }
    out
}

#[derive(Debug, Deserialize)]
struct DeviceConfig {
    name: String,
    #[serde(default)]
    friendly_name_prefix: Option<String>,
    #[serde(default)]
    sensors: Vec<SensorSpec>,
    #[serde(default)]
    data_name: Option<String>,
}

/// In-memory id → device mapping.
#[derive(Debug, Clone, Default)]
pub struct DeviceRegistry {
    devices: HashMap<u64, DeviceRecord>,
    started_at: i64,
}

impl DeviceRegistry {
    pub fn new(devices: impl IntoIterator<Item = DeviceRecord>) -> Self {
        Self {
            devices: devices.into_iter().map(|d| (d.id, d)).collect(),
            started_at: 0,
        }
    }

    /// Loads a registry file, choosing the format from its extension.
    pub fn from_path(path: &Path) -> Result<Self, RegistryError> {
        let contents = std::fs::read_to_string(path).map_err(|source| RegistryError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let registry = match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => Self::from_toml_str(&contents)?,
            Some("json") => Self::from_json_str(&contents)?,
            other => {
                return Err(RegistryError::UnsupportedFormat(
                    other.unwrap_or_default().to_string(),
                ))
            }
        };
        debug!(
            "Loaded {} devices from {}",
            registry.len(),
            path.display()
        );
        Ok(registry)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self, RegistryError> {
        let raw: HashMap<String, DeviceConfig> = toml::from_str(contents)?;
        Self::from_raw(raw)
    }

    pub fn from_json_str(contents: &str) -> Result<Self, RegistryError> {
        let raw: HashMap<String, DeviceConfig> = serde_json::from_str(contents)?;
        Self::from_raw(raw)
    }

    fn from_raw(raw: HashMap<String, DeviceConfig>) -> Result<Self, RegistryError> {
        let mut devices = Vec::with_capacity(raw.len());
        for (key, config) in raw {
            let id = key
                .trim()
                .parse::<u64>()
                .map_err(|_| RegistryError::InvalidId(key.clone()))?;
            let mut sensors = config.sensors;
            if sensors.is_empty() {
                if let Some(data_name) = config.data_name {
                    sensors.push(SensorSpec::new(data_name));
                }
            }
            devices.push(DeviceRecord {
                id,
                name: config.name,
                friendly_name_prefix: config.friendly_name_prefix,
                sensors,
                last_forward: None,
            });
        }
        Ok(Self::new(devices))
    }

    /// Records the process start time reported for devices that were never forwarded.
    pub(crate) fn start(&mut self, epoch_seconds: i64) {
        self.started_at = epoch_seconds;
    }

    pub fn get(&self, id: u64) -> Option<&DeviceRecord> {
        self.devices.get(&id)
    }

    pub fn get_mut(&mut self, id: u64) -> Option<&mut DeviceRecord> {
        self.devices.get_mut(&id)
    }

    pub fn contains(&self, id: u64) -> bool {
        self.devices.contains_key(&id)
    }

    /// Epoch seconds of the device's last forward, or the process start time if it
    /// has never been forwarded.
    pub fn last_forward_epoch_seconds(&self, id: u64) -> Option<i64> {
        self.devices
            .get(&id)
            .map(|device| device.last_forward.unwrap_or(self.started_at))
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }
}
