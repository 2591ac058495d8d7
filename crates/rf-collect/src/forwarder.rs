// Copyright 2025-Present rf-collect contributors
// SPDX-License-Identifier: Apache-2.0

use crate::errors::ForwardError;
use crate::registry::SensorReading;
use async_trait::async_trait;
use serde::Serialize;
use serde_json::{Map, Value};
use std::time::Duration;
use tracing::debug;

/// Sink for forwarded sensor readings.
#[async_trait]
pub trait Forwarder: Send + Sync {
    async fn set_state(&self, reading: &SensorReading) -> Result<(), ForwardError>;
}

#[derive(Serialize)]
struct StateBody<'a> {
    state: &'a Value,
    attributes: &'a Map<String, Value>,
}

pub struct HassConfig {
    /// Base URL of the Home Assistant instance (e.g., "http://homeassistant.local:8123")
    pub url: String,
    /// Long-lived access token
    pub token: String,
    pub timeout: Duration,
}

/// Pushes readings to the Home Assistant REST API (`POST /api/states/<entity_id>`).
#[derive(Clone)]
pub struct HassForwarder {
    client: reqwest::Client,
    base_url: String,
    token: String,
}

impl HassForwarder {
    pub fn new(config: HassConfig) -> Result<Self, ForwardError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ForwardError::Client(e.to_string()))?;
        Ok(Self {
            client,
            base_url: config.url.trim_end_matches('/').to_string(),
            token: config.token,
        })
    }

    fn state_url(&self, entity_id: &str) -> String {
        format!("{}/api/states/{}", self.base_url, entity_id)
    }
}

#[async_trait]
impl Forwarder for HassForwarder {
    async fn set_state(&self, reading: &SensorReading) -> Result<(), ForwardError> {
        let body = StateBody {
            state: &reading.state,
            attributes: &reading.attributes,
        };
        let resp = self
            .client
            .post(self.state_url(&reading.entity_id))
            .bearer_auth(&self.token)
            .json(&body)
            .send()
            .await
            .map_err(|source| ForwardError::Request {
                entity_id: reading.entity_id.clone(),
                source,
            })?;

        let status = resp.status();
        if status.is_success() {
            debug!("{}: set {} to {}", status, reading.entity_id, reading.state);
            return Ok(());
        }
        Err(ForwardError::Rejected {
            entity_id: reading.entity_id.clone(),
            status,
            body: resp.text().await.unwrap_or_default(),
        })
    }
}

impl std::fmt::Debug for HassForwarder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HassForwarder")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}
