// Copyright 2025-Present rf-collect contributors
// SPDX-License-Identifier: Apache-2.0

use std::path::PathBuf;

/// Payload text that could not be decoded into a JSON object.
#[derive(Debug, thiserror::Error)]
pub enum DecodeFailure {
    #[error("malformed JSON payload: {0}")]
    MalformedJson(#[from] serde_json::Error),

    #[error("payload is valid JSON but not an object")]
    NotAnObject,
}

/// Errors raised while loading the device registry.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("failed to read registry file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse TOML registry: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("failed to parse JSON registry: {0}")]
    Json(#[from] serde_json::Error),

    #[error("device id '{0}' is not an integer")]
    InvalidId(String),

    #[error("unsupported registry format '{0}', expected .toml or .json")]
    UnsupportedFormat(String),
}

/// Invalid collector configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Missing required environment variable {0}")]
    Missing(&'static str),
}

/// Failure to push a reading to the state sink.
#[derive(Debug, thiserror::Error)]
pub enum ForwardError {
    #[error("failed to build HTTP client: {0}")]
    Client(String),

    #[error("request to {entity_id} failed: {source}")]
    Request {
        entity_id: String,
        source: reqwest::Error,
    },

    #[error("{status}: state sink rejected {entity_id}: {body}")]
    Rejected {
        entity_id: String,
        status: reqwest::StatusCode,
        body: String,
    },
}

/// Failure to write buffered unknown devices to disk.
#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    #[error("failed to open {path}: {source}")]
    Open {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to write {path}: {source}")]
    Write { path: PathBuf, source: csv::Error },

    #[error("failed to flush {path}: {source}")]
    Flush {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Errors that end the ingestion loop.
#[derive(Debug, thiserror::Error)]
pub enum CollectorError {
    #[error("failed to bind UDP socket on {addr}: {source}")]
    Bind {
        addr: String,
        source: std::io::Error,
    },

    #[error("failed to receive datagram: {0}")]
    Receive(#[source] std::io::Error),

    #[error("forward failure: {0}")]
    Forward(#[from] ForwardError),

    #[error("persistence failure: {0}")]
    Persistence(#[from] PersistenceError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let error = ConfigError::Invalid("port must be greater than 0".to_string());
        assert_eq!(
            error.to_string(),
            "Invalid configuration: port must be greater than 0"
        );

        let error = ConfigError::Missing("HASS_URL");
        assert_eq!(
            error.to_string(),
            "Missing required environment variable HASS_URL"
        );
    }

    #[test]
    fn test_collector_error_wraps_fatal_kinds() {
        let error = CollectorError::from(PersistenceError::Open {
            path: PathBuf::from("/nope/unknown_devs_2024-01-01.csv"),
            source: std::io::Error::from(std::io::ErrorKind::PermissionDenied),
        });
        assert!(matches!(error, CollectorError::Persistence(_)));
        assert!(error
            .to_string()
            .starts_with("persistence failure: failed to open /nope/unknown_devs_2024-01-01.csv"));
    }

    #[test]
    fn test_decode_failure_debug() {
        let error = DecodeFailure::NotAnObject;
        let debug_str = format!("{:?}", error);
        assert!(debug_str.contains("NotAnObject"));
    }
}
