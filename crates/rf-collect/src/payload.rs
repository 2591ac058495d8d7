// Copyright 2025-Present rf-collect contributors
// SPDX-License-Identifier: Apache-2.0

//! JSON decoding and classification of rtl_433 payloads.
//!
//! Payload shape varies by device model, so decoding stops at a generic
//! string-keyed map. Narrowing into typed readings only happens once the device
//! is found in the registry.

use crate::errors::DecodeFailure;
use crate::registry::DeviceRegistry;
use serde_json::{Map, Value};

pub type Payload = Map<String, Value>;

/// Outcome of classifying a decoded payload against the registry.
#[derive(Debug, Clone, PartialEq)]
pub enum Classified {
    /// The payload belongs to a registered device.
    Known {
        id: u64,
        model: Value,
        time: Option<Value>,
        payload: Payload,
    },
    /// The payload has a `model` but its `id` is missing or not registered.
    UnknownDevice {
        id: Option<Value>,
        model: Value,
        payload: Payload,
    },
    /// The payload decoded but carries no `model` key.
    SchemaIncomplete(Payload),
}

/// Decodes `text` into a JSON object.
pub fn parse(text: &str) -> Result<Payload, DecodeFailure> {
    match serde_json::from_str::<Value>(text)? {
        Value::Object(map) => Ok(map),
        _ => Err(DecodeFailure::NotAnObject),
    }
}

/// Decodes and classifies a payload string.
pub fn classify(text: &str, registry: &DeviceRegistry) -> Result<Classified, DecodeFailure> {
    let payload = parse(text)?;

    let Some(model) = payload.get("model").cloned() else {
        return Ok(Classified::SchemaIncomplete(payload));
    };
    let time = payload.get("time").cloned();
    let id = payload.get("id").cloned();

    match id.as_ref().and_then(Value::as_u64) {
        Some(id) if registry.contains(id) => Ok(Classified::Known {
            id,
            model,
            time,
            payload,
        }),
        _ => Ok(Classified::UnknownDevice { id, model, payload }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::DeviceRecord;
    use serde_json::json;

    fn registry() -> DeviceRegistry {
        DeviceRegistry::new([DeviceRecord::new(8416, "rdu_lne")])
    }

    #[test]
    fn test_known_device() {
        let classified = classify(
            r#"{"time":"2024-05-01 10:00:00","model":"X","id":8416,"temperature_C":21.5}"#,
            &registry(),
        )
        .unwrap();
        match classified {
            Classified::Known {
                id,
                model,
                time,
                payload,
            } => {
                assert_eq!(id, 8416);
                assert_eq!(model, json!("X"));
                assert_eq!(time, Some(json!("2024-05-01 10:00:00")));
                assert_eq!(payload.get("temperature_C"), Some(&json!(21.5)));
            }
            other => panic!("expected known device, got {:?}", other),
        }
    }

    #[test]
    fn test_unregistered_id_is_unknown_device() {
        let classified = classify(r#"{"model":"Y","id":99999}"#, &registry()).unwrap();
        match classified {
            Classified::UnknownDevice { id, model, payload } => {
                assert_eq!(id, Some(json!(99999)));
                assert_eq!(model, json!("Y"));
                assert_eq!(Value::Object(payload), json!({"model":"Y","id":99999}));
            }
            other => panic!("expected unknown device, got {:?}", other),
        }
    }

    #[test]
    fn test_non_integer_id_is_unknown_device() {
        let classified = classify(r#"{"model":"Y","id":"8416"}"#, &registry()).unwrap();
        assert!(matches!(classified, Classified::UnknownDevice { .. }));

        let classified = classify(r#"{"model":"Y"}"#, &registry()).unwrap();
        assert!(matches!(classified, Classified::UnknownDevice { id: None, .. }));
    }

    #[test]
    fn test_missing_model_is_schema_incomplete() {
        let classified = classify(r#"{"id":8416,"temperature_C":21.5}"#, &registry()).unwrap();
        match classified {
            Classified::SchemaIncomplete(payload) => {
                assert_eq!(payload.get("temperature_C"), Some(&json!(21.5)));
            }
            other => panic!("expected schema-incomplete payload, got {:?}", other),
        }
    }

    #[test]
    fn test_malformed_json_is_decode_failure() {
        assert!(matches!(
            classify("not valid json", &registry()),
            Err(DecodeFailure::MalformedJson(_))
        ));
        assert!(matches!(
            classify("[1, 2, 3]", &registry()),
            Err(DecodeFailure::NotAnObject)
        ));
    }
}
