use serde::de::{Deserialize, DeserializeOwned, Deserializer, IgnoredAny};
use serde_json::{Map, Value};

use crate::ApiError;

/// Keys that mark a body as wrapped rather than a bare payload.
const ENVELOPE_MARKERS: [&str; 2] = ["success", "data"];

/// A response body validated at the client boundary.
///
/// The backend answers either with a bare payload (`[...]`, `{"accessToken": ...}`)
/// or with a wrapper (`{"success": true, "data": ..., "isNewUser": false}`).
/// Both shapes end up here so callers never branch on the wire format.
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope<T> {
    pub data: T,
    pub message: Option<String>,
    pub is_new_user: bool,
}

impl<T: DeserializeOwned> Envelope<T> {
    pub fn parse(body: &str) -> Result<Self, ApiError> {
        let value = if body.trim().is_empty() {
            Value::Null
        } else {
            serde_json::from_str(body)?
        };
        Self::from_value(value)
    }

    pub fn from_value(value: Value) -> Result<Self, ApiError> {
        match value {
            Value::Object(map) if ENVELOPE_MARKERS.iter().any(|key| map.contains_key(*key)) => {
                Self::unwrap(map)
            }
            value => Ok(Self {
                data: serde_json::from_value(value)?,
                message: None,
                is_new_user: false,
            }),
        }
    }

    fn unwrap(mut map: Map<String, Value>) -> Result<Self, ApiError> {
        let success = map.remove("success").and_then(|value| value.as_bool());
        let message = take_string(&mut map, "message").or_else(|| take_string(&mut map, "error"));

        if success == Some(false) {
            return Err(ApiError::Rejected {
                message: message.unwrap_or_else(|| "request was not successful".to_string()),
            });
        }

        let is_new_user = map
            .remove("isNewUser")
            .and_then(|value| value.as_bool())
            .unwrap_or(false);

        // Some handlers put the payload next to `success` instead of under `data`
        let data = match map.remove("data") {
            Some(data) => data,
            None if map.is_empty() => Value::Null,
            None => Value::Object(map),
        };

        Ok(Self {
            data: serde_json::from_value(data)?,
            message,
            is_new_user,
        })
    }
}

fn take_string(map: &mut Map<String, Value>, key: &str) -> Option<String> {
    match map.remove(key) {
        Some(Value::String(text)) => Some(text),
        _ => None,
    }
}

/// Payload of endpoints whose response carries nothing of interest.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Empty;

impl<'de> Deserialize<'de> for Empty {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        IgnoredAny::deserialize(deserializer).map(|_| Empty)
    }
}
