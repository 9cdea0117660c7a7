//! Decoding of the service's `stat`-tagged response envelope.

use crate::error::{GalleryError, Result};
use serde::Deserialize;
use serde_json::Value;
use stockroom_core::RemoteId;

/// How much of an unexpected body is kept in error messages.
const BODY_PREVIEW_CHARS: usize = 300;

#[derive(Debug, Deserialize)]
struct Envelope {
    stat: String,
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    err: Option<Value>,
    #[serde(default)]
    message: Option<String>,
}

/// Truncate a body for inclusion in an error.
pub(crate) fn preview(body: &str) -> String {
    body.chars().take(BODY_PREVIEW_CHARS).collect()
}

/// Turn an HTTP status and body into the call's `result` payload.
pub(crate) fn decode(method: &str, status: u16, body: &str) -> Result<Value> {
    if !(200..300).contains(&status) {
        return Err(GalleryError::Http {
            status,
            body: preview(body),
        });
    }

    let envelope: Envelope = serde_json::from_str(body).map_err(|_| {
        GalleryError::InvalidResponse(format!("non-JSON response: {}", preview(body)))
    })?;

    match envelope.stat.as_str() {
        "ok" => Ok(envelope.result.unwrap_or(Value::Null)),
        "fail" => Err(GalleryError::Protocol {
            method: method.to_string(),
            code: envelope.err.map(|code| scalar_to_string(&code)).unwrap_or_default(),
            message: envelope.message.unwrap_or_default(),
        }),
        other => Err(GalleryError::InvalidResponse(format!(
            "unknown stat '{other}' from {method}"
        ))),
    }
}

/// Render a JSON string or number without quotes.
pub(crate) fn scalar_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Read an identifier the service may send as a number or a string.
pub(crate) fn remote_id(value: Option<&Value>, field: &str) -> Result<RemoteId> {
    match value {
        Some(v @ (Value::Number(_) | Value::String(_))) => Ok(RemoteId::new(scalar_to_string(v))),
        _ => Err(GalleryError::InvalidResponse(format!(
            "missing {field} in response"
        ))),
    }
}
