//! The uniform reply envelope.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Error text used when a failed upstream reply carries no usable message.
pub const UPSTREAM_FALLBACK_ERROR: &str = "API request failed";

/// `{success, data, error, status}` returned for every proxied call.
///
/// Exactly one of `data` / `error` is populated; the constructors are the
/// only way to build one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProxyResponse {
    success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    status: Option<u16>,
}

impl ProxyResponse {
    pub fn success(data: Value, status: u16) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            status: Some(status),
        }
    }

    pub fn failure(error: impl Into<String>, status: Option<u16>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
            status,
        }
    }

    /// Normalize an upstream reply.
    ///
    /// JSON bodies are parsed; anything else is kept as text. Empty successful
    /// bodies become `null`.
    pub fn from_upstream(status: u16, body: &[u8]) -> Self {
        let parsed: Option<Value> = serde_json::from_slice(body).ok();

        if (200..300).contains(&status) {
            let data = match parsed {
                Some(value) => value,
                None if body.iter().all(u8::is_ascii_whitespace) => Value::Null,
                None => Value::String(String::from_utf8_lossy(body).into_owned()),
            };
            return Self::success(data, status);
        }

        let message = match parsed {
            Some(value) => error_message(&value),
            None => {
                let text = String::from_utf8_lossy(body).trim().to_owned();
                (!text.is_empty()).then_some(text)
            }
        };
        Self::failure(
            message.unwrap_or_else(|| UPSTREAM_FALLBACK_ERROR.to_owned()),
            Some(status),
        )
    }

    pub fn is_success(&self) -> bool {
        self.success
    }

    pub fn data(&self) -> Option<&Value> {
        self.data.as_ref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn status(&self) -> Option<u16> {
        self.status
    }

    pub(crate) fn data_mut(&mut self) -> Option<&mut Value> {
        self.data.as_mut()
    }

    pub(crate) fn error_mut(&mut self) -> Option<&mut String> {
        self.error.as_mut()
    }

    /// Status code for the gateway's own reply.
    ///
    /// 200 on success, the upstream status on upstream failure, 502 when no
    /// upstream reply was obtained.
    pub fn http_status(&self) -> StatusCode {
        if self.success {
            return StatusCode::OK;
        }
        self.status
            .and_then(|s| StatusCode::from_u16(s).ok())
            .unwrap_or(StatusCode::BAD_GATEWAY)
    }
}

impl IntoResponse for ProxyResponse {
    fn into_response(self) -> Response {
        (self.http_status(), Json(self)).into_response()
    }
}

/// Pull a human readable message out of an upstream JSON error body.
///
/// Tries `error` (string, or object with `message`), then `message`, then any
/// other non-null `error` value as compact JSON.
fn error_message(body: &Value) -> Option<String> {
    match body.get("error") {
        Some(Value::String(error)) if !error.is_empty() => return Some(error.clone()),
        Some(Value::Object(error)) => {
            if let Some(Value::String(message)) = error.get("message") {
                return Some(message.clone());
            }
        }
        _ => {}
    }

    if let Some(Value::String(message)) = body.get("message") {
        if !message.is_empty() {
            return Some(message.clone());
        }
    }

    match body.get("error") {
        Some(error) if !error.is_null() => Some(error.to_string()),
        _ => None,
    }
}
