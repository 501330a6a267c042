//! Client proxy requests and their structural validation.
//!
//! Validation parses the raw JSON into a typed [`ProxyRequest`]; checks run in
//! a fixed order and the first failure wins. Nothing here touches the network
//! or the registry.

use std::collections::BTreeMap;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// HTTP methods a client may ask the gateway to use upstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ProxyMethod {
    #[default]
    Get,
    Post,
    Put,
    Delete,
    Patch,
}

impl ProxyMethod {
    pub const ALL: [ProxyMethod; 5] = [
        ProxyMethod::Get,
        ProxyMethod::Post,
        ProxyMethod::Put,
        ProxyMethod::Delete,
        ProxyMethod::Patch,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ProxyMethod::Get => "GET",
            ProxyMethod::Post => "POST",
            ProxyMethod::Put => "PUT",
            ProxyMethod::Delete => "DELETE",
            ProxyMethod::Patch => "PATCH",
        }
    }

    /// Whether a client-supplied body is forwarded for this method.
    pub fn carries_body(self) -> bool {
        matches!(self, ProxyMethod::Post | ProxyMethod::Put | ProxyMethod::Patch)
    }

    pub fn as_http(self) -> reqwest::Method {
        match self {
            ProxyMethod::Get => reqwest::Method::GET,
            ProxyMethod::Post => reqwest::Method::POST,
            ProxyMethod::Put => reqwest::Method::PUT,
            ProxyMethod::Delete => reqwest::Method::DELETE,
            ProxyMethod::Patch => reqwest::Method::PATCH,
        }
    }
}

impl FromStr for ProxyMethod {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ProxyMethod::ALL
            .into_iter()
            .find(|m| m.as_str() == s)
            .ok_or_else(|| ValidationError::InvalidMethod(s.to_owned()))
    }
}

impl std::fmt::Display for ProxyMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A validated request to forward to an upstream service.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProxyRequest {
    pub endpoint: String,
    pub method: ProxyMethod,
    /// Query parameters, forwarded in key order.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub params: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
}

impl ProxyRequest {
    /// A GET request for `endpoint` with no params or body.
    pub fn get(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            method: ProxyMethod::Get,
            params: BTreeMap::new(),
            body: None,
        }
    }
}

/// Structural problems with a client proxy request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Endpoint is required")]
    MissingEndpoint,

    #[error("Invalid HTTP method: {0}")]
    InvalidMethod(String),

    #[error("Params must be an object of string values")]
    InvalidParams,

    #[error("Malformed request body: {0}")]
    MalformedBody(String),
}

/// Validate a raw request body and extract the typed request.
///
/// Order: endpoint, method, params. `null` counts as absent for the optional
/// fields.
pub fn validate(raw: &Value) -> Result<ProxyRequest, ValidationError> {
    let endpoint = match raw.get("endpoint") {
        Some(Value::String(endpoint)) if !endpoint.is_empty() => endpoint.clone(),
        _ => return Err(ValidationError::MissingEndpoint),
    };

    let method = match raw.get("method") {
        None | Some(Value::Null) => ProxyMethod::default(),
        Some(Value::String(method)) => method.parse()?,
        Some(other) => return Err(ValidationError::InvalidMethod(other.to_string())),
    };

    let params = match raw.get("params") {
        None | Some(Value::Null) => BTreeMap::new(),
        Some(Value::Object(map)) => map
            .iter()
            .map(|(key, value)| match value {
                Value::String(value) => Ok((key.clone(), value.clone())),
                _ => Err(ValidationError::InvalidParams),
            })
            .collect::<Result<_, _>>()?,
        Some(_) => return Err(ValidationError::InvalidParams),
    };

    let body = match raw.get("body") {
        None | Some(Value::Null) => None,
        Some(body) => Some(body.clone()),
    };

    Ok(ProxyRequest {
        endpoint,
        method,
        params,
        body,
    })
}
