//! A single upstream service and its credential.

use reqwest::header::{HeaderName, HeaderValue};
use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;
use url::Url;

/// Where the credential travels on the outbound request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialLocation {
    /// Sent as a request header named by the credential key.
    Header,
    /// Appended as a query parameter named by the credential key.
    Query,
}

/// Errors raised while building service entries.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("service `{service}` has an invalid base URL: {reason}")]
    InvalidBaseUrl { service: String, reason: String },

    #[error("service `{service}` has an invalid credential key `{key}`")]
    InvalidCredentialKey { service: String, key: String },

    #[error("service `{service}` has a credential that cannot be sent as a header")]
    UnencodableCredential { service: String },

    #[error("service `{service}` has an empty credential")]
    EmptyCredential { service: String },

    #[error("service `{0}` is registered more than once")]
    DuplicateService(String),
}

/// Routing and authentication data for one upstream API.
pub struct ServiceEntry {
    name: String,
    base_url: Url,
    location: CredentialLocation,
    credential_key: String,
    credential: SecretString,
}

impl ServiceEntry {
    /// Build an entry, checking that it can actually be forwarded to.
    ///
    /// The base URL must be absolute http(s) with a host; header credentials
    /// must form a valid header name and value.
    pub fn new(
        name: impl Into<String>,
        base_url: &str,
        location: CredentialLocation,
        credential_key: impl Into<String>,
        credential: impl Into<String>,
    ) -> Result<Self, RegistryError> {
        let name = name.into();
        let credential_key = credential_key.into();
        let credential = credential.into().trim().to_owned();

        if credential.is_empty() {
            return Err(RegistryError::EmptyCredential { service: name });
        }

        let mut base_url = Url::parse(base_url.trim()).map_err(|e| RegistryError::InvalidBaseUrl {
            service: name.clone(),
            reason: e.to_string(),
        })?;
        if !matches!(base_url.scheme(), "http" | "https") || !base_url.has_host() {
            return Err(RegistryError::InvalidBaseUrl {
                service: name,
                reason: "expected an absolute http(s) URL".to_string(),
            });
        }
        base_url.set_fragment(None);

        match location {
            CredentialLocation::Header => {
                if HeaderName::from_bytes(credential_key.as_bytes()).is_err() {
                    return Err(RegistryError::InvalidCredentialKey { service: name, key: credential_key });
                }
                if HeaderValue::from_str(&credential).is_err() {
                    return Err(RegistryError::UnencodableCredential { service: name });
                }
            }
            CredentialLocation::Query => {
                if credential_key.is_empty() {
                    return Err(RegistryError::InvalidCredentialKey { service: name, key: credential_key });
                }
            }
        }

        Ok(Self {
            name,
            base_url,
            location,
            credential_key,
            credential: SecretString::new(credential.into()),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn location(&self) -> CredentialLocation {
        self.location
    }

    pub fn credential_key(&self) -> &str {
        &self.credential_key
    }

    pub fn credential(&self) -> &SecretString {
        &self.credential
    }

    /// The header to attach for header-located credentials.
    ///
    /// `Authorization` gets the bearer scheme; any other header carries the
    /// raw value. The value is flagged sensitive so it never prints.
    pub fn credential_header(&self) -> Option<Result<(HeaderName, HeaderValue), RegistryError>> {
        if self.location != CredentialLocation::Header {
            return None;
        }
        let unencodable = || RegistryError::UnencodableCredential { service: self.name.clone() };

        let built = HeaderName::from_bytes(self.credential_key.as_bytes())
            .map_err(|_| RegistryError::InvalidCredentialKey {
                service: self.name.clone(),
                key: self.credential_key.clone(),
            })
            .and_then(|name| {
                let raw = self.credential.expose_secret();
                let text = if name == reqwest::header::AUTHORIZATION {
                    format!("Bearer {raw}")
                } else {
                    raw.to_owned()
                };
                let mut value = HeaderValue::from_str(&text).map_err(|_| unencodable())?;
                value.set_sensitive(true);
                Ok((name, value))
            });
        Some(built)
    }
}

impl std::fmt::Debug for ServiceEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceEntry")
            .field("name", &self.name)
            .field("base_url", &self.base_url.as_str())
            .field("location", &self.location)
            .field("credential_key", &self.credential_key)
            .field("credential", &"[REDACTED]")
            .finish()
    }
}
