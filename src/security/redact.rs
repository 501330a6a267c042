//! Credential redaction.
//!
//! # Responsibilities
//! - Hold every configured credential value
//! - Scrub them from log lines, error strings and JSON payloads
//!
//! # Design Decisions
//! - One redactor built from the registry, shared by every call site
//! - Matches both the raw value and its URL-encoded form, since query
//!   credentials show up percent-encoded in transport errors

use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;

/// Replacement text for redacted credentials.
pub const REDACTED: &str = "***";

/// Scrubs known secret values out of arbitrary text.
#[derive(Default)]
pub struct Redactor {
    patterns: Vec<SecretString>,
}

impl Redactor {
    /// Create a redactor with no known secrets.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a secret value. Empty values are ignored.
    pub fn add(&mut self, secret: &str) {
        if secret.is_empty() {
            return;
        }
        self.push_unique(secret.to_owned());

        let encoded: String = url::form_urlencoded::byte_serialize(secret.as_bytes()).collect();
        if encoded != secret {
            self.push_unique(encoded);
        }

        // Longest first so a secret that contains another is replaced whole.
        self.patterns
            .sort_by_key(|p| std::cmp::Reverse(p.expose_secret().len()));
    }

    fn push_unique(&mut self, pattern: String) {
        if !self.patterns.iter().any(|p| p.expose_secret() == pattern) {
            self.patterns.push(SecretString::new(pattern.into()));
        }
    }

    /// Number of registered patterns (raw and encoded forms).
    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// Return `input` with every known secret replaced by [`REDACTED`].
    pub fn redact(&self, input: &str) -> String {
        let mut output = input.to_owned();
        for pattern in &self.patterns {
            let secret = pattern.expose_secret();
            if output.contains(secret) {
                output = output.replace(secret, REDACTED);
            }
        }
        output
    }

    /// Redact every string (keys included) inside a JSON value in place.
    pub fn redact_json(&self, value: &mut Value) {
        if self.patterns.is_empty() {
            return;
        }
        match value {
            Value::String(s) => {
                let scrubbed = self.redact(s);
                if scrubbed != *s {
                    *s = scrubbed;
                }
            }
            Value::Array(items) => items.iter_mut().for_each(|item| self.redact_json(item)),
            Value::Object(map) => {
                let leaking: Vec<String> = map
                    .keys()
                    .filter(|k| self.redact(k) != **k)
                    .cloned()
                    .collect();
                for key in leaking {
                    if let Some(v) = map.remove(&key) {
                        map.insert(self.redact(&key), v);
                    }
                }
                map.values_mut().for_each(|v| self.redact_json(v));
            }
            _ => {}
        }
    }
}

impl std::fmt::Debug for Redactor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Redactor")
            .field("patterns", &self.patterns.len())
            .finish()
    }
}
