//! Service lookup.
//!
//! # Responsibilities
//! - Probe the known-service catalog against configuration
//! - Look up a service entry by name
//! - List configured services for discovery
//!
//! # Design Decisions
//! - Immutable after construction (shared via Arc without locks)
//! - Ordered map so listings are deterministic
//! - A service exists iff its credential is configured

use std::collections::BTreeMap;

use secrecy::ExposeSecret;

use crate::registry::catalog::{KnownService, KNOWN_SERVICES};
use crate::registry::service::{RegistryError, ServiceEntry};
use crate::security::redact::Redactor;

/// Immutable table of configured upstream services.
#[derive(Debug, Default)]
pub struct ServiceRegistry {
    services: BTreeMap<String, ServiceEntry>,
}

impl ServiceRegistry {
    /// Build the registry from the process environment.
    pub fn from_env() -> Result<Self, RegistryError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Build the registry from an arbitrary key/value source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, RegistryError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut entries = Vec::new();
        for known in KNOWN_SERVICES {
            if let Some(entry) = probe(known, &lookup)? {
                entries.push(entry);
            }
        }
        Self::from_entries(entries)
    }

    /// Build the registry from explicit entries.
    pub fn from_entries(entries: impl IntoIterator<Item = ServiceEntry>) -> Result<Self, RegistryError> {
        let mut services = BTreeMap::new();
        for entry in entries {
            let name = entry.name().to_owned();
            if services.contains_key(&name) {
                return Err(RegistryError::DuplicateService(name));
            }
            services.insert(name, entry);
        }
        Ok(Self { services })
    }

    pub fn lookup(&self, name: &str) -> Option<&ServiceEntry> {
        self.services.get(name)
    }

    /// Configured service names, sorted.
    pub fn list_services(&self) -> Vec<String> {
        self.services.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.services.len()
    }

    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }

    /// A redactor that knows every credential in this registry.
    pub fn redactor(&self) -> Redactor {
        let mut redactor = Redactor::new();
        for entry in self.services.values() {
            redactor.add(entry.credential().expose_secret());
        }
        redactor
    }
}

fn probe<F>(known: &KnownService, lookup: &F) -> Result<Option<ServiceEntry>, RegistryError>
where
    F: Fn(&str) -> Option<String>,
{
    let credential = match lookup(known.credential_var) {
        Some(value) if !value.trim().is_empty() => value,
        _ => return Ok(None),
    };

    let base_url = known
        .base_url_vars
        .iter()
        .filter_map(|&var| lookup(var))
        .find(|value| !value.trim().is_empty())
        .or_else(|| known.default_base_url.map(str::to_owned));

    let Some(base_url) = base_url else {
        tracing::warn!(
            service = known.name,
            variables = ?known.base_url_vars,
            "Credential configured but no base URL; service disabled"
        );
        return Ok(None);
    };

    ServiceEntry::new(
        known.name,
        &base_url,
        known.location,
        known.credential_key,
        credential,
    )
    .map(Some)
}
