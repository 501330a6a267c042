//! The fixed set of upstream services the gateway knows how to reach.

use crate::registry::service::CredentialLocation;

/// Static description of a known upstream API.
#[derive(Debug, Clone, Copy)]
pub struct KnownService {
    /// Service name used in `/api/proxy/{service}`.
    pub name: &'static str,
    /// Environment variable holding the credential.
    pub credential_var: &'static str,
    /// Default base URL, if the service has a fixed public endpoint.
    pub default_base_url: Option<&'static str>,
    /// Variables consulted (in order) for a base URL override.
    pub base_url_vars: &'static [&'static str],
    pub location: CredentialLocation,
    pub credential_key: &'static str,
}

pub const KNOWN_SERVICES: &[KnownService] = &[
    KnownService {
        name: "anthropic",
        credential_var: "ANTHROPIC_API_KEY",
        default_base_url: Some("https://api.anthropic.com/v1"),
        base_url_vars: &["ANTHROPIC_BASE_URL"],
        location: CredentialLocation::Header,
        credential_key: "x-api-key",
    },
    KnownService {
        name: "openai",
        credential_var: "OPENAI_API_KEY",
        default_base_url: Some("https://api.openai.com/v1"),
        base_url_vars: &["OPENAI_BASE_URL"],
        location: CredentialLocation::Header,
        credential_key: "Authorization",
    },
    KnownService {
        name: "gemini",
        credential_var: "GOOGLE_GEMINI_API_KEY",
        default_base_url: Some("https://generativelanguage.googleapis.com/v1beta"),
        base_url_vars: &["GEMINI_BASE_URL"],
        location: CredentialLocation::Query,
        credential_key: "key",
    },
    KnownService {
        name: "elevenlabs",
        credential_var: "ELEVENLABS_API_KEY",
        default_base_url: Some("https://api.elevenlabs.io/v1"),
        base_url_vars: &["ELEVENLABS_BASE_URL"],
        location: CredentialLocation::Header,
        credential_key: "xi-api-key",
    },
    KnownService {
        name: "glm",
        credential_var: "ZAI_GLM_API_KEY",
        default_base_url: Some("https://open.bigmodel.cn/api/paas/v4"),
        base_url_vars: &["GLM_BASE_URL"],
        location: CredentialLocation::Header,
        credential_key: "Authorization",
    },
    KnownService {
        name: "resend",
        credential_var: "RESEND_API_KEY",
        default_base_url: Some("https://api.resend.com"),
        base_url_vars: &["RESEND_BASE_URL"],
        location: CredentialLocation::Header,
        credential_key: "Authorization",
    },
    KnownService {
        name: "googlemaps",
        credential_var: "GOOGLE_MAPS_API_KEY",
        default_base_url: Some("https://maps.googleapis.com/maps/api"),
        base_url_vars: &["GOOGLEMAPS_BASE_URL"],
        location: CredentialLocation::Query,
        credential_key: "key",
    },
    // Project-specific URL, no public default.
    KnownService {
        name: "supabase",
        credential_var: "SUPABASE_SERVICE_ROLE_KEY",
        default_base_url: None,
        base_url_vars: &["SUPABASE_BASE_URL", "SUPABASE_URL", "NEXT_PUBLIC_SUPABASE_URL"],
        location: CredentialLocation::Header,
        credential_key: "Authorization",
    },
];
