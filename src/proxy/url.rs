//! Upstream URL composition.
//!
//! # Rules
//! - One leading `/` is stripped from the endpoint, which is then appended to
//!   the base path (the base path is kept)
//! - Query parameters on the endpoint come first, caller params after them
//!   sorted by key; duplicate keys are all kept
//! - Query credentials are appended last; header credentials never touch the URL
//! - The authority is always the base URL's: an absolute endpoint only
//!   contributes its path and query

use std::collections::BTreeMap;

use url::Url;

use crate::registry::CredentialLocation;

/// Build the absolute upstream URL for a proxied call.
pub fn compose(
    base: &Url,
    endpoint: &str,
    params: &BTreeMap<String, String>,
    credential_key: &str,
    credential_value: &str,
    location: CredentialLocation,
) -> Url {
    let (path, query) = relative_parts(endpoint);

    let mut url = base.clone();
    url.set_fragment(None);
    let base_path = base.path().trim_end_matches('/');
    url.set_path(&format!("{base_path}/{path}"));
    url.set_query(query.as_deref());

    let inject_credential = location == CredentialLocation::Query;
    if !params.is_empty() || inject_credential {
        let mut pairs = url.query_pairs_mut();
        for (key, value) in params {
            pairs.append_pair(key, value);
        }
        if inject_credential {
            pairs.append_pair(credential_key, credential_value);
        }
    }

    url
}

/// Split an endpoint into (path without one leading slash, query).
fn relative_parts(endpoint: &str) -> (String, Option<String>) {
    // Absolute URLs are reduced to path + query so the host can't be swapped.
    if let Ok(absolute) = Url::parse(endpoint) {
        if absolute.has_host() {
            let path = absolute.path();
            let path = path.strip_prefix('/').unwrap_or(path);
            return (path.to_owned(), absolute.query().map(str::to_owned));
        }
    }

    let without_fragment = endpoint.split('#').next().unwrap_or_default();
    let (path, query) = match without_fragment.split_once('?') {
        Some((path, query)) => (path, Some(query.to_owned())),
        None => (without_fragment, None),
    };
    let path = path.strip_prefix('/').unwrap_or(path);
    (path.to_owned(), query)
}
