//! Forwarding executor.
//!
//! # Responsibilities
//! - Compose the upstream URL and inject the credential
//! - Issue exactly one bounded outbound call
//! - Normalize the reply (or the failure) into a [`ProxyResponse`]
//!
//! # Design Decisions
//! - Timeouts are mandatory; the client is built with connect and total limits
//! - Redirects are never followed; a 3xx is the upstream's answer
//! - Reply bodies are read up to a configured size
//! - Upstream and network failures end here as envelopes, never as panics or 500s
//! - Everything leaving this module passes through the shared redactor
//! - Dropping the returned future cancels the outbound call

use std::error::Error as _;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Bytes;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use secrecy::ExposeSecret;
use thiserror::Error;
use url::Url;

use crate::config::{TimeoutConfig, UpstreamConfig};
use crate::proxy::request::ProxyRequest;
use crate::proxy::response::ProxyResponse;
use crate::proxy::url::compose;
use crate::registry::ServiceEntry;
use crate::security::redact::Redactor;

/// Why no upstream reply was obtained.
#[derive(Debug, Error)]
pub enum ForwardError {
    #[error("Upstream request timed out")]
    Timeout,

    #[error("Upstream request failed: {0}")]
    Transport(String),

    #[error("Upstream response too large")]
    ResponseTooLarge,

    #[error("Credential for service `{0}` cannot be attached")]
    Credential(String),
}

/// Issues authenticated calls to upstream services.
#[derive(Debug)]
pub struct Forwarder {
    client: reqwest::Client,
    redactor: Arc<Redactor>,
    max_response_bytes: usize,
}

impl Forwarder {
    /// Build a forwarder with bounded connect and total timeouts.
    ///
    /// The client stays on the composed URL's host: redirects would carry
    /// header credentials to whatever host the upstream names.
    pub fn new(
        timeouts: &TimeoutConfig,
        upstream: &UpstreamConfig,
        redactor: Arc<Redactor>,
    ) -> Result<Self, reqwest::Error> {
        let mut builder = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(timeouts.connect_secs))
            .timeout(Duration::from_secs(timeouts.upstream_secs))
            .redirect(reqwest::redirect::Policy::none())
            .user_agent(upstream.user_agent.as_str());
        if !upstream.system_proxy {
            builder = builder.no_proxy();
        }

        Ok(Self {
            client: builder.build()?,
            redactor,
            max_response_bytes: upstream.max_response_bytes,
        })
    }

    pub fn redactor(&self) -> &Redactor {
        &self.redactor
    }

    /// Forward `request` to `entry` and normalize the outcome.
    pub async fn forward(&self, entry: &ServiceEntry, request: &ProxyRequest) -> ProxyResponse {
        let url = self.target_url(entry, request);
        tracing::info!(
            service = entry.name(),
            method = %request.method,
            url = %self.redactor.redact(url.as_str()),
            "Proxying request"
        );

        let outcome = match self.build(entry, request, url) {
            Ok(outbound) => self.execute(outbound).await,
            Err(err) => Err(err),
        };

        let mut response = match outcome {
            Ok((status, body)) => {
                let response = ProxyResponse::from_upstream(status, &body);
                if !response.is_success() {
                    tracing::warn!(service = entry.name(), status, "Upstream returned an error status");
                }
                response
            }
            Err(err) => {
                let message = self.redactor.redact(&err.to_string());
                tracing::warn!(service = entry.name(), error = %message, "Upstream unreachable");
                ProxyResponse::failure(message, None)
            }
        };

        self.scrub(&mut response);
        response
    }

    /// Upstream URL for `request`, with any query credential applied.
    pub fn target_url(&self, entry: &ServiceEntry, request: &ProxyRequest) -> Url {
        compose(
            entry.base_url(),
            &request.endpoint,
            &request.params,
            entry.credential_key(),
            entry.credential().expose_secret(),
            entry.location(),
        )
    }

    /// Assemble the outbound request without sending it.
    pub fn build(
        &self,
        entry: &ServiceEntry,
        request: &ProxyRequest,
        url: Url,
    ) -> Result<reqwest::Request, ForwardError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if let Some(credential) = entry.credential_header() {
            let (name, value) =
                credential.map_err(|_| ForwardError::Credential(entry.name().to_owned()))?;
            headers.insert(name, value);
        }

        let mut builder = self
            .client
            .request(request.method.as_http(), url)
            .headers(headers);
        if request.method.carries_body() {
            if let Some(body) = &request.body {
                builder = builder.json(body);
            }
        }

        builder.build().map_err(|err| self.describe(err))
    }

    async fn execute(&self, outbound: reqwest::Request) -> Result<(u16, Bytes), ForwardError> {
        let response = self
            .client
            .execute(outbound)
            .await
            .map_err(|err| self.describe(err))?;
        let status = response.status().as_u16();
        let body = self.read_body(response).await?;
        Ok((status, body))
    }

    async fn read_body(&self, mut response: reqwest::Response) -> Result<Bytes, ForwardError> {
        let limit = self.max_response_bytes;
        if response.content_length().is_some_and(|len| len > limit as u64) {
            return Err(ForwardError::ResponseTooLarge);
        }

        let mut body = Vec::new();
        while let Some(chunk) = response.chunk().await.map_err(|err| self.describe(err))? {
            if body.len() + chunk.len() > limit {
                return Err(ForwardError::ResponseTooLarge);
            }
            body.extend_from_slice(&chunk);
        }
        Ok(Bytes::from(body))
    }

    /// Turn a transport error into a credential-free description.
    fn describe(&self, err: reqwest::Error) -> ForwardError {
        if err.is_timeout() {
            return ForwardError::Timeout;
        }

        let err = err.without_url();
        let mut detail = err.to_string();
        let mut source = err.source();
        while let Some(cause) = source {
            detail.push_str(": ");
            detail.push_str(&cause.to_string());
            source = cause.source();
        }
        ForwardError::Transport(self.redactor.redact(&detail))
    }

    fn scrub(&self, response: &mut ProxyResponse) {
        if let Some(data) = response.data_mut() {
            self.redactor.redact_json(data);
        }
        if let Some(error) = response.error_mut() {
            *error = self.redactor.redact(error);
        }
    }
}
