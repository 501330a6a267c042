//! Shared utilities for integration tests.
#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    body::Bytes,
    extract::Request,
    http::{
        header::{CONTENT_TYPE, LOCATION},
        HeaderMap, StatusCode,
    },
    response::{IntoResponse, Response},
    Router,
};
use keyward::config::GatewayConfig;
use keyward::registry::{CredentialLocation, ServiceEntry, ServiceRegistry};
use keyward::{GatewayServer, Shutdown};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// One request as seen by the mock upstream.
#[derive(Debug, Clone)]
pub struct Captured {
    pub method: String,
    pub path_and_query: String,
    pub headers: HeaderMap,
    pub body: Bytes,
}

type Responder = dyn Fn(&Captured) -> (u16, String) + Send + Sync;

/// A programmable upstream API that records every request it receives.
pub struct MockUpstream {
    pub addr: SocketAddr,
    calls: Arc<AtomicU32>,
    captured: Arc<Mutex<Vec<Captured>>>,
}

impl MockUpstream {
    pub async fn start<F>(responder: F) -> Self
    where
        F: Fn(&Captured) -> (u16, String) + Send + Sync + 'static,
    {
        Self::start_delayed(Duration::ZERO, responder).await
    }

    /// Start a mock that waits `delay` before answering.
    pub async fn start_delayed<F>(delay: Duration, responder: F) -> Self
    where
        F: Fn(&Captured) -> (u16, String) + Send + Sync + 'static,
    {
        Self::spawn(delay, None, Arc::new(responder)).await
    }

    /// Start a mock that answers every request with `302 Location: <location>`.
    pub async fn start_redirect(location: String) -> Self {
        Self::spawn(Duration::ZERO, Some(location.into()), Arc::new(|_: &Captured| (302, String::new()))).await
    }

    async fn spawn(delay: Duration, location: Option<Arc<str>>, responder: Arc<Responder>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let calls = Arc::new(AtomicU32::new(0));
        let captured = Arc::new(Mutex::new(Vec::new()));

        let app = {
            let calls = calls.clone();
            let captured = captured.clone();
            Router::new().fallback(move |request: Request| {
                let calls = calls.clone();
                let captured = captured.clone();
                let responder = responder.clone();
                let location = location.clone();
                async move { record(request, delay, location, calls, captured, responder).await }
            })
        };

        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Self {
            addr,
            calls,
            captured,
        }
    }

    /// Base URL for a service hosted on this mock.
    pub fn base_url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn captured(&self) -> Vec<Captured> {
        self.captured.lock().unwrap().clone()
    }

    pub fn last(&self) -> Captured {
        self.captured().pop().expect("mock upstream received no request")
    }
}

async fn record(
    request: Request,
    delay: Duration,
    location: Option<Arc<str>>,
    calls: Arc<AtomicU32>,
    captured: Arc<Mutex<Vec<Captured>>>,
    responder: Arc<Responder>,
) -> Response {
    calls.fetch_add(1, Ordering::SeqCst);
    let (parts, body) = request.into_parts();
    let seen = Captured {
        method: parts.method.to_string(),
        path_and_query: parts
            .uri
            .path_and_query()
            .map(|pq| pq.as_str().to_owned())
            .unwrap_or_default(),
        headers: parts.headers,
        body: axum::body::to_bytes(body, usize::MAX).await.unwrap(),
    };
    let (status, body) = responder(&seen);
    captured.lock().unwrap().push(seen);

    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }

    let mut response = (
        StatusCode::from_u16(status).unwrap(),
        [(CONTENT_TYPE, "application/json")],
        body,
    )
        .into_response();
    if let Some(location) = location {
        response
            .headers_mut()
            .insert(LOCATION, location.parse().unwrap());
    }
    response
}

/// A gateway serving on an ephemeral port; shut down on drop.
pub struct TestGateway {
    pub addr: SocketAddr,
    shutdown: Shutdown,
    handle: Option<JoinHandle<()>>,
}

impl TestGateway {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// Trigger shutdown and wait for the server to drain.
    pub async fn stop(&mut self) {
        self.shutdown.trigger();
        if let Some(handle) = self.handle.take() {
            tokio::time::timeout(Duration::from_secs(5), handle)
                .await
                .expect("gateway did not shut down")
                .unwrap();
        }
    }
}

impl Drop for TestGateway {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

pub async fn start_gateway(config: GatewayConfig, registry: ServiceRegistry) -> TestGateway {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = GatewayServer::new(config, registry).unwrap();

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    let handle = tokio::spawn(async move {
        server.run(listener, server_shutdown).await.unwrap();
    });

    TestGateway {
        addr,
        shutdown,
        handle: Some(handle),
    }
}

/// Defaults with outbound proxies ignored so loopback mocks are reachable.
pub fn test_config() -> GatewayConfig {
    let mut config = GatewayConfig::default();
    config.listener.bind_address = "127.0.0.1:0".to_string();
    config.upstream.system_proxy = false;
    config
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}

pub fn header_service(name: &str, base_url: &str, key: &str, secret: &str) -> ServiceEntry {
    ServiceEntry::new(name, base_url, CredentialLocation::Header, key, secret).unwrap()
}

pub fn query_service(name: &str, base_url: &str, key: &str, secret: &str) -> ServiceEntry {
    ServiceEntry::new(name, base_url, CredentialLocation::Query, key, secret).unwrap()
}
