//! Shared utilities for integration testing.

#![allow(dead_code)]

use async_trait::async_trait;
use axum::http::StatusCode;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

use edge_dispatch::config::EdgeConfig;
use edge_dispatch::lifecycle::Shutdown;
use edge_dispatch::secrets::{SecretBackend, SecretError};
use edge_dispatch::EdgeService;

/// Request line target and headers seen by a mock backend.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub target: String,
    pub headers: HashMap<String, String>,
}

impl RecordedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(String::as_str)
    }
}

/// Canned reply of a mock backend. The body is written chunk by chunk with
/// a short pause in between.
#[derive(Debug, Clone)]
pub struct MockResponse {
    pub status: u16,
    pub content_type: &'static str,
    pub chunks: Vec<String>,
}

impl MockResponse {
    pub fn json(body: &str) -> Self {
        Self {
            status: 200,
            content_type: "application/json",
            chunks: vec![body.to_string()],
        }
    }

    pub fn html_chunks(chunks: &[&str]) -> Self {
        Self {
            status: 200,
            content_type: "text/html",
            chunks: chunks.iter().map(|c| c.to_string()).collect(),
        }
    }

    pub fn status(status: u16, body: &str) -> Self {
        Self {
            status,
            content_type: "text/plain",
            chunks: vec![body.to_string()],
        }
    }
}

pub struct MockBackend {
    pub addr: SocketAddr,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl MockBackend {
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }
}

/// Start a programmable mock backend on an ephemeral port.
pub async fn start_programmable_backend<F>(f: F) -> MockBackend
where
    F: Fn(&RecordedRequest) -> MockResponse + Send + Sync + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let requests = Arc::new(Mutex::new(Vec::new()));
    let f = Arc::new(f);

    let recorded = requests.clone();
    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    let f = f.clone();
                    let recorded = recorded.clone();
                    tokio::spawn(async move {
                        let Some(request) = read_request_head(&mut socket).await else {
                            return;
                        };
                        recorded.lock().unwrap().push(request.clone());
                        let response = f(&request);
                        let _ = write_response(&mut socket, &response).await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    MockBackend { addr, requests }
}

async fn read_request_head(socket: &mut TcpStream) -> Option<RecordedRequest> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);
    }

    let head = String::from_utf8_lossy(&buf);
    let mut lines = head.split("\r\n");
    let target = lines.next()?.split_whitespace().nth(1)?.to_string();
    let headers = lines
        .take_while(|line| !line.is_empty())
        .filter_map(|line| line.split_once(':'))
        .map(|(name, value)| (name.trim().to_ascii_lowercase(), value.trim().to_string()))
        .collect();

    Some(RecordedRequest { target, headers })
}

async fn write_response(socket: &mut TcpStream, response: &MockResponse) -> std::io::Result<()> {
    let reason = StatusCode::from_u16(response.status)
        .ok()
        .and_then(|s| s.canonical_reason())
        .unwrap_or("Unknown");
    let length: usize = response.chunks.iter().map(String::len).sum();
    let head = format!(
        "HTTP/1.1 {} {}\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        response.status, reason, response.content_type, length
    );
    socket.write_all(head.as_bytes()).await?;

    for chunk in &response.chunks {
        socket.write_all(chunk.as_bytes()).await?;
        socket.flush().await?;
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    socket.shutdown().await
}

/// In-memory secret backend counting its loads.
pub struct StaticSecrets {
    result: Result<HashMap<String, String>, SecretError>,
    loads: Arc<AtomicUsize>,
}

impl StaticSecrets {
    pub fn with(pairs: &[(&str, &str)]) -> Self {
        Self {
            result: Ok(pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect()),
            loads: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn failing() -> Self {
        Self {
            result: Err(SecretError::Unreachable("secret store offline".into())),
            loads: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn load_counter(&self) -> Arc<AtomicUsize> {
        self.loads.clone()
    }
}

#[async_trait]
impl SecretBackend for StaticSecrets {
    async fn load_all(&self) -> Result<HashMap<String, String>, SecretError> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(20)).await;
        self.result.clone()
    }
}

/// Default config with the listener on an ephemeral loopback port.
pub fn test_config() -> EdgeConfig {
    let mut config = EdgeConfig::default();
    config.listener.bind_address = "127.0.0.1:0".to_string();
    config.observability.metrics_enabled = false;
    config.service.pop_name = "test-pop".to_string();
    config
}

/// A running edge service.
pub struct TestEdge {
    pub addr: SocketAddr,
    shutdown: Shutdown,
    handle: JoinHandle<()>,
}

impl TestEdge {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub async fn stop(self) {
        self.shutdown.trigger();
        let _ = tokio::time::timeout(Duration::from_secs(5), self.handle).await;
    }
}

pub async fn start_edge(config: EdgeConfig, secrets: impl SecretBackend + 'static) -> TestEdge {
    let service = EdgeService::with_secret_backend(config, Arc::new(secrets)).unwrap();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    let handle = tokio::spawn(async move {
        service.run(listener, server_shutdown).await.unwrap();
    });

    TestEdge {
        addr,
        shutdown,
        handle,
    }
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}
