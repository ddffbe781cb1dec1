//! Shared utilities for integration testing.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use relay_gateway::config::GatewayConfig;
use relay_gateway::lifecycle::{Application, Shutdown};
use relay_gateway::store::RequestRecord;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::mpsc;

/// Start a mock origin that answers every request with `status` and `body`.
///
/// Each raw request (head and body) is sent on the returned channel.
pub async fn start_mock_backend(
    status: &'static str,
    body: &'static str,
) -> (SocketAddr, mpsc::UnboundedReceiver<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    let tx = tx.clone();
                    tokio::spawn(async move {
                        let request = read_request(&mut socket).await;
                        let _ = tx.send(request);
                        let response = format!(
                            "HTTP/1.1 {}\r\nContent-Type: text/plain\r\nX-Backend: mock\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                            status,
                            body.len(),
                            body
                        );
                        let _ = socket.write_all(response.as_bytes()).await;
                        let _ = socket.shutdown().await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    (addr, rx)
}

/// Read one HTTP/1.1 request with a `Content-Length` body.
pub async fn read_request<S: AsyncRead + Unpin>(socket: &mut S) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];

    loop {
        if let Some(head_end) = find(&buf, b"\r\n\r\n") {
            let head = String::from_utf8_lossy(&buf[..head_end]).to_lowercase();
            let length = head
                .lines()
                .find_map(|l| l.strip_prefix("content-length:"))
                .and_then(|v| v.trim().parse::<usize>().ok())
                .unwrap_or(0);
            if buf.len() >= head_end + 4 + length {
                break;
            }
        }
        match socket.read(&mut chunk).await {
            Ok(0) | Err(_) => break,
            Ok(n) => buf.extend_from_slice(&chunk[..n]),
        }
    }

    String::from_utf8_lossy(&buf).into_owned()
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

/// A running gateway over a scratch directory.
pub struct TestGateway {
    pub addr: SocketAddr,
    pub dir: PathBuf,
    shutdown: Shutdown,
}

impl TestGateway {
    /// Write `routes` as the routes file and start a gateway on an ephemeral port.
    pub async fn start(routes: &str, route_ttl_secs: u64) -> Self {
        let dir = std::env::temp_dir().join(format!("relay-gateway-it-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("routes.toml"), routes).unwrap();

        let mut config = GatewayConfig::default();
        config.listener.bind_address = "127.0.0.1:0".into();
        config.cache.route_ttl_secs = route_ttl_secs;
        config.storage.routes_path = dir.join("routes.toml").display().to_string();
        config.storage.requests_path = dir.join("requests.jsonl").display().to_string();

        let shutdown = Shutdown::new();
        let app = Application::build(&config, shutdown.clone()).await.unwrap();
        let addr = app.local_addr();
        tokio::spawn(async move {
            let _ = app.run().await;
        });

        Self { addr, dir, shutdown }
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub fn write_routes(&self, routes: &str) {
        std::fs::write(self.dir.join("routes.toml"), routes).unwrap();
    }

    pub fn records(&self) -> Vec<RequestRecord> {
        read_records(&self.dir.join("requests.jsonl"))
    }

    /// Poll the request log until it holds at least `n` records.
    pub async fn wait_for_records(&self, n: usize) -> Vec<RequestRecord> {
        for _ in 0..200 {
            let records = self.records();
            if records.len() >= n {
                return records;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("expected {n} records, found {}", self.records().len());
    }
}

impl Drop for TestGateway {
    fn drop(&mut self) {
        self.shutdown.trigger();
        let _ = std::fs::remove_dir_all(&self.dir);
    }
}

fn read_records(path: &Path) -> Vec<RequestRecord> {
    std::fs::read_to_string(path)
        .unwrap_or_default()
        .lines()
        .filter(|l| !l.trim().is_empty())
        .filter_map(|l| serde_json::from_str(l).ok())
        .collect()
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}
