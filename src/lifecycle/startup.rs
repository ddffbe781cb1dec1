//! Startup orchestration.
//!
//! # Responsibilities
//! - Initialize subsystems in dependency order
//! - Start background tasks (cache sweeper)
//! - Bind the listener and begin accepting traffic
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Listener binds last (traffic only when ready)

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use crate::audit::RecordLogStorer;
use crate::cache::TtlCache;
use crate::config::GatewayConfig;
use crate::http::{Gateway, HttpServer};
use crate::lifecycle::Shutdown;
use crate::net::tls::TlsError;
use crate::routing::StoreRouteProvider;
use crate::store::{CachedRouteStore, CachedRoutes, FileRouteStore, JsonlRequestSink, StoreError};

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error("storage error: {0}")]
    Store(#[from] StoreError),

    #[error("TLS error: {0}")]
    Tls(#[from] TlsError),

    #[error("server error: {0}")]
    Serve(#[from] std::io::Error),
}

/// A fully wired gateway with a bound listener, ready to serve.
pub struct Application {
    server: HttpServer,
    listener: TcpListener,
    local_addr: SocketAddr,
    shutdown: Shutdown,
    server_shutdown: broadcast::Receiver<()>,
    sweeper: JoinHandle<()>,
}

impl Application {
    /// Wire storage, cache, gateway and listener from `config`.
    pub async fn build(config: &GatewayConfig, shutdown: Shutdown) -> Result<Self, StartupError> {
        let cache: TtlCache<CachedRoutes> = TtlCache::new();
        let sweeper = cache.spawn_sweeper(
            Duration::from_secs(config.cache.sweep_interval_secs),
            shutdown.subscribe(),
        );

        let route_store = Arc::new(CachedRouteStore::new(
            Arc::new(FileRouteStore::new(&config.storage.routes_path)),
            cache,
            Duration::from_secs(config.cache.route_ttl_secs),
        ));
        let sink = Arc::new(JsonlRequestSink::open(&config.storage.requests_path).await?);

        let gateway = Gateway::new(
            Arc::new(StoreRouteProvider::new(Arc::clone(&route_store))),
            Arc::new(RecordLogStorer::new(route_store, sink)),
        )?;
        let server = HttpServer::new(Arc::new(gateway));

        let address = &config.listener.bind_address;
        let listener = TcpListener::bind(address)
            .await
            .map_err(|source| StartupError::Bind {
                address: address.clone(),
                source,
            })?;
        let local_addr = listener.local_addr()?;

        tracing::info!(
            address = %local_addr,
            routes_path = %config.storage.routes_path,
            requests_path = %config.storage.requests_path,
            "Gateway initialized"
        );

        Ok(Self {
            server,
            listener,
            local_addr,
            server_shutdown: shutdown.subscribe(),
            shutdown,
            sweeper,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Serve until the shutdown signal fires, then wait for the sweeper to exit.
    pub async fn run(self) -> Result<(), StartupError> {
        let served = self.server.run(self.listener, self.server_shutdown).await;

        // Stops the sweeper when the server exits on its own.
        self.shutdown.trigger();
        if let Err(e) = self.sweeper.await {
            tracing::warn!(error = %e, "Cache sweeper task failed");
        }
        Ok(served?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(dir: &std::path::Path) -> GatewayConfig {
        let mut config = GatewayConfig::default();
        config.listener.bind_address = "127.0.0.1:0".into();
        config.storage.routes_path = dir.join("routes.toml").display().to_string();
        config.storage.requests_path = dir.join("out/requests.jsonl").display().to_string();
        config
    }

    fn temp_dir() -> std::path::PathBuf {
        std::env::temp_dir().join(format!("relay-gateway-startup-{}", uuid::Uuid::new_v4()))
    }

    #[tokio::test]
    async fn test_build_and_shutdown() {
        let dir = temp_dir();
        let shutdown = Shutdown::new();
        let app = Application::build(&config(&dir), shutdown.clone()).await.unwrap();
        assert_ne!(app.local_addr().port(), 0);
        assert!(dir.join("out/requests.jsonl").exists());

        shutdown.trigger();
        tokio::time::timeout(Duration::from_secs(2), app.run())
            .await
            .unwrap()
            .unwrap();
        let _ = std::fs::remove_dir_all(dir);
    }

    #[tokio::test]
    async fn test_bind_failure() {
        let dir = temp_dir();
        let mut config = config(&dir);
        config.listener.bind_address = "not-an-address".into();

        let err = Application::build(&config, Shutdown::new()).await.err().unwrap();
        assert!(matches!(err, StartupError::Bind { .. }));
        let _ = std::fs::remove_dir_all(dir);
    }
}
