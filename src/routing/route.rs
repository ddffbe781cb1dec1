//! The gateway's view of a route and the capability that supplies routes.

use async_trait::async_trait;
use thiserror::Error;

use crate::store::StoreError;

/// Client-side TLS material attached to a route (PEM text).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteTls {
    pub client_cert: String,
    pub client_key: String,
    pub ca_cert: String,
    /// Skip server certificate validation. Meant for internal or self-signed origins.
    pub skip_verify: bool,
}

impl RouteTls {
    /// Custom TLS is only attached to the upstream call when a client certificate is present.
    pub fn has_client_cert(&self) -> bool {
        !self.client_cert.is_empty()
    }
}

/// A rule mapping an endpoint prefix to an origin.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Route {
    /// Opaque identifier, correlates log events with the persisted route.
    pub id: String,
    /// Literal prefix matched against the request path. May be empty or `/`.
    pub endpoint: String,
    /// Base URL requests are forwarded to.
    pub origin_url: String,
    pub tls: RouteTls,
}

impl Route {
    pub fn new(
        id: impl Into<String>,
        endpoint: impl Into<String>,
        origin_url: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            endpoint: endpoint.into(),
            origin_url: origin_url.into(),
            tls: RouteTls::default(),
        }
    }
}

/// Errors surfaced by a [`RouteProvider`].
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("route storage error: {0}")]
    Store(#[from] StoreError),

    #[error("{0}")]
    Other(String),
}

/// Supplies the complete active route set.
///
/// Called once per request, possibly from many tasks at the same time.
#[async_trait]
pub trait RouteProvider: Send + Sync {
    async fn routes(&self) -> Result<Vec<Route>, ProviderError>;
}
