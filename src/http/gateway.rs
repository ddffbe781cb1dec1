//! Per-request gateway pipeline.
//!
//! # Data Flow
//! ```text
//! ResolveIP → ResolveRoute → ResolveOriginURL → CaptureRequestBody
//!     → EmitRequestLog → Proxy (optional mTLS) → CaptureResponseBody
//!     → EmitResponseLog → Done
//! ```
//! Any step before the request log may answer the client directly with an
//! error. Once the request log is emitted every response, error or not, gets
//! a matching response log.
//!
//! # Design Decisions
//! - No retries at any step
//! - Request bodies are buffered once and shared by the upstream call and the log
//! - Response bodies stream to the client while being captured
//! - Log storage runs on background tasks and never delays the response

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::body::Body;
use axum::extract::ConnectInfo;
use axum::http::{header, request::Parts, Request, Response, Uri, Version};
use axum::response::IntoResponse;
use bytes::Bytes;
use chrono::Utc;
use url::Url;

use crate::audit::{LogDispatcher, LogStorer, PendingRequestLog, RequestLog, ResponseLog};
use crate::http::capture::CaptureBody;
use crate::http::headers::{append_forwarded_for, strip_hop_by_hop};
use crate::http::request::{
    client_ip, clone_header_map, request_urls, RequestId, RequestTarget, RequestUrls,
};
use crate::http::response::GatewayError;
use crate::net::tls::{configure_tls, upstream_client, TlsError, UpstreamClient};
use crate::observability::metrics;
use crate::routing::{find_route, Route, RouteProvider};

/// Routes, forwards and records inbound requests.
pub struct Gateway {
    route_provider: Option<Arc<dyn RouteProvider>>,
    logs: Option<LogDispatcher>,
    client: UpstreamClient,
}

/// Builder for [`Gateway`].
#[derive(Default)]
pub struct GatewayBuilder {
    route_provider: Option<Arc<dyn RouteProvider>>,
    log_storer: Option<Arc<dyn LogStorer>>,
}

impl GatewayBuilder {
    pub fn route_provider(mut self, provider: Arc<dyn RouteProvider>) -> Self {
        self.route_provider = Some(provider);
        self
    }

    pub fn log_storer(mut self, storer: Arc<dyn LogStorer>) -> Self {
        self.log_storer = Some(storer);
        self
    }

    pub fn build(self) -> Result<Gateway, TlsError> {
        let client = upstream_client(configure_tls("", "", "", false)?);

        Ok(Gateway {
            route_provider: self.route_provider,
            logs: self.log_storer.map(LogDispatcher::new),
            client,
        })
    }
}

/// Request facts carried from route resolution to the response log.
struct Transaction {
    route: Route,
    request_id: RequestId,
    started: Instant,
}

impl Gateway {
    pub fn builder() -> GatewayBuilder {
        GatewayBuilder::default()
    }

    /// Gateway with both collaborators and the default upstream client.
    pub fn new(
        route_provider: Arc<dyn RouteProvider>,
        log_storer: Arc<dyn LogStorer>,
    ) -> Result<Self, TlsError> {
        Self::builder()
            .route_provider(route_provider)
            .log_storer(log_storer)
            .build()
    }

    /// Handle one inbound request.
    ///
    /// The peer address is read from the `ConnectInfo` extension when present.
    pub async fn handle(&self, request: Request<Body>) -> Response<Body> {
        let remote = request
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| *addr);
        let method = request.method().to_string();
        let path = request.uri().path().to_string();
        let start_time = Instant::now();

        match self.serve(request, remote).await {
            Ok((response, route_id)) => {
                metrics::record_request(&method, response.status().as_u16(), &route_id, start_time);
                response
            }
            Err(e) => {
                match &e {
                    GatewayError::NoRoute => {
                        tracing::warn!(method = %method, path = %path, "No route matched");
                    }
                    other => {
                        tracing::error!(
                            method = %method,
                            path = %path,
                            error = ?other,
                            "Gateway error"
                        );
                    }
                }
                metrics::record_request(&method, e.status_code().as_u16(), "none", start_time);
                e.into_response()
            }
        }
    }

    async fn serve(
        &self,
        request: Request<Body>,
        remote: Option<SocketAddr>,
    ) -> Result<(Response<Body>, String), GatewayError> {
        let ip = client_ip(request.headers(), remote)?;

        let route_provider = self
            .route_provider
            .as_ref()
            .ok_or(GatewayError::MissingRouteProvider)?;
        let logs = self.logs.as_ref().ok_or(GatewayError::MissingLogStorer)?;

        let routes = route_provider.routes().await.map_err(GatewayError::Routes)?;
        let route = find_route(&routes, request.uri().path())
            .ok_or(GatewayError::NoRoute)?
            .clone();

        validate_origin(&route.origin_url)?;

        let tx = Transaction {
            request_id: RequestId::new(),
            started: Instant::now(),
            route,
        };
        let timestamp = Utc::now();

        let (parts, body) = request.into_parts();
        let body = axum::body::to_bytes(body, usize::MAX)
            .await
            .map_err(GatewayError::RequestBody)?;

        let urls = request_urls(&RequestTarget::from_parts(&parts), &tx.route);

        tracing::debug!(
            request_id = %tx.request_id,
            route_id = %tx.route.id,
            method = %parts.method,
            origin_url = %urls.origin,
            "Proxying request"
        );

        let pending = logs.request(RequestLog {
            route_id: tx.route.id.clone(),
            request_id: tx.request_id,
            timestamp,
            ip,
            method: parts.method.to_string(),
            gateway_url: urls.gateway.clone(),
            origin_url: urls.origin.clone(),
            headers: clone_header_map(&parts.headers),
            body: body.clone(),
        });

        let response = match self.proxy(&tx.route, parts, body, &urls, remote).await {
            Ok(response) => response,
            Err(e) => {
                tracing::error!(
                    request_id = %tx.request_id,
                    route_id = %tx.route.id,
                    error = ?e,
                    "Upstream request failed"
                );
                e.into_response()
            }
        };

        let route_id = tx.route.id.clone();
        Ok((capture_response(logs, pending, tx, response), route_id))
    }

    /// Forward the buffered request to the origin.
    async fn proxy(
        &self,
        route: &Route,
        mut parts: Parts,
        body: Bytes,
        urls: &RequestUrls,
        remote: Option<SocketAddr>,
    ) -> Result<Response<Body>, GatewayError> {
        let uri: Uri = urls
            .upstream
            .parse()
            .map_err(|e: axum::http::uri::InvalidUri| GatewayError::OriginUrl(e.to_string()))?;

        let client = if route.tls.has_client_cert() {
            let tls = &route.tls;
            let config = configure_tls(
                &tls.client_cert,
                &tls.client_key,
                &tls.ca_cert,
                tls.skip_verify,
            )
            .map_err(GatewayError::Tls)?;
            upstream_client(config)
        } else {
            self.client.clone()
        };

        strip_hop_by_hop(&mut parts.headers);
        // Host is derived from the upstream URI.
        parts.headers.remove(header::HOST);
        if let Some(peer) = remote {
            append_forwarded_for(&mut parts.headers, peer.ip());
        }
        parts.uri = uri;
        parts.version = Version::HTTP_11;

        let response = client
            .request(Request::from_parts(parts, Body::from(body)))
            .await
            .map_err(GatewayError::Upstream)?;

        let (mut parts, body) = response.into_parts();
        strip_hop_by_hop(&mut parts.headers);
        Ok(Response::from_parts(parts, Body::new(body)))
    }
}

fn validate_origin(origin_url: &str) -> Result<(), GatewayError> {
    let url = Url::parse(origin_url).map_err(|e| GatewayError::OriginUrl(e.to_string()))?;
    if url.host_str().is_none() {
        return Err(GatewayError::OriginUrl(format!("missing host in {origin_url}")));
    }
    // The rewritten path and the inbound query are appended to the origin base.
    if url.query().is_some() || url.fragment().is_some() {
        return Err(GatewayError::OriginUrl(format!(
            "query or fragment in origin base {origin_url}"
        )));
    }
    Ok(())
}

/// Stream `response` to the client and emit the response log once it is complete.
fn capture_response(
    logs: &LogDispatcher,
    pending: PendingRequestLog,
    tx: Transaction,
    response: Response<Body>,
) -> Response<Body> {
    let (parts, body) = response.into_parts();
    let (body, captured) = CaptureBody::new(body);

    let status = parts.status.as_u16();
    let headers = clone_header_map(&parts.headers);
    logs.response(pending, async move {
        let body = captured.bytes().await;
        ResponseLog {
            route_id: tx.route.id,
            request_id: tx.request_id,
            timestamp: Utc::now(),
            duration: tx.started.elapsed(),
            status,
            headers,
            body,
        }
    });

    Response::from_parts(parts, Body::new(body))
}
