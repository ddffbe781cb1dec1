//! Request inspection helpers.
//!
//! # Responsibilities
//! - Generate unique request IDs (UUID v4)
//! - Resolve the client IP (X-Forwarded-For, then transport peer)
//! - Reconstruct the gateway-facing and origin-facing URLs
//! - Snapshot headers for logging
//!
//! # Design Decisions
//! - Loopback peers are normalized to `127.0.0.1`
//! - URL reconstruction is string-level and mirrors the path rewriter

use std::collections::BTreeMap;
use std::fmt;
use std::net::{IpAddr, SocketAddr};

use axum::http::{header, request::Parts, HeaderMap};
use thiserror::Error;
use uuid::Uuid;

use crate::http::headers::X_FORWARDED_FOR;
use crate::routing::slash::{remove_all_leading_slashes, remove_all_trailing_slashes};
use crate::routing::{gateway_to_origin_path, Route};

/// Header name → every value, with names in lowercase.
pub type CapturedHeaders = BTreeMap<String, Vec<String>>;

/// Unique identifier of one proxied transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RequestId(Uuid);

impl RequestId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ClientIpError {
    #[error("IP not found")]
    NotFound,
}

/// Resolve the client IP for a request.
///
/// The first `X-Forwarded-For` entry wins when it parses as an IP; otherwise the
/// transport peer address is used, with loopback normalized to `127.0.0.1`.
pub fn client_ip(headers: &HeaderMap, remote: Option<SocketAddr>) -> Result<String, ClientIpError> {
    let forwarded = headers
        .get(X_FORWARDED_FOR)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .and_then(|first| first.trim().parse::<IpAddr>().ok());
    if let Some(ip) = forwarded {
        return Ok(ip.to_canonical().to_string());
    }

    let ip = remote.ok_or(ClientIpError::NotFound)?.ip().to_canonical();
    if ip.is_loopback() {
        return Ok("127.0.0.1".to_string());
    }
    Ok(ip.to_string())
}

/// Copy every header into an owned multi-map. Non UTF-8 values are converted lossily.
pub fn clone_header_map(headers: &HeaderMap) -> CapturedHeaders {
    let mut cloned = CapturedHeaders::new();
    for (name, value) in headers {
        cloned
            .entry(name.as_str().to_string())
            .or_default()
            .push(String::from_utf8_lossy(value.as_bytes()).into_owned());
    }
    cloned
}

/// The parts of an inbound request URL needed to rebuild it.
#[derive(Debug, Clone, Copy, Default)]
pub struct RequestTarget<'a> {
    pub scheme: Option<&'a str>,
    pub host: &'a str,
    pub path: &'a str,
    pub query: Option<&'a str>,
    pub fragment: Option<&'a str>,
}

impl<'a> RequestTarget<'a> {
    /// Read the target from request parts. The authority of an absolute-form
    /// URI takes precedence over the `Host` header.
    pub fn from_parts(parts: &'a Parts) -> Self {
        let host = parts
            .uri
            .authority()
            .map(|a| a.as_str())
            .or_else(|| parts.headers.get(header::HOST).and_then(|h| h.to_str().ok()))
            .unwrap_or_default();

        Self {
            scheme: parts.uri.scheme_str(),
            host,
            path: parts.uri.path(),
            query: parts.uri.query(),
            fragment: None,
        }
    }
}

/// URLs of one transaction, as seen from each side of the gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestUrls {
    /// URL the client called.
    pub gateway: String,
    /// URL the request is forwarded to, fragment included.
    pub origin: String,
    /// `origin` without the fragment, suitable for the upstream call.
    pub upstream: String,
}

/// Rebuild the gateway-facing and origin-facing URLs for `target` routed by `route`.
pub fn request_urls(target: &RequestTarget<'_>, route: &Route) -> RequestUrls {
    let scheme = target.scheme.filter(|s| !s.is_empty()).unwrap_or("http");
    let gateway_path = remove_all_leading_slashes(target.path);
    let origin_path = gateway_to_origin_path(gateway_path, &route.endpoint);

    let mut gateway = format!("{scheme}://{}", target.host);
    if !gateway_path.is_empty() {
        gateway = format!("{}/{}", remove_all_trailing_slashes(&gateway), gateway_path);
    }

    let mut upstream = route.origin_url.clone();
    if !origin_path.is_empty() {
        upstream = format!("{}/{}", remove_all_trailing_slashes(&upstream), origin_path);
    }

    if let Some(query) = target.query.filter(|q| !q.is_empty()) {
        gateway.push('?');
        gateway.push_str(query);
        upstream.push('?');
        upstream.push_str(query);
    }

    let mut origin = upstream.clone();
    if let Some(fragment) = target.fragment.filter(|f| !f.is_empty()) {
        gateway.push('#');
        gateway.push_str(fragment);
        origin.push('#');
        origin.push_str(fragment);
    }

    RequestUrls {
        gateway,
        origin,
        upstream,
    }
}
