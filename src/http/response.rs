//! Gateway error responses.
//!
//! # Responsibilities
//! - Classify pipeline failures
//! - Map each failure to an HTTP status code
//! - Render a plain-text status line for the client
//!
//! # Design Decisions
//! - No structured error body; the message is the body
//! - Upstream transport failures become 502 Bad Gateway

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use crate::http::request::ClientIpError;
use crate::net::tls::TlsError;
use crate::routing::ProviderError;

/// Reasons the gateway answers a request itself instead of the origin.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("Gateway Error: failed to get request IP")]
    ClientIp(#[from] ClientIpError),

    #[error("Gateway Error: route provider is not configured")]
    MissingRouteProvider,

    #[error("Gateway Error: log storer is not configured")]
    MissingLogStorer,

    #[error("Gateway Error: failed to get routes")]
    Routes(#[source] ProviderError),

    #[error("Not Found")]
    NoRoute,

    #[error("Gateway Error: failed to parse destination URL")]
    OriginUrl(String),

    #[error("Gateway Error: failed to read request body")]
    RequestBody(#[source] axum::Error),

    #[error("Gateway Error: failed to configure TLS")]
    Tls(#[source] TlsError),

    #[error("Bad Gateway")]
    Upstream(#[source] hyper_util::client::legacy::Error),
}

impl GatewayError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            GatewayError::NoRoute => StatusCode::NOT_FOUND,
            GatewayError::Upstream(_) => StatusCode::BAD_GATEWAY,
            GatewayError::ClientIp(_)
            | GatewayError::MissingRouteProvider
            | GatewayError::MissingLogStorer
            | GatewayError::Routes(_)
            | GatewayError::OriginUrl(_)
            | GatewayError::RequestBody(_)
            | GatewayError::Tls(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        (self.status_code(), self.to_string()).into_response()
    }
}
