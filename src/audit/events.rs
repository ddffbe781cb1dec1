//! Log events handed from the gateway to the log storer.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};

use crate::http::request::{CapturedHeaders, RequestId};

/// Request half of a proxied transaction.
#[derive(Debug, Clone)]
pub struct RequestLog {
    /// Route that handled the request.
    pub route_id: String,
    /// Correlates this event with its [`ResponseLog`].
    pub request_id: RequestId,
    /// When the gateway received the request.
    pub timestamp: DateTime<Utc>,
    pub ip: String,
    pub method: String,
    /// URL as seen by the client.
    pub gateway_url: String,
    /// URL the request was forwarded to.
    pub origin_url: String,
    pub headers: CapturedHeaders,
    pub body: Bytes,
}

/// Response half of a proxied transaction.
#[derive(Debug, Clone)]
pub struct ResponseLog {
    pub route_id: String,
    pub request_id: RequestId,
    /// When the response finished.
    pub timestamp: DateTime<Utc>,
    pub duration: Duration,
    pub status: u16,
    pub headers: CapturedHeaders,
    pub body: Bytes,
}

/// Persists log events.
///
/// Calls are fire-and-forget from the gateway's side and may run concurrently.
#[async_trait]
pub trait LogStorer: Send + Sync {
    async fn store_request_log(&self, log: RequestLog);
    async fn store_response_log(&self, log: ResponseLog);
}
