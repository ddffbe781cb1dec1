//! Log storer writing request records through a [`RequestSink`].

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;

use crate::audit::events::{LogStorer, RequestLog, ResponseLog};
use crate::store::{
    CachedRouteStore, RequestEntry, RequestRecord, RequestSink, ResponseEntry, RouteRecord,
};

/// Stores events subject to the owning route's logging toggles.
pub struct RecordLogStorer {
    routes: Arc<CachedRouteStore>,
    sink: Arc<dyn RequestSink>,
}

impl RecordLogStorer {
    pub fn new(routes: Arc<CachedRouteStore>, sink: Arc<dyn RequestSink>) -> Self {
        Self { routes, sink }
    }

    /// Look up the route and decide whether it records hits at all.
    async fn recording_route(&self, route_id: &str, op: &'static str) -> Option<Arc<RouteRecord>> {
        let route = match self.routes.cached_route_by_id(route_id).await {
            Ok(route) => route,
            Err(e) => {
                tracing::error!(route_id = %route_id, op, error = %e, "Failed to get route by id");
                return None;
            }
        };

        (route.active && route.store_hits).then_some(route)
    }
}

/// Body text to store, or `None` when the body exceeds `max_bytes` (`0` = no cap).
fn capped_body(body: &Bytes, max_bytes: usize) -> Option<String> {
    if max_bytes > 0 && body.len() > max_bytes {
        return None;
    }
    Some(String::from_utf8_lossy(body).into_owned())
}

#[async_trait]
impl LogStorer for RecordLogStorer {
    async fn store_request_log(&self, log: RequestLog) {
        let Some(route) = self.recording_route(&log.route_id, "store_request_log").await else {
            return;
        };

        let body = if route.store_req_body {
            let body = capped_body(&log.body, route.store_req_body_max_bytes);
            if body.is_none() {
                tracing::debug!(
                    request_id = %log.request_id,
                    size = log.body.len(),
                    max = route.store_req_body_max_bytes,
                    "Request body over size cap, not stored"
                );
            }
            body
        } else {
            None
        };

        let entry = RequestEntry {
            request_id: log.request_id.to_string(),
            route_id: log.route_id,
            timestamp: log.timestamp,
            ip: log.ip,
            method: log.method,
            gateway_url: log.gateway_url,
            origin_url: log.origin_url,
            headers: route.store_req_headers.then_some(log.headers),
            body,
        };

        if let Err(e) = self.sink.append(RequestRecord::Request(entry)).await {
            tracing::error!(
                route_id = %route.id,
                request_id = %log.request_id,
                error = %e,
                "Failed to store request log"
            );
        }
    }

    async fn store_response_log(&self, log: ResponseLog) {
        let Some(route) = self.recording_route(&log.route_id, "store_response_log").await else {
            return;
        };

        let body = if route.store_res_body {
            capped_body(&log.body, route.store_res_body_max_bytes)
        } else {
            None
        };

        let entry = ResponseEntry {
            request_id: log.request_id.to_string(),
            route_id: log.route_id,
            timestamp: log.timestamp,
            duration_ms: u64::try_from(log.duration.as_millis()).unwrap_or(u64::MAX),
            status: log.status,
            headers: route.store_res_headers.then_some(log.headers),
            body,
        };

        if let Err(e) = self.sink.append(RequestRecord::Response(entry)).await {
            tracing::error!(
                route_id = %route.id,
                request_id = %log.request_id,
                error = %e,
                "Failed to store response log"
            );
        }
    }
}
