//! Persisted record shapes.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::routing::{Route, RouteTls};

/// A route as kept in storage, including its logging toggles.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct RouteRecord {
    /// Unique route identifier.
    pub id: String,

    /// Human-readable label.
    #[serde(default)]
    pub name: String,

    /// Inactive routes are neither served nor logged.
    #[serde(default = "default_true")]
    pub active: bool,

    /// Literal path prefix to match.
    #[serde(default)]
    pub endpoint: String,

    /// Base URL of the origin.
    pub origin_url: String,

    /// Record request/response summaries for this route.
    #[serde(default = "default_true")]
    pub store_hits: bool,

    #[serde(default)]
    pub store_req_headers: bool,

    #[serde(default)]
    pub store_req_body: bool,

    /// Bodies larger than this are not stored. `0` disables the cap.
    #[serde(default)]
    pub store_req_body_max_bytes: usize,

    #[serde(default)]
    pub store_res_headers: bool,

    #[serde(default)]
    pub store_res_body: bool,

    #[serde(default)]
    pub store_res_body_max_bytes: usize,

    /// Client certificate (PEM).
    #[serde(default)]
    pub tls_client_cert: String,

    /// Client private key (PEM).
    #[serde(default)]
    pub tls_client_key: String,

    /// CA certificate used to verify the origin (PEM).
    #[serde(default)]
    pub tls_ca_cert: String,

    #[serde(default)]
    pub tls_skip_cert_verify: bool,
}

fn default_true() -> bool {
    true
}

impl RouteRecord {
    /// Minimal active record with every logging toggle at its default.
    pub fn new(
        id: impl Into<String>,
        endpoint: impl Into<String>,
        origin_url: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: String::new(),
            active: true,
            endpoint: endpoint.into(),
            origin_url: origin_url.into(),
            store_hits: true,
            store_req_headers: false,
            store_req_body: false,
            store_req_body_max_bytes: 0,
            store_res_headers: false,
            store_res_body: false,
            store_res_body_max_bytes: 0,
            tls_client_cert: String::new(),
            tls_client_key: String::new(),
            tls_ca_cert: String::new(),
            tls_skip_cert_verify: false,
        }
    }

    /// Project the record onto the shape the gateway routes with.
    pub fn to_route(&self) -> Route {
        Route {
            id: self.id.clone(),
            endpoint: self.endpoint.clone(),
            origin_url: self.origin_url.clone(),
            tls: RouteTls {
                client_cert: self.tls_client_cert.clone(),
                client_key: self.tls_client_key.clone(),
                ca_cert: self.tls_ca_cert.clone(),
                skip_verify: self.tls_skip_cert_verify,
            },
        }
    }
}

/// Request half of a stored transaction.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct RequestEntry {
    pub request_id: String,
    pub route_id: String,
    pub timestamp: DateTime<Utc>,
    pub ip: String,
    pub method: String,
    pub gateway_url: String,
    pub origin_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub headers: Option<BTreeMap<String, Vec<String>>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
}

/// Response half of a stored transaction.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct ResponseEntry {
    pub request_id: String,
    pub route_id: String,
    pub timestamp: DateTime<Utc>,
    pub duration_ms: u64,
    pub status: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub headers: Option<BTreeMap<String, Vec<String>>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
}

/// One line of the request log.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RequestRecord {
    Request(RequestEntry),
    Response(ResponseEntry),
}

impl RequestRecord {
    pub fn request_id(&self) -> &str {
        match self {
            RequestRecord::Request(entry) => &entry.request_id,
            RequestRecord::Response(entry) => &entry.request_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_route_record_defaults() {
        let record: RouteRecord = toml::from_str(
            r#"
            id = "r1"
            endpoint = "/api"
            origin_url = "https://api.example.com"
            "#,
        )
        .unwrap();

        assert!(record.active);
        assert!(record.store_hits);
        assert!(!record.store_req_body);
        assert_eq!(record.store_res_body_max_bytes, 0);
        assert_eq!(record, RouteRecord::new("r1", "/api", "https://api.example.com"));
    }

    #[test]
    fn test_to_route_carries_tls() {
        let mut record = RouteRecord::new("r1", "/svc", "https://up.example.com");
        record.tls_client_cert = "cert".into();
        record.tls_client_key = "key".into();
        record.tls_skip_cert_verify = true;

        let route = record.to_route();
        assert_eq!(route.id, "r1");
        assert_eq!(route.endpoint, "/svc");
        assert_eq!(route.tls.client_key, "key");
        assert!(route.tls.skip_verify);
        assert!(route.tls.ca_cert.is_empty());
    }

    #[test]
    fn test_request_record_is_tagged() {
        let record = RequestRecord::Response(ResponseEntry {
            request_id: "req".into(),
            route_id: "r1".into(),
            timestamp: Utc::now(),
            duration_ms: 12,
            status: 200,
            headers: None,
            body: Some("ok".into()),
        });

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["kind"], "response");
        assert_eq!(json["status"], 200);
        assert!(json.get("headers").is_none());
        assert_eq!(record.request_id(), "req");
    }
}
