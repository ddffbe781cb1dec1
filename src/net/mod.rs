//! Network layer: upstream TLS and HTTP client construction.

pub mod tls;

pub use tls::{configure_tls, upstream_client, TlsError, UpstreamClient};
