//! Relay gateway library.
//!
//! A reverse-proxy gateway that forwards requests to per-route origins and
//! records each request/response pair for later inspection.

pub mod audit;
pub mod cache;
pub mod config;
pub mod http;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod routing;
pub mod store;

pub use config::GatewayConfig;
pub use http::{Gateway, HttpServer};
pub use lifecycle::{Application, Shutdown};
