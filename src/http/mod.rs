//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, catch-all handler)
//!     → gateway.rs (client IP, route match, URL rewrite)
//!     → request.rs (request ID, URLs, header capture)
//!     → headers.rs (hop-by-hop removal, X-Forwarded-For)
//!     → upstream origin
//!     → capture.rs (stream response back while recording it)
//!     → response.rs (gateway-generated error responses)
//! ```

pub mod capture;
pub mod gateway;
pub mod headers;
pub mod request;
pub mod response;
pub mod server;

pub use gateway::{Gateway, GatewayBuilder};
pub use request::{CapturedHeaders, RequestId};
pub use response::GatewayError;
pub use server::HttpServer;
