//! Persistence collaborators.
//!
//! # Data Flow
//! ```text
//! Route lookups:
//!     StoreRouteProvider / RecordLogStorer
//!     → routes.rs CachedRouteStore (TTL cache, 5s)
//!     → miss: FileRouteStore (TOML routes file) or MemoryRouteStore
//!
//! Request records:
//!     RecordLogStorer
//!     → requests.rs RequestSink
//!     → JsonlRequestSink (append-only file) or MemoryRequestSink
//! ```
//!
//! # Design Decisions
//! - Storage is reached only through the `RouteStore` and `RequestSink` traits
//! - The routes file is re-read on cache miss, so edits apply within one TTL
//! - Retention of stored records is handled outside the gateway

pub mod records;
pub mod requests;
pub mod routes;

pub use records::{RequestEntry, RequestRecord, ResponseEntry, RouteRecord};
pub use requests::{JsonlRequestSink, MemoryRequestSink, RequestSink};
pub use routes::{CachedRouteStore, CachedRoutes, FileRouteStore, MemoryRouteStore, RouteStore};

use thiserror::Error;

/// Errors raised by storage backends.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Route not found: {0}")]
    RouteNotFound(String),
}
