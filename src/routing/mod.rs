//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming Request (path)
//!     → provider.rs (current route set, served from the TTL cache)
//!     → matcher.rs (longest literal endpoint prefix)
//!     → rewrite.rs (gateway path → origin path)
//!     → Return: matched Route or NoMatch
//! ```
//!
//! # Design Decisions
//! - Endpoints are raw string prefixes, not path segments: `/api` also matches `/apiv2`
//! - Longest endpoint wins; an empty endpoint is the lowest-priority catch-all
//! - Route sets are small, so every request scans them linearly
//! - Routes are re-read from storage at most once per cache TTL

pub mod matcher;
pub mod provider;
pub mod rewrite;
pub mod route;
pub mod slash;

pub use matcher::find_route;
pub use provider::StoreRouteProvider;
pub use rewrite::gateway_to_origin_path;
pub use route::{ProviderError, Route, RouteProvider, RouteTls};
