//! Short-lived caching subsystem.
//!
//! # Data Flow
//! ```text
//! lookup(key)
//!     → ttl.rs (single-lock map, lazy eviction on read)
//!     → hit: return stored handle
//!     → miss: caller fetches from storage and calls set(key, value, ttl)
//!
//! Background:
//!     sweeper task wakes every sweep interval
//!     → removes every expired entry
//!     → exits on shutdown broadcast
//! ```
//!
//! # Design Decisions
//! - One owned instance built at startup, shared via clone (inner `Arc`)
//! - Values are typed per cache; no runtime casts
//! - Expired entries are bounded in memory to one sweep interval

pub mod ttl;

pub use ttl::{TtlCache, DEFAULT_SWEEP_INTERVAL};
