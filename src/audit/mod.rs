//! Request/response recording subsystem.
//!
//! # Data Flow
//! ```text
//! Gateway (per request)
//!     → dispatcher.rs: spawn store_request_log(RequestLog)
//!     → ... proxied call, response streamed to client ...
//!     → dispatcher.rs: spawn store_response_log(ResponseLog)
//!         (waits for the request log task first)
//!
//! RecordLogStorer
//!     → route lookup by id (cached)
//!     → per-route toggles and body size caps
//!     → RequestSink (JSON lines, memory, ...)
//! ```
//!
//! # Design Decisions
//! - Recording is best-effort: failures are logged, never surfaced to clients
//! - The gateway never waits on storage
//! - Bodies travel as `Bytes`, so every reader sees the full payload

pub mod dispatcher;
pub mod events;
pub mod storer;

pub use dispatcher::{LogDispatcher, PendingRequestLog};
pub use events::{LogStorer, RequestLog, ResponseLog};
pub use storer::RecordLogStorer;
