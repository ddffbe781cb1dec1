//! Structured logging.
//!
//! # Design Decisions
//! - `RUST_LOG` overrides the configured filter
//! - Human-readable fmt output on stdout

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Default filter used when neither `RUST_LOG` nor the config provide one.
pub const DEFAULT_FILTER: &str = "relay_gateway=info,tower_http=info";

/// Install the global tracing subscriber.
///
/// Returns `false` if a subscriber was already installed.
pub fn init(configured_filter: &str) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(configured_filter))
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init()
        .is_ok()
}
