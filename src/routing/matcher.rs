//! Route matching logic.
//!
//! # Responsibilities
//! - Select the route whose endpoint is the longest literal prefix of the path
//! - Report an explicit no-match when nothing qualifies
//!
//! # Design Decisions
//! - Path matching is case-sensitive and byte-wise
//! - Empty endpoint = always matches (catch-all, lowest priority)
//! - Equal-length endpoints: the last one in iteration order wins

use crate::routing::route::Route;

/// Find the most specific route for `path`.
pub fn find_route<'a>(routes: &'a [Route], path: &str) -> Option<&'a Route> {
    let mut best: Option<&Route> = None;

    for route in routes {
        if !path.starts_with(route.endpoint.as_str()) {
            continue;
        }
        match best {
            Some(current) if route.endpoint.len() < current.endpoint.len() => {}
            _ => best = Some(route),
        }
    }

    best
}
