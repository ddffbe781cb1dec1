//! Translation of gateway-facing paths into origin-facing paths.

use crate::routing::slash::remove_all_leading_slashes;

/// Strip `endpoint` from `gateway_path` after slash normalization.
///
/// Both inputs lose all leading slashes, the cleaned endpoint is removed as a
/// literal prefix, and leading slashes are stripped again from the rest. This is
/// string-level: endpoint `/api` strips against `/apiv2` as well.
pub fn gateway_to_origin_path(gateway_path: &str, endpoint: &str) -> String {
    let clean_path = remove_all_leading_slashes(gateway_path);
    let clean_endpoint = remove_all_leading_slashes(endpoint);
    let rest = clean_path.strip_prefix(clean_endpoint).unwrap_or(clean_path);
    remove_all_leading_slashes(rest).to_string()
}
