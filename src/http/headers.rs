//! Case-insensitive header normalization for incoming requests.

use crate::http::GateRequest;
use std::collections::HashMap;

/// Rewrite the request's header map so every key is lowercase.
///
/// Applied in place, exactly once per invocation, before any middleware or
/// route handler runs; every downstream lookup assumes the lowercase key
/// invariant. Duplicate keys differing only in case collapse to a single
/// entry. Best effort: an empty map is left untouched.
pub fn normalize_headers(request: &mut GateRequest) {
    if request.headers.is_empty() {
        return;
    }
    let normalized: HashMap<String, String> = request
        .headers
        .drain()
        .map(|(key, value)| (key.to_ascii_lowercase(), value))
        .collect();
    request.headers = normalized;
}
