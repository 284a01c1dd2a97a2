//! Hop-by-hop header filtering.
//!
//! # Responsibilities
//! - Strip headers that are meaningful for one transport leg only
//! - Drop `content-length` in the response direction (streamed bodies
//!   have no known length; buffered bodies get it recomputed)
//!
//! # Design Decisions
//! - Pure function: no headers are added, renamed, or reordered
//! - Matching is case-insensitive (HeaderName is already lowercase)

use axum::http::HeaderMap;

/// The fixed hop-by-hop header set from RFC 2616 §13.5.1.
const HOP_BY_HOP: [&str; 8] = [
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailers",
    "transfer-encoding",
    "upgrade",
];

/// Which transport leg the headers are being prepared for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Headers forwarded from the caller to the upstream.
    Request,
    /// Headers relayed from the upstream back to the caller.
    Response,
}

/// Return a copy of `headers` with hop-by-hop headers removed.
///
/// All other headers pass through byte-for-byte, including repeated
/// values.
pub fn filter_headers(headers: &HeaderMap, direction: Direction) -> HeaderMap {
    let mut filtered = HeaderMap::with_capacity(headers.len());
    for (name, value) in headers {
        let lower = name.as_str();
        if HOP_BY_HOP.contains(&lower) {
            continue;
        }
        if direction == Direction::Response && lower == "content-length" {
            continue;
        }
        filtered.append(name.clone(), value.clone());
    }
    filtered
}
