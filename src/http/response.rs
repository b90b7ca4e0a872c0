//! Response handling and transformation.
//!
//! # Responsibilities
//! - Convert upstream responses for the client
//! - Strip hop-by-hop headers
//! - Mark account-bearing responses as uncacheable

use axum::{
    body::Body,
    http::{header, HeaderMap, HeaderValue, Response},
};
use hyper::body::Incoming;

use crate::security::headers::strip_hop_by_hop;

/// Streams an upstream response back to the client.
pub fn from_upstream(response: Response<Incoming>) -> Response<Body> {
    let (mut parts, body) = response.into_parts();
    strip_hop_by_hop(&mut parts.headers);
    Response::from_parts(parts, Body::new(body))
}

/// Forbids caching by browsers and intermediaries.
pub fn no_store(headers: &mut HeaderMap) {
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store, no-cache"));
    headers.insert(header::PRAGMA, HeaderValue::from_static("no-cache"));
}
