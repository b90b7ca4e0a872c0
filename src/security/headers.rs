//! Header hygiene for forwarded requests.
//!
//! # Responsibilities
//! - Strip hop-by-hop headers in both directions
//! - Add X-Forwarded-For, X-Forwarded-Proto, X-Forwarded-Host, X-Forwarded-Prefix
//!
//! # Design Decisions
//! - X-Forwarded-For is appended to, the others are replaced
//! - Names listed in `Connection` are hop-by-hop as well

use axum::http::{header, HeaderMap, HeaderName, HeaderValue};

use crate::error::ForwardError;
use crate::filter::{FilterStage, ProxyFilter, RequestContext};

pub const X_FORWARDED_FOR: HeaderName = HeaderName::from_static("x-forwarded-for");
pub const X_FORWARDED_HOST: HeaderName = HeaderName::from_static("x-forwarded-host");
pub const X_FORWARDED_PROTO: HeaderName = HeaderName::from_static("x-forwarded-proto");
pub const X_FORWARDED_PREFIX: HeaderName = HeaderName::from_static("x-forwarded-prefix");

const HOP_BY_HOP: [HeaderName; 9] = [
    header::CONNECTION,
    HeaderName::from_static("keep-alive"),
    HeaderName::from_static("proxy-connection"),
    header::PROXY_AUTHENTICATE,
    header::PROXY_AUTHORIZATION,
    header::TE,
    header::TRAILER,
    header::TRANSFER_ENCODING,
    header::UPGRADE,
];

/// Removes hop-by-hop headers, including any named by `Connection`.
pub fn strip_hop_by_hop(headers: &mut HeaderMap) {
    let listed: Vec<HeaderName> = headers
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .filter_map(|name| HeaderName::from_bytes(name.trim().as_bytes()).ok())
        .collect();

    for name in listed.iter().chain(HOP_BY_HOP.iter()) {
        headers.remove(name);
    }
}

/// Adds the conventional `X-Forwarded-*` headers.
#[derive(Debug, Clone, Copy, Default)]
pub struct ForwardedHeadersFilter;

impl ProxyFilter for ForwardedHeadersFilter {
    fn name(&self) -> &'static str {
        "forwarded-headers"
    }

    fn stage(&self) -> FilterStage {
        FilterStage::Pre
    }

    fn order(&self) -> i32 {
        5
    }

    fn run(&self, ctx: &mut RequestContext) -> Result<(), ForwardError> {
        if let Some(addr) = ctx.client_addr() {
            let ip = addr.ip().to_string();
            let value = match ctx
                .upstream_headers()
                .get(&X_FORWARDED_FOR)
                .and_then(|v| v.to_str().ok())
            {
                Some(existing) if !existing.trim().is_empty() => format!("{}, {}", existing, ip),
                _ => ip,
            };
            ctx.set_upstream_header(X_FORWARDED_FOR, HeaderValue::from_str(&value)?);
        }

        if let Some(host) = ctx.inbound().headers.get(header::HOST).cloned() {
            ctx.set_upstream_header(X_FORWARDED_HOST, host);
        }

        // The listener is plain HTTP
        ctx.set_upstream_header(X_FORWARDED_PROTO, HeaderValue::from_static("http"));

        if let Some(prefix) = ctx.route().and_then(|r| r.stripped_prefix()).map(str::to_string) {
            ctx.set_upstream_header(X_FORWARDED_PREFIX, HeaderValue::from_str(&prefix)?);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use std::net::SocketAddr;

    #[test]
    fn test_strip_hop_by_hop() {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONNECTION, HeaderValue::from_static("keep-alive, x-secret"));
        headers.insert("keep-alive", HeaderValue::from_static("timeout=5"));
        headers.insert("x-secret", HeaderValue::from_static("1"));
        headers.insert(header::TRANSFER_ENCODING, HeaderValue::from_static("chunked"));
        headers.insert(header::ACCEPT, HeaderValue::from_static("*/*"));

        strip_hop_by_hop(&mut headers);

        assert_eq!(headers.len(), 1);
        assert!(headers.contains_key(header::ACCEPT));
    }

    #[test]
    fn test_forwarded_headers() {
        let (parts, _) = Request::builder()
            .uri("/api/users")
            .header(header::HOST, "gateway.local")
            .header(X_FORWARDED_FOR, "10.0.0.1")
            .body(Body::empty())
            .unwrap()
            .into_parts();
        let addr: SocketAddr = "192.168.1.7:5000".parse().unwrap();
        let mut ctx = RequestContext::new(parts, Some(addr));

        ForwardedHeadersFilter.run(&mut ctx).unwrap();

        let headers = ctx.upstream_headers();
        assert_eq!(headers.get(&X_FORWARDED_FOR).unwrap(), "10.0.0.1, 192.168.1.7");
        assert_eq!(headers.get(&X_FORWARDED_HOST).unwrap(), "gateway.local");
        assert_eq!(headers.get(&X_FORWARDED_PROTO).unwrap(), "http");
        assert!(headers.get(&X_FORWARDED_PREFIX).is_none());
    }

    #[test]
    fn test_proto_ignores_absolute_form_scheme() {
        let (parts, _) = Request::builder()
            .uri("https://gateway.local/orders")
            .body(Body::empty())
            .unwrap()
            .into_parts();
        let mut ctx = RequestContext::new(parts, None);

        ForwardedHeadersFilter.run(&mut ctx).unwrap();

        assert_eq!(ctx.upstream_headers().get(&X_FORWARDED_PROTO).unwrap(), "http");
        assert!(ctx.upstream_headers().get(&X_FORWARDED_FOR).is_none());
    }
}
