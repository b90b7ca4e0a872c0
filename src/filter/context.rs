//! Per-request state shared by the filters of one chain run.

use axum::http::{request::Parts, HeaderMap, HeaderName, HeaderValue, StatusCode};
use std::net::SocketAddr;
use std::sync::Arc;

use crate::routing::Route;
use crate::security::headers::strip_hop_by_hop;

/// State of a single proxied request while the filter chain runs.
///
/// The inbound parts are read-only; filters shape the forwarded request
/// through `upstream_headers`, which starts as a copy of the inbound headers
/// without hop-by-hop fields.
#[derive(Debug)]
pub struct RequestContext {
    inbound: Parts,
    upstream_headers: HeaderMap,
    client_addr: Option<SocketAddr>,
    route: Option<Arc<Route>>,
    short_circuit: Option<StatusCode>,
}

impl RequestContext {
    pub fn new(inbound: Parts, client_addr: Option<SocketAddr>) -> Self {
        let mut upstream_headers = inbound.headers.clone();
        strip_hop_by_hop(&mut upstream_headers);
        Self {
            inbound,
            upstream_headers,
            client_addr,
            route: None,
            short_circuit: None,
        }
    }

    pub fn with_route(mut self, route: Arc<Route>) -> Self {
        self.route = Some(route);
        self
    }

    pub fn inbound(&self) -> &Parts {
        &self.inbound
    }

    pub fn upstream_headers(&self) -> &HeaderMap {
        &self.upstream_headers
    }

    pub fn upstream_headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.upstream_headers
    }

    /// Replaces every occurrence of `name` with a single `value`.
    pub fn set_upstream_header(&mut self, name: HeaderName, value: HeaderValue) {
        self.upstream_headers.insert(name, value);
    }

    /// Removes every occurrence of `name`; returns whether any existed.
    pub fn remove_upstream_header(&mut self, name: &HeaderName) -> bool {
        self.upstream_headers.remove(name).is_some()
    }

    pub fn client_addr(&self) -> Option<SocketAddr> {
        self.client_addr
    }

    pub fn route(&self) -> Option<&Route> {
        self.route.as_deref()
    }

    /// Stops the chain; the request is answered with `status` instead of
    /// being forwarded.
    pub fn short_circuit(&mut self, status: StatusCode) {
        self.short_circuit = Some(status);
    }

    pub fn is_short_circuited(&self) -> bool {
        self.short_circuit.is_some()
    }

    pub fn short_circuit_status(&self) -> Option<StatusCode> {
        self.short_circuit
    }

    pub fn into_parts(self) -> (Parts, HeaderMap) {
        (self.inbound, self.upstream_headers)
    }
}
