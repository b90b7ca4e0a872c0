//! Route lookup and upstream URI construction.
//!
//! # Responsibilities
//! - Store compiled routes
//! - Look up matching route for request
//! - Rewrite the request URI onto the route's upstream
//!
//! # Design Decisions
//! - Immutable after construction (thread-safe without locks)
//! - Higher priority first, then longer prefix, then declaration order
//! - Explicit `None` rather than a silent default route

use axum::http::{request::Parts, uri::InvalidUri, Uri};
use std::sync::Arc;
use url::Url;

use crate::config::RouteConfig;
use crate::routing::matcher::{AndMatcher, HostMatcher, Matcher, PathPrefixMatcher};

/// A compiled route.
#[derive(Debug)]
pub struct Route {
    pub name: String,
    pub priority: u32,
    matcher: AndMatcher,
    prefix: String,
    target: Url,
    strip_prefix: bool,
}

impl Route {
    /// Compiles a route; fails if the upstream URL does not parse.
    pub fn from_config(config: &RouteConfig) -> Result<Self, url::ParseError> {
        let target = Url::parse(&config.url)?;
        let prefix = config.path_prefix.trim_end_matches('/').to_string();

        let mut matchers: Vec<Box<dyn Matcher>> = vec![Box::new(PathPrefixMatcher::new(prefix.clone()))];
        if let Some(host) = &config.host {
            matchers.push(Box::new(HostMatcher::new(host.clone())));
        }

        Ok(Self {
            name: config.name.clone(),
            priority: config.priority,
            matcher: AndMatcher::new(matchers),
            prefix,
            target,
            strip_prefix: config.strip_prefix,
        })
    }

    pub fn matches(&self, req: &Parts) -> bool {
        self.matcher.matches(req)
    }

    pub fn target(&self) -> &Url {
        &self.target
    }

    /// The prefix removed from forwarded paths, if any.
    pub fn stripped_prefix(&self) -> Option<&str> {
        (self.strip_prefix && !self.prefix.is_empty()).then_some(self.prefix.as_str())
    }

    /// Maps an inbound URI onto this route's upstream, keeping the query.
    pub fn upstream_uri(&self, original: &Uri) -> Result<Uri, InvalidUri> {
        let path = original.path();
        let rest = match self.stripped_prefix() {
            Some(prefix) => path.strip_prefix(prefix).unwrap_or(path),
            None => path,
        };

        let mut joined = self.target.path().trim_end_matches('/').to_string();
        if !rest.is_empty() && !rest.starts_with('/') {
            joined.push('/');
        }
        joined.push_str(rest);
        if !joined.starts_with('/') {
            joined.insert(0, '/');
        }

        let host = self.target.host_str().unwrap_or_default();
        let mut uri = match self.target.port() {
            Some(port) => format!("{}://{}:{}{}", self.target.scheme(), host, port, joined),
            None => format!("{}://{}{}", self.target.scheme(), host, joined),
        };
        if let Some(query) = original.query() {
            uri.push('?');
            uri.push_str(query);
        }
        uri.parse()
    }
}

/// Ordered set of routes.
#[derive(Debug, Default)]
pub struct Router {
    routes: Vec<Arc<Route>>,
}

impl Router {
    /// Compiles routes; invalid ones are logged and skipped.
    pub fn from_config(configs: &[RouteConfig]) -> Self {
        let mut routes: Vec<Arc<Route>> = Vec::with_capacity(configs.len());
        for config in configs {
            match Route::from_config(config) {
                Ok(route) => routes.push(Arc::new(route)),
                Err(e) => tracing::warn!(route = %config.name, url = %config.url, error = %e, "Skipping route with invalid upstream"),
            }
        }
        routes.sort_by(|a, b| {
            b.priority
                .cmp(&a.priority)
                .then_with(|| b.prefix.len().cmp(&a.prefix.len()))
        });
        Self { routes }
    }

    /// First route matching the request.
    pub fn match_request(&self, req: &Parts) -> Option<Arc<Route>> {
        self.routes.iter().find(|r| r.matches(req)).cloned()
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;

    fn route(name: &str, prefix: &str, url: &str) -> RouteConfig {
        RouteConfig {
            name: name.into(),
            host: None,
            path_prefix: prefix.into(),
            url: url.into(),
            strip_prefix: true,
            priority: 0,
        }
    }

    fn parts(uri: &str) -> Parts {
        Request::builder().uri(uri).body(Body::empty()).unwrap().into_parts().0
    }

    #[test]
    fn test_longest_prefix_wins() {
        let router = Router::from_config(&[
            route("root", "/", "http://127.0.0.1:3000"),
            route("api", "/api", "http://127.0.0.1:3001"),
        ]);

        assert_eq!(router.match_request(&parts("/api/users")).unwrap().name, "api");
        assert_eq!(router.match_request(&parts("/other")).unwrap().name, "root");
    }

    #[test]
    fn test_priority_beats_length() {
        let mut root = route("root", "/", "http://127.0.0.1:3000");
        root.priority = 10;
        let router = Router::from_config(&[root, route("api", "/api", "http://127.0.0.1:3001")]);

        assert_eq!(router.match_request(&parts("/api/users")).unwrap().name, "root");
    }

    #[test]
    fn test_no_match() {
        let router = Router::from_config(&[route("api", "/api", "http://127.0.0.1:3001")]);
        assert!(router.match_request(&parts("/web")).is_none());
    }

    #[test]
    fn test_invalid_route_skipped() {
        let router = Router::from_config(&[route("bad", "/", "not a url")]);
        assert!(router.is_empty());
    }

    #[test]
    fn test_upstream_uri_strips_prefix() {
        let r = Route::from_config(&route("api", "/api/", "http://backend:8080/v1")).unwrap();
        let uri: Uri = "/api/users?page=2".parse().unwrap();
        assert_eq!(r.upstream_uri(&uri).unwrap(), "http://backend:8080/v1/users?page=2");
        assert_eq!(r.stripped_prefix(), Some("/api"));

        let uri: Uri = "/api".parse().unwrap();
        assert_eq!(r.upstream_uri(&uri).unwrap(), "http://backend:8080/v1");
    }

    #[test]
    fn test_upstream_uri_keeps_prefix() {
        let mut config = route("api", "/api", "http://backend");
        config.strip_prefix = false;
        let r = Route::from_config(&config).unwrap();

        let uri: Uri = "/api/users".parse().unwrap();
        assert_eq!(r.upstream_uri(&uri).unwrap(), "http://backend/api/users");
        assert_eq!(r.stripped_prefix(), None);
    }

    #[test]
    fn test_upstream_uri_root() {
        let r = Route::from_config(&route("root", "/", "http://127.0.0.1:3000")).unwrap();
        let uri: Uri = "/".parse().unwrap();
        assert_eq!(r.upstream_uri(&uri).unwrap(), "http://127.0.0.1:3000/");
    }
}
