//! Filter chain execution.

use std::sync::Arc;
use tracing::{trace, warn};

use crate::error::FilterError;
use crate::filter::{FilterStage, OnError, ProxyFilter, RequestContext};
use crate::observability::metrics;

/// Immutable, ordered list of filters.
#[derive(Clone, Default)]
pub struct FilterChain {
    filters: Vec<Arc<dyn ProxyFilter>>,
}

impl FilterChain {
    /// Orders `filters` by (stage, order); ties keep their given order.
    pub fn new(mut filters: Vec<Arc<dyn ProxyFilter>>) -> Self {
        filters.sort_by_key(|f| (f.stage(), f.order()));
        Self { filters }
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    /// Filter names in execution order.
    pub fn names(&self) -> Vec<&'static str> {
        self.filters.iter().map(|f| f.name()).collect()
    }

    /// Runs every filter of `stage` against `ctx`.
    ///
    /// Returns an error only when a failing filter demands rejection; other
    /// failures are logged and the remaining filters still run.
    pub fn run(&self, stage: FilterStage, ctx: &mut RequestContext) -> Result<(), FilterError> {
        for filter in self.filters.iter().filter(|f| f.stage() == stage) {
            if !filter.should_filter(ctx) {
                trace!(filter = filter.name(), %stage, "Filter skipped");
                continue;
            }

            if let Err(e) = filter.run(ctx) {
                let err = FilterError::new(filter.name(), e);
                metrics::record_filter_error(filter.name());
                match filter.on_error() {
                    OnError::Omit => {
                        warn!(filter = filter.name(), %stage, error = %err.source, "Filter failed, continuing without it");
                    }
                    OnError::Reject => return Err(err),
                }
            }
        }
        Ok(())
    }
}

impl std::fmt::Debug for FilterChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FilterChain")
            .field("filters", &self.names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ForwardError, ResolveError};
    use axum::body::Body;
    use axum::http::{HeaderName, HeaderValue, Request, StatusCode};

    /// Appends its name to the `x-trace` header.
    struct Tracer {
        name: &'static str,
        stage: FilterStage,
        order: i32,
        fail: Option<OnError>,
    }

    impl Tracer {
        fn new(name: &'static str, stage: FilterStage, order: i32) -> Arc<dyn ProxyFilter> {
            Arc::new(Self { name, stage, order, fail: None })
        }

        fn failing(name: &'static str, order: i32, policy: OnError) -> Arc<dyn ProxyFilter> {
            Arc::new(Self { name, stage: FilterStage::Pre, order, fail: Some(policy) })
        }
    }

    impl ProxyFilter for Tracer {
        fn name(&self) -> &'static str {
            self.name
        }

        fn stage(&self) -> FilterStage {
            self.stage
        }

        fn order(&self) -> i32 {
            self.order
        }

        fn run(&self, ctx: &mut RequestContext) -> Result<(), ForwardError> {
            if self.fail.is_some() {
                return Err(ResolveError::NotFound.into());
            }
            ctx.upstream_headers_mut().append(
                HeaderName::from_static("x-trace"),
                HeaderValue::from_static(self.name),
            );
            Ok(())
        }

        fn on_error(&self) -> OnError {
            self.fail.unwrap_or_default()
        }
    }

    /// Short-circuits the request.
    struct Blocker;

    impl ProxyFilter for Blocker {
        fn name(&self) -> &'static str {
            "blocker"
        }

        fn stage(&self) -> FilterStage {
            FilterStage::Pre
        }

        fn order(&self) -> i32 {
            0
        }

        fn run(&self, ctx: &mut RequestContext) -> Result<(), ForwardError> {
            ctx.short_circuit(StatusCode::FORBIDDEN);
            Ok(())
        }
    }

    fn ctx() -> RequestContext {
        let (parts, _) = Request::builder().uri("/").body(Body::empty()).unwrap().into_parts();
        RequestContext::new(parts, None)
    }

    fn trace(ctx: &RequestContext) -> Vec<&str> {
        ctx.upstream_headers()
            .get_all("x-trace")
            .iter()
            .map(|v| v.to_str().unwrap())
            .collect()
    }

    #[test]
    fn test_order_within_stage() {
        let chain = FilterChain::new(vec![
            Tracer::new("late", FilterStage::Pre, 10),
            Tracer::new("route", FilterStage::Route, -100),
            Tracer::new("early", FilterStage::Pre, -1),
            Tracer::new("tie-a", FilterStage::Pre, 0),
            Tracer::new("tie-b", FilterStage::Pre, 0),
        ]);
        assert_eq!(chain.names(), vec!["early", "tie-a", "tie-b", "late", "route"]);

        let mut ctx = ctx();
        chain.run(FilterStage::Pre, &mut ctx).unwrap();
        assert_eq!(trace(&ctx), vec!["early", "tie-a", "tie-b", "late"]);

        chain.run(FilterStage::Route, &mut ctx).unwrap();
        assert_eq!(trace(&ctx).last(), Some(&"route"));
    }

    #[test]
    fn test_short_circuit_skips_remaining_filters() {
        let chain = FilterChain::new(vec![
            Arc::new(Blocker),
            Tracer::new("after", FilterStage::Pre, 1),
        ]);

        let mut ctx = ctx();
        chain.run(FilterStage::Pre, &mut ctx).unwrap();
        assert!(ctx.is_short_circuited());
        assert!(trace(&ctx).is_empty());
    }

    #[test]
    fn test_omitting_failure_continues() {
        let chain = FilterChain::new(vec![
            Tracer::failing("broken", 0, OnError::Omit),
            Tracer::new("after", FilterStage::Pre, 1),
        ]);

        let mut ctx = ctx();
        chain.run(FilterStage::Pre, &mut ctx).unwrap();
        assert_eq!(trace(&ctx), vec!["after"]);
    }

    #[test]
    fn test_rejecting_failure_stops_chain() {
        let chain = FilterChain::new(vec![
            Tracer::failing("broken", 0, OnError::Reject),
            Tracer::new("after", FilterStage::Pre, 1),
        ]);

        let mut ctx = ctx();
        let err = chain.run(FilterStage::Pre, &mut ctx).unwrap_err();
        assert_eq!(err.filter, "broken");
        assert!(trace(&ctx).is_empty());
    }
}
