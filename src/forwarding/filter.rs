//! Filter that attaches the forwarded account header to upstream requests.

use axum::http::{HeaderName, HeaderValue};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

use crate::error::ForwardError;
use crate::filter::{FilterStage, OnError, ProxyFilter, RequestContext};
use crate::forwarding::header_value::HeaderValueResolver;
use crate::observability::metrics;

/// Default outbound header name.
pub const X_FORWARDED_ACCOUNT: &str = "x-forwarded-account";

/// Treatment of a same-named inbound header when no account is attached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MissingAccountPolicy {
    /// Leave the upstream headers exactly as received.
    #[default]
    Preserve,
    /// Drop any client-supplied header of the configured name.
    Strip,
}

/// Sets the configured header to the projected account of the request.
pub struct ForwardedAccountHeaderFilter {
    stage: FilterStage,
    order: i32,
    header_name: HeaderName,
    on_missing: MissingAccountPolicy,
    on_error: OnError,
    values: Arc<dyn HeaderValueResolver>,
}

impl ForwardedAccountHeaderFilter {
    pub fn new(header_name: HeaderName, values: Arc<dyn HeaderValueResolver>) -> Self {
        Self {
            stage: FilterStage::Pre,
            order: 0,
            header_name,
            on_missing: MissingAccountPolicy::Preserve,
            on_error: OnError::Omit,
            values,
        }
    }

    pub fn with_stage(mut self, stage: FilterStage) -> Self {
        self.stage = stage;
        self
    }

    pub fn with_order(mut self, order: i32) -> Self {
        self.order = order;
        self
    }

    pub fn with_missing_account(mut self, policy: MissingAccountPolicy) -> Self {
        self.on_missing = policy;
        self
    }

    pub fn with_on_error(mut self, policy: OnError) -> Self {
        self.on_error = policy;
        self
    }

    pub fn header_name(&self) -> &HeaderName {
        &self.header_name
    }
}

impl ProxyFilter for ForwardedAccountHeaderFilter {
    fn name(&self) -> &'static str {
        "forwarded-account"
    }

    fn stage(&self) -> FilterStage {
        self.stage
    }

    fn order(&self) -> i32 {
        self.order
    }

    fn run(&self, ctx: &mut RequestContext) -> Result<(), ForwardError> {
        // Strip applies whether or not an account is attached
        let stripped = self.on_missing == MissingAccountPolicy::Strip
            && ctx.remove_upstream_header(&self.header_name);

        let value = self.values.resolve(ctx.inbound()).and_then(|value| {
            value
                .map(|v| HeaderValue::from_str(&v).map_err(ForwardError::from))
                .transpose()
        });

        match value {
            Ok(Some(value)) => {
                ctx.set_upstream_header(self.header_name.clone(), value);
                debug!(header = %self.header_name, "Forwarded account header set");
                metrics::record_forwarded_account("set");
            }
            Ok(None) if stripped => {
                debug!(header = %self.header_name, "Removed client-supplied account header");
                metrics::record_forwarded_account("stripped");
            }
            Ok(None) => metrics::record_forwarded_account("absent"),
            Err(e) => {
                // An authenticated request never carries a client-supplied value upstream
                ctx.remove_upstream_header(&self.header_name);
                metrics::record_forwarded_account("omitted");
                return Err(e);
            }
        }
        Ok(())
    }

    fn on_error(&self) -> OnError {
        self.on_error
    }
}
