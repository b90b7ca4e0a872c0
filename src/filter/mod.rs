//! Ordered request filter chain.
//!
//! # Data Flow
//! ```text
//! matched request
//!     → context.rs (inbound parts + mutable upstream headers)
//!     → chain.rs: Pre filters by order, then Route filters by order
//!     → server forwards with the resulting upstream headers
//! ```
//!
//! # Design Decisions
//! - Chain is sorted once at startup and shared immutably
//! - Equal (stage, order) keys keep registration order
//! - A filter that failed either lets the request continue or rejects it,
//!   as the filter itself declares

pub mod chain;
pub mod context;

use serde::{Deserialize, Serialize};

use crate::error::ForwardError;

pub use chain::FilterChain;
pub use context::RequestContext;

/// When a filter runs relative to forwarding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterStage {
    /// Before the upstream request is assembled.
    #[default]
    Pre,
    /// Immediately before the request is sent upstream.
    Route,
}

impl std::fmt::Display for FilterStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FilterStage::Pre => write!(f, "pre"),
            FilterStage::Route => write!(f, "route"),
        }
    }
}

/// What the chain does when a filter fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OnError {
    /// Log and keep going; whatever the filter would have added is missing.
    #[default]
    Omit,
    /// Stop and answer 502 without contacting the upstream.
    Reject,
}

/// A stage in the request filter chain.
pub trait ProxyFilter: Send + Sync {
    /// Name used in logs and errors.
    fn name(&self) -> &'static str;

    fn stage(&self) -> FilterStage;

    /// Lower runs earlier within a stage.
    fn order(&self) -> i32;

    fn should_filter(&self, ctx: &RequestContext) -> bool {
        !ctx.is_short_circuited()
    }

    fn run(&self, ctx: &mut RequestContext) -> Result<(), ForwardError>;

    fn on_error(&self) -> OnError {
        OnError::Omit
    }
}
