//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Forwarded request:
//!     → headers.rs (strip hop-by-hop, add X-Forwarded-*)
//!     → forwarding filter (replace or strip the account header)
//!     → upstream
//! ```
//!
//! # Design Decisions
//! - Nothing the client sends is allowed to masquerade as gateway output
//!   once `on_missing_account = "strip"` is configured

pub mod headers;

pub use headers::ForwardedHeadersFilter;
