//! Forwarded account propagation.
//!
//! # Data Flow
//! ```text
//! request parts
//!     → AccountResolver (attached account or none)
//!     → projection.rs (allow/deny-listed attribute map)
//!     → serializer.rs (compact ASCII JSON)
//!     → header_value.rs (Option<String>)
//!     → filter.rs (set header on the upstream request)
//! ```
//!
//! # Design Decisions
//! - Values are computed fresh per request and never cached
//! - A value is either written whole or not at all
//! - Whether a client-supplied header survives an anonymous request is an
//!   explicit setting (`MissingAccountPolicy`)

pub mod filter;
pub mod header_value;
pub mod projection;
pub mod serializer;

pub use filter::{ForwardedAccountHeaderFilter, MissingAccountPolicy, X_FORWARDED_ACCOUNT};
pub use header_value::{AccountHeaderValueResolver, HeaderValueResolver};
pub use projection::{project, FieldPolicy};
pub use serializer::{AsciiJson, JsonSerializer};
