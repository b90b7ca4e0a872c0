//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware stack)
//!     → request.rs (request ID)
//!     → account::attach_account (bearer token → account)
//!     → me.rs (current account, answered locally)
//!       or proxy handler: route → filter chain → upstream
//!     → response.rs (strip hop-by-hop, cache headers)
//!     → Send to client
//! ```

pub mod me;
pub mod request;
pub mod response;
pub mod server;

pub use request::{MakeRequestUuid, X_REQUEST_ID};
pub use server::{AppState, HttpServer};
