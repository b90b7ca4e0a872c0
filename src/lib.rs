//! Account-forwarding reverse proxy library.

pub mod account;
pub mod config;
pub mod error;
pub mod filter;
pub mod forwarding;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod routing;
pub mod security;

pub use config::schema::ProxyConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
