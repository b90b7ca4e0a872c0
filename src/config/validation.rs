//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate addresses, timeouts, header names and upstream URLs
//! - Detect duplicate routes and account tokens
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ProxyConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use axum::http::HeaderName;
use std::collections::HashSet;
use std::net::SocketAddr;
use thiserror::Error;
use url::Url;

use crate::config::schema::ProxyConfig;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field}: invalid socket address `{value}`")]
    InvalidAddress { field: &'static str, value: String },

    #[error("{field} must be greater than zero")]
    ZeroTimeout { field: &'static str },

    #[error("route `{0}` is defined more than once")]
    DuplicateRoute(String),

    #[error("route `{route}`: invalid upstream url `{url}`")]
    InvalidUpstream { route: String, url: String },

    #[error("route `{route}`: path_prefix `{prefix}` must start with `/`")]
    InvalidPrefix { route: String, prefix: String },

    #[error("forwarded_account.header_name: `{0}` is not a valid header name")]
    InvalidHeaderName(String),

    #[error("me.path `{0}` must be a literal path below `/`")]
    InvalidMePath(String),

    #[error("account `{0}` has an empty id")]
    EmptyAccountId(String),

    #[error("account token for `{0}` is empty")]
    EmptyToken(String),

    #[error("account token of `{0}` is already used by another account")]
    DuplicateToken(String),
}

/// Validates `config`, collecting every problem found.
pub fn validate_config(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidAddress {
            field: "listener.bind_address",
            value: config.listener.bind_address.clone(),
        });
    }
    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::InvalidAddress {
            field: "observability.metrics_address",
            value: config.observability.metrics_address.clone(),
        });
    }

    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::ZeroTimeout { field: "timeouts.request_secs" });
    }
    if config.timeouts.connect_secs == 0 {
        errors.push(ValidationError::ZeroTimeout { field: "timeouts.connect_secs" });
    }

    let mut route_names = HashSet::new();
    for route in &config.routes {
        if !route_names.insert(route.name.as_str()) {
            errors.push(ValidationError::DuplicateRoute(route.name.clone()));
        }
        // The upstream client speaks plain HTTP only
        let valid_url = Url::parse(&route.url)
            .map(|u| u.scheme() == "http" && u.host_str().is_some())
            .unwrap_or(false);
        if !valid_url {
            errors.push(ValidationError::InvalidUpstream {
                route: route.name.clone(),
                url: route.url.clone(),
            });
        }
        if !route.path_prefix.starts_with('/') {
            errors.push(ValidationError::InvalidPrefix {
                route: route.name.clone(),
                prefix: route.path_prefix.clone(),
            });
        }
    }

    let fwd = &config.forwarded_account;
    if HeaderName::from_bytes(fwd.header_name.as_bytes()).is_err() {
        errors.push(ValidationError::InvalidHeaderName(fwd.header_name.clone()));
    }

    let me_path = &config.me.path;
    let literal = !me_path.contains(|c: char| matches!(c, '{' | '}' | '*'));
    if config.me.enabled && (!me_path.starts_with('/') || me_path == "/" || !literal) {
        errors.push(ValidationError::InvalidMePath(config.me.path.clone()));
    }

    let mut tokens = HashSet::new();
    for entry in &config.accounts {
        if entry.account.id.is_empty() {
            errors.push(ValidationError::EmptyAccountId(entry.token.clone()));
        }
        if entry.token.is_empty() {
            errors.push(ValidationError::EmptyToken(entry.account.id.clone()));
        } else if !tokens.insert(entry.token.as_str()) {
            errors.push(ValidationError::DuplicateToken(entry.account.id.clone()));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
