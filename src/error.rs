//! Error types shared by the account propagation path.
//!
//! # Design Decisions
//! - `ResolveError::NotFound` is a skip signal, not a failure
//! - Nothing here is retried: every operation is a pure function of data
//!   already attached to the request

use axum::http::header::InvalidHeaderValue;
use thiserror::Error;

/// Failure to obtain the account attached to a request.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ResolveError {
    #[error("no account is associated with the request")]
    NotFound,
}

/// Failure to encode a projected account as JSON text.
#[derive(Debug, Error)]
pub enum SerializationError {
    #[error("json encoding failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("json output is not valid utf-8: {0}")]
    Encoding(#[from] std::string::FromUtf8Error),
}

/// Failure while computing the forwarded account header.
#[derive(Debug, Error)]
pub enum ForwardError {
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error(transparent)]
    Serialization(#[from] SerializationError),

    #[error("header value rejected: {0}")]
    InvalidHeaderValue(#[from] InvalidHeaderValue),
}

/// A filter in the chain failed; the request has not been forwarded yet.
#[derive(Debug, Error)]
#[error("filter `{filter}` failed: {source}")]
pub struct FilterError {
    pub filter: &'static str,
    #[source]
    pub source: ForwardError,
}

impl FilterError {
    pub fn new(filter: &'static str, source: impl Into<ForwardError>) -> Self {
        Self {
            filter,
            source: source.into(),
        }
    }
}
