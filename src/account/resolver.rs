//! Looking up the account attached to a request.

use axum::http::request::Parts;
use std::sync::Arc;

use crate::account::Account;
use crate::error::ResolveError;

/// Resolves the authenticated account of an inbound request.
///
/// Implementations must be side-effect free: calling either method any
/// number of times on the same request yields the same answer.
pub trait AccountResolver: Send + Sync {
    /// Returns true if an account is attached to the request.
    fn has_account(&self, req: &Parts) -> bool;

    /// Returns the attached account, or `ResolveError::NotFound`.
    fn account(&self, req: &Parts) -> Result<Arc<Account>, ResolveError>;
}

/// Reads the `Arc<Account>` stored in the request extensions by the
/// authentication stage.
#[derive(Debug, Clone, Copy, Default)]
pub struct RequestAccountResolver;

impl AccountResolver for RequestAccountResolver {
    fn has_account(&self, req: &Parts) -> bool {
        req.extensions.get::<Arc<Account>>().is_some()
    }

    fn account(&self, req: &Parts) -> Result<Arc<Account>, ResolveError> {
        req.extensions
            .get::<Arc<Account>>()
            .cloned()
            .ok_or(ResolveError::NotFound)
    }
}
