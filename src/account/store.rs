//! Token-to-account lookup and the middleware that attaches accounts.
//!
//! This stage stands in for whatever authenticated the caller upstream of
//! the gateway. Tokens are opaque keys; nothing is verified here.

use axum::{
    body::Body,
    extract::State,
    http::{header::AUTHORIZATION, HeaderMap, Request},
    middleware::Next,
    response::Response,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::account::Account;

/// An account as listed in the configuration file.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AccountEntry {
    /// Bearer token presented by the client.
    pub token: String,

    #[serde(flatten)]
    pub account: Account,
}

/// Source of accounts keyed by bearer token.
pub trait AccountStore: Send + Sync {
    fn lookup(&self, token: &str) -> Option<Arc<Account>>;
}

/// Immutable in-memory store built at startup.
#[derive(Debug, Default)]
pub struct StaticAccountStore {
    accounts: HashMap<String, Arc<Account>>,
}

impl StaticAccountStore {
    pub fn new(entries: Vec<AccountEntry>) -> Self {
        let mut accounts = HashMap::with_capacity(entries.len());
        for entry in entries {
            if accounts.insert(entry.token, Arc::new(entry.account)).is_some() {
                warn!("Duplicate account token in configuration, keeping the last entry");
            }
        }
        tracing::info!(count = accounts.len(), "Account store loaded");
        Self { accounts }
    }

    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }
}

impl AccountStore for StaticAccountStore {
    fn lookup(&self, token: &str) -> Option<Arc<Account>> {
        self.accounts.get(token).cloned()
    }
}

/// Extracts the token of an `Authorization: Bearer <token>` header.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

/// Attaches the caller's account to the request extensions.
///
/// Never rejects: requests without a usable token continue anonymously.
pub async fn attach_account(
    State(store): State<Arc<dyn AccountStore>>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    let account = bearer_token(req.headers()).and_then(|token| store.lookup(token));

    match account {
        Some(account) if account.is_enabled() => {
            debug!(account = %account.id, "Account attached to request");
            req.extensions_mut().insert(account);
        }
        Some(account) => {
            warn!(account = %account.id, status = ?account.status, "Ignoring token of inactive account");
        }
        None => {}
    }

    next.run(req).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::AccountStatus;
    use axum::http::HeaderValue;

    fn entry(token: &str, id: &str) -> AccountEntry {
        AccountEntry {
            token: token.into(),
            account: Account::new(id),
        }
    }

    #[test]
    fn test_lookup() {
        let store = StaticAccountStore::new(vec![entry("t1", "acc1"), entry("t2", "acc2")]);
        assert_eq!(store.len(), 2);
        assert_eq!(store.lookup("t2").unwrap().id, "acc2");
        assert!(store.lookup("nope").is_none());
    }

    #[test]
    fn test_bearer_token_parsing() {
        let mut headers = HeaderMap::new();
        assert_eq!(bearer_token(&headers), None);

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer abc"));
        assert_eq!(bearer_token(&headers), Some("abc"));

        headers.insert(AUTHORIZATION, HeaderValue::from_static("bearer  abc "));
        assert_eq!(bearer_token(&headers), Some("abc"));

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic abc"));
        assert_eq!(bearer_token(&headers), None);

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer "));
        assert_eq!(bearer_token(&headers), None);
    }

    #[test]
    fn test_entry_from_toml() {
        #[derive(Deserialize)]
        struct Wrapper {
            accounts: Vec<AccountEntry>,
        }

        let parsed: Wrapper = toml::from_str(
            r#"
            [[accounts]]
            token = "t1"
            id = "acc1"
            email = "a@b.com"
            status = "ENABLED"
            groups = ["admins"]

            [accounts.customData]
            k = "v"
            "#,
        )
        .unwrap();

        let entry = &parsed.accounts[0];
        assert_eq!(entry.token, "t1");
        assert_eq!(entry.account.email.as_deref(), Some("a@b.com"));
        assert_eq!(entry.account.status, Some(AccountStatus::Enabled));
        assert_eq!(entry.account.groups, vec!["admins"]);
        assert_eq!(entry.account.custom_data["k"], "v");
    }
}
