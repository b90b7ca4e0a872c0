//! Composition of resolver, projection and serializer into a header value.

use axum::http::request::Parts;
use std::sync::Arc;

use crate::account::AccountResolver;
use crate::error::ForwardError;
use crate::forwarding::projection::{project, FieldPolicy};
use crate::forwarding::serializer::JsonSerializer;

/// Produces the value of a forwarded header for a request, if any.
pub trait HeaderValueResolver: Send + Sync {
    fn resolve(&self, req: &Parts) -> Result<Option<String>, ForwardError>;
}

/// Resolves the projected, serialized account of a request.
pub struct AccountHeaderValueResolver {
    accounts: Arc<dyn AccountResolver>,
    policy: FieldPolicy,
    serializer: Arc<dyn JsonSerializer>,
}

impl AccountHeaderValueResolver {
    pub fn new(
        accounts: Arc<dyn AccountResolver>,
        policy: FieldPolicy,
        serializer: Arc<dyn JsonSerializer>,
    ) -> Self {
        Self {
            accounts,
            policy,
            serializer,
        }
    }

    pub fn policy(&self) -> &FieldPolicy {
        &self.policy
    }
}

impl HeaderValueResolver for AccountHeaderValueResolver {
    fn resolve(&self, req: &Parts) -> Result<Option<String>, ForwardError> {
        if !self.accounts.has_account(req) {
            return Ok(None);
        }
        let account = self.accounts.account(req)?;
        let projected = project(account.as_ref(), &self.policy);
        let value = self.serializer.serialize(&projected)?;
        Ok(Some(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::{Account, RequestAccountResolver};
    use crate::error::SerializationError;
    use crate::forwarding::serializer::AsciiJson;
    use axum::body::Body;
    use axum::http::Request;
    use serde_json::{json, Map, Value};

    fn parts_with(account: Option<Account>) -> Parts {
        let mut req = Request::builder().uri("/").body(Body::empty()).unwrap();
        if let Some(account) = account {
            req.extensions_mut().insert(Arc::new(account));
        }
        req.into_parts().0
    }

    fn resolver(policy: FieldPolicy) -> AccountHeaderValueResolver {
        AccountHeaderValueResolver::new(Arc::new(RequestAccountResolver), policy, Arc::new(AsciiJson))
    }

    fn sample() -> Account {
        let mut account = Account::new("acc1");
        account.email = Some("a@b.com".into());
        account.groups = vec!["admins".into()];
        account.custom_data.insert("k".into(), json!("v"));
        account
    }

    #[test]
    fn test_absent_without_account() {
        let parts = parts_with(None);
        assert!(resolver(FieldPolicy::default()).resolve(&parts).unwrap().is_none());
    }

    #[test]
    fn test_resolves_projection() {
        let parts = parts_with(Some(sample()));
        let value = resolver(FieldPolicy::default()).resolve(&parts).unwrap().unwrap();

        let parsed: Value = serde_json::from_str(&value).unwrap();
        assert_eq!(parsed, json!({"groups": ["admins"], "customData": {"k": "v"}}));
    }

    #[test]
    fn test_resolve_is_idempotent() {
        let parts = parts_with(Some(sample()));
        let resolver = resolver(FieldPolicy::all());

        let first = resolver.resolve(&parts).unwrap();
        let second = resolver.resolve(&parts).unwrap();
        assert_eq!(first, second);
    }

    struct FailingSerializer;

    impl JsonSerializer for FailingSerializer {
        fn serialize(&self, _map: &Map<String, Value>) -> Result<String, SerializationError> {
            let err = serde_json::from_str::<Value>("{").unwrap_err();
            Err(SerializationError::Json(err))
        }
    }

    #[test]
    fn test_serialization_failure_propagates() {
        let parts = parts_with(Some(sample()));
        let resolver = AccountHeaderValueResolver::new(
            Arc::new(RequestAccountResolver),
            FieldPolicy::default(),
            Arc::new(FailingSerializer),
        );

        let err = resolver.resolve(&parts).unwrap_err();
        assert!(matches!(err, ForwardError::Serialization(_)));
    }
}
