//! Account subsystem.
//!
//! # Data Flow
//! ```text
//! Authorization: Bearer <token>
//!     → store.rs (token lookup, attach Arc<Account> to request extensions)
//!     → resolver.rs (read the attached account back for filters/handlers)
//!     → Identity::attributes (finite attribute list for projection)
//! ```
//!
//! # Design Decisions
//! - Accounts are immutable once loaded and shared via `Arc`
//! - Attribute names are the JSON wire names (`givenName`, `customData`)
//! - Linked sub-resources are tagged so projection can keep them out by default

pub mod resolver;
pub mod store;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub use resolver::{AccountResolver, RequestAccountResolver};
pub use store::{attach_account, AccountEntry, AccountStore, StaticAccountStore};

/// Lifecycle status of an account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccountStatus {
    Enabled,
    Disabled,
    Unverified,
}

impl AccountStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountStatus::Enabled => "ENABLED",
            AccountStatus::Disabled => "DISABLED",
            AccountStatus::Unverified => "UNVERIFIED",
        }
    }
}

/// Reference to a sub-resource owned by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceRef {
    pub href: String,
}

/// An authenticated account.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Account {
    /// Stable identifier.
    pub id: String,
    pub href: Option<String>,
    pub username: Option<String>,
    pub email: Option<String>,
    pub given_name: Option<String>,
    pub middle_name: Option<String>,
    pub surname: Option<String>,
    /// Unset is treated as enabled.
    pub status: Option<AccountStatus>,
    /// Names of the groups the account belongs to.
    pub groups: Vec<String>,
    /// Free-form application data.
    pub custom_data: Map<String, Value>,
    pub directory: Option<ResourceRef>,
    pub tenant: Option<ResourceRef>,
}

impl Account {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    /// Whether the account may be attached to requests.
    pub fn is_enabled(&self) -> bool {
        matches!(self.status, None | Some(AccountStatus::Enabled))
    }

    /// Given, middle and surname joined by spaces, if any is set.
    pub fn full_name(&self) -> Option<String> {
        let parts: Vec<&str> = [&self.given_name, &self.middle_name, &self.surname]
            .into_iter()
            .filter_map(|p| p.as_deref())
            .filter(|p| !p.is_empty())
            .collect();

        if parts.is_empty() {
            None
        } else {
            Some(parts.join(" "))
        }
    }
}

/// How an attribute may be exposed by a projection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributeKind {
    /// Plain value: string, number, bool.
    Scalar,
    /// Simple nested data owned by the identity (lists, maps).
    Collection,
    /// Reference to a separate resource; only exposed when asked for by name.
    Linked,
}

/// A named attribute of an identity.
#[derive(Debug, Clone, PartialEq)]
pub struct Attribute {
    pub name: &'static str,
    pub kind: AttributeKind,
    pub value: Value,
}

impl Attribute {
    pub fn scalar(name: &'static str, value: impl Into<Value>) -> Self {
        Self { name, kind: AttributeKind::Scalar, value: value.into() }
    }

    pub fn collection(name: &'static str, value: impl Into<Value>) -> Self {
        Self { name, kind: AttributeKind::Collection, value: value.into() }
    }

    pub fn linked(name: &'static str, value: impl Into<Value>) -> Self {
        Self { name, kind: AttributeKind::Linked, value: value.into() }
    }
}

/// Anything that can be projected into a forwarded representation.
///
/// Implementors declare their full attribute list up front; projection
/// never inspects anything beyond what `attributes` returns.
pub trait Identity: Send + Sync {
    /// Stable identifier, used for logging.
    fn id(&self) -> &str;

    /// Every attribute the identity currently carries.
    fn attributes(&self) -> Vec<Attribute>;
}

impl Identity for Account {
    fn id(&self) -> &str {
        &self.id
    }

    fn attributes(&self) -> Vec<Attribute> {
        let mut attrs = vec![Attribute::scalar("id", self.id.clone())];

        let optional = [
            ("href", &self.href),
            ("username", &self.username),
            ("email", &self.email),
            ("givenName", &self.given_name),
            ("middleName", &self.middle_name),
            ("surname", &self.surname),
        ];
        for (name, value) in optional {
            if let Some(v) = value {
                attrs.push(Attribute::scalar(name, v.clone()));
            }
        }
        if let Some(full_name) = self.full_name() {
            attrs.push(Attribute::scalar("fullName", full_name));
        }
        if let Some(status) = self.status {
            attrs.push(Attribute::scalar("status", status.as_str()));
        }

        attrs.push(Attribute::collection("groups", self.groups.clone()));
        attrs.push(Attribute::collection(
            "customData",
            Value::Object(self.custom_data.clone()),
        ));

        if let Some(dir) = &self.directory {
            attrs.push(Attribute::linked("directory", serde_json::json!({ "href": dir.href })));
        }
        if let Some(tenant) = &self.tenant {
            attrs.push(Attribute::linked("tenant", serde_json::json!({ "href": tenant.href })));
        }

        attrs
    }
}
