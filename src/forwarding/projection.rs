//! Field projection: the bounded view of an identity that may leave the
//! gateway.
//!
//! # Rules
//! - Empty `included` means every attribute, otherwise only the named ones
//! - `excluded` always wins over `included`
//! - Linked sub-resources are dropped unless named in `included`, or in
//!   `expand` when `included` is empty

use serde_json::{Map, Value};
use std::collections::BTreeSet;

use crate::account::{Attribute, AttributeKind, Identity};

/// Allow/deny lists applied when projecting an identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldPolicy {
    pub included: BTreeSet<String>,
    pub excluded: BTreeSet<String>,
    pub expand: BTreeSet<String>,
}

impl Default for FieldPolicy {
    fn default() -> Self {
        Self::new(["groups", "customData"], Vec::<String>::new())
    }
}

impl FieldPolicy {
    pub fn new<I, E>(included: I, excluded: E) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
        E: IntoIterator,
        E::Item: Into<String>,
    {
        Self {
            included: included.into_iter().map(Into::into).collect(),
            excluded: excluded.into_iter().map(Into::into).collect(),
            expand: BTreeSet::new(),
        }
    }

    /// Every non-linked attribute.
    pub fn all() -> Self {
        Self::new(Vec::<String>::new(), Vec::<String>::new())
    }

    /// Linked attributes to emit when `included` is empty.
    pub fn with_expand<X>(mut self, expand: X) -> Self
    where
        X: IntoIterator,
        X::Item: Into<String>,
    {
        self.expand = expand.into_iter().map(Into::into).collect();
        self
    }

    /// Whether `attr` survives this policy.
    pub fn permits(&self, attr: &Attribute) -> bool {
        if self.excluded.contains(attr.name) {
            return false;
        }
        if !self.included.is_empty() {
            return self.included.contains(attr.name);
        }
        match attr.kind {
            AttributeKind::Linked => self.expand.contains(attr.name),
            AttributeKind::Scalar | AttributeKind::Collection => true,
        }
    }
}

/// Projects `identity` through `policy`.
pub fn project(identity: &dyn Identity, policy: &FieldPolicy) -> Map<String, Value> {
    identity
        .attributes()
        .into_iter()
        .filter(|attr| policy.permits(attr))
        .map(|attr| (attr.name.to_string(), attr.value))
        .collect()
}
