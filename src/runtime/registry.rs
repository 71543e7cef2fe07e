//! Lookup of providers by stable symbolic key.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::error::ScopeError;
use crate::graph::Policy;

use super::{downcast, Instance, ProviderId, Scope};

/// A read-only view from registry keys to this scope's providers.
///
/// Keys are fixed when the graph is compiled and are exactly those the scope
/// kind declared. Used where the caller only holds a runtime tag, such as a
/// factory asked for "the view model registered as `HomeViewModel`".
pub struct KeyedRegistry<'a> {
    scope: &'a Scope,
    entries: &'a BTreeMap<String, ProviderId>,
}

impl<'a> KeyedRegistry<'a> {
    pub(crate) fn new(scope: &'a Scope, entries: &'a BTreeMap<String, ProviderId>) -> Self {
        Self { scope, entries }
    }

    /// Finds the provider registered under `key`.
    pub fn lookup(&self, key: &str) -> Result<ProviderRef<'a>, ScopeError> {
        let (key, id) = self
            .entries
            .get_key_value(key)
            .ok_or_else(|| ScopeError::UnsupportedKey {
                scope: self.scope.kind().to_string(),
                key: key.to_string(),
            })?;

        Ok(ProviderRef {
            scope: self.scope,
            key: key.as_str(),
            id: *id,
        })
    }

    /// Every supported key, in sorted order.
    pub fn keys(&self) -> impl Iterator<Item = &'a str> + 'a {
        self.entries.keys().map(String::as_str)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// A provider found through a [`KeyedRegistry`].
#[derive(Clone, Copy)]
pub struct ProviderRef<'a> {
    scope: &'a Scope,
    key: &'a str,
    id: ProviderId,
}

impl<'a> ProviderRef<'a> {
    pub fn key(&self) -> &'a str {
        self.key
    }

    pub fn id(&self) -> ProviderId {
        self.id
    }

    /// Name of the provider the key points at.
    pub fn name(&self) -> &'a str {
        self.scope
            .entry(self.id)
            .map(|entry| entry.name.as_str())
            .unwrap_or_default()
    }

    pub fn policy(&self) -> Policy {
        self.scope
            .entry(self.id)
            .map(|entry| entry.policy)
            .unwrap_or_default()
    }

    pub fn resolve(&self) -> Result<Instance, ScopeError> {
        self.scope.resolve(self.id)
    }

    pub fn get<T: Send + Sync + 'static>(&self) -> Result<Arc<T>, ScopeError> {
        downcast(self.key, self.resolve()?)
    }
}

impl std::fmt::Debug for ProviderRef<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderRef")
            .field("scope", &self.scope.kind())
            .field("key", &self.key)
            .field("id", &self.id)
            .finish()
    }
}
