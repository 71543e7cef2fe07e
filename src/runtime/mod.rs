//! Scope instances and value resolution.
//!
//! - [`Scope`] - a live node in the scope tree, owning its memoized values
//! - [`ScopeBuilder`] - gates entry into a scope on its external inputs
//! - [`Resolver`] - the handle a recipe reads its dependencies through
//! - [`KeyedRegistry`] - symbolic-key lookup over a scope's providers

mod builder;
mod dispatch;
mod provider;
mod registry;
mod scope;

use std::any::Any;
use std::sync::Arc;

pub use builder::ScopeBuilder;
pub(crate) use dispatch::{Dispatcher, Recipe, RecipeEntry};
pub(crate) use provider::Provider;
pub use registry::{KeyedRegistry, ProviderRef};
pub use scope::{Resolver, Scope};

/// A resolved value, type-erased.
pub type Instance = Arc<dyn Any + Send + Sync>;

/// Index of a provider within one scope kind.
///
/// Ids are dense and assigned in declaration order when the graph is
/// compiled. They are only meaningful for the scope kind that issued them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProviderId(u32);

impl ProviderId {
    pub fn new(index: u32) -> Self {
        Self(index)
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl std::fmt::Display for ProviderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Downcasts a resolved value, naming the binding on mismatch.
pub(crate) fn downcast<T: Send + Sync + 'static>(
    name: &str,
    instance: Instance,
) -> Result<Arc<T>, crate::error::ScopeError> {
    instance
        .downcast::<T>()
        .map_err(|_| crate::error::ScopeError::TypeMismatch {
            name: name.to_string(),
            expected: std::any::type_name::<T>(),
        })
}
