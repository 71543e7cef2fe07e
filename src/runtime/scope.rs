//! Live scope instances and resolution through the scope chain.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use ulid::Ulid;

use crate::error::ScopeError;
use crate::graph::compiled::{Binding, Graph, Shape};
use crate::graph::Policy;

use super::dispatch::RecipeEntry;
use super::registry::KeyedRegistry;
use super::{downcast, Instance, Provider, ProviderId, ScopeBuilder};

/// A live node in the scope tree.
///
/// A scope owns one memoized [`Provider`] slot per declared provider and the
/// external inputs it was built with. Cloning the handle is cheap; the scope
/// and everything it memoized are released when the last handle (including
/// those held by child scopes) is dropped. A child keeps its parent alive;
/// the parent never references its children.
#[derive(Clone)]
pub struct Scope {
    inner: Arc<ScopeInner>,
}

struct ScopeInner {
    id: Ulid,
    graph: Arc<Graph>,
    shape: usize,
    parent: Option<Scope>,
    inputs: Vec<Instance>,
    providers: Vec<Provider>,
    keys: Arc<BTreeMap<String, ProviderId>>,
}

impl Drop for ScopeInner {
    fn drop(&mut self) {
        tracing::debug!(
            "Closing scope {} ({})",
            self.graph.shape(self.shape).kind,
            self.id
        );
    }
}

impl Scope {
    /// Wires a new instance. Inputs must already be complete and in slot order.
    pub(crate) fn new(
        graph: Arc<Graph>,
        shape: usize,
        parent: Option<Scope>,
        inputs: Vec<Instance>,
    ) -> Self {
        let (providers, keys) = {
            let shape = graph.shape(shape);
            let providers: Vec<Provider> = shape
                .dispatcher
                .entries()
                .map(|(_, entry)| Provider::new(entry.policy))
                .collect();
            (providers, Arc::clone(&shape.keys))
        };

        let id = Ulid::new();
        tracing::debug!(
            "Entered scope {} ({}) with {} provider(s)",
            graph.shape(shape).kind,
            id,
            graph.shape(shape).dispatcher.len()
        );

        Self {
            inner: Arc::new(ScopeInner {
                id,
                graph,
                shape,
                parent,
                inputs,
                providers,
                keys,
            }),
        }
    }

    /// Unique id of this instance, for diagnostics.
    pub fn id(&self) -> Ulid {
        self.inner.id
    }

    /// The declared kind this scope is an instance of.
    pub fn kind(&self) -> &str {
        &self.shape().kind
    }

    pub fn parent(&self) -> Option<&Scope> {
        self.inner.parent.as_ref()
    }

    pub fn graph(&self) -> &Arc<Graph> {
        &self.inner.graph
    }

    /// Starts entering a child scope of `kind` below this one.
    pub fn child_builder(&self, kind: &str) -> Result<ScopeBuilder, ScopeError> {
        self.inner.graph.child_builder(self, kind)
    }

    /// The id of a provider declared directly in this scope.
    pub fn provider_id(&self, name: &str) -> Option<ProviderId> {
        self.shape().local_provider(name)
    }

    /// Resolves a provider of this scope by id.
    ///
    /// Ids come from [`provider_id`](Self::provider_id) or the registry. An
    /// id this scope kind never issued is a wiring bug and fails with
    /// [`ScopeError::UnknownDependency`].
    pub fn resolve(&self, id: ProviderId) -> Result<Instance, ScopeError> {
        let Some(provider) = self.inner.providers.get(id.index()) else {
            return Err(ScopeError::UnknownDependency {
                scope: self.kind().to_string(),
                id,
            });
        };
        provider.resolve(|| self.evaluate(id))
    }

    /// Resolves a provider or input visible from this scope by name,
    /// searching this scope first and then each ancestor.
    pub fn resolve_named(&self, name: &str) -> Result<Instance, ScopeError> {
        let missing = || ScopeError::MissingProvider {
            scope: self.kind().to_string(),
            name: name.to_string(),
        };

        match self.shape().bindings.get(name) {
            Some(&Binding::Provider { hops, id }) => self.ancestor(hops).ok_or_else(missing)?.resolve(id),
            Some(&Binding::Input { hops, slot }) => self
                .ancestor(hops)
                .and_then(|scope| scope.inner.inputs.get(slot))
                .cloned()
                .ok_or_else(missing),
            None => Err(missing()),
        }
    }

    /// Typed [`resolve_named`](Self::resolve_named).
    pub fn get<T: Send + Sync + 'static>(&self, name: &str) -> Result<Arc<T>, ScopeError> {
        downcast(name, self.resolve_named(name)?)
    }

    /// An external input of this scope or one of its ancestors.
    pub fn input<T: Send + Sync + 'static>(&self, name: &str) -> Result<Arc<T>, ScopeError> {
        match self.shape().bindings.get(name) {
            Some(Binding::Input { .. }) => self.get(name),
            _ => Err(ScopeError::UnknownInput {
                scope: self.kind().to_string(),
                input: name.to_string(),
            }),
        }
    }

    /// Symbolic-key lookup over this scope's providers.
    pub fn registry(&self) -> KeyedRegistry<'_> {
        KeyedRegistry::new(self, &self.inner.keys)
    }

    /// Whether a per-scope provider of this scope already holds its value.
    pub fn is_cached(&self, id: ProviderId) -> bool {
        self.inner
            .providers
            .get(id.index())
            .is_some_and(Provider::is_cached)
    }

    /// Releases this handle. The scope is torn down once no other handle or
    /// child scope refers to it; ancestors are never affected.
    pub fn close(self) {
        drop(self);
    }

    pub(crate) fn shape_index(&self) -> usize {
        self.inner.shape
    }

    pub(crate) fn entry(&self, id: ProviderId) -> Option<&RecipeEntry> {
        self.shape().dispatcher.entry(id)
    }

    fn shape(&self) -> &Shape {
        self.inner.graph.shape(self.inner.shape)
    }

    fn ancestor(&self, hops: usize) -> Option<&Scope> {
        let mut scope = self;
        for _ in 0..hops {
            scope = scope.parent()?;
        }
        Some(scope)
    }

    /// Runs the recipe for `id` once, outside any cache.
    fn evaluate(&self, id: ProviderId) -> Result<Instance, ScopeError> {
        let shape = self.shape();
        let entry = shape.dispatcher.entry(id);
        let name = entry.map(|e| e.name.as_str()).unwrap_or("?");
        let started = Instant::now();

        let result = match shape.dispatcher.dispatch(id, self) {
            Some(result) => result.map_err(ScopeError::from_recipe),
            None => Err(ScopeError::UnknownDependency {
                scope: shape.kind.clone(),
                id,
            }),
        };

        let elapsed = started.elapsed();
        if let Some(threshold) = self.inner.graph.runtime.slow_recipe_threshold() {
            if elapsed > threshold {
                tracing::warn!(
                    "Recipe {}.{} took {:?} (threshold {:?})",
                    shape.kind,
                    name,
                    elapsed,
                    threshold
                );
            }
        }

        match &result {
            Ok(_) if entry.is_some_and(|e| e.policy == Policy::PerScope) => {
                tracing::trace!("Evaluated {}.{} in scope {}", shape.kind, name, self.inner.id)
            }
            Ok(_) => {}
            Err(err) => tracing::warn!("Recipe {}.{} failed: {}", shape.kind, name, err),
        }
        result
    }
}

impl std::fmt::Debug for Scope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scope")
            .field("kind", &self.kind())
            .field("id", &self.inner.id)
            .field("parent", &self.parent().map(Scope::kind))
            .finish()
    }
}

/// The handle a recipe reads its dependencies through.
///
/// A resolver only hands out the bindings its provider declared. Values
/// owned by an ancestor are resolved by that ancestor, so they are shared
/// with every other descendant.
pub struct Resolver<'a> {
    scope: &'a Scope,
    entry: &'a RecipeEntry,
}

impl<'a> Resolver<'a> {
    pub(crate) fn new(scope: &'a Scope, entry: &'a RecipeEntry) -> Self {
        Self { scope, entry }
    }

    /// Resolves a declared dependency.
    pub fn instance(&self, dep: &str) -> Result<Instance, ScopeError> {
        if !self.entry.allows(dep) {
            return Err(ScopeError::UndeclaredDependency {
                provider: format!("{}.{}", self.scope.kind(), self.entry.name),
                dependency: dep.to_string(),
            });
        }
        self.scope.resolve_named(dep)
    }

    /// Resolves a declared dependency as `T`.
    pub fn get<T: Send + Sync + 'static>(&self, dep: &str) -> Result<Arc<T>, ScopeError> {
        downcast(dep, self.instance(dep)?)
    }

    /// Kind of the scope the recipe runs in.
    pub fn scope_kind(&self) -> &str {
        self.scope.kind()
    }

    /// Name of the provider being built.
    pub fn provider(&self) -> &str {
        &self.entry.name
    }
}
