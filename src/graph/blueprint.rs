//! Declaring scope kinds together with their recipes.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use crate::config::Config;
use crate::error::GraphError;
use crate::graph::compiled::{Binding, Graph, Shape};
use crate::graph::decl::{Policy, ProviderDecl, ScopeDecl};
use crate::graph::validation::{validate, Issue};
use crate::runtime::{Dispatcher, Instance, ProviderId, Recipe, RecipeEntry, Resolver};

/// Wraps a typed recipe into the erased form the dispatcher stores.
pub(crate) fn erase<T, F>(recipe: F) -> Recipe
where
    T: Send + Sync + 'static,
    F: Fn(&Resolver<'_>) -> anyhow::Result<T> + Send + Sync + 'static,
{
    Arc::new(move |resolver: &Resolver<'_>| -> anyhow::Result<Instance> {
        let value = recipe(resolver)?;
        Ok(Arc::new(value) as Instance)
    })
}

/// One scope kind under construction: its declaration plus recipe closures.
///
/// # Example
///
/// ```ignore
/// let view_model = ScopeDef::child("view_model", "activity_retained")
///     .input("saved_state")
///     .per_request("home_vm", &["order_repo", "saved_state"], |r| {
///         Ok(HomeViewModel::new(r.get("order_repo")?, r.get("saved_state")?))
///     })
///     .key("HomeViewModel", "home_vm");
/// ```
pub struct ScopeDef {
    decl: ScopeDecl,
    recipes: HashMap<String, Recipe>,
}

impl ScopeDef {
    /// A scope kind with no parent.
    pub fn root(kind: impl Into<String>) -> Self {
        Self::from_decl(ScopeDecl::root(kind))
    }

    /// A scope kind entered below `parent`.
    pub fn child(kind: impl Into<String>, parent: impl Into<String>) -> Self {
        Self::from_decl(ScopeDecl::child(kind, parent))
    }

    /// Starts from an existing declaration with no recipes bound.
    pub fn from_decl(decl: ScopeDecl) -> Self {
        Self {
            decl,
            recipes: HashMap::new(),
        }
    }

    /// Declares a required external input.
    pub fn input(mut self, name: impl Into<String>) -> Self {
        self.decl.inputs.push(name.into());
        self
    }

    /// Declares a provider and binds its recipe.
    ///
    /// `deps` must list every binding the recipe reads through its
    /// [`Resolver`]. The recipe returns the plain value; it is wrapped in an
    /// `Arc` by the runtime.
    pub fn provide<T, F>(mut self, name: &str, policy: Policy, deps: &[&str], recipe: F) -> Self
    where
        T: Send + Sync + 'static,
        F: Fn(&Resolver<'_>) -> anyhow::Result<T> + Send + Sync + 'static,
    {
        self.decl
            .providers
            .push(ProviderDecl::new(name, policy).with_deps(deps.iter().copied()));
        self.recipes.insert(name.to_string(), erase(recipe));
        self
    }

    /// Declares a provider memoized for the scope's lifetime.
    pub fn scoped<T, F>(self, name: &str, deps: &[&str], recipe: F) -> Self
    where
        T: Send + Sync + 'static,
        F: Fn(&Resolver<'_>) -> anyhow::Result<T> + Send + Sync + 'static,
    {
        self.provide(name, Policy::PerScope, deps, recipe)
    }

    /// Declares a provider that builds a fresh value on every resolution.
    pub fn per_request<T, F>(self, name: &str, deps: &[&str], recipe: F) -> Self
    where
        T: Send + Sync + 'static,
        F: Fn(&Resolver<'_>) -> anyhow::Result<T> + Send + Sync + 'static,
    {
        self.provide(name, Policy::PerRequest, deps, recipe)
    }

    /// Exposes a provider of this scope through the keyed registry.
    pub fn key(mut self, key: impl Into<String>, provider: impl Into<String>) -> Self {
        self.decl.keys.insert(key.into(), provider.into());
        self
    }

    /// Binds a recipe to an already-declared provider.
    pub(crate) fn bind(&mut self, provider: &str, recipe: Recipe) {
        self.recipes.insert(provider.to_string(), recipe);
    }

    pub fn decl(&self) -> &ScopeDecl {
        &self.decl
    }

    pub fn kind(&self) -> &str {
        &self.decl.kind
    }
}

/// The full set of scope kinds of an application, before validation.
#[derive(Default)]
pub struct Blueprint {
    scopes: Vec<ScopeDef>,
}

impl Blueprint {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a scope kind.
    pub fn scope(mut self, def: ScopeDef) -> Self {
        self.scopes.push(def);
        self
    }

    pub fn push(&mut self, def: ScopeDef) {
        self.scopes.push(def);
    }

    pub fn decls(&self) -> Vec<ScopeDecl> {
        self.scopes.iter().map(|s| s.decl.clone()).collect()
    }

    /// Validates and compiles with default settings.
    pub fn compile(self) -> Result<Arc<Graph>, GraphError> {
        self.compile_with(&Config::default())
    }

    /// Validates every declaration and compiles the graph.
    ///
    /// Fails with [`GraphError::Invalid`] listing every issue found; no
    /// scope can be entered from a graph that did not pass.
    pub fn compile_with(self, config: &Config) -> Result<Arc<Graph>, GraphError> {
        let decls = self.decls();
        let mut report = validate(&decls, &config.validation);

        for def in &self.scopes {
            for provider in &def.decl.providers {
                if !def.recipes.contains_key(&provider.name) {
                    report.push(Issue::UnboundRecipe {
                        scope: def.decl.kind.clone(),
                        provider: provider.name.clone(),
                        recipe: provider.recipe_name().to_string(),
                    });
                }
            }
        }

        if !report.is_ok() {
            return Err(GraphError::Invalid(report));
        }

        let by_kind: HashMap<String, usize> = self
            .scopes
            .iter()
            .enumerate()
            .map(|(i, s)| (s.decl.kind.clone(), i))
            .collect();

        let shapes = self
            .scopes
            .iter()
            .map(|def| build_bindings(def, &self.scopes, &by_kind))
            .collect::<Vec<_>>();

        let shapes = self
            .scopes
            .into_iter()
            .zip(shapes)
            .map(|(def, bindings)| into_shape(def, bindings, &by_kind))
            .collect();

        tracing::debug!("Compiled scope graph with {} kind(s)", by_kind.len());

        Ok(Arc::new(Graph {
            shapes,
            by_kind,
            runtime: config.runtime.clone(),
        }))
    }
}

/// Resolves every name visible from `def` to its nearest binding.
fn build_bindings(
    def: &ScopeDef,
    scopes: &[ScopeDef],
    by_kind: &HashMap<String, usize>,
) -> HashMap<String, Binding> {
    let mut bindings = HashMap::new();
    let mut current = Some(def);
    let mut hops = 0;

    while let Some(scope) = current {
        for (slot, input) in scope.decl.inputs.iter().enumerate() {
            bindings
                .entry(input.clone())
                .or_insert(Binding::Input { hops, slot });
        }
        for (index, provider) in scope.decl.providers.iter().enumerate() {
            bindings
                .entry(provider.name.clone())
                .or_insert(Binding::Provider {
                    hops,
                    id: ProviderId::new(index as u32),
                });
        }
        current = scope
            .decl
            .parent
            .as_ref()
            .and_then(|p| by_kind.get(p))
            .map(|&i| &scopes[i]);
        hops += 1;
    }

    bindings
}

fn into_shape(
    def: ScopeDef,
    bindings: HashMap<String, Binding>,
    by_kind: &HashMap<String, usize>,
) -> Shape {
    let ScopeDef { decl, mut recipes } = def;

    let entries = decl
        .providers
        .iter()
        .filter_map(|p| {
            Some(RecipeEntry {
                name: p.name.clone(),
                policy: p.policy,
                deps: p.deps.iter().cloned().collect(),
                recipe: recipes.remove(&p.name)?,
            })
        })
        .collect();

    let keys: BTreeMap<String, ProviderId> = decl
        .keys
        .iter()
        .filter_map(|(key, target)| match bindings.get(target) {
            Some(Binding::Provider { hops: 0, id }) => Some((key.clone(), *id)),
            _ => None,
        })
        .collect();

    Shape {
        parent: decl.parent.as_ref().and_then(|p| by_kind.get(p).copied()),
        kind: decl.kind,
        inputs: decl.inputs,
        dispatcher: Dispatcher::new(entries),
        bindings,
        keys: Arc::new(keys),
    }
}
