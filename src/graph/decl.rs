//! Pure-data declarations of scope kinds.
//!
//! These types describe the *shape* of a graph without any recipe code, so
//! they can be validated on their own and loaded from a manifest.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Memoization policy of a provider.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Policy {
    /// Evaluated at most once per scope instance.
    #[default]
    PerScope,
    /// Evaluated on every resolution, never cached.
    PerRequest,
}

impl std::fmt::Display for Policy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Policy::PerScope => write!(f, "per_scope"),
            Policy::PerRequest => write!(f, "per_request"),
        }
    }
}

/// A provider as declared in a scope kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderDecl {
    /// Binding name, unique within the scope kind.
    pub name: String,
    #[serde(default)]
    pub policy: Policy,
    /// Every binding the recipe reads. Anything else is refused at resolution.
    #[serde(default)]
    pub deps: Vec<String>,
    /// Recipe name in a [`RecipeBook`](super::RecipeBook); defaults to `name`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recipe: Option<String>,
}

impl ProviderDecl {
    pub fn new(name: impl Into<String>, policy: Policy) -> Self {
        Self {
            name: name.into(),
            policy,
            deps: Vec::new(),
            recipe: None,
        }
    }

    pub fn with_deps<I, S>(mut self, deps: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.deps = deps.into_iter().map(Into::into).collect();
        self
    }

    /// The recipe name this provider is bound through.
    pub fn recipe_name(&self) -> &str {
        self.recipe.as_deref().unwrap_or(&self.name)
    }
}

/// A scope kind: its parent, required inputs, providers and registry keys.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScopeDecl {
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
    /// External inputs the host must supply to the builder.
    #[serde(default)]
    pub inputs: Vec<String>,
    #[serde(default)]
    pub providers: Vec<ProviderDecl>,
    /// Registry key → name of a provider in this scope.
    #[serde(default)]
    pub keys: BTreeMap<String, String>,
}

impl ScopeDecl {
    pub fn root(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            ..Self::default()
        }
    }

    pub fn child(kind: impl Into<String>, parent: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            parent: Some(parent.into()),
            ..Self::default()
        }
    }

    pub fn provider(&self, name: &str) -> Option<&ProviderDecl> {
        self.providers.iter().find(|p| p.name == name)
    }

    pub fn has_input(&self, name: &str) -> bool {
        self.inputs.iter().any(|i| i == name)
    }

    /// Whether `name` is bound in this scope, as a provider or an input.
    pub fn binds(&self, name: &str) -> bool {
        self.has_input(name) || self.provider(name).is_some()
    }
}
