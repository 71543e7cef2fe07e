//! Error types for graph compilation and scope resolution.

use thiserror::Error;

use crate::graph::ValidationReport;
use crate::runtime::ProviderId;

/// Errors raised while building scopes or resolving values from them.
#[derive(Error, Debug)]
pub enum ScopeError {
    // Builder errors
    #[error("Cannot build scope '{scope}': missing required input(s) {}", .inputs.join(", "))]
    MissingBuilderInput { scope: String, inputs: Vec<String> },

    #[error("Builder for scope '{scope}' has already been used")]
    AlreadyBuilt { scope: String },

    #[error("Scope '{scope}' declares no input named '{input}'")]
    UnknownInput { scope: String, input: String },

    // Hierarchy errors
    #[error("Unknown scope kind: {0}")]
    UnknownScopeKind(String),

    #[error("Scope '{0}' has a parent and cannot be entered as a root")]
    NotARootScope(String),

    #[error("Scope '{child}' is not a child of '{parent}'")]
    NotAChildScope { parent: String, child: String },

    // Resolution errors
    #[error("Unknown dependency id {id} in scope '{scope}'")]
    UnknownDependency { scope: String, id: ProviderId },

    #[error("No provider or input named '{name}' is visible from scope '{scope}'")]
    MissingProvider { scope: String, name: String },

    #[error("Provider '{provider}' did not declare a dependency on '{dependency}'")]
    UndeclaredDependency {
        provider: String,
        dependency: String,
    },

    #[error("Scope '{scope}' does not support registry key '{key}'")]
    UnsupportedKey { scope: String, key: String },

    #[error("Binding '{name}' is not of type {expected}")]
    TypeMismatch {
        name: String,
        expected: &'static str,
    },

    // Recipe failures pass through untouched
    #[error(transparent)]
    Recipe(anyhow::Error),
}

impl ScopeError {
    /// Recovers the error a recipe returned.
    ///
    /// A `ScopeError` that a nested recipe propagated with `?` comes back as
    /// itself rather than as an opaque recipe failure.
    pub fn from_recipe(err: anyhow::Error) -> Self {
        match err.downcast::<ScopeError>() {
            Ok(scope_err) => scope_err,
            Err(other) => ScopeError::Recipe(other),
        }
    }

    /// Returns the underlying recipe error, if this is a recipe failure.
    pub fn recipe_error(&self) -> Option<&anyhow::Error> {
        match self {
            ScopeError::Recipe(err) => Some(err),
            _ => None,
        }
    }
}

/// Errors raised while turning declarations into a usable [`Graph`](crate::graph::Graph).
#[derive(Error, Debug)]
pub enum GraphError {
    #[error("Invalid scope graph:\n{0}")]
    Invalid(ValidationReport),

    #[error("Configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),
}
