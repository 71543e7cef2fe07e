//! Declared scope graphs.
//!
//! A graph is declared as a set of scope kinds ([`ScopeDecl`] plus recipe
//! closures, collected in a [`Blueprint`]), validated as a whole, and
//! compiled into an immutable [`Graph`] that scopes are entered from.
//!
//! - [`decl`] - pure-data declarations, shared with manifests
//! - [`validation`] - static checks over declarations
//! - [`manifest`] - TOML form of declarations and the [`RecipeBook`]

pub mod blueprint;
pub mod compiled;
pub mod decl;
pub mod manifest;
pub mod validation;

pub use blueprint::{Blueprint, ScopeDef};
pub use compiled::Graph;
pub use decl::{Policy, ProviderDecl, ScopeDecl};
pub use manifest::{Manifest, RecipeBook};
pub use validation::{validate, Issue, ValidationReport};
