//! TOML manifests of scope declarations, bound to recipes by name.
//!
//! A manifest carries only the shape of the graph. Recipes live in code and
//! are registered in a [`RecipeBook`] under the names the manifest refers to:
//!
//! ```toml
//! [[scopes]]
//! kind = "singleton"
//!
//! [[scopes.providers]]
//! name = "http_client"
//!
//! [[scopes.providers]]
//! name = "order_repo"
//! deps = ["http_client"]
//! recipe = "remote_order_repo"
//! ```

use std::collections::HashMap;
use std::path::Path;

use figment::{
    providers::{Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::config::{ConfigError, ValidationConfig};
use crate::graph::blueprint::{erase, Blueprint, ScopeDef};
use crate::graph::decl::ScopeDecl;
use crate::graph::validation::{validate, ValidationReport};
use crate::runtime::{Recipe, Resolver};

/// Declared scope kinds as read from a manifest file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    #[serde(default)]
    pub scopes: Vec<ScopeDecl>,
}

impl Manifest {
    /// Reads a manifest from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(figment::Error::from(format!(
                "manifest not found: {}",
                path.display()
            ))
            .into());
        }

        Figment::new()
            .merge(Toml::file(path))
            .extract()
            .map_err(ConfigError::from)
    }

    /// Parses a manifest from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Figment::new()
            .merge(Toml::string(text))
            .extract()
            .map_err(ConfigError::from)
    }

    pub fn scope(&self, kind: &str) -> Option<&ScopeDecl> {
        self.scopes.iter().find(|s| s.kind == kind)
    }

    /// Runs static validation without binding any recipes.
    pub fn validate(&self, options: &ValidationConfig) -> ValidationReport {
        validate(&self.scopes, options)
    }

    /// Binds each declared provider to the recipe registered under its
    /// recipe name.
    ///
    /// Providers with no matching recipe stay unbound and are reported when
    /// the blueprint is compiled.
    pub fn into_blueprint(self, book: &RecipeBook) -> Blueprint {
        let mut blueprint = Blueprint::new();
        for decl in self.scopes {
            let bound: Vec<(String, Recipe)> = decl
                .providers
                .iter()
                .filter_map(|p| Some((p.name.clone(), book.get(p.recipe_name())?)))
                .collect();

            let mut def = ScopeDef::from_decl(decl);
            for (provider, recipe) in bound {
                def.bind(&provider, recipe);
            }
            blueprint.push(def);
        }
        blueprint
    }
}

/// Recipes registered by name, for binding against a [`Manifest`].
#[derive(Default)]
pub struct RecipeBook {
    recipes: HashMap<String, Recipe>,
}

impl RecipeBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `recipe` under `name`, replacing any previous one.
    pub fn register<T, F>(&mut self, name: impl Into<String>, recipe: F) -> &mut Self
    where
        T: Send + Sync + 'static,
        F: Fn(&Resolver<'_>) -> anyhow::Result<T> + Send + Sync + 'static,
    {
        self.recipes.insert(name.into(), erase(recipe));
        self
    }

    pub fn contains(&self, name: &str) -> bool {
        self.recipes.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.recipes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.recipes.is_empty()
    }

    pub(crate) fn get(&self, name: &str) -> Option<Recipe> {
        self.recipes.get(name).cloned()
    }
}
