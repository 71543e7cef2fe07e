//! Configuration with layered resolution using figment.
//!
//! Resolution order (highest priority last):
//! 1. User config: `~/.config/scopegraph/config.toml` (XDG) or platform config dir
//! 2. Project config: `.scopegraph.toml`
//! 3. Environment variables: `SCOPEGRAPH_*`, nested keys separated by `__`
//!
//! Every field has a default, so no file is required.
//!
//! ```toml
//! [runtime]
//! slow_recipe_ms = 250
//!
//! [validation]
//! deny_shadowing = true
//! ```

use std::ops::Deref;
use std::path::Path;
use std::time::Duration;

use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::Deserialize;

/// A config load failure.
#[derive(Debug)]
pub struct ConfigError(Box<figment::Error>);

impl Deref for ConfigError {
    type Target = figment::Error;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.0.source()
    }
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self(Box::new(err))
    }
}

/// Root configuration structure.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub runtime: RuntimeConfig,
    pub validation: ValidationConfig,
}

/// Settings that affect scopes at resolution time.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Recipes that run longer than this many milliseconds are logged at
    /// warn level. `0` disables the check.
    pub slow_recipe_ms: u64,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self { slow_recipe_ms: 250 }
    }
}

impl RuntimeConfig {
    /// The slow-recipe threshold, or `None` when disabled.
    pub fn slow_recipe_threshold(&self) -> Option<Duration> {
        (self.slow_recipe_ms > 0).then(|| Duration::from_millis(self.slow_recipe_ms))
    }
}

/// Options for the static validation pass over declared scopes.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    /// Report a binding that hides one of the same name in an ancestor scope.
    pub deny_shadowing: bool,
}

impl Config {
    /// Load config with layered resolution (user → project → env).
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(Self::user_config_path(), ".scopegraph.toml")
    }

    /// Load config from explicit user and project files, then the environment.
    ///
    /// Missing files are skipped.
    pub fn load_from(user: impl AsRef<Path>, project: impl AsRef<Path>) -> Result<Self, ConfigError> {
        Figment::new()
            // Layer 1: User config (lowest priority)
            .merge(Toml::file(user.as_ref()))
            // Layer 2: Project config
            .merge(Toml::file(project.as_ref()))
            // Layer 3: Environment variables (highest priority)
            .merge(Env::prefixed("SCOPEGRAPH_").split("__"))
            .extract()
            .map_err(ConfigError::from)
    }

    fn user_config_path() -> std::path::PathBuf {
        let xdg = dirs::home_dir().map(|home| home.join(".config/scopegraph/config.toml"));
        match xdg {
            Some(path) if path.exists() => path,
            _ => dirs::config_dir()
                .map(|dir| dir.join("scopegraph").join("config.toml"))
                .unwrap_or_default(),
        }
    }
}
