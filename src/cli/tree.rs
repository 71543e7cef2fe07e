//! Tree subcommand - print the declared scope hierarchy.

use std::collections::HashSet;
use std::path::PathBuf;

use clap::Parser;
use color_eyre::Result;

use crate::graph::{Manifest, ScopeDecl};

/// Print the scope hierarchy a manifest declares.
#[derive(Parser)]
pub struct TreeCommand {
    /// Path to the TOML manifest.
    pub manifest: PathBuf,
}

impl TreeCommand {
    /// Run the tree command.
    pub fn run(self) -> Result<()> {
        let manifest = Manifest::load(&self.manifest)?;
        print!("{}", render_tree(&manifest));
        Ok(())
    }
}

/// Renders each scope kind under its parent, with inputs, providers (id,
/// policy, deps) and registry keys.
///
/// Kinds whose parent is not declared are rendered as roots.
pub fn render_tree(manifest: &Manifest) -> String {
    let declared: HashSet<&str> = manifest.scopes.iter().map(|s| s.kind.as_str()).collect();
    let mut out = String::new();
    let mut visited = HashSet::new();

    let roots = manifest
        .scopes
        .iter()
        .filter(|s| s.parent.as_deref().map_or(true, |p| !declared.contains(p)));
    for root in roots {
        render_scope(manifest, root, 0, &mut visited, &mut out);
    }
    out
}

fn render_scope<'a>(
    manifest: &'a Manifest,
    scope: &'a ScopeDecl,
    depth: usize,
    visited: &mut HashSet<&'a str>,
    out: &mut String,
) {
    if !visited.insert(scope.kind.as_str()) {
        return;
    }
    let pad = "  ".repeat(depth);

    out.push_str(&format!("{}{}\n", pad, scope.kind));
    if !scope.inputs.is_empty() {
        out.push_str(&format!("{}  inputs: {}\n", pad, scope.inputs.join(", ")));
    }
    for (id, provider) in scope.providers.iter().enumerate() {
        out.push_str(&format!("{}  [{}] {} ({})", pad, id, provider.name, provider.policy));
        if !provider.deps.is_empty() {
            out.push_str(&format!(" <- {}", provider.deps.join(", ")));
        }
        out.push('\n');
    }
    for (key, target) in &scope.keys {
        out.push_str(&format!("{}  key {} -> {}\n", pad, key, target));
    }

    let children = manifest
        .scopes
        .iter()
        .filter(|s| s.parent.as_deref() == Some(scope.kind.as_str()));
    for child in children {
        render_scope(manifest, child, depth + 1, visited, out);
    }
}
