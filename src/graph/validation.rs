//! Static validation of declared scope kinds.
//!
//! Every dependency edge is known once all scope kinds are declared, so
//! missing providers, dependency cycles and broken registry keys are caught
//! here, before any scope instance exists.

use std::collections::{BTreeSet, HashMap, HashSet};

use serde::Serialize;
use thiserror::Error;

use crate::config::ValidationConfig;
use crate::graph::decl::ScopeDecl;

/// A single integrity problem found in a set of declarations.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "issue", rename_all = "snake_case")]
pub enum Issue {
    #[error("scope '{scope}' is declared more than once")]
    DuplicateScope { scope: String },

    #[error("scope '{scope}' names unknown parent '{parent}'")]
    UnknownParent { scope: String, parent: String },

    #[error("scope parents form a cycle: {}", .chain.join(" -> "))]
    ScopeCycle { chain: Vec<String> },

    #[error("scope '{scope}' binds '{name}' more than once")]
    DuplicateBinding { scope: String, name: String },

    #[error("scope '{scope}' binding '{name}' shadows the one in ancestor '{ancestor}'")]
    ShadowedBinding {
        scope: String,
        name: String,
        ancestor: String,
    },

    #[error("provider '{scope}.{provider}' depends on '{dependency}', which no scope in its chain provides")]
    MissingProvider {
        scope: String,
        provider: String,
        dependency: String,
    },

    #[error("providers form a dependency cycle: {}", .chain.join(" -> "))]
    CyclicDependency { chain: Vec<String> },

    #[error("scope '{scope}' registry key '{key}' points at '{provider}', which is not a provider of that scope")]
    KeyTargetMissing {
        scope: String,
        key: String,
        provider: String,
    },

    #[error("provider '{scope}.{provider}' has no recipe bound (looked up '{recipe}')")]
    UnboundRecipe {
        scope: String,
        provider: String,
        recipe: String,
    },
}

/// The outcome of validating a set of declarations.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    pub issues: Vec<Issue>,
}

impl ValidationReport {
    pub fn is_ok(&self) -> bool {
        self.issues.is_empty()
    }

    pub fn len(&self) -> usize {
        self.issues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }

    pub(crate) fn push(&mut self, issue: Issue) {
        self.issues.push(issue);
    }
}

impl std::fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (i, issue) in self.issues.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "  - {}", issue)?;
        }
        Ok(())
    }
}

/// Validates declarations against each other.
pub fn validate(scopes: &[ScopeDecl], options: &ValidationConfig) -> ValidationReport {
    let mut report = ValidationReport::default();
    let mut index: HashMap<&str, &ScopeDecl> = HashMap::new();

    for scope in scopes {
        if index.contains_key(scope.kind.as_str()) {
            report.push(Issue::DuplicateScope {
                scope: scope.kind.clone(),
            });
        } else {
            index.insert(scope.kind.as_str(), scope);
        }
    }

    let cyclic = check_hierarchy(scopes, &index, &mut report);

    for scope in scopes.iter().filter(|s| !cyclic.contains(s.kind.as_str())) {
        let chain = ancestry(scope, &index);
        check_bindings(scope, &chain, options, &mut report);
        check_keys(scope, &mut report);
    }

    check_dependency_cycles(scopes, &index, &cyclic, &mut report);

    report
}

/// Reports unknown parents and parent cycles. Returns the kinds caught in a cycle.
fn check_hierarchy<'a>(
    scopes: &'a [ScopeDecl],
    index: &HashMap<&str, &'a ScopeDecl>,
    report: &mut ValidationReport,
) -> HashSet<&'a str> {
    let mut cyclic = HashSet::new();
    let mut reported: BTreeSet<Vec<String>> = BTreeSet::new();

    for scope in scopes {
        if let Some(parent) = &scope.parent {
            if !index.contains_key(parent.as_str()) {
                report.push(Issue::UnknownParent {
                    scope: scope.kind.clone(),
                    parent: parent.clone(),
                });
            }
        }

        let mut path: Vec<&str> = vec![scope.kind.as_str()];
        let mut current = scope;
        while let Some(parent) = current.parent.as_deref().and_then(|p| index.get(p).copied()) {
            if let Some(pos) = path.iter().position(|k| *k == parent.kind) {
                let members = &path[pos..];
                cyclic.extend(members.iter().copied());
                let chain = rotate_min(members);
                if reported.insert(chain.clone()) {
                    report.push(Issue::ScopeCycle { chain });
                }
                break;
            }
            path.push(parent.kind.as_str());
            current = parent;
        }
    }

    cyclic
}

/// The scope followed by its ancestors, nearest first.
fn ancestry<'a>(scope: &'a ScopeDecl, index: &HashMap<&str, &'a ScopeDecl>) -> Vec<&'a ScopeDecl> {
    let mut chain = vec![scope];
    let mut current = scope;
    while let Some(parent) = current.parent.as_deref().and_then(|p| index.get(p).copied()) {
        if chain.iter().any(|s| s.kind == parent.kind) {
            break;
        }
        chain.push(parent);
        current = parent;
    }
    chain
}

fn check_bindings(
    scope: &ScopeDecl,
    chain: &[&ScopeDecl],
    options: &ValidationConfig,
    report: &mut ValidationReport,
) {
    let mut seen = HashSet::new();
    let names = scope
        .inputs
        .iter()
        .chain(scope.providers.iter().map(|p| &p.name));

    for name in names {
        if !seen.insert(name.as_str()) {
            report.push(Issue::DuplicateBinding {
                scope: scope.kind.clone(),
                name: name.clone(),
            });
            continue;
        }
        if options.deny_shadowing {
            if let Some(ancestor) = chain[1..].iter().find(|s| s.binds(name)) {
                report.push(Issue::ShadowedBinding {
                    scope: scope.kind.clone(),
                    name: name.clone(),
                    ancestor: ancestor.kind.clone(),
                });
            }
        }
    }

    for provider in &scope.providers {
        for dep in &provider.deps {
            if !chain.iter().any(|s| s.binds(dep)) {
                report.push(Issue::MissingProvider {
                    scope: scope.kind.clone(),
                    provider: provider.name.clone(),
                    dependency: dep.clone(),
                });
            }
        }
    }
}

fn check_keys(scope: &ScopeDecl, report: &mut ValidationReport) {
    for (key, target) in &scope.keys {
        if scope.provider(target).is_none() {
            report.push(Issue::KeyTargetMissing {
                scope: scope.kind.clone(),
                key: key.clone(),
                provider: target.clone(),
            });
        }
    }
}

type Node<'a> = (&'a str, &'a str);

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    Active,
    Done,
}

fn check_dependency_cycles<'a>(
    scopes: &'a [ScopeDecl],
    index: &HashMap<&str, &'a ScopeDecl>,
    cyclic: &HashSet<&str>,
    report: &mut ValidationReport,
) {
    // Each provider's deps, resolved to the nearest provider that binds them.
    // Inputs and unresolved names are leaves.
    let mut edges: HashMap<Node<'a>, Vec<Node<'a>>> = HashMap::new();
    for scope in scopes.iter().filter(|s| !cyclic.contains(s.kind.as_str())) {
        let chain = ancestry(scope, index);
        for provider in &scope.providers {
            let targets = provider
                .deps
                .iter()
                .filter_map(|dep| {
                    let owner = chain.iter().find(|s| s.binds(dep)).copied()?;
                    owner
                        .provider(dep)
                        .map(|p| (owner.kind.as_str(), p.name.as_str()))
                })
                .collect();
            edges
                .entry((scope.kind.as_str(), provider.name.as_str()))
                .or_insert(targets);
        }
    }

    let mut marks: HashMap<Node<'a>, Mark> = HashMap::new();
    let mut reported: BTreeSet<Vec<String>> = BTreeSet::new();
    let mut roots: Vec<Node<'a>> = edges.keys().copied().collect();
    roots.sort();

    for root in roots {
        if marks.contains_key(&root) {
            continue;
        }
        // Iterative DFS; each frame is a node and the index of its next edge.
        let mut stack: Vec<(Node<'a>, usize)> = vec![(root, 0)];
        marks.insert(root, Mark::Active);

        while let Some((node, next)) = stack.last().copied() {
            let targets = edges.get(&node).map(Vec::as_slice).unwrap_or(&[]);
            let Some(&target) = targets.get(next) else {
                marks.insert(node, Mark::Done);
                stack.pop();
                continue;
            };
            if let Some(frame) = stack.last_mut() {
                frame.1 += 1;
            }

            match marks.get(&target) {
                Some(Mark::Active) => {
                    let pos = stack.iter().position(|(n, _)| *n == target).unwrap_or(0);
                    let members: Vec<String> = stack[pos..]
                        .iter()
                        .map(|((kind, name), _)| format!("{}.{}", kind, name))
                        .collect();
                    let members: Vec<&str> = members.iter().map(String::as_str).collect();
                    let chain = rotate_min(&members);
                    if reported.insert(chain.clone()) {
                        report.push(Issue::CyclicDependency { chain });
                    }
                }
                Some(Mark::Done) => {}
                None => {
                    marks.insert(target, Mark::Active);
                    stack.push((target, 0));
                }
            }
        }
    }
}

/// Rotates a cycle to start at its smallest member and closes it, so the same
/// cycle found from different entry points compares equal.
fn rotate_min(members: &[&str]) -> Vec<String> {
    let start = members
        .iter()
        .enumerate()
        .min_by_key(|(_, m)| **m)
        .map(|(i, _)| i)
        .unwrap_or(0);
    let mut chain: Vec<String> = members[start..]
        .iter()
        .chain(&members[..start])
        .map(|m| m.to_string())
        .collect();
    if let Some(first) = chain.first().cloned() {
        chain.push(first);
    }
    chain
}
