//! The compiled, immutable form of a blueprint.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use crate::config::RuntimeConfig;
use crate::error::ScopeError;
use crate::runtime::{Dispatcher, ProviderId, Scope, ScopeBuilder};

/// Where a name visible from a scope kind is bound.
///
/// `hops` counts parent links to follow: `0` is the kind itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Binding {
    Provider { hops: usize, id: ProviderId },
    Input { hops: usize, slot: usize },
}

/// Everything the runtime needs to know about one scope kind.
pub(crate) struct Shape {
    pub(crate) kind: String,
    pub(crate) parent: Option<usize>,
    pub(crate) inputs: Vec<String>,
    pub(crate) dispatcher: Dispatcher,
    /// Every name visible from this kind, nearest declaration first.
    pub(crate) bindings: HashMap<String, Binding>,
    pub(crate) keys: Arc<BTreeMap<String, ProviderId>>,
}

impl Shape {
    pub(crate) fn local_provider(&self, name: &str) -> Option<ProviderId> {
        match self.bindings.get(name) {
            Some(Binding::Provider { hops: 0, id }) => Some(*id),
            _ => None,
        }
    }
}

/// A validated set of scope kinds, ready to enter.
///
/// Produced by [`Blueprint::compile`](super::Blueprint::compile). The graph
/// holds no scope instances; it only describes them.
pub struct Graph {
    pub(crate) shapes: Vec<Shape>,
    pub(crate) by_kind: HashMap<String, usize>,
    pub(crate) runtime: RuntimeConfig,
}

impl Graph {
    /// Starts entering a root scope of `kind`.
    pub fn builder(self: &Arc<Self>, kind: &str) -> Result<ScopeBuilder, ScopeError> {
        let index = self.index_of(kind)?;
        if self.shapes[index].parent.is_some() {
            return Err(ScopeError::NotARootScope(kind.to_string()));
        }
        Ok(ScopeBuilder::new(Arc::clone(self), index, None))
    }

    /// Starts entering a `kind` scope below `parent`.
    pub(crate) fn child_builder(
        self: &Arc<Self>,
        parent: &Scope,
        kind: &str,
    ) -> Result<ScopeBuilder, ScopeError> {
        let index = self.index_of(kind)?;
        if self.shapes[index].parent != Some(parent.shape_index()) {
            return Err(ScopeError::NotAChildScope {
                parent: parent.kind().to_string(),
                child: kind.to_string(),
            });
        }
        Ok(ScopeBuilder::new(Arc::clone(self), index, Some(parent.clone())))
    }

    /// Declared scope kinds, in declaration order.
    pub fn kinds(&self) -> impl Iterator<Item = &str> {
        self.shapes.iter().map(|s| s.kind.as_str())
    }

    pub fn parent_of(&self, kind: &str) -> Option<&str> {
        let shape = &self.shapes[*self.by_kind.get(kind)?];
        shape.parent.map(|p| self.shapes[p].kind.as_str())
    }

    /// Kinds that can be entered directly below `kind`.
    pub fn children_of<'a>(&'a self, kind: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        let index = self.by_kind.get(kind).copied();
        self.shapes
            .iter()
            .filter(move |s| index.is_some() && s.parent == index)
            .map(|s| s.kind.as_str())
    }

    /// Registry keys a `kind` scope will support, without entering one.
    pub fn keys_of(&self, kind: &str) -> Result<impl Iterator<Item = &str>, ScopeError> {
        let index = self.index_of(kind)?;
        Ok(self.shapes[index].keys.keys().map(String::as_str))
    }

    pub fn runtime_config(&self) -> &RuntimeConfig {
        &self.runtime
    }

    pub(crate) fn shape(&self, index: usize) -> &Shape {
        &self.shapes[index]
    }

    fn index_of(&self, kind: &str) -> Result<usize, ScopeError> {
        self.by_kind
            .get(kind)
            .copied()
            .ok_or_else(|| ScopeError::UnknownScopeKind(kind.to_string()))
    }
}

impl std::fmt::Debug for Graph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Graph")
            .field("kinds", &self.kinds().collect::<Vec<_>>())
            .finish()
    }
}
