//! Id-based recipe dispatch for one scope kind.

use std::collections::HashSet;
use std::sync::Arc;

use crate::graph::Policy;

use super::{Instance, ProviderId, Resolver, Scope};

/// A type-erased construction recipe.
pub(crate) type Recipe = Arc<dyn Fn(&Resolver<'_>) -> anyhow::Result<Instance> + Send + Sync>;

/// One provider's recipe and the dependencies it is allowed to read.
pub(crate) struct RecipeEntry {
    pub(crate) name: String,
    pub(crate) policy: Policy,
    pub(crate) deps: HashSet<String>,
    pub(crate) recipe: Recipe,
}

impl RecipeEntry {
    pub(crate) fn allows(&self, dep: &str) -> bool {
        self.deps.contains(dep)
    }
}

/// Routes "evaluate provider #k" to the k-th recipe of a scope kind.
///
/// One dispatcher is shared by every instance of the kind; lookup is a
/// slice index, independent of how many providers the kind declares.
pub(crate) struct Dispatcher {
    entries: Vec<RecipeEntry>,
}

impl Dispatcher {
    pub(crate) fn new(entries: Vec<RecipeEntry>) -> Self {
        Self { entries }
    }

    pub(crate) fn entry(&self, id: ProviderId) -> Option<&RecipeEntry> {
        self.entries.get(id.index())
    }

    pub(crate) fn entries(&self) -> impl Iterator<Item = (ProviderId, &RecipeEntry)> {
        self.entries
            .iter()
            .enumerate()
            .map(|(i, e)| (ProviderId::new(i as u32), e))
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    /// Runs the recipe for `id` against `scope`.
    ///
    /// Returns `None` for an id this kind never issued.
    pub(crate) fn dispatch(&self, id: ProviderId, scope: &Scope) -> Option<anyhow::Result<Instance>> {
        let entry = self.entry(id)?;
        let resolver = Resolver::new(scope, entry);
        Some((entry.recipe)(&resolver))
    }
}
