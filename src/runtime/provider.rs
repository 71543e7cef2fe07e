//! Per-provider memoization.

use std::sync::Arc;

use once_cell::sync::OnceCell;

use crate::error::ScopeError;
use crate::graph::Policy;

use super::Instance;

/// The memoized slot for one provider in one scope instance.
///
/// `PerScope` slots run their recipe at most once successfully. Concurrent
/// callers that arrive before the value exists block on this slot alone
/// until the running evaluation finishes, then share its result. A failed
/// evaluation leaves the slot empty, so a later call may retry.
pub(crate) struct Provider {
    policy: Policy,
    cell: OnceCell<Instance>,
}

impl Provider {
    pub(crate) fn new(policy: Policy) -> Self {
        Self {
            policy,
            cell: OnceCell::new(),
        }
    }

    /// Returns the cached value, or produces one with `recipe`.
    pub(crate) fn resolve<F>(&self, recipe: F) -> Result<Instance, ScopeError>
    where
        F: FnOnce() -> Result<Instance, ScopeError>,
    {
        match self.policy {
            Policy::PerScope => self.cell.get_or_try_init(recipe).map(Arc::clone),
            Policy::PerRequest => recipe(),
        }
    }

    pub(crate) fn is_cached(&self) -> bool {
        self.cell.get().is_some()
    }
}
