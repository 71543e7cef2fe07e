//! Staged construction of scope instances.

use std::sync::Arc;

use crate::error::ScopeError;
use crate::graph::Graph;

use super::{Instance, Scope};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BuilderState {
    Collecting,
    Built,
}

/// Collects the external inputs a scope kind requires, then enters it.
///
/// Obtained from [`Graph::builder`] for root kinds or
/// [`Scope::child_builder`] for child kinds. Every declared input must be
/// set before [`build`](Self::build) succeeds; there are no defaults.
/// After a successful build the builder is spent.
///
/// # Example
///
/// ```ignore
/// let mut builder = activity_retained.child_builder("view_model")?;
/// builder.set_input("saved_state", SavedState::default())?;
/// let view_model = builder.build()?;
/// ```
pub struct ScopeBuilder {
    graph: Arc<Graph>,
    shape: usize,
    parent: Option<Scope>,
    slots: Vec<Option<Instance>>,
    state: BuilderState,
}

impl ScopeBuilder {
    pub(crate) fn new(graph: Arc<Graph>, shape: usize, parent: Option<Scope>) -> Self {
        let slots = vec![None; graph.shape(shape).inputs.len()];
        Self {
            graph,
            shape,
            parent,
            slots,
            state: BuilderState::Collecting,
        }
    }

    /// The scope kind this builder enters.
    pub fn kind(&self) -> &str {
        &self.graph.shape(self.shape).kind
    }

    /// Sets a named input. Setting the same input again replaces the value.
    pub fn set_input<T: Send + Sync + 'static>(
        &mut self,
        name: &str,
        value: T,
    ) -> Result<&mut Self, ScopeError> {
        self.set_input_instance(name, Arc::new(value))
    }

    /// Sets a named input from an already type-erased value.
    pub fn set_input_instance(
        &mut self,
        name: &str,
        value: Instance,
    ) -> Result<&mut Self, ScopeError> {
        self.ensure_collecting()?;

        let slot = self
            .graph
            .shape(self.shape)
            .inputs
            .iter()
            .position(|input| input == name)
            .ok_or_else(|| ScopeError::UnknownInput {
                scope: self.kind().to_string(),
                input: name.to_string(),
            })?;

        self.slots[slot] = Some(value);
        Ok(self)
    }

    /// Consuming form of [`set_input`](Self::set_input), for chaining.
    pub fn with_input<T: Send + Sync + 'static>(
        mut self,
        name: &str,
        value: T,
    ) -> Result<Self, ScopeError> {
        self.set_input(name, value)?;
        Ok(self)
    }

    /// Names of the declared inputs not yet set.
    pub fn missing_inputs(&self) -> Vec<&str> {
        self.graph
            .shape(self.shape)
            .inputs
            .iter()
            .zip(&self.slots)
            .filter(|(_, slot)| slot.is_none())
            .map(|(name, _)| name.as_str())
            .collect()
    }

    pub fn is_built(&self) -> bool {
        self.state == BuilderState::Built
    }

    /// Enters the scope.
    ///
    /// Fails with [`ScopeError::MissingBuilderInput`] naming every unset
    /// input, leaving the builder usable. A second call after success fails
    /// with [`ScopeError::AlreadyBuilt`].
    pub fn build(&mut self) -> Result<Scope, ScopeError> {
        self.ensure_collecting()?;

        let missing = self.missing_inputs();
        if !missing.is_empty() {
            return Err(ScopeError::MissingBuilderInput {
                scope: self.kind().to_string(),
                inputs: missing.into_iter().map(String::from).collect(),
            });
        }

        let inputs = std::mem::take(&mut self.slots).into_iter().flatten().collect();
        self.state = BuilderState::Built;

        Ok(Scope::new(
            Arc::clone(&self.graph),
            self.shape,
            self.parent.take(),
            inputs,
        ))
    }

    fn ensure_collecting(&self) -> Result<(), ScopeError> {
        match self.state {
            BuilderState::Collecting => Ok(()),
            BuilderState::Built => Err(ScopeError::AlreadyBuilt {
                scope: self.kind().to_string(),
            }),
        }
    }
}

impl std::fmt::Debug for ScopeBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScopeBuilder")
            .field("kind", &self.kind())
            .field("missing", &self.missing_inputs())
            .field("state", &self.state)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{Blueprint, ScopeDef};

    fn graph() -> Arc<Graph> {
        Blueprint::new()
            .scope(ScopeDef::root("singleton"))
            .scope(
                ScopeDef::child("view_model", "singleton")
                    .input("saved_state")
                    .input("lifecycle")
                    .scoped("vm", &["saved_state", "lifecycle"], |r| {
                        Ok(format!(
                            "{}/{}",
                            r.get::<String>("saved_state")?,
                            r.get::<u8>("lifecycle")?
                        ))
                    }),
            )
            .compile()
            .unwrap()
    }

    #[test]
    fn test_build_requires_every_input() {
        let graph = graph();
        let root = graph.builder("singleton").unwrap().build().unwrap();

        let mut builder = root.child_builder("view_model").unwrap();
        builder.set_input("lifecycle", 3u8).unwrap();

        let err = builder.build().unwrap_err();
        assert!(matches!(
            err,
            ScopeError::MissingBuilderInput { ref inputs, .. } if inputs == &["saved_state"]
        ));
        assert!(!builder.is_built());

        builder.set_input("saved_state", "restored".to_string()).unwrap();
        let scope = builder.build().unwrap();
        assert_eq!(*scope.get::<String>("vm").unwrap(), "restored/3");
    }

    #[test]
    fn test_missing_error_names_all_slots() {
        let graph = graph();
        let root = graph.builder("singleton").unwrap().build().unwrap();

        let err = root.child_builder("view_model").unwrap().build().unwrap_err();
        assert!(matches!(
            err,
            ScopeError::MissingBuilderInput { ref inputs, .. }
                if inputs == &["saved_state", "lifecycle"]
        ));
    }

    #[test]
    fn test_second_build_fails() {
        let graph = graph();
        let mut builder = graph.builder("singleton").unwrap();

        builder.build().unwrap();
        assert!(builder.is_built());
        assert!(matches!(builder.build(), Err(ScopeError::AlreadyBuilt { .. })));
        assert!(matches!(
            builder.set_input("anything", 1u8),
            Err(ScopeError::AlreadyBuilt { .. })
        ));
    }

    #[test]
    fn test_setting_input_twice_replaces_value() {
        let graph = graph();
        let root = graph.builder("singleton").unwrap().build().unwrap();

        let scope = root
            .child_builder("view_model")
            .unwrap()
            .with_input("saved_state", "first".to_string())
            .unwrap()
            .with_input("saved_state", "second".to_string())
            .unwrap()
            .with_input("lifecycle", 1u8)
            .unwrap()
            .build()
            .unwrap();

        assert_eq!(*scope.get::<String>("vm").unwrap(), "second/1");
    }

    #[test]
    fn test_unknown_input_and_wrong_hierarchy() {
        let graph = graph();
        let root = graph.builder("singleton").unwrap().build().unwrap();

        let mut builder = root.child_builder("view_model").unwrap();
        assert!(matches!(
            builder.set_input("activity", 0u8),
            Err(ScopeError::UnknownInput { .. })
        ));

        assert!(matches!(
            graph.builder("view_model"),
            Err(ScopeError::NotARootScope(_))
        ));
        assert!(matches!(
            graph.builder("fragment"),
            Err(ScopeError::UnknownScopeKind(_))
        ));
        assert!(matches!(
            root.child_builder("singleton"),
            Err(ScopeError::NotAChildScope { .. })
        ));
    }
}
