//! scopegraph - hierarchical dependency-injection scopes.
//!
//! Scope kinds are declared once, validated as a whole, and compiled into a
//! [`Graph`]. The host then enters scope instances through builders as its
//! own lifecycle dictates; each instance lazily builds and memoizes the
//! values its providers declare, reading from ancestor scopes as needed.
//!
//! ```ignore
//! use scopegraph::{Blueprint, ScopeDef};
//!
//! let graph = Blueprint::new()
//!     .scope(ScopeDef::root("singleton")
//!         .scoped("http_client", &[], |_| Ok(HttpClient::new()))
//!         .scoped("order_repo", &["http_client"], |r| {
//!             Ok(OrderRepository::new(r.get("http_client")?))
//!         }))
//!     .scope(ScopeDef::child("view_model", "singleton")
//!         .input("saved_state")
//!         .per_request("orders_vm", &["order_repo", "saved_state"], |r| {
//!             Ok(OrdersViewModel::new(r.get("order_repo")?, r.get("saved_state")?))
//!         })
//!         .key("OrdersViewModel", "orders_vm"))
//!     .compile()?;
//!
//! let app = graph.builder("singleton")?.build()?;
//! let vm_scope = app
//!     .child_builder("view_model")?
//!     .with_input("saved_state", SavedState::default())?
//!     .build()?;
//! let vm = vm_scope.registry().lookup("OrdersViewModel")?.get::<OrdersViewModel>()?;
//! ```

pub mod cli;
pub mod config;
pub mod error;
pub mod graph;
pub mod runtime;

pub use config::Config;
pub use error::{GraphError, ScopeError};
pub use graph::{Blueprint, Graph, Manifest, Policy, RecipeBook, ScopeDef};
pub use runtime::{Instance, KeyedRegistry, ProviderId, ProviderRef, Resolver, Scope, ScopeBuilder};
