//! # aap-inventory
//!
//! Declarative inventory reconciliation for Ansible Automation Platform and
//! AWX.
//!
//! An inventory is declared as a tree: groups with named children, hosts with
//! named group memberships. The platform only offers flat CRUD plus pairwise
//! association endpoints. [`Reconciler`] bridges the two: it creates, updates
//! and deletes entities keyed by the ids carried in state, diffs memberships
//! by name, and returns a fresh snapshot to persist for the next run.
//!
//! ## Example
//!
//! ```
//! use aap_inventory::{GroupState, HostState, InventoryState, Reconciler};
//! use aapkit::MockBackend;
//!
//! let backend = MockBackend::new();
//! let desired = InventoryState {
//!     groups: vec![GroupState::new("web").with_children(["web_eu"]), GroupState::new("web_eu")],
//!     hosts: vec![HostState::new("eu1").with_groups(["web_eu"])],
//!     ..InventoryState::new("lab")
//! };
//!
//! let reconciler = Reconciler::new(&backend);
//! let created = reconciler.apply(&desired).unwrap();
//! assert!(created.state.id.is_some());
//!
//! // Applying the snapshot again changes nothing.
//! let again = reconciler.apply(&created.state).unwrap();
//! assert!(again.summary.is_converged());
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod model;
pub mod resolver;
pub mod snapshot;
pub mod state;
pub mod variables;

pub use config::{Config, GatewayConfig};
pub use engine::{Outcome, Plan, Reconciler};
pub use error::{Action, EntityKind, Error, Phase, Result};
pub use model::{GroupState, HostState, InventoryState, Variables};
pub use state::StateStore;

pub use converge::ReconcileSummary;
