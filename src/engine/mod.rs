//! Reconciliation engine
//!
//! Converges a platform inventory toward declared state through the flat
//! CRUD and pairwise association endpoints of a [`Backend`].
//!
//! Every path is sequential and fail-fast: the first gateway error aborts
//! the pass and nothing already applied is rolled back. The update path is
//! keyed by the ids carried in state, so re-running it after a failure
//! converges whatever is left.

mod create;
mod delete;
mod plan;
mod read;
mod update;

pub use plan::{EntityPlan, MembershipPlan, Plan};

use aapkit::{Backend, GroupRequest, HostRequest, InventoryRequest};
use converge::ReconcileSummary;

use crate::error::{EntityKind, Error, Result};
use crate::model::{GroupState, HostState, InventoryState};
use crate::variables::{self, Variables};

/// Organization used on create when the declaration names none
pub const DEFAULT_ORGANIZATION: i64 = 1;

/// Result of a mutating pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    /// Snapshot of remote state after the pass, ready to persist
    pub state: InventoryState,
    /// Changes the pass made
    pub summary: ReconcileSummary,
}

/// Drives reconciliation passes against a backend
pub struct Reconciler<'a> {
    backend: &'a dyn Backend,
    default_organization: i64,
}

impl<'a> Reconciler<'a> {
    /// Create a reconciler over a backend
    pub fn new(backend: &'a dyn Backend) -> Self {
        Self {
            backend,
            default_organization: DEFAULT_ORGANIZATION,
        }
    }

    /// Organization for inventories that do not declare one
    pub fn with_default_organization(mut self, organization: i64) -> Self {
        self.default_organization = organization;
        self
    }

    /// Create the inventory if it carries no id, otherwise update it
    pub fn apply(&self, desired: &InventoryState) -> Result<Outcome> {
        match desired.id {
            None => self.create(desired),
            Some(_) => self.update(desired),
        }
    }

    fn inventory_request(&self, desired: &InventoryState) -> Result<InventoryRequest> {
        Ok(InventoryRequest {
            organization: desired.organization.unwrap_or(self.default_organization),
            name: desired.name.clone(),
            description: desired.description.clone().unwrap_or_default(),
            variables: encode(EntityKind::Inventory, &desired.name, &desired.variables)?,
        })
    }
}

fn group_request(inventory: i64, desired: &GroupState) -> Result<GroupRequest> {
    Ok(GroupRequest {
        inventory,
        name: desired.name.clone(),
        description: desired.description.clone().unwrap_or_default(),
        variables: encode(EntityKind::Group, &desired.name, &desired.variables)?,
    })
}

fn host_request(inventory: i64, desired: &HostState) -> Result<HostRequest> {
    Ok(HostRequest {
        inventory,
        name: desired.name.clone(),
        description: desired.description.clone().unwrap_or_default(),
        variables: encode(EntityKind::Host, &desired.name, &desired.variables)?,
    })
}

fn encode(kind: EntityKind, name: &str, vars: &Variables) -> Result<Option<String>> {
    variables::encode(vars).map_err(|source| Error::Codec {
        kind,
        name: name.to_string(),
        source,
    })
}


#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;
    use aapkit::{Call, MockBackend};

    #[test]
    fn test_apply_dispatches_on_carried_id() {
        init_logger();
        let mock = MockBackend::new();
        let reconciler = Reconciler::new(&mock);

        let created = reconciler.apply(&scenario()).unwrap();
        assert!(matches!(mock.calls()[0], Call::CreateInventory { .. }));
        assert_eq!(created.summary.created, 4);

        mock.clear_calls();
        let updated = reconciler.apply(&created.state).unwrap();
        assert!(matches!(mock.calls()[0], Call::UpdateInventory(_)));
        assert!(updated.summary.is_converged());
        assert_eq!(updated.state, created.state);
    }

    #[test]
    fn test_default_organization() {
        let mock = MockBackend::new();
        let outcome = Reconciler::new(&mock)
            .with_default_organization(42)
            .create(&InventoryState::new("lab"))
            .unwrap();
        assert_eq!(outcome.state.organization, Some(42));

        let declared = InventoryState {
            organization: Some(7),
            ..InventoryState::new("other")
        };
        let outcome = Reconciler::new(&mock)
            .with_default_organization(42)
            .create(&declared)
            .unwrap();
        assert_eq!(outcome.state.organization, Some(7));
    }
}
