use super::Reconciler;
use crate::error::{Action, EntityKind, Error, GatewayContext, Phase, Result};
use crate::model::InventoryState;

impl Reconciler<'_> {
    /// Delete the inventory; the platform removes its groups and hosts
    pub fn delete(&self, id: i64) -> Result<()> {
        log::info!("Deleting inventory {id}");
        self.backend
            .delete_inventory(id)
            .during(Phase::Delete, Action::Delete, EntityKind::Inventory, id)
    }

    /// Delete the inventory a persisted state refers to
    pub fn delete_state(&self, state: &InventoryState) -> Result<()> {
        let id = state.id.ok_or_else(|| Error::MissingId {
            phase: Phase::Delete,
            kind: EntityKind::Inventory,
            name: state.name.clone(),
        })?;
        self.delete(id)
    }
}
