use super::Reconciler;
use crate::error::{Action, EntityKind, GatewayContext, Phase, Result};
use crate::model::InventoryState;
use crate::snapshot;

impl Reconciler<'_> {
    /// Project the remote inventory into declarative state
    ///
    /// No diffing happens here.
    pub fn read(&self, id: i64) -> Result<InventoryState> {
        log::info!("Reading inventory {id}");
        let inventory = self
            .backend
            .get_inventory(id)
            .during(Phase::Read, Action::Get, EntityKind::Inventory, id)?;
        let groups = self
            .backend
            .list_inventory_groups(id)
            .during(Phase::Read, Action::List, EntityKind::Group, &inventory.name)?;
        let hosts = self
            .backend
            .list_inventory_hosts(id)
            .during(Phase::Read, Action::List, EntityKind::Host, &inventory.name)?;

        snapshot::build(self.backend, &inventory, &groups, &hosts)
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::*;
    use super::*;
    use aapkit::MockBackend;

    #[test]
    fn test_read_matches_apply_snapshot() {
        init_logger();
        let mock = MockBackend::new();
        let state = applied(&mock, &scenario());

        let read = Reconciler::new(&mock).read(state.id.unwrap()).unwrap();

        assert_eq!(read, state);
        assert!(mock.mutations().is_empty());
    }

    #[test]
    fn test_read_sees_external_changes() {
        let mock = MockBackend::new();
        let state = applied(&mock, &scenario());
        mock.remove_group_out_of_band(state.group("B").unwrap().id.unwrap());

        let read = Reconciler::new(&mock).read(state.id.unwrap()).unwrap();

        assert!(read.group("B").is_none());
        assert!(read.group("A").unwrap().children.is_empty());
        assert_eq!(read.host("H").unwrap().groups.len(), 1);
    }

    #[test]
    fn test_read_missing_inventory() {
        let mock = MockBackend::new();
        let err = Reconciler::new(&mock).read(404).unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(err.phase(), Some(Phase::Read));
    }
}
