use std::collections::BTreeSet;

use aapkit::{Group, Host, Inventory};
use converge::{Change, Disposition, ReconcileSummary, disposition, membership_diff, orphans};

use super::{Outcome, Reconciler, group_request, host_request};
use crate::error::{Action, EntityKind, Error, GatewayContext, Phase, Result};
use crate::model::{GroupState, HostState, InventoryState};
use crate::resolver::{resolve_id, validate_unique};
use crate::snapshot;

impl Reconciler<'_> {
    /// Converge an existing inventory toward its declaration
    ///
    /// Entities are matched by the ids carried in state. A carried id that no
    /// longer exists remotely falls back to create; remote entities that no
    /// declared entity claims are deleted. Associations are diffed by name
    /// and resolved against the groups reconciled in this same pass.
    pub fn update(&self, desired: &InventoryState) -> Result<Outcome> {
        validate_unique(desired)?;
        let id = desired.id.ok_or_else(|| Error::MissingId {
            phase: Phase::Update,
            kind: EntityKind::Inventory,
            name: desired.name.clone(),
        })?;
        log::info!("Updating inventory '{}' (id {id})", desired.name);

        let mut summary = ReconcileSummary::default();
        let inventory = self
            .backend
            .update_inventory(id, &self.inventory_request(desired)?)
            .during(Phase::Update, Action::Update, EntityKind::Inventory, &desired.name)?;
        summary.record(Change::Updated);

        let groups = self.reconcile_groups(&inventory, &desired.groups, &mut summary)?;
        self.reconcile_children(&desired.groups, &groups, &mut summary)?;

        let hosts = self.reconcile_hosts(&inventory, &desired.hosts, &mut summary)?;
        self.reconcile_memberships(&desired.hosts, &hosts, &groups, &mut summary)?;

        let state = snapshot::build(self.backend, &inventory, &groups, &hosts)?;
        log::info!("Updated inventory '{}': {summary}", inventory.name);
        Ok(Outcome { state, summary })
    }

    /// Create or update each declared group, then delete unclaimed ones
    fn reconcile_groups(
        &self,
        inventory: &Inventory,
        desired: &[GroupState],
        summary: &mut ReconcileSummary,
    ) -> Result<Vec<Group>> {
        let current = self
            .backend
            .list_inventory_groups(inventory.id)
            .during(Phase::Update, Action::List, EntityKind::Group, &inventory.name)?;
        let observed: BTreeSet<i64> = current.iter().map(|g| g.id).collect();

        let dispositions: Vec<Disposition<i64>> =
            desired.iter().map(|d| disposition(d.id, &observed)).collect();
        let mut slots: Vec<Option<Group>> = desired.iter().map(|_| None).collect();

        // Updates first: a rename can free a name that a create in this pass reuses.
        for ((declared, slot), planned) in desired.iter().zip(&mut slots).zip(&dispositions) {
            if let Disposition::Update(id) = *planned {
                let request = group_request(inventory.id, declared)?;
                let group = self
                    .backend
                    .update_group(id, &request)
                    .during(Phase::Update, Action::Update, EntityKind::Group, &declared.name)?;
                summary.record(Change::Updated);
                *slot = Some(group);
            }
        }
        for ((declared, slot), planned) in desired.iter().zip(&mut slots).zip(&dispositions) {
            if planned.is_create() {
                let request = group_request(inventory.id, declared)?;
                let group = self
                    .backend
                    .create_group(&request)
                    .during(Phase::Update, Action::Create, EntityKind::Group, &declared.name)?;
                summary.record(Change::Created);
                log::debug!("Created group '{}' (id {})", group.name, group.id);
                *slot = Some(group);
            }
        }
        let reconciled: Vec<Group> = slots.into_iter().flatten().collect();

        let claimed: BTreeSet<i64> = reconciled.iter().map(|g| g.id).collect();
        for orphan in orphans(&current, &claimed, |g| g.id) {
            self.backend
                .delete_group(orphan.id)
                .during(Phase::Update, Action::Delete, EntityKind::Group, &orphan.name)?;
            summary.record(Change::Deleted);
            log::debug!("Deleted group '{}' (id {})", orphan.name, orphan.id);
        }

        Ok(reconciled)
    }

    /// Apply the per-group difference between declared and remote children
    fn reconcile_children(
        &self,
        desired: &[GroupState],
        groups: &[Group],
        summary: &mut ReconcileSummary,
    ) -> Result<()> {
        for (declared, group) in desired.iter().zip(groups) {
            let current = self
                .backend
                .list_group_children(group.id)
                .during(Phase::Update, Action::ListChildren, EntityKind::Group, &group.name)?;
            let diff = membership_diff(&declared.children, &current, |c| &c.name);

            for name in diff.to_add {
                let child_id = resolve_id(name, groups).map_err(|source| Error::Resolve {
                    phase: Phase::Update,
                    kind: EntityKind::Group,
                    owner: group.name.clone(),
                    source,
                })?;
                self.backend
                    .add_child_to_group(group.id, child_id)
                    .during(
                        Phase::Update,
                        Action::Associate,
                        EntityKind::Group,
                        format_args!("{} -> {name}", group.name),
                    )?;
                summary.record(Change::Associated);
                log::debug!("Added child '{name}' to group '{}'", group.name);
            }

            for child in diff.to_remove {
                self.backend
                    .remove_child_from_group(group.id, child.id)
                    .during(
                        Phase::Update,
                        Action::Disassociate,
                        EntityKind::Group,
                        format_args!("{} -> {}", group.name, child.name),
                    )?;
                summary.record(Change::Disassociated);
                log::debug!("Removed child '{}' from group '{}'", child.name, group.name);
            }
        }
        Ok(())
    }

    /// Create or update each declared host, then delete unclaimed ones
    fn reconcile_hosts(
        &self,
        inventory: &Inventory,
        desired: &[HostState],
        summary: &mut ReconcileSummary,
    ) -> Result<Vec<Host>> {
        let current = self
            .backend
            .list_inventory_hosts(inventory.id)
            .during(Phase::Update, Action::List, EntityKind::Host, &inventory.name)?;
        let observed: BTreeSet<i64> = current.iter().map(|h| h.id).collect();

        let dispositions: Vec<Disposition<i64>> =
            desired.iter().map(|d| disposition(d.id, &observed)).collect();
        let mut slots: Vec<Option<Host>> = desired.iter().map(|_| None).collect();

        for ((declared, slot), planned) in desired.iter().zip(&mut slots).zip(&dispositions) {
            if let Disposition::Update(id) = *planned {
                let request = host_request(inventory.id, declared)?;
                let host = self
                    .backend
                    .update_host(id, &request)
                    .during(Phase::Update, Action::Update, EntityKind::Host, &declared.name)?;
                summary.record(Change::Updated);
                *slot = Some(host);
            }
        }
        for ((declared, slot), planned) in desired.iter().zip(&mut slots).zip(&dispositions) {
            if planned.is_create() {
                let request = host_request(inventory.id, declared)?;
                let host = self
                    .backend
                    .create_host(&request)
                    .during(Phase::Update, Action::Create, EntityKind::Host, &declared.name)?;
                summary.record(Change::Created);
                log::debug!("Created host '{}' (id {})", host.name, host.id);
                *slot = Some(host);
            }
        }
        let reconciled: Vec<Host> = slots.into_iter().flatten().collect();

        let claimed: BTreeSet<i64> = reconciled.iter().map(|h| h.id).collect();
        for orphan in orphans(&current, &claimed, |h| h.id) {
            self.backend
                .delete_host(orphan.id)
                .during(Phase::Update, Action::Delete, EntityKind::Host, &orphan.name)?;
            summary.record(Change::Deleted);
            log::debug!("Deleted host '{}' (id {})", orphan.name, orphan.id);
        }

        Ok(reconciled)
    }

    /// Apply the per-host difference between declared and remote groups
    fn reconcile_memberships(
        &self,
        desired: &[HostState],
        hosts: &[Host],
        groups: &[Group],
        summary: &mut ReconcileSummary,
    ) -> Result<()> {
        for (declared, host) in desired.iter().zip(hosts) {
            let current = self
                .backend
                .list_host_groups(host.id)
                .during(Phase::Update, Action::ListGroups, EntityKind::Host, &host.name)?;
            let diff = membership_diff(&declared.groups, &current, |g| &g.name);

            for name in diff.to_add {
                let group_id = resolve_id(name, groups).map_err(|source| Error::Resolve {
                    phase: Phase::Update,
                    kind: EntityKind::Host,
                    owner: host.name.clone(),
                    source,
                })?;
                self.backend
                    .add_group_to_host(host.id, group_id)
                    .during(
                        Phase::Update,
                        Action::Associate,
                        EntityKind::Host,
                        format_args!("{} -> {name}", host.name),
                    )?;
                summary.record(Change::Associated);
                log::debug!("Added host '{}' to group '{name}'", host.name);
            }

            for group in diff.to_remove {
                self.backend
                    .remove_group_from_host(host.id, group.id)
                    .during(
                        Phase::Update,
                        Action::Disassociate,
                        EntityKind::Host,
                        format_args!("{} -> {}", host.name, group.name),
                    )?;
                summary.record(Change::Disassociated);
                log::debug!("Removed host '{}' from group '{}'", host.name, group.name);
            }
        }
        Ok(())
    }
}
