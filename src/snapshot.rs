//! Snapshot builder
//!
//! Projects remote entities back into declarative state. Association names
//! are always fetched fresh so the snapshot reflects what the platform holds,
//! not what a reconciliation pass believes it did.

use std::collections::BTreeSet;

use aapkit::{Backend, Group, Host, Inventory};

use crate::error::{Action, EntityKind, Error, GatewayContext, Phase, Result};
use crate::model::{GroupState, HostState, InventoryState};
use crate::variables;

fn non_empty(text: &str) -> Option<String> {
    (!text.is_empty()).then(|| text.to_string())
}

fn decode(kind: EntityKind, name: &str, raw: Option<&str>) -> Result<variables::Variables> {
    variables::decode(raw).map_err(|source| Error::Codec {
        kind,
        name: name.to_string(),
        source,
    })
}

/// Project a group and its child names
pub fn group_state<I>(group: &Group, children: I) -> Result<GroupState>
where
    I: IntoIterator<Item = String>,
{
    Ok(GroupState {
        id: Some(group.id),
        inventory: Some(group.inventory),
        name: group.name.clone(),
        children: children.into_iter().collect::<BTreeSet<_>>(),
        description: non_empty(&group.description),
        variables: decode(EntityKind::Group, &group.name, group.variables.as_deref())?,
    })
}

/// Project a host and its group names
pub fn host_state<I>(host: &Host, groups: I) -> Result<HostState>
where
    I: IntoIterator<Item = String>,
{
    Ok(HostState {
        id: Some(host.id),
        inventory: Some(host.inventory),
        name: host.name.clone(),
        groups: groups.into_iter().collect::<BTreeSet<_>>(),
        description: non_empty(&host.description),
        variables: decode(EntityKind::Host, &host.name, host.variables.as_deref())?,
    })
}

/// Project an inventory around already projected groups and hosts
pub fn inventory_state(
    inventory: &Inventory,
    groups: Vec<GroupState>,
    hosts: Vec<HostState>,
) -> Result<InventoryState> {
    Ok(InventoryState {
        id: Some(inventory.id),
        organization: Some(inventory.organization),
        name: inventory.name.clone(),
        description: non_empty(&inventory.description),
        variables: decode(
            EntityKind::Inventory,
            &inventory.name,
            inventory.variables.as_deref(),
        )?,
        groups,
        hosts,
    })
}

/// Build a snapshot, fetching each entity's associations from the gateway
///
/// Issues only list calls.
pub fn build(
    backend: &dyn Backend,
    inventory: &Inventory,
    groups: &[Group],
    hosts: &[Host],
) -> Result<InventoryState> {
    let mut group_states = Vec::with_capacity(groups.len());
    for group in groups {
        let children = backend
            .list_group_children(group.id)
            .during(Phase::Snapshot, Action::ListChildren, EntityKind::Group, &group.name)?;
        group_states.push(group_state(group, children.into_iter().map(|c| c.name))?);
    }

    let mut host_states = Vec::with_capacity(hosts.len());
    for host in hosts {
        let member_of = backend
            .list_host_groups(host.id)
            .during(Phase::Snapshot, Action::ListGroups, EntityKind::Host, &host.name)?;
        host_states.push(host_state(host, member_of.into_iter().map(|g| g.name))?);
    }

    log::trace!(
        "snapshot of inventory '{}': {} groups, {} hosts",
        inventory.name,
        group_states.len(),
        host_states.len()
    );
    inventory_state(inventory, group_states, host_states)
}
