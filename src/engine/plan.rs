//! Dry-run preview of a reconciliation pass

use std::collections::{BTreeMap, BTreeSet};

use aapkit::Group;
use converge::{Disposition, ReconcileSummary, disposition, membership_diff, orphans};
use serde::Serialize;

use super::Reconciler;
use crate::error::{Action, EntityKind, GatewayContext, Phase, Result};
use crate::model::InventoryState;
use crate::resolver::validate_unique;

/// What will happen to one declared group or host
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntityPlan {
    pub name: String,
    pub disposition: Disposition<i64>,
}

/// Association changes for one group or host, by name
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MembershipPlan {
    pub owner: String,
    pub add: Vec<String>,
    pub remove: Vec<String>,
}

/// Operations an apply would issue, computed without mutating anything
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Plan {
    pub inventory: Disposition<i64>,
    pub groups: Vec<EntityPlan>,
    /// Remote groups no declared group claims
    pub group_deletes: Vec<String>,
    /// Child changes, only for groups that have some
    pub children: Vec<MembershipPlan>,
    pub hosts: Vec<EntityPlan>,
    pub host_deletes: Vec<String>,
    /// Group membership changes, only for hosts that have some
    pub memberships: Vec<MembershipPlan>,
}

impl Plan {
    /// Changes the apply is expected to report
    pub fn summary(&self) -> ReconcileSummary {
        let entities = std::iter::once(&self.inventory)
            .chain(self.groups.iter().map(|g| &g.disposition))
            .chain(self.hosts.iter().map(|h| &h.disposition));
        let created = entities.clone().filter(|d| d.is_create()).count();
        let updated = entities.count() - created;

        let associations = self.children.iter().chain(&self.memberships);
        ReconcileSummary {
            created,
            updated,
            deleted: self.group_deletes.len() + self.host_deletes.len(),
            associated: associations.clone().map(|m| m.add.len()).sum(),
            disassociated: associations.map(|m| m.remove.len()).sum(),
        }
    }

    /// Check if an apply would only rewrite entities in place
    pub fn is_converged(&self) -> bool {
        self.summary().is_converged()
    }
}

impl Reconciler<'_> {
    /// Preview the operations `apply` would issue for a declaration
    ///
    /// Only read calls are made, and none at all when the inventory does not
    /// exist yet.
    pub fn plan(&self, desired: &InventoryState) -> Result<Plan> {
        validate_unique(desired)?;
        match desired.id {
            None => Ok(plan_create(desired)),
            Some(id) => self.plan_update(id, desired),
        }
    }

    fn plan_update(&self, id: i64, desired: &InventoryState) -> Result<Plan> {
        let inventory = self
            .backend
            .get_inventory(id)
            .during(Phase::Plan, Action::Get, EntityKind::Inventory, id)?;

        let current_groups = self
            .backend
            .list_inventory_groups(id)
            .during(Phase::Plan, Action::List, EntityKind::Group, &inventory.name)?;
        let observed: BTreeSet<i64> = current_groups.iter().map(|g| g.id).collect();
        let groups: Vec<EntityPlan> = desired
            .groups
            .iter()
            .map(|g| EntityPlan {
                name: g.name.clone(),
                disposition: disposition(g.id, &observed),
            })
            .collect();

        // Updated groups take their declared name; orphans disappear.
        let mut names_after: BTreeMap<i64, &str> = current_groups
            .iter()
            .map(|g| (g.id, g.name.as_str()))
            .collect();
        for plan in &groups {
            if let Disposition::Update(id) = plan.disposition {
                names_after.insert(id, plan.name.as_str());
            }
        }
        let claimed: BTreeSet<i64> =
            groups.iter().filter_map(|g| updated_id(&g.disposition)).collect();
        let orphaned = orphans(&current_groups, &claimed, |g| g.id);
        for orphan in &orphaned {
            names_after.remove(&orphan.id);
        }
        let surviving = |members: Vec<Group>| -> Vec<String> {
            members
                .iter()
                .filter_map(|m| names_after.get(&m.id).map(|n| (*n).to_string()))
                .collect()
        };

        let mut children = Vec::new();
        for (declared, plan) in desired.groups.iter().zip(&groups) {
            let current = match plan.disposition {
                Disposition::Update(id) => surviving(
                    self.backend
                        .list_group_children(id)
                        .during(
                            Phase::Plan,
                            Action::ListChildren,
                            EntityKind::Group,
                            &declared.name,
                        )?,
                ),
                Disposition::Create => Vec::new(),
            };
            children.extend(membership_plan(&declared.name, &declared.children, &current));
        }

        let current_hosts = self
            .backend
            .list_inventory_hosts(id)
            .during(Phase::Plan, Action::List, EntityKind::Host, &inventory.name)?;
        let observed: BTreeSet<i64> = current_hosts.iter().map(|h| h.id).collect();
        let hosts: Vec<EntityPlan> = desired
            .hosts
            .iter()
            .map(|h| EntityPlan {
                name: h.name.clone(),
                disposition: disposition(h.id, &observed),
            })
            .collect();
        let claimed: BTreeSet<i64> =
            hosts.iter().filter_map(|h| updated_id(&h.disposition)).collect();
        let host_deletes = orphans(&current_hosts, &claimed, |h| h.id)
            .into_iter()
            .map(|h| h.name.clone())
            .collect();

        let mut memberships = Vec::new();
        for (declared, plan) in desired.hosts.iter().zip(&hosts) {
            let current = match plan.disposition {
                Disposition::Update(id) => surviving(
                    self.backend
                        .list_host_groups(id)
                        .during(Phase::Plan, Action::ListGroups, EntityKind::Host, &declared.name)?,
                ),
                Disposition::Create => Vec::new(),
            };
            memberships.extend(membership_plan(&declared.name, &declared.groups, &current));
        }

        Ok(Plan {
            inventory: Disposition::Update(id),
            groups,
            group_deletes: orphaned.into_iter().map(|g| g.name.clone()).collect(),
            children,
            hosts,
            host_deletes,
            memberships,
        })
    }
}

fn plan_create(desired: &InventoryState) -> Plan {
    let none = Vec::new();
    Plan {
        inventory: Disposition::Create,
        groups: desired
            .groups
            .iter()
            .map(|g| EntityPlan {
                name: g.name.clone(),
                disposition: Disposition::Create,
            })
            .collect(),
        group_deletes: Vec::new(),
        children: desired
            .groups
            .iter()
            .filter_map(|g| membership_plan(&g.name, &g.children, &none))
            .collect(),
        hosts: desired
            .hosts
            .iter()
            .map(|h| EntityPlan {
                name: h.name.clone(),
                disposition: Disposition::Create,
            })
            .collect(),
        host_deletes: Vec::new(),
        memberships: desired
            .hosts
            .iter()
            .filter_map(|h| membership_plan(&h.name, &h.groups, &none))
            .collect(),
    }
}

fn updated_id(disposition: &Disposition<i64>) -> Option<i64> {
    match disposition {
        Disposition::Update(id) => Some(*id),
        Disposition::Create => None,
    }
}

fn membership_plan(
    owner: &str,
    declared: &BTreeSet<String>,
    current: &[String],
) -> Option<MembershipPlan> {
    let diff = membership_diff(declared, current, |name| name);
    (!diff.is_empty()).then(|| MembershipPlan {
        owner: owner.to_string(),
        add: diff.to_add.into_iter().cloned().collect(),
        remove: diff.to_remove.into_iter().cloned().collect(),
    })
}
