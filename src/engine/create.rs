use aapkit::{Group, Host};
use converge::{Change, ReconcileSummary};

use super::{Outcome, Reconciler, group_request, host_request};
use crate::error::{Action, EntityKind, Error, GatewayContext, Phase, Result};
use crate::model::InventoryState;
use crate::resolver::{resolve_id, validate_unique};
use crate::snapshot;

impl Reconciler<'_> {
    /// Materialise a declared inventory that does not exist yet
    ///
    /// All groups are created before any edge is wired, and every host is
    /// created before its memberships, so both endpoints of an association
    /// always have ids.
    pub fn create(&self, desired: &InventoryState) -> Result<Outcome> {
        validate_unique(desired)?;
        log::info!(
            "Creating inventory '{}' ({} groups, {} hosts)",
            desired.name,
            desired.groups.len(),
            desired.hosts.len()
        );

        let mut summary = ReconcileSummary::default();
        let inventory = self
            .backend
            .create_inventory(&self.inventory_request(desired)?)
            .during(Phase::Create, Action::Create, EntityKind::Inventory, &desired.name)?;
        summary.record(Change::Created);
        log::debug!("Created inventory '{}' (id {})", inventory.name, inventory.id);

        let mut groups: Vec<Group> = Vec::with_capacity(desired.groups.len());
        for declared in &desired.groups {
            let group = self
                .backend
                .create_group(&group_request(inventory.id, declared)?)
                .during(Phase::Create, Action::Create, EntityKind::Group, &declared.name)?;
            summary.record(Change::Created);
            log::debug!("Created group '{}' (id {})", group.name, group.id);
            groups.push(group);
        }

        for (declared, parent) in desired.groups.iter().zip(&groups) {
            for child in &declared.children {
                let child_id = resolve_id(child, &groups).map_err(|source| Error::Resolve {
                    phase: Phase::Create,
                    kind: EntityKind::Group,
                    owner: parent.name.clone(),
                    source,
                })?;
                self.backend
                    .add_child_to_group(parent.id, child_id)
                    .during(
                        Phase::Create,
                        Action::Associate,
                        EntityKind::Group,
                        format_args!("{} -> {child}", parent.name),
                    )?;
                summary.record(Change::Associated);
                log::debug!("Added child '{child}' to group '{}'", parent.name);
            }
        }

        let mut hosts: Vec<Host> = Vec::with_capacity(desired.hosts.len());
        for declared in &desired.hosts {
            let host = self
                .backend
                .create_host(&host_request(inventory.id, declared)?)
                .during(Phase::Create, Action::Create, EntityKind::Host, &declared.name)?;
            summary.record(Change::Created);
            log::debug!("Created host '{}' (id {})", host.name, host.id);
            hosts.push(host);
        }

        for (declared, host) in desired.hosts.iter().zip(&hosts) {
            for name in &declared.groups {
                let group_id = resolve_id(name, &groups).map_err(|source| Error::Resolve {
                    phase: Phase::Create,
                    kind: EntityKind::Host,
                    owner: host.name.clone(),
                    source,
                })?;
                self.backend
                    .add_group_to_host(host.id, group_id)
                    .during(
                        Phase::Create,
                        Action::Associate,
                        EntityKind::Host,
                        format_args!("{} -> {name}", host.name),
                    )?;
                summary.record(Change::Associated);
                log::debug!("Added host '{}' to group '{name}'", host.name);
            }
        }

        let state = snapshot::build(self.backend, &inventory, &groups, &hosts)?;
        log::info!("Created inventory '{}': {summary}", inventory.name);
        Ok(Outcome { state, summary })
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::*;
    use super::*;
    use crate::model::{GroupState, HostState};
    use crate::resolver::ResolveError;
    use aapkit::{Backend, Call, MockBackend};
    use std::collections::BTreeSet;

    #[test]
    fn test_end_to_end_call_sequence() {
        init_logger();
        let mock = MockBackend::new();

        let outcome = Reconciler::new(&mock).create(&scenario()).unwrap();

        let inv = outcome.state.id.unwrap();
        let a = mock.group_id(inv, "A").unwrap();
        let b = mock.group_id(inv, "B").unwrap();
        let h = mock.host_id(inv, "H").unwrap();
        assert_eq!(
            mock.mutations(),
            vec![
                Call::CreateInventory {
                    name: "Inv".to_string()
                },
                Call::CreateGroup {
                    name: "A".to_string()
                },
                Call::CreateGroup {
                    name: "B".to_string()
                },
                Call::AddChildToGroup { parent: a, child: b },
                Call::CreateHost {
                    name: "H".to_string()
                },
                Call::AddGroupToHost { host: h, group: a },
                Call::AddGroupToHost { host: h, group: b },
            ]
        );

        let state = outcome.state;
        assert_eq!(
            state.group("A").unwrap().children,
            BTreeSet::from(["B".to_string()])
        );
        assert!(state.group("B").unwrap().children.is_empty());
        assert_eq!(
            state.host("H").unwrap().groups,
            BTreeSet::from(["A".to_string(), "B".to_string()])
        );
        assert_eq!(state.group("A").unwrap().id, Some(a));
        assert_eq!(state.host("H").unwrap().inventory, Some(inv));

        assert_eq!(outcome.summary.created, 4);
        assert_eq!(outcome.summary.associated, 3);
    }

    #[test]
    fn test_no_association_before_both_endpoints_exist() {
        let mock = MockBackend::new();
        let desired = InventoryState {
            groups: vec![
                GroupState::new("all").with_children(["web", "db"]),
                GroupState::new("web"),
                GroupState::new("db").with_children(["replica"]),
                GroupState::new("replica"),
            ],
            hosts: vec![
                HostState::new("w1").with_groups(["web", "all"]),
                HostState::new("d1").with_groups(["db"]),
            ],
            ..InventoryState::new("lab")
        };

        let outcome = Reconciler::new(&mock).create(&desired).unwrap();

        let calls = mock.calls();
        let position = |call: &Call| calls.iter().position(|c| c == call).unwrap();
        let inv = outcome.state.id.unwrap();
        let created_group = |name: &str| {
            position(&Call::CreateGroup {
                name: name.to_string(),
            })
        };
        let created_host = |name: &str| {
            position(&Call::CreateHost {
                name: name.to_string(),
            })
        };

        for (index, call) in calls.iter().enumerate() {
            match call {
                Call::AddChildToGroup { parent, child } => {
                    for id in [parent, child] {
                        let group = outcome.state.groups.iter().find(|g| g.id == Some(*id));
                        assert!(created_group(&group.unwrap().name) < index);
                    }
                }
                Call::AddGroupToHost { host, group } => {
                    let host = outcome.state.hosts.iter().find(|h| h.id == Some(*host)).unwrap();
                    let group = outcome.state.groups.iter().find(|g| g.id == Some(*group)).unwrap();
                    let (host, group) = (&host.name, &group.name);
                    assert!(created_host(host) < index);
                    assert!(created_group(group) < index);
                }
                _ => {}
            }
        }
        assert!(mock.group_id(inv, "replica").is_some());
        assert_eq!(outcome.summary.associated, 6);
    }

    #[test]
    fn test_unknown_child_aborts_after_groups_exist() {
        let mock = MockBackend::new();
        let desired = InventoryState {
            groups: vec![GroupState::new("web").with_children(["ghost"])],
            hosts: vec![HostState::new("h")],
            ..InventoryState::new("lab")
        };

        let err = Reconciler::new(&mock).create(&desired).unwrap_err();
        match err {
            Error::Resolve {
                phase, owner, source, ..
            } => {
                assert_eq!(phase, Phase::Create);
                assert_eq!(owner, "web");
                assert_eq!(source, ResolveError::NotFound("ghost".to_string()));
            }
            other => panic!("expected resolve error, got {other:?}"),
        }
        // No rollback, and nothing after the failure.
        assert_eq!(mock.inventory_count(), 1);
        assert!(!mock.calls().iter().any(|c| matches!(c, Call::CreateHost { .. })));
    }

    #[test]
    fn test_gateway_failure_is_fail_fast() {
        let mock = MockBackend::new();
        mock.fail_on(|call| matches!(call, Call::CreateGroup { name } if name == "B"));

        let err = Reconciler::new(&mock).create(&scenario()).unwrap_err();
        match &err {
            Error::Gateway {
                phase,
                action,
                kind,
                target,
                source,
            } => {
                assert_eq!(*phase, Phase::Create);
                assert_eq!(*action, Action::Create);
                assert_eq!(*kind, EntityKind::Group);
                assert_eq!(target, "B");
                assert_eq!(source.status_code(), Some(500));
            }
            other => panic!("expected gateway error, got {other:?}"),
        }
        assert_eq!(
            mock.calls().last(),
            Some(&Call::CreateGroup {
                name: "B".to_string()
            })
        );
    }

    #[test]
    fn test_duplicate_names_rejected_before_any_call() {
        let mock = MockBackend::new();
        let desired = InventoryState {
            groups: vec![GroupState::new("web"), GroupState::new("web")],
            ..InventoryState::new("lab")
        };

        assert!(matches!(
            Reconciler::new(&mock).create(&desired),
            Err(Error::DuplicateName { .. })
        ));
        assert!(mock.calls().is_empty());
    }

    #[test]
    fn test_variables_travel_encoded() {
        let mock = MockBackend::new();
        let mut desired = InventoryState::new("lab");
        desired
            .variables
            .insert("env".to_string(), "prod".to_string());
        let mut host = HostState::new("h");
        host.variables
            .insert("ansible_host".to_string(), "10.1.1.1".to_string());
        host.description = Some("primary".to_string());
        desired.hosts.push(host);

        let outcome = Reconciler::new(&mock).create(&desired).unwrap();

        let inv = outcome.state.id.unwrap();
        let remote = mock.get_host(mock.host_id(inv, "h").unwrap()).unwrap();
        assert_eq!(remote.variables.as_deref(), Some(r#"{"ansible_host":"10.1.1.1"}"#));
        assert_eq!(outcome.state.variables["env"], "prod");
        assert_eq!(outcome.state.hosts[0].description.as_deref(), Some("primary"));
        assert_eq!(outcome.state.hosts[0].variables["ansible_host"], "10.1.1.1");
    }
}
