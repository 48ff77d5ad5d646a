//! Backend trait and implementations for the platform API.
//!
//! The primary implementation is [`http::HttpBackend`], which talks to a live
//! `api/v2` endpoint. [`MockBackend`] keeps an in-memory platform so callers
//! can be tested without network access:
//!
//! ```
//! use aapkit::backend::{Backend, Call, MockBackend};
//! use aapkit::types::{GroupRequest, InventoryRequest};
//!
//! let mock = MockBackend::new();
//! let inventory = mock
//!     .create_inventory(&InventoryRequest {
//!         organization: 1,
//!         name: "lab".to_string(),
//!         description: String::new(),
//!         variables: None,
//!     })
//!     .unwrap();
//! let web = mock
//!     .create_group(&GroupRequest {
//!         inventory: inventory.id,
//!         name: "web".to_string(),
//!         description: String::new(),
//!         variables: None,
//!     })
//!     .unwrap();
//!
//! assert_eq!(mock.list_inventory_groups(inventory.id).unwrap(), vec![web]);
//! assert_eq!(mock.calls().len(), 3);
//! assert!(matches!(mock.calls()[0], Call::CreateInventory { .. }));
//! ```

pub mod http;

use crate::error::{Error, Result};
use crate::types::{Group, GroupRequest, Host, HostRequest, Inventory, InventoryRequest};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Backend trait for the inventory, group and host endpoints.
///
/// Every method maps to one remote call (list methods may span several
/// pages). Implementations never retry; a failure is returned as-is.
pub trait Backend: Send + Sync {
    /// Create an inventory.
    fn create_inventory(&self, request: &InventoryRequest) -> Result<Inventory>;

    /// Fetch an inventory by id.
    fn get_inventory(&self, id: i64) -> Result<Inventory>;

    /// Replace an inventory's fields.
    fn update_inventory(&self, id: i64, request: &InventoryRequest) -> Result<Inventory>;

    /// Delete an inventory. The platform removes its groups and hosts.
    fn delete_inventory(&self, id: i64) -> Result<()>;

    /// Create a group.
    fn create_group(&self, request: &GroupRequest) -> Result<Group>;

    /// Fetch a group by id.
    fn get_group(&self, id: i64) -> Result<Group>;

    /// Replace a group's fields.
    fn update_group(&self, id: i64, request: &GroupRequest) -> Result<Group>;

    /// Delete a group.
    fn delete_group(&self, id: i64) -> Result<()>;

    /// List the direct children of a group.
    fn list_group_children(&self, id: i64) -> Result<Vec<Group>>;

    /// List every group of an inventory.
    fn list_inventory_groups(&self, inventory_id: i64) -> Result<Vec<Group>>;

    /// Create a host.
    fn create_host(&self, request: &HostRequest) -> Result<Host>;

    /// Fetch a host by id.
    fn get_host(&self, id: i64) -> Result<Host>;

    /// Replace a host's fields.
    fn update_host(&self, id: i64, request: &HostRequest) -> Result<Host>;

    /// Delete a host.
    fn delete_host(&self, id: i64) -> Result<()>;

    /// List the groups a host is a direct member of.
    fn list_host_groups(&self, id: i64) -> Result<Vec<Group>>;

    /// List every host of an inventory.
    fn list_inventory_hosts(&self, inventory_id: i64) -> Result<Vec<Host>>;

    /// Make `child_id` a child of `parent_id`.
    fn add_child_to_group(&self, parent_id: i64, child_id: i64) -> Result<()>;

    /// Remove `child_id` from the children of `parent_id`.
    fn remove_child_from_group(&self, parent_id: i64, child_id: i64) -> Result<()>;

    /// Add a host to a group.
    fn add_group_to_host(&self, host_id: i64, group_id: i64) -> Result<()>;

    /// Remove a host from a group.
    fn remove_group_from_host(&self, host_id: i64, group_id: i64) -> Result<()>;
}

// =============================================================================
// Mock backend
// =============================================================================

/// A call received by [`MockBackend`], in arrival order.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    CreateInventory { name: String },
    GetInventory(i64),
    UpdateInventory(i64),
    DeleteInventory(i64),
    CreateGroup { name: String },
    GetGroup(i64),
    UpdateGroup(i64),
    DeleteGroup(i64),
    ListGroupChildren(i64),
    ListInventoryGroups(i64),
    CreateHost { name: String },
    GetHost(i64),
    UpdateHost(i64),
    DeleteHost(i64),
    ListHostGroups(i64),
    ListInventoryHosts(i64),
    AddChildToGroup { parent: i64, child: i64 },
    RemoveChildFromGroup { parent: i64, child: i64 },
    AddGroupToHost { host: i64, group: i64 },
    RemoveGroupFromHost { host: i64, group: i64 },
}

impl Call {
    /// Whether the call changes remote state.
    #[must_use]
    pub fn is_mutation(&self) -> bool {
        !matches!(
            self,
            Self::GetInventory(_)
                | Self::GetGroup(_)
                | Self::GetHost(_)
                | Self::ListGroupChildren(_)
                | Self::ListInventoryGroups(_)
                | Self::ListHostGroups(_)
                | Self::ListInventoryHosts(_)
        )
    }

    /// Whether the call is one of the four association endpoints.
    #[must_use]
    pub fn is_association(&self) -> bool {
        matches!(
            self,
            Self::AddChildToGroup { .. }
                | Self::RemoveChildFromGroup { .. }
                | Self::AddGroupToHost { .. }
                | Self::RemoveGroupFromHost { .. }
        )
    }

    /// Whether the call creates or deletes an entity.
    #[must_use]
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            Self::CreateInventory { .. }
                | Self::DeleteInventory(_)
                | Self::CreateGroup { .. }
                | Self::DeleteGroup(_)
                | Self::CreateHost { .. }
                | Self::DeleteHost(_)
        )
    }
}

type FaultFn = Box<dyn Fn(&Call) -> bool + Send + Sync>;

#[derive(Debug, Default)]
struct MockState {
    last_id: i64,
    inventories: BTreeMap<i64, Inventory>,
    groups: BTreeMap<i64, Group>,
    hosts: BTreeMap<i64, Host>,
    /// (parent, child)
    children: BTreeSet<(i64, i64)>,
    /// (host, group)
    host_groups: BTreeSet<(i64, i64)>,
    calls: Vec<Call>,
}

impl MockState {
    fn allocate_id(&mut self) -> i64 {
        self.last_id += 1;
        self.last_id
    }

    fn group(&self, id: i64) -> Result<&Group> {
        self.groups
            .get(&id)
            .ok_or_else(|| Error::status(404, r#"{"detail":"Not found."}"#))
    }

    fn host(&self, id: i64) -> Result<&Host> {
        self.hosts
            .get(&id)
            .ok_or_else(|| Error::status(404, r#"{"detail":"Not found."}"#))
    }

    fn require_inventory(&self, id: i64) -> Result<()> {
        if self.inventories.contains_key(&id) {
            Ok(())
        } else {
            Err(Error::status(
                400,
                format!(r#"{{"inventory":["Invalid pk \"{id}\" - object does not exist."]}}"#),
            ))
        }
    }

    fn group_name_taken(&self, inventory: i64, name: &str, except: Option<i64>) -> bool {
        self.groups
            .values()
            .any(|g| g.inventory == inventory && g.name == name && Some(g.id) != except)
    }

    fn host_name_taken(&self, inventory: i64, name: &str, except: Option<i64>) -> bool {
        self.hosts
            .values()
            .any(|h| h.inventory == inventory && h.name == name && Some(h.id) != except)
    }

    fn remove_group(&mut self, id: i64) {
        self.groups.remove(&id);
        self.children.retain(|&(p, c)| p != id && c != id);
        self.host_groups.retain(|&(_, g)| g != id);
    }

    fn remove_host(&mut self, id: i64) {
        self.hosts.remove(&id);
        self.host_groups.retain(|&(h, _)| h != id);
    }
}

/// In-memory platform for testing without network access.
///
/// Allocates ids from a single counter, enforces name uniqueness per
/// inventory, cascades deletes into association tables and records every
/// call it receives. Clones share the same state.
#[derive(Clone, Default)]
pub struct MockBackend {
    state: Arc<Mutex<MockState>>,
    fault: Arc<Mutex<Option<FaultFn>>>,
}

impl fmt::Debug for MockBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MockBackend")
            .field("state", &*self.lock())
            .finish_non_exhaustive()
    }
}

impl MockBackend {
    /// Create a new empty mock platform.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Record a call and apply fault injection.
    fn enter(&self, call: Call) -> Result<MutexGuard<'_, MockState>> {
        let fail = self
            .fault
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|f| f(&call));
        let mut state = self.lock();
        state.calls.push(call);
        if fail {
            return Err(Error::status(500, "injected failure"));
        }
        Ok(state)
    }

    /// Fail every call matching the predicate with HTTP 500.
    pub fn fail_on(&self, predicate: impl Fn(&Call) -> bool + Send + Sync + 'static) {
        *self.fault.lock().unwrap_or_else(PoisonError::into_inner) = Some(Box::new(predicate));
    }

    /// Stop injecting failures.
    pub fn clear_faults(&self) {
        *self.fault.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }

    /// Every call received so far.
    #[must_use]
    pub fn calls(&self) -> Vec<Call> {
        self.lock().calls.clone()
    }

    /// Calls that changed remote state.
    #[must_use]
    pub fn mutations(&self) -> Vec<Call> {
        self.lock()
            .calls
            .iter()
            .filter(|c| c.is_mutation())
            .cloned()
            .collect()
    }

    /// Forget recorded calls.
    pub fn clear_calls(&self) {
        self.lock().calls.clear();
    }

    /// Delete a group without recording a call, as another client would.
    pub fn remove_group_out_of_band(&self, id: i64) {
        self.lock().remove_group(id);
    }

    /// Delete a host without recording a call, as another client would.
    pub fn remove_host_out_of_band(&self, id: i64) {
        self.lock().remove_host(id);
    }

    /// Attach a child without recording a call, as another client would.
    pub fn add_child_out_of_band(&self, parent_id: i64, child_id: i64) {
        self.lock().children.insert((parent_id, child_id));
    }

    /// Find a group id by inventory and name.
    #[must_use]
    pub fn group_id(&self, inventory: i64, name: &str) -> Option<i64> {
        self.lock()
            .groups
            .values()
            .find(|g| g.inventory == inventory && g.name == name)
            .map(|g| g.id)
    }

    /// Find a host id by inventory and name.
    #[must_use]
    pub fn host_id(&self, inventory: i64, name: &str) -> Option<i64> {
        self.lock()
            .hosts
            .values()
            .find(|h| h.inventory == inventory && h.name == name)
            .map(|h| h.id)
    }

    /// Number of inventories currently stored.
    #[must_use]
    pub fn inventory_count(&self) -> usize {
        self.lock().inventories.len()
    }
}

impl Backend for MockBackend {
    fn create_inventory(&self, request: &InventoryRequest) -> Result<Inventory> {
        let mut state = self.enter(Call::CreateInventory {
            name: request.name.clone(),
        })?;
        let id = state.allocate_id();
        let inventory = Inventory {
            id,
            organization: request.organization,
            name: request.name.clone(),
            description: request.description.clone(),
            variables: request.variables.clone(),
        };
        state.inventories.insert(id, inventory.clone());
        Ok(inventory)
    }

    fn get_inventory(&self, id: i64) -> Result<Inventory> {
        let state = self.enter(Call::GetInventory(id))?;
        state
            .inventories
            .get(&id)
            .cloned()
            .ok_or_else(|| Error::status(404, r#"{"detail":"Not found."}"#))
    }

    fn update_inventory(&self, id: i64, request: &InventoryRequest) -> Result<Inventory> {
        let mut state = self.enter(Call::UpdateInventory(id))?;
        let inventory = state
            .inventories
            .get_mut(&id)
            .ok_or_else(|| Error::status(404, r#"{"detail":"Not found."}"#))?;
        inventory.organization = request.organization;
        inventory.name = request.name.clone();
        inventory.description = request.description.clone();
        inventory.variables = request.variables.clone();
        Ok(inventory.clone())
    }

    fn delete_inventory(&self, id: i64) -> Result<()> {
        let mut state = self.enter(Call::DeleteInventory(id))?;
        if state.inventories.remove(&id).is_none() {
            return Err(Error::status(404, r#"{"detail":"Not found."}"#));
        }
        let groups: Vec<i64> = state
            .groups
            .values()
            .filter(|g| g.inventory == id)
            .map(|g| g.id)
            .collect();
        let hosts: Vec<i64> = state
            .hosts
            .values()
            .filter(|h| h.inventory == id)
            .map(|h| h.id)
            .collect();
        for group in groups {
            state.remove_group(group);
        }
        for host in hosts {
            state.remove_host(host);
        }
        Ok(())
    }

    fn create_group(&self, request: &GroupRequest) -> Result<Group> {
        let mut state = self.enter(Call::CreateGroup {
            name: request.name.clone(),
        })?;
        state.require_inventory(request.inventory)?;
        if state.group_name_taken(request.inventory, &request.name, None) {
            return Err(Error::status(
                400,
                r#"{"__all__":["Group with this Name and Inventory already exists."]}"#,
            ));
        }
        let id = state.allocate_id();
        let group = Group {
            id,
            inventory: request.inventory,
            name: request.name.clone(),
            description: request.description.clone(),
            variables: request.variables.clone(),
        };
        state.groups.insert(id, group.clone());
        Ok(group)
    }

    fn get_group(&self, id: i64) -> Result<Group> {
        let state = self.enter(Call::GetGroup(id))?;
        state.group(id).cloned()
    }

    fn update_group(&self, id: i64, request: &GroupRequest) -> Result<Group> {
        let mut state = self.enter(Call::UpdateGroup(id))?;
        state.group(id)?;
        if state.group_name_taken(request.inventory, &request.name, Some(id)) {
            return Err(Error::status(
                400,
                r#"{"__all__":["Group with this Name and Inventory already exists."]}"#,
            ));
        }
        let group = state
            .groups
            .get_mut(&id)
            .ok_or_else(|| Error::status(404, r#"{"detail":"Not found."}"#))?;
        group.name = request.name.clone();
        group.description = request.description.clone();
        group.variables = request.variables.clone();
        Ok(group.clone())
    }

    fn delete_group(&self, id: i64) -> Result<()> {
        let mut state = self.enter(Call::DeleteGroup(id))?;
        state.group(id)?;
        state.remove_group(id);
        Ok(())
    }

    fn list_group_children(&self, id: i64) -> Result<Vec<Group>> {
        let state = self.enter(Call::ListGroupChildren(id))?;
        state.group(id)?;
        Ok(state
            .children
            .iter()
            .filter(|&&(parent, _)| parent == id)
            .filter_map(|(_, child)| state.groups.get(child).cloned())
            .collect())
    }

    fn list_inventory_groups(&self, inventory_id: i64) -> Result<Vec<Group>> {
        let state = self.enter(Call::ListInventoryGroups(inventory_id))?;
        Ok(state
            .groups
            .values()
            .filter(|g| g.inventory == inventory_id)
            .cloned()
            .collect())
    }

    fn create_host(&self, request: &HostRequest) -> Result<Host> {
        let mut state = self.enter(Call::CreateHost {
            name: request.name.clone(),
        })?;
        state.require_inventory(request.inventory)?;
        if state.host_name_taken(request.inventory, &request.name, None) {
            return Err(Error::status(
                400,
                r#"{"__all__":["Host with this Name and Inventory already exists."]}"#,
            ));
        }
        let id = state.allocate_id();
        let host = Host {
            id,
            inventory: request.inventory,
            name: request.name.clone(),
            description: request.description.clone(),
            variables: request.variables.clone(),
        };
        state.hosts.insert(id, host.clone());
        Ok(host)
    }

    fn get_host(&self, id: i64) -> Result<Host> {
        let state = self.enter(Call::GetHost(id))?;
        state.host(id).cloned()
    }

    fn update_host(&self, id: i64, request: &HostRequest) -> Result<Host> {
        let mut state = self.enter(Call::UpdateHost(id))?;
        state.host(id)?;
        if state.host_name_taken(request.inventory, &request.name, Some(id)) {
            return Err(Error::status(
                400,
                r#"{"__all__":["Host with this Name and Inventory already exists."]}"#,
            ));
        }
        let host = state
            .hosts
            .get_mut(&id)
            .ok_or_else(|| Error::status(404, r#"{"detail":"Not found."}"#))?;
        host.name = request.name.clone();
        host.description = request.description.clone();
        host.variables = request.variables.clone();
        Ok(host.clone())
    }

    fn delete_host(&self, id: i64) -> Result<()> {
        let mut state = self.enter(Call::DeleteHost(id))?;
        state.host(id)?;
        state.remove_host(id);
        Ok(())
    }

    fn list_host_groups(&self, id: i64) -> Result<Vec<Group>> {
        let state = self.enter(Call::ListHostGroups(id))?;
        state.host(id)?;
        Ok(state
            .host_groups
            .iter()
            .filter(|&&(host, _)| host == id)
            .filter_map(|(_, group)| state.groups.get(group).cloned())
            .collect())
    }

    fn list_inventory_hosts(&self, inventory_id: i64) -> Result<Vec<Host>> {
        let state = self.enter(Call::ListInventoryHosts(inventory_id))?;
        Ok(state
            .hosts
            .values()
            .filter(|h| h.inventory == inventory_id)
            .cloned()
            .collect())
    }

    fn add_child_to_group(&self, parent_id: i64, child_id: i64) -> Result<()> {
        let mut state = self.enter(Call::AddChildToGroup {
            parent: parent_id,
            child: child_id,
        })?;
        state.group(parent_id)?;
        if !state.groups.contains_key(&child_id) {
            return Err(Error::status(400, r#"{"msg":"Related object not found."}"#));
        }
        if parent_id == child_id {
            return Err(Error::status(
                400,
                r#"{"error":"Cyclical Group association."}"#,
            ));
        }
        state.children.insert((parent_id, child_id));
        Ok(())
    }

    fn remove_child_from_group(&self, parent_id: i64, child_id: i64) -> Result<()> {
        let mut state = self.enter(Call::RemoveChildFromGroup {
            parent: parent_id,
            child: child_id,
        })?;
        state.group(parent_id)?;
        state.children.remove(&(parent_id, child_id));
        Ok(())
    }

    fn add_group_to_host(&self, host_id: i64, group_id: i64) -> Result<()> {
        let mut state = self.enter(Call::AddGroupToHost {
            host: host_id,
            group: group_id,
        })?;
        state.host(host_id)?;
        if !state.groups.contains_key(&group_id) {
            return Err(Error::status(400, r#"{"msg":"Related object not found."}"#));
        }
        state.host_groups.insert((host_id, group_id));
        Ok(())
    }

    fn remove_group_from_host(&self, host_id: i64, group_id: i64) -> Result<()> {
        let mut state = self.enter(Call::RemoveGroupFromHost {
            host: host_id,
            group: group_id,
        })?;
        state.host(host_id)?;
        state.host_groups.remove(&(host_id, group_id));
        Ok(())
    }
}
