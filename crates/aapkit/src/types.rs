//! Wire types for the inventory, group and host endpoints.
//!
//! Response types keep only the fields this crate consumes; the platform
//! returns many more (`related`, `summary_fields`, timestamps) which serde
//! ignores. `variables` is the platform's raw JSON/YAML string.

use serde::{Deserialize, Serialize};

/// An inventory as returned by `api/v2/inventories/`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Inventory {
    pub id: i64,
    pub organization: i64,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub variables: Option<String>,
}

/// A group as returned by `api/v2/groups/`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub id: i64,
    pub inventory: i64,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub variables: Option<String>,
}

/// A host as returned by `api/v2/hosts/`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Host {
    pub id: i64,
    pub inventory: i64,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub variables: Option<String>,
}

/// Body for creating or updating an inventory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryRequest {
    pub organization: i64,
    pub name: String,
    pub description: String,
    pub variables: Option<String>,
}

/// Body for creating or updating a group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupRequest {
    pub inventory: i64,
    pub name: String,
    pub description: String,
    pub variables: Option<String>,
}

/// Body for creating or updating a host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostRequest {
    pub inventory: i64,
    pub name: String,
    pub description: String,
    pub variables: Option<String>,
}

/// Body for the pairwise association endpoints.
///
/// `{"id": 7}` associates, `{"id": 7, "disassociate": true}` removes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssociationRequest {
    pub id: i64,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub disassociate: bool,
}

impl AssociationRequest {
    /// Associate the target id.
    #[must_use]
    pub fn associate(id: i64) -> Self {
        Self {
            id,
            disassociate: false,
        }
    }

    /// Disassociate the target id.
    #[must_use]
    pub fn disassociate(id: i64) -> Self {
        Self {
            id,
            disassociate: true,
        }
    }
}

/// One page of a list endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Page<T> {
    #[serde(default)]
    pub count: u64,
    #[serde(default)]
    pub next: Option<String>,
    #[serde(default)]
    pub previous: Option<String>,
    #[serde(default = "Vec::new")]
    pub results: Vec<T>,
}
